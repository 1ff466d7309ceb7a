//! `ContextBuilder`: decides whether a turn needs a fresh
//! retrieval pass or can reuse the previous turn's context, combining the
//! query-intent classifier with a cosine-similarity skip heuristic.

use docint_core::retrieval::cosine_similarity;

use crate::services::query_analyzer::QueryAnalyzer;

use super::types::{RetrievalDecision, SkipReason};

/// Above this cosine similarity to the previous query's embedding, a
/// follow-up question is assumed to target the same retrieved context.
const SKIP_RETRIEVAL_SIMILARITY_THRESHOLD: f32 = 0.75;

pub struct ContextBuilder;

impl ContextBuilder {
    pub fn decide_retrieval(query: &str, last_query_embedding: Option<&[f32]>, new_embedding: &[f32]) -> RetrievalDecision {
        if QueryAnalyzer::is_meta_question(query) {
            return RetrievalDecision::Skip(SkipReason::MetaQuestion);
        }
        if let Some(prev) = last_query_embedding {
            if cosine_similarity(prev, new_embedding) >= SKIP_RETRIEVAL_SIMILARITY_THRESHOLD {
                return RetrievalDecision::Skip(SkipReason::FollowUpSimilarToLastQuery);
            }
        }
        RetrievalDecision::Retrieve
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_question_always_skips() {
        let decision = ContextBuilder::decide_retrieval("what is this document about?", None, &[1.0, 0.0]);
        assert!(matches!(decision, RetrievalDecision::Skip(SkipReason::MetaQuestion)));
    }

    #[test]
    fn dissimilar_followup_retrieves() {
        let prev = vec![1.0, 0.0, 0.0];
        let next = vec![0.0, 1.0, 0.0];
        let decision = ContextBuilder::decide_retrieval("what about the budget?", Some(&prev), &next);
        assert!(matches!(decision, RetrievalDecision::Retrieve));
    }
}
