//! Pure retrieval math: cosine similarity, min-max normalization, BM25-like
//! scoring, Reciprocal Rank Fusion, query classification, and metadata
//! boosting. All DB access lives in `docint-api`; this module
//! is intentionally I/O-free so it can be exhaustively unit tested.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Min-max normalize a page of similarity scores to `[0, 1]`
pub fn min_max_normalize(scores: &[f32]) -> Vec<f32> {
    let min = scores.iter().cloned().fold(f32::INFINITY, f32::min);
    let max = scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    if !(max - min).is_finite() || (max - min).abs() < f32::EPSILON {
        return scores.iter().map(|_| 1.0).collect();
    }
    scores.iter().map(|s| (s - min) / (max - min)).collect()
}

/// Length-normalized BM25-like term overlap score; `prefer_tables` applies
/// a boost multiplier to table chunks.
pub fn bm25_like_score(
    query_terms: &[String],
    doc_terms: &[String],
    avg_doc_len: f32,
    k1: f32,
    b: f32,
    term_doc_freq: &HashMap<String, usize>,
    corpus_size: usize,
) -> f32 {
    let doc_len = doc_terms.len() as f32;
    let mut doc_term_counts: HashMap<&str, usize> = HashMap::new();
    for t in doc_terms {
        *doc_term_counts.entry(t.as_str()).or_insert(0) += 1;
    }

    query_terms
        .iter()
        .map(|q| {
            let tf = *doc_term_counts.get(q.as_str()).unwrap_or(&0) as f32;
            if tf == 0.0 {
                return 0.0;
            }
            let df = *term_doc_freq.get(q).unwrap_or(&1) as f32;
            let idf = ((corpus_size as f32 - df + 0.5) / (df + 0.5) + 1.0).ln();
            let denom = tf + k1 * (1.0 - b + b * (doc_len / avg_doc_len.max(1.0)));
            idf * (tf * (k1 + 1.0)) / denom.max(f32::EPSILON)
        })
        .sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    DataExtraction,
    Summarization,
    EntityLookup,
    GeneralQa,
    Comparison,
}

#[derive(Debug, Clone, Default)]
pub struct QueryPreferences {
    pub prefer_tables: bool,
    pub prefer_narrative: bool,
}

/// Classify a query's retrieval intent plus content preferences.
/// Kept as simple, auditable keyword matching over a five-way taxonomy.
pub fn classify_query(query: &str, document_count: usize) -> (QueryType, QueryPreferences) {
    let q = query.to_lowercase();

    if document_count >= 2
        && ["compare", "versus", " vs ", "difference between", "which document"]
            .iter()
            .any(|p| q.contains(p))
    {
        return (QueryType::Comparison, QueryPreferences::default());
    }

    let table_markers = ["table", "figure", "row", "column", "breakdown", "numbers", "amount"];
    let extraction_markers = ["extract", "how much", "what is the value", "total", "list all"];
    if extraction_markers.iter().any(|p| q.contains(p)) {
        return (
            QueryType::DataExtraction,
            QueryPreferences {
                prefer_tables: table_markers.iter().any(|p| q.contains(p)),
                prefer_narrative: false,
            },
        );
    }

    let summary_markers = ["summarize", "summary", "overview", "tl;dr", "recap"];
    if summary_markers.iter().any(|p| q.contains(p)) {
        return (
            QueryType::Summarization,
            QueryPreferences {
                prefer_tables: false,
                prefer_narrative: true,
            },
        );
    }

    let entity_markers = ["who is", "who was", "what company", "ceo", "named"];
    if entity_markers.iter().any(|p| q.contains(p)) {
        return (
            QueryType::EntityLookup,
            QueryPreferences {
                prefer_tables: false,
                prefer_narrative: true,
            },
        );
    }

    (
        QueryType::GeneralQa,
        QueryPreferences {
            prefer_tables: table_markers.iter().any(|p| q.contains(p)),
            prefer_narrative: false,
        },
    )
}

#[derive(Debug, Clone)]
pub struct FusedResult {
    pub chunk_id: Uuid,
    pub hybrid_score: f32,
    pub semantic_rank: Option<usize>,
    pub keyword_rank: Option<usize>,
}

/// Reciprocal Rank Fusion over two ranked id lists: `score = sum(1 / (k +
/// rank_i))`. Ranks are 1-based. Unique chunks keep whichever ranks they
/// appeared at.
pub fn rrf_fuse(dense_ranked: &[Uuid], lexical_ranked: &[Uuid], rrf_k: f32) -> Vec<FusedResult> {
    let mut scores: HashMap<Uuid, (f32, Option<usize>, Option<usize>)> = HashMap::new();

    for (idx, id) in dense_ranked.iter().enumerate() {
        let rank = idx + 1;
        let entry = scores.entry(*id).or_insert((0.0, None, None));
        entry.0 += 1.0 / (rrf_k + rank as f32);
        entry.1 = Some(rank);
    }
    for (idx, id) in lexical_ranked.iter().enumerate() {
        let rank = idx + 1;
        let entry = scores.entry(*id).or_insert((0.0, None, None));
        entry.0 += 1.0 / (rrf_k + rank as f32);
        entry.2 = Some(rank);
    }

    let mut fused: Vec<FusedResult> = scores
        .into_iter()
        .map(|(chunk_id, (score, sem_rank, kw_rank))| FusedResult {
            chunk_id,
            hybrid_score: score,
            semantic_rank: sem_rank,
            keyword_rank: kw_rank,
        })
        .collect();

    fused.sort_by(|a, b| b.hybrid_score.partial_cmp(&a.hybrid_score).unwrap());
    fused
}

/// Bounded metadata boost: small multiplicative factors from query-type
/// content matches, clamped so no single boost dominates.
pub fn metadata_boost_factor(
    query_type: QueryType,
    is_tabular: bool,
    section_heading_matches_query: bool,
) -> f32 {
    const MAX_BOOST: f32 = 1.5;
    let mut factor = 1.0;
    match query_type {
        QueryType::DataExtraction if is_tabular => factor *= 1.25,
        QueryType::EntityLookup if section_heading_matches_query => factor *= 1.15,
        QueryType::Summarization if !is_tabular => factor *= 1.05,
        _ => {}
    }
    factor.min(MAX_BOOST)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_identical_vectors_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rrf_fuses_per_scenario_3() {
        let ids: Vec<Uuid> = (0..8).map(|_| Uuid::new_v4()).collect();
        let (a, b, c, d, _e, f, g, h) = (
            ids[0], ids[1], ids[2], ids[3], ids[4], ids[5], ids[6], ids[7],
        );
        let dense = vec![a, b, c, d, ids[4]];
        let lexical = vec![c, f, b, g, h];

        let fused = rrf_fuse(&dense, &lexical, 60.0);
        let top3: Vec<Uuid> = fused.iter().take(3).map(|r| r.chunk_id).collect();
        assert_eq!(top3[0], c);
        assert_eq!(top3[1], b);
        assert_eq!(top3[2], a);
    }

    #[test]
    fn boost_is_bounded() {
        let f = metadata_boost_factor(QueryType::DataExtraction, true, true);
        assert!(f <= 1.5);
    }
}
