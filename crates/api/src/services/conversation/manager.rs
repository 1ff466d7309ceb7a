//! `ConversationManager`: orchestrates a chat turn through
//! staged phases — understand, retrieve, compose, finalize — yielding SSE
//! events as it goes, built over `docint_core`'s collaborator traits.

use async_stream::try_stream;
use docint_core::db::chunks::Scope;
use docint_core::db::membership::MembershipStore;
use docint_core::db::sessions::SessionStore;
use docint_core::error::CoreError;
use docint_core::memory::{self, MemoryBudgetConfig};
use docint_core::model::MessageRole;
use docint_core::retrieval;
use docint_core::traits::{EmbeddingProvider, LlmProvider, LlmStreamEvent};
use futures::Stream;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::services::context_expander::ContextExpander;
use crate::services::hybrid_retriever::HybridRetriever;
use crate::services::prompt_builder::{build_chat_prompt, build_context_block};
use crate::services::reranker::{compress_window, select_diverse};

use super::cache::ConversationCache;
use super::context_builder::ContextBuilder;
use super::types::{ChatStreamChunk, RetrievalDecision};
use super::verification::{LlmVerifier, VerificationOutcome, MAX_VERIFICATION_ITERATIONS};

pub struct ConversationManager {
    cache: Arc<ConversationCache>,
    sessions: Arc<SessionStore>,
    membership: Arc<MembershipStore>,
    retriever: Arc<HybridRetriever>,
    expander: Arc<ContextExpander>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    memory_cfg: MemoryBudgetConfig,
    rerank_window: usize,
    rerank_token_budget: usize,
    diversity_ratio: f32,
    max_expansion_per_chunk: usize,
    system_prompt: String,
}

pub struct ManagerConfig {
    pub rerank_window: usize,
    pub rerank_token_budget: usize,
    pub diversity_ratio: f32,
    pub max_expansion_per_chunk: usize,
    pub system_prompt: String,
}

impl ConversationManager {
    pub fn new(
        cache: Arc<ConversationCache>,
        sessions: Arc<SessionStore>,
        membership: Arc<MembershipStore>,
        retriever: Arc<HybridRetriever>,
        expander: Arc<ContextExpander>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        memory_cfg: MemoryBudgetConfig,
        cfg: ManagerConfig,
    ) -> Self {
        Self {
            cache,
            sessions,
            membership,
            retriever,
            expander,
            embedder,
            llm,
            memory_cfg,
            rerank_window: cfg.rerank_window,
            rerank_token_budget: cfg.rerank_token_budget,
            diversity_ratio: cfg.diversity_ratio,
            max_expansion_per_chunk: cfg.max_expansion_per_chunk,
            system_prompt: cfg.system_prompt,
        }
    }

    pub fn cache(&self) -> &ConversationCache {
        &self.cache
    }

    /// Drives one chat turn end to end, yielding staged SSE events. The
    /// retrieval-verify loop reacts to `<NEED_MORE_CONTEXT/>`/
    /// `<NOT_RELEVANT/>` tags the model may emit, widening the retrieval
    /// window up to `MAX_VERIFICATION_ITERATIONS` times.
    pub fn handle_message(
        self: Arc<Self>,
        session_id: Uuid,
        tenant_id: Uuid,
        user_id: Uuid,
        user_query: String,
    ) -> impl Stream<Item = Result<ChatStreamChunk, CoreError>> {
        try_stream! {
            yield ChatStreamChunk::Stage { stage: "understand".into(), message: "Analyzing your question".into() };

            let document_ids = self.membership.documents_in_session(session_id).await?;
            let state_lock = self.cache.get_or_create(session_id, tenant_id, user_id, document_ids.clone());
            let last_embedding = state_lock.lock().last_query_embedding.clone();

            self.sessions
                .append_message(session_id, MessageRole::User, &user_query, &[], None)
                .await?;

            let query_embedding = self.embedder.embed_text(&user_query).await?;
            let decision = ContextBuilder::decide_retrieval(&user_query, last_embedding.as_deref(), &query_embedding);

            yield ChatStreamChunk::Stage { stage: "retrieve".into(), message: "Searching your documents".into() };

            let document_order: HashMap<Uuid, usize> =
                document_ids.iter().enumerate().map(|(i, id)| (*id, i + 1)).collect();
            let scope = Scope::Documents(document_ids.clone());
            let (query_type, prefs) = retrieval::classify_query(&user_query, document_ids.len());

            let mut window = self.rerank_window;
            let mut source_chunk_ids = Vec::new();
            let mut raw_answer = String::new();

            for attempt in 0..MAX_VERIFICATION_ITERATIONS {
                let retrieved = match decision {
                    RetrievalDecision::Skip(_) if attempt == 0 => Vec::new(),
                    _ => self.retriever.retrieve(&user_query, &scope, query_type, &prefs, window).await?,
                };

                let base_chunks: Vec<_> = retrieved.into_iter().map(|r| r.chunk).collect();
                let expanded = self.expander.expand(&base_chunks, self.max_expansion_per_chunk).await?;
                source_chunk_ids = expanded.iter().map(|c| c.id).collect();

                let scored: Vec<_> = expanded
                    .into_iter()
                    .map(|chunk| crate::services::hybrid_retriever::RetrievedChunk { chunk, hybrid_score: 1.0 })
                    .collect();
                let diverse = select_diverse(scored, window, self.diversity_ratio);
                let ranked = compress_window(diverse, self.rerank_token_budget, 0.5);
                let compressed_chunks: Vec<_> = ranked.iter().map(|r| {
                    let mut c = r.chunk.clone();
                    c.text = r.compression.text.clone();
                    c
                }).collect();

                let context_block = build_context_block(&compressed_chunks, &document_order);
                let prompt = build_chat_prompt(&self.system_prompt, &context_block, "", &user_query);

                yield ChatStreamChunk::Stage { stage: "compose".into(), message: "Drafting your answer".into() };

                let mut rx = self.llm.stream_chat(&prompt).await?;
                raw_answer.clear();
                while let Some(event) = rx.recv().await {
                    match event {
                        LlmStreamEvent::Text { text } => {
                            raw_answer.push_str(&text);
                            yield ChatStreamChunk::Message { delta: text };
                        }
                        LlmStreamEvent::Data { .. } => {}
                        LlmStreamEvent::Done => break,
                    }
                }

                match LlmVerifier::classify(&raw_answer) {
                    VerificationOutcome::Accepted => break,
                    VerificationOutcome::NotRelevant => break,
                    VerificationOutcome::NeedsMoreContext => {
                        window += self.rerank_window;
                        continue;
                    }
                }
            }

            let final_answer = LlmVerifier::strip_tags(&raw_answer);
            let citations = docint_core::citation::extract_citations(&final_answer);

            let message = self
                .sessions
                .append_message(session_id, MessageRole::Assistant, &final_answer, &source_chunk_ids, Some(&user_query))
                .await?;

            {
                let mut state = state_lock.lock();
                state.last_query_embedding = Some(query_embedding);
            }
            self.cache.touch(session_id);

            self.maybe_summarize(session_id).await?;

            if !citations.is_empty() {
                yield ChatStreamChunk::Citation { tokens: citations };
            }
            yield ChatStreamChunk::Done { message_id: message.id };
        }
    }

    async fn maybe_summarize(&self, session_id: Uuid) -> Result<(), CoreError> {
        let session = match self.sessions.get(session_id).await? {
            Some(s) => s,
            None => return Ok(()),
        };
        let recent = self
            .sessions
            .recent_messages(session_id, self.memory_cfg.max_history_messages as i64)
            .await?;
        let history: Vec<String> = recent.iter().map(|m| m.content.clone()).collect();

        if memory::should_summarize(&history, "", &self.memory_cfg) {
            // The summary text itself is produced by the LLM collaborator;
            // here we only decide *that* it should happen and merge facts.
            let merged_facts = memory::merge_key_facts(&session.last_summary_key_facts, &[], 10);
            self.sessions
                .update_summary(session_id, &session.last_summary_text.unwrap_or_default(), &merged_facts, session.message_count)
                .await?;
        }
        Ok(())
    }
}

pub fn default_ttl() -> Duration {
    Duration::from_secs(30 * 60)
}
