//! Hybrid retrieval orchestration: runs dense + lexical search
//! against the Chunk Store, fuses with RRF, then applies bounded metadata
//! boosting. The math itself (`rrf_fuse`, `metadata_boost_factor`) lives in
//! `docint_core::retrieval`; this module owns the DB round trips.

use docint_core::db::chunks::{ChunkStore, Scope};
use docint_core::error::CoreError;
use docint_core::model::Chunk;
use docint_core::retrieval::{self, QueryPreferences, QueryType};
use docint_core::traits::EmbeddingProvider;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::RetrievalConfig;

#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub hybrid_score: f32,
}

pub struct HybridRetriever {
    chunks: Arc<ChunkStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    cfg: RetrievalConfig,
}

impl HybridRetriever {
    pub fn new(chunks: Arc<ChunkStore>, embedder: Arc<dyn EmbeddingProvider>, cfg: RetrievalConfig) -> Self {
        Self { chunks, embedder, cfg }
    }

    pub async fn retrieve(
        &self,
        query: &str,
        scope: &Scope,
        query_type: QueryType,
        prefs: &QueryPreferences,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, CoreError> {
        let embedding = self.embedder.embed_text(query).await?;
        let scope_clone = match scope {
            Scope::Collection(id) => Scope::Collection(*id),
            Scope::Documents(ids) => Scope::Documents(ids.clone()),
        };

        let (dense, lexical) = tokio::try_join!(
            self.chunks.semantic_search(embedding, scope, k * 2),
            self.chunks.keyword_search(query, &scope_clone, k * 2, prefs.prefer_tables, self.cfg.table_boost),
        )?;

        let mut by_id: HashMap<Uuid, Chunk> = HashMap::new();
        let dense_ranked: Vec<Uuid> = dense
            .into_iter()
            .map(|(chunk, _sim)| {
                let id = chunk.id;
                by_id.insert(id, chunk);
                id
            })
            .collect();
        let lexical_ranked: Vec<Uuid> = lexical
            .into_iter()
            .map(|(chunk, _rank)| {
                let id = chunk.id;
                by_id.entry(id).or_insert(chunk);
                id
            })
            .collect();

        let fused = retrieval::rrf_fuse(&dense_ranked, &lexical_ranked, self.cfg.rrf_k);

        let mut scored: Vec<RetrievedChunk> = fused
            .into_iter()
            .filter_map(|f| by_id.get(&f.chunk_id).cloned().map(|chunk| (f, chunk)))
            .map(|(f, chunk)| {
                let heading_match = chunk
                    .section_heading
                    .as_deref()
                    .map(|h| h.to_lowercase().contains(&query.to_lowercase()))
                    .unwrap_or(false);
                let boost = retrieval::metadata_boost_factor(query_type, chunk.is_tabular, heading_match);
                RetrievedChunk {
                    chunk,
                    hybrid_score: f.hybrid_score * boost,
                }
            })
            .collect();

        scored.sort_by(|a, b| b.hybrid_score.partial_cmp(&a.hybrid_score).unwrap());
        scored.truncate(k);
        Ok(scored)
    }
}
