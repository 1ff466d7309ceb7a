//! Context Expander: pulls in a bounded number of
//! relationship-linked chunks (sibling continuations, linked table/narrative
//! pairs) per selected chunk, via a single batch fetch — never one query
//! per chunk.

use docint_core::db::chunks::ChunkStore;
use docint_core::error::CoreError;
use docint_core::model::Chunk;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

pub struct ContextExpander {
    chunks: Arc<ChunkStore>,
}

impl ContextExpander {
    pub fn new(chunks: Arc<ChunkStore>) -> Self {
        Self { chunks }
    }

    /// Returns the original selection plus up to `max_expansion_per_chunk`
    /// linked chunks per selected chunk, deduplicated against the
    /// selection itself.
    pub async fn expand(&self, selected: &[Chunk], max_expansion_per_chunk: usize) -> Result<Vec<Chunk>, CoreError> {
        let already: HashSet<Uuid> = selected.iter().map(|c| c.id).collect();

        let mut candidate_ids: Vec<Uuid> = Vec::new();
        for chunk in selected {
            let mut linked = Vec::new();
            linked.extend(chunk.metadata.parent_chunk_id);
            linked.extend(chunk.metadata.sibling_chunk_ids.iter().copied());
            linked.extend(chunk.metadata.linked_narrative_id);
            linked.extend(chunk.metadata.linked_table_ids.iter().copied());

            for id in linked.into_iter().take(max_expansion_per_chunk) {
                if !already.contains(&id) && !candidate_ids.contains(&id) {
                    candidate_ids.push(id);
                }
            }
        }

        if candidate_ids.is_empty() {
            return Ok(selected.to_vec());
        }

        let expanded = self.chunks.fetch_many(&candidate_ids).await?;
        let mut result = selected.to_vec();
        result.extend(expanded);
        Ok(result)
    }
}
