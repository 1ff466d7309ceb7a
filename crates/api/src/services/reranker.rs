//! Reranker + Compressor: orders retrieved chunks by score with
//! a per-document diversity cap, then compresses each selected chunk to fit
//! the model's context budget using `docint_core::compression`.

use docint_core::compression::{compress_to_budget, CompressionResult};
use docint_core::model::Chunk;

use crate::services::hybrid_retriever::RetrievedChunk;

pub struct RankedChunk {
    pub chunk: Chunk,
    pub hybrid_score: f32,
    pub compression: CompressionResult,
}

/// `diversity_ratio` caps how much of the final window a single document
/// may occupy (e.g. 0.5 => at most half the slots from one document), so a
/// single long document can't crowd out the rest of a multi-document scope.
pub fn select_diverse(mut chunks: Vec<RetrievedChunk>, window: usize, diversity_ratio: f32) -> Vec<RetrievedChunk> {
    chunks.sort_by(|a, b| b.hybrid_score.partial_cmp(&a.hybrid_score).unwrap());
    let per_doc_cap = ((window as f32) * diversity_ratio).ceil().max(1.0) as usize;

    let mut counts = std::collections::HashMap::new();
    let mut selected = Vec::with_capacity(window);
    let mut overflow = Vec::new();

    for rc in chunks {
        if selected.len() >= window {
            break;
        }
        let count = counts.entry(rc.chunk.document_id).or_insert(0usize);
        if *count < per_doc_cap {
            *count += 1;
            selected.push(rc);
        } else {
            overflow.push(rc);
        }
    }
    // Backfill from overflow if the diversity cap left the window short.
    for rc in overflow {
        if selected.len() >= window {
            break;
        }
        selected.push(rc);
    }
    selected
}

/// Compress each chunk to its share of `total_token_budget`, reserving
/// extra headroom for table chunks which compress less aggressively.
pub fn compress_window(chunks: Vec<RetrievedChunk>, total_token_budget: usize, compress_ratio: f32) -> Vec<RankedChunk> {
    if chunks.is_empty() {
        return Vec::new();
    }
    let per_chunk_budget = (total_token_budget / chunks.len()).max(32);

    chunks
        .into_iter()
        .map(|rc| {
            let heading = rc.chunk.section_heading.clone();
            let compression = compress_to_budget(
                &rc.chunk.text,
                per_chunk_budget,
                compress_ratio,
                rc.chunk.is_tabular,
                heading.as_deref(),
            );
            RankedChunk {
                chunk: rc.chunk,
                hybrid_score: rc.hybrid_score,
                compression,
            }
        })
        .collect()
}
