//! Pipeline stages: parse → chunk → embed → store_vectors for
//! the chat-indexing tail. Each stage advances the Job Ledger monotonically
//! and records a durable artifact path before moving on, so a mid-chain
//! crash resumes from the last completed stage rather than from scratch.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use docint_core::chunking::smart_chunk;
use docint_core::db::chunks::ChunkStore;
use docint_core::db::documents::DocumentStore;
use docint_core::db::jobs::JobStore;
use docint_core::model::{Job, JobError};
use docint_core::traits::{EmbeddingProvider, ProgressBus, ProgressEvent, StorageBackend};

use crate::document::parser;
use crate::document::DocumentLoader;
use crate::utils::error::WorkerError;

pub struct StageContext {
    pub documents: Arc<DocumentStore>,
    pub chunks: Arc<ChunkStore>,
    pub jobs: Arc<JobStore>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub storage: Arc<dyn StorageBackend>,
    pub progress_bus: Arc<dyn ProgressBus>,
    pub loader: DocumentLoader,
}

async fn publish(ctx: &StageContext, job_id: Uuid, event: ProgressEvent) {
    if let Err(e) = ctx.progress_bus.publish(job_id, event).await {
        tracing::warn!(%job_id, error = %e.message, "failed to publish progress event");
    }
}

async fn advance(
    ctx: &StageContext,
    job_id: Uuid,
    stage: &str,
    progress_percent: i16,
    message: &str,
) -> Result<(), WorkerError> {
    ctx.jobs.update_progress(job_id, stage, progress_percent, message).await?;
    publish(
        ctx,
        job_id,
        ProgressEvent::Progress {
            status: "processing".to_string(),
            current_stage: stage.to_string(),
            progress_percent,
            message: message.to_string(),
            details: None,
        },
    )
    .await;
    Ok(())
}

/// Runs the full parse → chunk → embed → store_vectors chain for one
/// queued document job. Returns the chunk count on success, or the name of
/// the stage that failed alongside the error.
pub async fn run_document_pipeline(ctx: &StageContext, job: &Job) -> Result<i32, (String, WorkerError)> {
    let document_id = job.owner.document_id().ok_or_else(|| {
        ("claim".to_string(), WorkerError::Unknown("document job missing document_id owner".to_string()))
    })?;
    let job_id = job.job_id;
    let started = Instant::now();

    let document = ctx
        .documents
        .get(document_id)
        .await
        .map_err(|e| ("parse".to_string(), WorkerError::from(e)))?
        .ok_or_else(|| ("parse".to_string(), WorkerError::DocumentNotFound(document_id)))?;

    // --- parse ---
    advance(ctx, job_id, "parse", 10, "downloading and parsing document")
        .await
        .map_err(|e| ("parse".to_string(), e))?;
    let local_path: PathBuf = ctx
        .loader
        .stage(&document.file_path, &document.filename)
        .await
        .map_err(|e| ("parse".to_string(), e))?;
    let elements = match parser::parse_document(&local_path) {
        Ok(elements) => elements,
        Err(e) => {
            ctx.loader.cleanup(&local_path).await;
            return Err(("parse".to_string(), e));
        }
    };
    ctx.jobs
        .mark_stage_completed(job_id, "parsing", Some(&local_path.display().to_string()))
        .await
        .map_err(|e| ("parse".to_string(), WorkerError::from(e)))?;

    // --- chunk ---
    advance(ctx, job_id, "chunk", 35, "splitting into section-aware chunks")
        .await
        .map_err(|e| ("chunk".to_string(), e))?;
    let mut chunks = smart_chunk(&document.filename, &elements);
    for chunk in &mut chunks {
        chunk.document_id = document_id;
    }
    ctx.loader.cleanup(&local_path).await;
    ctx.jobs
        .mark_stage_completed(job_id, "chunking", None)
        .await
        .map_err(|e| ("chunk".to_string(), WorkerError::from(e)))?;

    if chunks.is_empty() {
        return Err(("chunk".to_string(), WorkerError::ChunkingError("parser produced no extractable text".to_string())));
    }

    // --- embed ---
    advance(ctx, job_id, "embed", 60, "generating dense embeddings")
        .await
        .map_err(|e| ("embed".to_string(), e))?;
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = ctx
        .embedder
        .embed_batch(&texts)
        .await
        .map_err(|e| ("embed".to_string(), WorkerError::EmbeddingError(e.message)))?;
    for (chunk, vector) in chunks.iter_mut().zip(vectors.into_iter()) {
        chunk.embedding = Some(vector);
        chunk.embedding_model = Some(ctx.embedder.model_name().to_string());
    }
    ctx.jobs
        .mark_stage_completed(job_id, "embedding", None)
        .await
        .map_err(|e| ("embed".to_string(), WorkerError::from(e)))?;

    // --- store_vectors ---
    advance(ctx, job_id, "store_vectors", 90, "persisting chunks")
        .await
        .map_err(|e| ("store_vectors".to_string(), e))?;
    ctx.chunks
        .bulk_insert(&chunks)
        .await
        .map_err(|e| ("store_vectors".to_string(), WorkerError::from(e)))?;
    ctx.jobs
        .mark_stage_completed(job_id, "store_vectors", None)
        .await
        .map_err(|e| ("store_vectors".to_string(), WorkerError::from(e)))?;

    let chunk_count = chunks.len() as i32;
    let page_count = chunks.iter().filter_map(|c| c.page_number).max();
    let elapsed_ms = started.elapsed().as_millis() as i64;

    ctx.documents
        .mark_completed(document_id, chunk_count, page_count, elapsed_ms, "docint-worker")
        .await
        .map_err(|e| ("store_vectors".to_string(), WorkerError::from(e)))?;
    ctx.jobs
        .mark_completed(job_id)
        .await
        .map_err(|e| ("store_vectors".to_string(), WorkerError::from(e)))?;
    publish(ctx, job_id, ProgressEvent::Complete { message: "document indexed".to_string(), job_id }).await;
    publish(ctx, job_id, ProgressEvent::End { reason: "completed".to_string(), job_id }).await;

    Ok(chunk_count)
}

/// Records the failure on both the Document and the Job, and publishes the
/// terminal `error` + `end` pair the Progress Bus bridge always expects.
pub async fn fail_document_pipeline(ctx: &StageContext, job: &Job, stage: &str, err: &WorkerError) {
    let job_id = job.job_id;
    let kind = err.kind();
    let message = err.to_string();

    if let Some(document_id) = job.owner.document_id() {
        let _ = ctx.documents.mark_failed(document_id, &message).await;
    }

    let job_error = JobError {
        stage: stage.to_string(),
        message: message.clone(),
        error_type: kind,
        is_retryable: kind.is_retryable(),
    };
    let _ = ctx.jobs.mark_failed(job_id, job_error.clone()).await;

    publish(
        ctx,
        job_id,
        ProgressEvent::Error {
            stage: stage.to_string(),
            message,
            error_type: kind.as_str().to_string(),
            retryable: job_error.is_retryable,
        },
    )
    .await;
    publish(ctx, job_id, ProgressEvent::End { reason: "failed".to_string(), job_id }).await;
}
