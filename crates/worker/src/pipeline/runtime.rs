//! Job-polling runtime. Polls the Job Ledger for queued
//! document jobs with `FOR UPDATE SKIP LOCKED`, bounds concurrent stage
//! execution with a semaphore sized from `PipelineConfig::worker_concurrency`,
//! and retries a failed-but-retryable job with exponential backoff up to
//! `retry_max_attempts`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::sleep;

use crate::config::PipelineConfig;
use crate::pipeline::stages::{self, StageContext};
use crate::utils::metrics::Metrics;

pub struct PipelineRunner {
    ctx: Arc<StageContext>,
    config: PipelineConfig,
    semaphore: Arc<Semaphore>,
    metrics: Arc<Metrics>,
}

impl PipelineRunner {
    pub fn new(ctx: StageContext, config: PipelineConfig, metrics: Arc<Metrics>) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.worker_concurrency.max(1)));
        Self { ctx: Arc::new(ctx), config, semaphore, metrics }
    }

    /// Runs forever, polling at `poll_interval_ms`. Each claimed job is
    /// spawned onto its own task so a slow embedding call for one document
    /// doesn't stall the claim loop for the rest.
    pub async fn run(&self) -> ! {
        let mut interval = tokio::time::interval(Duration::from_millis(self.config.poll_interval_ms));
        loop {
            interval.tick().await;

            let permit = match self.semaphore.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => continue,
            };

            let job = match self.ctx.jobs.claim_next_document_job().await {
                Ok(Some(job)) => job,
                Ok(None) => {
                    drop(permit);
                    continue;
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to poll job queue");
                    drop(permit);
                    continue;
                }
            };

            let ctx = self.ctx.clone();
            let metrics = self.metrics.clone();
            let max_attempts = self.config.retry_max_attempts;
            let backoff_base_ms = self.config.retry_backoff_base_ms;

            tokio::spawn(async move {
                let _permit = permit;
                process_with_retry(&ctx, job, max_attempts, backoff_base_ms, &metrics).await;
            });
        }
    }
}

async fn process_with_retry(
    ctx: &StageContext,
    mut job: docint_core::model::Job,
    max_attempts: u32,
    backoff_base_ms: u64,
    metrics: &Metrics,
) {
    let job_id = job.job_id;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        tracing::info!(%job_id, attempt, "processing document job");

        let result = stages::run_document_pipeline(ctx, &job).await;
        match result {
            Ok(chunk_count) => {
                metrics.increment_documents_processed();
                metrics.add_chunks_created(chunk_count as u64);
                tracing::info!(%job_id, chunk_count, "document job completed");
                return;
            }
            Err((stage, err)) => {
                metrics.increment_documents_failed();
                let retryable = err.is_retryable();
                if !retryable || attempt >= max_attempts {
                    stages::fail_document_pipeline(ctx, &job, &stage, &err).await;
                    tracing::error!(%job_id, stage = %stage, error = %err, "document job failed permanently");
                    return;
                }

                tracing::warn!(%job_id, stage = %stage, attempt, error = %err, "retryable failure, backing off");
                let delay = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));

                let job_error = docint_core::model::JobError {
                    stage: stage.clone(),
                    message: err.to_string(),
                    error_type: err.kind(),
                    is_retryable: true,
                };
                if let Err(e) = ctx.jobs.mark_failed(job_id, job_error).await {
                    tracing::error!(%job_id, error = %e, "failed to record transient failure before retry");
                    stages::fail_document_pipeline(ctx, &job, &stage, &err).await;
                    return;
                }

                sleep(Duration::from_millis(delay)).await;

                match ctx.jobs.reset_for_retry(job_id).await {
                    Ok(reset_job) => job = reset_job,
                    Err(e) => {
                        tracing::error!(%job_id, error = %e, "failed to reset job for retry");
                        stages::fail_document_pipeline(ctx, &job, &stage, &err).await;
                        return;
                    }
                }
            }
        }
    }
}

