use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use docint_core::bus::InProcessProgressBus;
use docint_core::db::chunks::ChunkStore;
use docint_core::db::documents::DocumentStore;
use docint_core::db::jobs::JobStore;
use docint_core::db::DbPool;
use docint_core::storage::LocalStorage;
use docint_core::traits::{EmbeddingProvider, ProgressBus, StorageBackend};

use docint_worker::config::Settings;
use docint_worker::document::DocumentLoader;
use docint_worker::embedding::WorkerEmbeddingProvider;
use docint_worker::pipeline::{PipelineRunner, StageContext};
use docint_worker::utils::logger;
use docint_worker::utils::metrics::Metrics;

#[tokio::main]
async fn main() -> Result<()> {
    logger::init_logger()?;
    info!("starting docint worker");

    let settings = Settings::load()?;
    info!(
        worker_concurrency = settings.pipeline.worker_concurrency,
        poll_interval_ms = settings.pipeline.poll_interval_ms,
        "configuration loaded"
    );

    let db_pool = DbPool::connect(
        &settings.database.url,
        settings.database.pool_max_size,
        settings.database.pool_timeout_seconds,
    )
    .await?;
    info!("database connection established");

    let documents = Arc::new(DocumentStore::new(db_pool.clone()));
    let chunks = Arc::new(ChunkStore::new(db_pool.clone()));
    let jobs = Arc::new(JobStore::new(db_pool.clone()));

    let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::new(settings.pipeline.storage_root.clone()));
    let loader = DocumentLoader::new(storage.clone(), settings.pipeline.artifact_dir.clone());
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(WorkerEmbeddingProvider::new(&settings.embedding));

    // Cross-process progress delivery runs through the Job Ledger row itself
    // (api's SSE handler polls `JobStore::get`); this bus only fans out
    // within this process, matching the DI seam in `docint_core::traits`.
    let progress_bus: Arc<dyn ProgressBus> = Arc::new(InProcessProgressBus::new());

    let ctx = StageContext { documents, chunks, jobs, embedder, storage, progress_bus, loader };
    let metrics = Arc::new(Metrics::new());
    let runner = PipelineRunner::new(ctx, settings.pipeline.clone(), metrics);

    info!("worker ready, polling for document jobs");
    runner.run().await;
}
