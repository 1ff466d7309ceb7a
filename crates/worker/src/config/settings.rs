use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub embedding: EmbeddingConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_max_size: u32,
    pub pool_timeout_seconds: u64,
}

/// Talks to the same embedding endpoint `docint-api` uses; the worker does
/// not supervise its own llama-server subprocess (see DESIGN.md).
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
    pub dimension: usize,
    pub batch_size: usize,
}

/// Worker-pool tuning: how many jobs run concurrently, how
/// often the queue is polled, where durable stage artifacts land, and the
/// retry backoff schedule for retryable stages.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PipelineConfig {
    pub worker_concurrency: usize,
    pub poll_interval_ms: u64,
    pub artifact_dir: PathBuf,
    pub storage_root: PathBuf,
    pub retry_max_attempts: u32,
    pub retry_backoff_base_ms: u64,
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config/settings").required(true))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }
}
