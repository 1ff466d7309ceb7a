use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub database: DatabaseConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub rag: RagConfig,
    pub retrieval: RetrievalConfig,
    pub memory: MemoryConfig,
    pub limits: LimitsConfig,
    pub prompts: PromptsConfig,
}

/// Semaphore-gated concurrency limits for outbound embedding/LLM calls and
/// DB search.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LimitsConfig {
    pub embedding_concurrency: usize,
    pub db_search_concurrency: usize,
    pub llm_generate_concurrency: usize,
    pub llm_stream_concurrency: usize,
    pub acquire_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_connections: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SecurityConfig {
    pub allowed_ips: Vec<String>,
    pub custom_headers: CustomHeadersConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CustomHeadersConfig {
    pub app_id: String,
    pub api_key: String,
    pub request_signature: String,
    pub timestamp_tolerance: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_max_size: u32,
    pub pool_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    pub model: String,
    pub base_url: String,
    pub dimension: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub max_tokens: usize,
    pub stream_response: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RagConfig {
    pub retrieval_top_k: usize,
    pub rerank_enabled: bool,
    pub max_context_tokens: usize,
}

/// Hybrid retrieval tuning knobs.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RetrievalConfig {
    pub rrf_k: f32,
    pub rerank_token_budget: usize,
    pub diversity_ratio: f32,
    pub max_expansion_per_chunk: usize,
    pub table_boost: f32,
}

/// Progressive conversation memory budget.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MemoryConfig {
    pub summary_trigger_ratio: f32,
    pub min_messages: usize,
    pub verbatim_message_count: usize,
    pub max_history_messages: usize,
    pub model_input_budget: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PromptsConfig {
    pub main_system_prompt: String,
    pub context_extraction_system_prompt: String,
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

    pub fn config_path(&self) -> PathBuf {
        PathBuf::from("config/settings.toml")
    }
}

impl From<&MemoryConfig> for docint_core::memory::MemoryBudgetConfig {
    fn from(c: &MemoryConfig) -> Self {
        docint_core::memory::MemoryBudgetConfig {
            summary_trigger_ratio: c.summary_trigger_ratio,
            min_messages: c.min_messages,
            max_history_messages: c.max_history_messages,
            verbatim_message_count: c.verbatim_message_count,
            model_input_budget: c.model_input_budget,
        }
    }
}
