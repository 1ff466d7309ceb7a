//! External collaborator interfaces. Concrete vendors (object
//! store, embedding provider, LLM) are injected by the composition root in
//! `docint-api`/`docint-worker`; unit tests use the fakes in
//! [`crate::testing`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::CoreError;

#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn upload(&self, local_path: &std::path::Path, storage_key: &str) -> Result<String, CoreError>;
    async fn download(&self, storage_key: &str, local_path: &std::path::Path) -> Result<(), CoreError>;
    async fn generate_presigned_url(&self, storage_key: &str, ttl: Duration) -> Result<String, CoreError>;
    async fn exists(&self, storage_key: &str) -> Result<bool, CoreError>;
    /// Idempotent: deleting an absent key is not an error.
    async fn delete(&self, storage_key: &str) -> Result<(), CoreError>;
    fn storage_type(&self) -> &'static str;
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, CoreError>;
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CoreError>;
    fn model_name(&self) -> &str;
    fn dimension(&self) -> usize;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmExtraction {
    pub raw_text: String,
    pub data: Option<serde_json::Value>,
    pub usage: LlmUsage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LlmStreamEvent {
    Text { text: String },
    Data { data: serde_json::Value },
    Done,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn extract_structured_data(
        &self,
        user_text: &str,
        system_prompt: Option<&str>,
        context: Option<&str>,
        use_cache: bool,
    ) -> Result<LlmExtraction, CoreError>;

    /// Streaming chat completion; callers drain the channel until `Done`.
    async fn stream_chat(
        &self,
        prompt: &str,
    ) -> Result<tokio::sync::mpsc::Receiver<LlmStreamEvent>, CoreError>;

    async fn summarize_chunks_batch(
        &self,
        chunks: &[(i32, String)],
    ) -> Result<Vec<String>, CoreError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
#[allow(clippy::large_enum_variant)]
pub enum ProgressEvent {
    Progress {
        status: String,
        current_stage: String,
        progress_percent: i16,
        message: String,
        details: Option<serde_json::Value>,
    },
    Complete {
        message: String,
        job_id: uuid::Uuid,
    },
    Error {
        stage: String,
        message: String,
        error_type: String,
        retryable: bool,
    },
    End {
        reason: String,
        job_id: uuid::Uuid,
    },
}

#[async_trait]
pub trait ProgressBus: Send + Sync {
    async fn publish(&self, job_id: uuid::Uuid, event: ProgressEvent) -> Result<(), CoreError>;

    /// Returns `None` once the channel has been closed and drained.
    async fn next_message(
        &self,
        job_id: uuid::Uuid,
        timeout: Duration,
    ) -> Result<Option<ProgressEvent>, CoreError>;
}
