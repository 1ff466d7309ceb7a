//! In-memory fakes for the external-collaborator traits so api/worker unit
//! tests never need a live Postgres, object store, or LLM vendor.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use crate::error::CoreError;
use crate::traits::{EmbeddingProvider, LlmExtraction, LlmProvider, LlmStreamEvent, LlmUsage, ProgressBus, ProgressEvent, StorageBackend};

pub struct FakeStorage {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl FakeStorage {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for FakeStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for FakeStorage {
    async fn upload(&self, local_path: &Path, storage_key: &str) -> Result<String, CoreError> {
        let bytes = std::fs::read(local_path)
            .map_err(|e| CoreError::new(crate::error::ErrorKind::StorageError, e.to_string()))?;
        self.files.lock().unwrap().insert(storage_key.to_string(), bytes);
        Ok(storage_key.to_string())
    }

    async fn download(&self, storage_key: &str, local_path: &Path) -> Result<(), CoreError> {
        let files = self.files.lock().unwrap();
        let bytes = files
            .get(storage_key)
            .ok_or_else(|| CoreError::new(crate::error::ErrorKind::NotFound, storage_key.to_string()))?;
        std::fs::write(local_path, bytes)
            .map_err(|e| CoreError::new(crate::error::ErrorKind::StorageError, e.to_string()))
    }

    async fn generate_presigned_url(&self, storage_key: &str, _ttl: Duration) -> Result<String, CoreError> {
        Ok(format!("file://{storage_key}"))
    }

    async fn exists(&self, storage_key: &str) -> Result<bool, CoreError> {
        Ok(self.files.lock().unwrap().contains_key(storage_key))
    }

    async fn delete(&self, storage_key: &str) -> Result<(), CoreError> {
        self.files.lock().unwrap().remove(storage_key);
        Ok(())
    }

    fn storage_type(&self) -> &'static str {
        "local"
    }
}

pub struct FakeEmbeddingProvider {
    pub dimension: usize,
}

#[async_trait]
impl EmbeddingProvider for FakeEmbeddingProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, CoreError> {
        Ok(deterministic_vector(text, self.dimension))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CoreError> {
        Ok(texts.iter().map(|t| deterministic_vector(t, self.dimension)).collect())
    }

    fn model_name(&self) -> &str {
        "fake-embedder-v1"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn deterministic_vector(text: &str, dim: usize) -> Vec<f32> {
    let mut seed: u32 = 2166136261;
    for b in text.bytes() {
        seed = seed.wrapping_mul(16777619) ^ b as u32;
    }
    (0..dim)
        .map(|i| (((seed.wrapping_add(i as u32)) % 1000) as f32) / 1000.0)
        .collect()
}

pub struct FakeLlmProvider;

#[async_trait]
impl LlmProvider for FakeLlmProvider {
    async fn extract_structured_data(
        &self,
        user_text: &str,
        _system_prompt: Option<&str>,
        _context: Option<&str>,
        _use_cache: bool,
    ) -> Result<LlmExtraction, CoreError> {
        Ok(LlmExtraction {
            raw_text: user_text.to_string(),
            data: Some(serde_json::json!({})),
            usage: LlmUsage { prompt_tokens: 0, completion_tokens: 0, cost: 0.0 },
        })
    }

    async fn stream_chat(&self, prompt: &str) -> Result<tokio::sync::mpsc::Receiver<LlmStreamEvent>, CoreError> {
        let (tx, rx) = tokio::sync::mpsc::channel(4);
        let prompt = prompt.to_string();
        tokio::spawn(async move {
            let _ = tx.send(LlmStreamEvent::Text { text: format!("echo: {prompt}") }).await;
            let _ = tx.send(LlmStreamEvent::Done).await;
        });
        Ok(rx)
    }

    async fn summarize_chunks_batch(&self, chunks: &[(i32, String)]) -> Result<Vec<String>, CoreError> {
        Ok(chunks.iter().map(|(page, text)| format!("[p{page}] {}", &text[..text.len().min(40)])).collect())
    }
}

pub struct FakeProgressBus {
    events: Mutex<HashMap<Uuid, Vec<ProgressEvent>>>,
}

impl FakeProgressBus {
    pub fn new() -> Self {
        Self { events: Mutex::new(HashMap::new()) }
    }

    pub fn history(&self, job_id: Uuid) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().get(&job_id).cloned().unwrap_or_default()
    }
}

impl Default for FakeProgressBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProgressBus for FakeProgressBus {
    async fn publish(&self, job_id: Uuid, event: ProgressEvent) -> Result<(), CoreError> {
        self.events.lock().unwrap().entry(job_id).or_default().push(event);
        Ok(())
    }

    async fn next_message(&self, job_id: Uuid, _timeout: Duration) -> Result<Option<ProgressEvent>, CoreError> {
        Ok(self.events.lock().unwrap().get(&job_id).and_then(|v| v.first().cloned()))
    }
}
