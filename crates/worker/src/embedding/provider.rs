//! OpenAI-format `/v1/embeddings` client, grounded on
//! `docint-api`'s `EmbeddingService`. The worker's own pool concurrency is
//! already bounded by `PipelineConfig::worker_concurrency`, so this vendor
//! client skips the request-plane's semaphore/cache layer and just batches.

use async_trait::async_trait;
use docint_core::error::{CoreError, ErrorKind};
use docint_core::traits::EmbeddingProvider;
use serde::{Deserialize, Serialize};

use crate::config::EmbeddingConfig;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

pub struct WorkerEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimension: usize,
    batch_size: usize,
}

impl WorkerEmbeddingProvider {
    pub fn new(cfg: &EmbeddingConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: cfg.base_url.clone(),
            model: cfg.model.clone(),
            dimension: cfg.dimension,
            batch_size: cfg.batch_size.max(1),
        }
    }

    async fn call_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, CoreError> {
        let url = format!("{}/v1/embeddings", self.base_url.trim_end_matches('/'));
        let body = EmbeddingRequest { model: &self.model, input: texts.to_vec() };
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::new(ErrorKind::EmbeddingError, e.to_string()))?
            .error_for_status()
            .map_err(|e| CoreError::new(ErrorKind::EmbeddingError, e.to_string()))?
            .json::<EmbeddingResponse>()
            .await
            .map_err(|e| CoreError::new(ErrorKind::EmbeddingError, e.to_string()))?;
        Ok(resp.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for WorkerEmbeddingProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, CoreError> {
        let mut v = self.call_embeddings(&[text]).await?;
        v.pop().ok_or_else(|| CoreError::new(ErrorKind::EmbeddingError, "empty embedding response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CoreError> {
        let mut results = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let refs: Vec<&str> = batch.iter().map(String::as_str).collect();
            results.extend(self.call_embeddings(&refs).await?);
        }
        Ok(results)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
