//! OpenAI-format `/v1/embeddings` client: an in-memory cache keyed by text
//! hash and a semaphore-gated concurrency limit around every outbound call.

use async_trait::async_trait;
use docint_core::error::{CoreError, ErrorKind};
use docint_core::traits::EmbeddingProvider;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::EmbeddingConfig;
use crate::utils::limiters::Limiters;

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

pub struct EmbeddingService {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimension: usize,
    cache: RwLock<HashMap<String, Vec<f32>>>,
    limiters: Arc<Limiters>,
}

fn cache_key(model: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model.as_bytes());
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

impl EmbeddingService {
    pub fn new(cfg: &EmbeddingConfig, limiters: Arc<Limiters>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: cfg.base_url.clone(),
            model: cfg.model.clone(),
            dimension: cfg.dimension,
            cache: RwLock::new(HashMap::new()),
            limiters,
        }
    }

    async fn call_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, CoreError> {
        let url = format!("{}/v1/embeddings", self.base_url.trim_end_matches('/'));
        let body = EmbeddingRequest {
            model: &self.model,
            input: texts.to_vec(),
        };
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
impl EmbeddingProvider for EmbeddingService {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, CoreError> {
        let key = cache_key(&self.model, text);
        if let Some(cached) = self.cache.read().await.get(&key) {
            return Ok(cached.clone());
        }

        let (_permit, _waited) = Limiters::acquire_timed(
            self.limiters.embedding.clone(),
            self.limiters.acquire_timeout,
            "embed_text",
        )
        .await
        .map_err(|e| CoreError::new(ErrorKind::Timeout, e.to_string()))?;

        let mut vectors = self.call_embeddings(&[text]).await?;
        let vector = vectors
            .pop()
            .ok_or_else(|| CoreError::new(ErrorKind::EmbeddingError, "empty embedding response"))?;
        self.cache.write().await.insert(key, vector.clone());
        Ok(vector)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CoreError> {
        let mut results = vec![Vec::new(); texts.len()];
        let mut misses = Vec::new();
        {
            let cache = self.cache.read().await;
            for (i, text) in texts.iter().enumerate() {
                let key = cache_key(&self.model, text);
                match cache.get(&key) {
                    Some(v) => results[i] = v.clone(),
                    None => misses.push(i),
                }
            }
        }
        if misses.is_empty() {
            return Ok(results);
        }

        let (_permit, _waited) = Limiters::acquire_timed(
            self.limiters.embedding.clone(),
            self.limiters.acquire_timeout,
            "embed_batch",
        )
        .await
        .map_err(|e| CoreError::new(ErrorKind::Timeout, e.to_string()))?;

        const BATCH_SIZE: usize = 64;
        let mut cache = self.cache.write().await;
        for chunk in misses.chunks(BATCH_SIZE) {
            let batch_texts: Vec<&str> = chunk.iter().map(|&i| texts[i].as_str()).collect();
            let embeddings = self.call_embeddings(&batch_texts).await?;
            for (&i, embedding) in chunk.iter().zip(embeddings.into_iter()) {
                let key = cache_key(&self.model, &texts[i]);
                cache.insert(key, embedding.clone());
                results[i] = embedding;
            }
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
