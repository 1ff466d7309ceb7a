//! Chat-completion vendor client: raw SSE `data: {...}` parsing for
//! streaming, plus retry-with-backoff distinguishing a still-loading model
//! (503) from a genuine failure.

use async_trait::async_trait;
use docint_core::error::{CoreError, ErrorKind};
use docint_core::json_repair::repair_and_parse;
use docint_core::traits::{LlmExtraction, LlmProvider, LlmStreamEvent, LlmUsage};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::LlmConfig;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    max_tokens: usize,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ResponseChoice>,
    usage: Option<UsageField>,
}

#[derive(Debug, Deserialize)]
struct ResponseChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize, Default)]
struct UsageField {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize, Default)]
struct StreamDelta {
    content: Option<String>,
}

const MAX_RETRIES: u32 = 3;

pub struct LlmService {
    client: Client,
    config: LlmConfig,
}

impl LlmService {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_seconds))
                .build()
                .expect("failed to build llm http client"),
            config,
        }
    }

    /// Model-loading (503) responses get retried with backoff; any other
    /// status is treated as a non-retryable `LlmError`.
    async fn post_with_retry(&self, url: &str, body: &serde_json::Value) -> Result<reqwest::Response, CoreError> {
        let mut attempt = 0;
        loop {
            let resp = self
                .client
                .post(url)
                .json(body)
                .send()
                .await
                .map_err(|e| CoreError::new(ErrorKind::LlmError, e.to_string()))?;

            if resp.status() == StatusCode::SERVICE_UNAVAILABLE && attempt < MAX_RETRIES {
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(500 * 2u64.pow(attempt))).await;
                continue;
            }
            return resp
                .error_for_status()
                .map_err(|e| CoreError::new(ErrorKind::LlmError, e.to_string()));
        }
    }

    async fn chat_completion(&self, system_prompt: Option<&str>, user_text: &str) -> Result<(String, LlmUsage), CoreError> {
        let mut messages = Vec::new();
        if let Some(sp) = system_prompt {
            messages.push(ChatMessage { role: "system", content: sp });
        }
        messages.push(ChatMessage { role: "user", content: user_text });

        let request = ChatCompletionRequest {
            messages,
            max_tokens: self.config.max_tokens,
            temperature: 0.2,
            stream: false,
        };
        let url = format!("{}/v1/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = serde_json::to_value(&request).map_err(|e| CoreError::new(ErrorKind::LlmError, e.to_string()))?;
        let resp = self.post_with_retry(&url, &body).await?;
        let parsed: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|e| CoreError::new(ErrorKind::LlmError, e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| CoreError::new(ErrorKind::LlmError, "empty completion"))?;
        let usage = parsed.usage.unwrap_or_default();
        Ok((
            content,
            LlmUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                cost: 0.0,
            },
        ))
    }
}

#[async_trait]
impl LlmProvider for LlmService {
    async fn extract_structured_data(
        &self,
        user_text: &str,
        system_prompt: Option<&str>,
        context: Option<&str>,
        _use_cache: bool,
    ) -> Result<LlmExtraction, CoreError> {
        let prompt = match context {
            Some(ctx) => format!("{ctx}\n\n{user_text}"),
            None => user_text.to_string(),
        };
        let (raw_text, usage) = self.chat_completion(system_prompt, &prompt).await?;
        // Strict-then-lenient decode: schema-directed callers
        // still get the raw text back if repair fails, for their own
        // error reporting.
        let data = repair_and_parse(&raw_text).ok();
        Ok(LlmExtraction { raw_text, data, usage })
    }

    async fn stream_chat(&self, prompt: &str) -> Result<mpsc::Receiver<LlmStreamEvent>, CoreError> {
        let (tx, rx) = mpsc::channel(32);
        let request = ChatCompletionRequest {
            messages: vec![ChatMessage { role: "user", content: prompt }],
            max_tokens: self.config.max_tokens,
            temperature: 0.7,
            stream: true,
        };
        let url = format!("{}/v1/chat/completions", self.config.base_url.trim_end_matches('/'));
        let client = self.client.clone();

        tokio::spawn(async move {
            use futures::StreamExt;

            let response = match client.post(&url).json(&request).send().await {
                Ok(r) => r,
                Err(e) => {
                    let _ = tx.send(LlmStreamEvent::Data { data: serde_json::json!({"error": e.to_string()}) }).await;
                    return;
                }
            };

            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let bytes = match chunk {
                    Ok(b) => b,
                    Err(_) => break,
                };
                let text = String::from_utf8_lossy(&bytes).to_string();
                for line in text.lines() {
                    let Some(json_str) = line.strip_prefix("data: ") else { continue };
                    if json_str.trim() == "[DONE]" {
                        let _ = tx.send(LlmStreamEvent::Done).await;
                        return;
                    }
                    if let Ok(parsed) = serde_json::from_str::<StreamChunk>(json_str) {
                        if let Some(content) = parsed.choices.first().and_then(|c| c.delta.content.clone()) {
                            if tx.send(LlmStreamEvent::Text { text: content }).await.is_err() {
                                return;
                            }
                        }
                    }
                }
            }
            let _ = tx.send(LlmStreamEvent::Done).await;
        });

        Ok(rx)
    }

    async fn summarize_chunks_batch(&self, chunks: &[(i32, String)]) -> Result<Vec<String>, CoreError> {
        let mut summaries = Vec::with_capacity(chunks.len());
        for (page, text) in chunks {
            let prompt = format!(
                "Summarize the following page {page} excerpt in 1-2 sentences, preserving any figures:\n\n{text}"
            );
            let (summary, _usage) = self.chat_completion(None, &prompt).await?;
            summaries.push(summary);
        }
        Ok(summaries)
    }
}
