//! Ollama Provider
//!
//! This module implements the `LlmProvider` trait for Ollama, a local LLM
//! provider typically running at http://localhost:11434. Local execution
//! means no API key and no rate-limit headers; the returned
//! `RateLimitSnapshot` is always empty.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ChatOutcome, ChatRequest, LlmError, LlmProvider, RateLimitSnapshot, Result};

/// Local models load slowly on first use; allow much longer than cloud calls
const REQUEST_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct OllamaProvider {
    /// Base URL for Ollama API (typically http://localhost:11434)
    base_url: String,

    /// HTTP client for API requests
    client: Client,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn check_health(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        self.client
            .get(&url)
            .timeout(Duration::from_secs(2))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatOutcome> {
        let messages: Vec<OllamaMessage> = request
            .messages
            .iter()
            .map(|msg| OllamaMessage {
                role: msg.role.to_string(),
                content: msg.content.clone(),
            })
            .collect();

        tracing::debug!(
            "Ollama request: model={}, messages={}, total_chars={}",
            request.model,
            messages.len(),
            messages.iter().map(|m| m.content.len()).sum::<usize>()
        );

        let body = OllamaChatBody {
            model: request.model.clone(),
            messages,
            stream: false,
            options: request
                .temperature
                .map(|temperature| OllamaOptions { temperature }),
        };

        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else if e.is_connect() {
                    LlmError::ProviderUnavailable(format!(
                        "Cannot connect to Ollama at {}. Is Ollama running?",
                        self.base_url
                    ))
                } else {
                    LlmError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                500..=599 => LlmError::Server {
                    status: status.as_u16(),
                    message: text,
                },
                _ => LlmError::InvalidRequest(text),
            });
        }

        let data: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;

        if data.message.content.is_empty() {
            return Err(LlmError::ParseError("Empty content".to_string()));
        }

        Ok(ChatOutcome {
            content: data.message.content,
            model: request.model.clone(),
            total_tokens: data.eval_count,
            rate_limit: RateLimitSnapshot::default(),
        })
    }
}

#[derive(Debug, Serialize)]
struct OllamaChatBody {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
    #[serde(default)]
    eval_count: Option<u64>,
}
