//! OpenAI-compatible chat provider
//!
//! Talks to any endpoint exposing the `/chat/completions` surface. Maps HTTP
//! failures to typed errors (including `Retry-After` on 429) and captures the
//! `x-ratelimit-*` response headers into a [`RateLimitSnapshot`].

use super::{ChatOutcome, ChatRequest, LlmError, LlmProvider, RateLimitSnapshot};
use crate::config::OpenAiConfig;
use crate::secrets::SecretString;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

/// Per-request timeout for chat completions
const REQUEST_TIMEOUT_SECS: u64 = 60;

pub struct OpenAiProvider {
    config: OpenAiConfig,
    api_key: Option<SecretString>,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig, api_key: Option<SecretString>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            config,
            api_key,
            client,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn check_health(&self) -> bool {
        self.api_key.is_some()
    }

    async fn chat(&self, request: &ChatRequest) -> super::Result<ChatOutcome> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| LlmError::AuthenticationFailed("OPENAI_API_KEY not set".to_string()))?;

        let url = format!("{}/chat/completions", self.config.base_url);

        let mut api_messages = Vec::new();
        for msg in &request.messages {
            api_messages.push(json!({
                "role": msg.role.to_string(),
                "content": msg.content
            }));
        }

        let mut payload = json!({
            "model": request.model,
            "messages": api_messages,
        });
        if let Some(temperature) = request.temperature {
            payload["temperature"] = json!(temperature);
        }
        if let Some(cache_key) = &request.prompt_cache_key {
            payload["prompt_cache_key"] = json!(cache_key);
        }

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key.unsecure()))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        let rate_limit = parse_rate_limit_headers(response.headers());
        let retry_after = parse_retry_after(response.headers());

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                401 | 403 => LlmError::AuthenticationFailed(text),
                429 => LlmError::RateLimited {
                    retry_after_secs: retry_after,
                },
                500..=599 => LlmError::Server {
                    status: status.as_u16(),
                    message: text,
                },
                _ => LlmError::InvalidRequest(text),
            });
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;

        let content = data
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| LlmError::ParseError("No message content in response".to_string()))?;

        if content.is_empty() {
            return Err(LlmError::ParseError("Empty content".to_string()));
        }

        let total_tokens = data
            .get("usage")
            .and_then(|u| u.get("total_tokens"))
            .and_then(|t| t.as_u64());

        Ok(ChatOutcome {
            content: content.to_string(),
            model: request.model.clone(),
            total_tokens,
            rate_limit,
        })
    }
}

/// Parse the `x-ratelimit-*` response headers into a snapshot.
fn parse_rate_limit_headers(headers: &reqwest::header::HeaderMap) -> RateLimitSnapshot {
    let get = |name: &str| -> Option<u64> {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    };

    RateLimitSnapshot {
        limit_requests: get("x-ratelimit-limit-requests"),
        limit_tokens: get("x-ratelimit-limit-tokens"),
        remaining_requests: get("x-ratelimit-remaining-requests"),
        remaining_tokens: get("x-ratelimit-remaining-tokens"),
    }
}

/// Parse a `Retry-After` header expressed in whole seconds.
fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    #[test]
    fn test_parse_rate_limit_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-limit-requests", HeaderValue::from_static("500"));
        headers.insert(
            "x-ratelimit-remaining-tokens",
            HeaderValue::from_static("99871"),
        );

        let snapshot = parse_rate_limit_headers(&headers);
        assert_eq!(snapshot.limit_requests, Some(500));
        assert_eq!(snapshot.remaining_tokens, Some(99871));
        assert_eq!(snapshot.limit_tokens, None);
        assert_eq!(snapshot.remaining_requests, None);
    }

    #[test]
    fn test_parse_rate_limit_headers_ignores_garbage() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-ratelimit-limit-requests",
            HeaderValue::from_static("not-a-number"),
        );

        let snapshot = parse_rate_limit_headers(&headers);
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert(reqwest::header::RETRY_AFTER, HeaderValue::from_static("12"));
        assert_eq!(parse_retry_after(&headers), Some(12));

        let empty = HeaderMap::new();
        assert_eq!(parse_retry_after(&empty), None);
    }
}
