//! LLM Client Layer
//!
//! This module provides a common interface for the chat-completion providers
//! the planner calls (OpenAI-compatible APIs, Ollama). The `LlmProvider`
//! trait defines the contract that all providers must implement; the
//! `registry` caches configured clients, and `retry` wraps every call with
//! backoff on rate limits and transient server failures.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod ollama;
pub mod openai;
pub mod registry;
pub mod retry;

use crate::config::LlmConfig;
use crate::secrets::SecretString;
use std::sync::Arc;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimited {
        /// Server-suggested wait, when the Retry-After header was present
        retry_after_secs: Option<u64>,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl LlmError {
    /// Whether a retry could plausibly succeed.
    ///
    /// Rate limits, server-side failures, timeouts, and network errors are
    /// retryable; authentication and malformed-request errors are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Server { .. } | Self::NetworkError(_) | Self::Timeout
        )
    }
}

/// Message in a conversation history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender (user, assistant, system)
    pub role: MessageRole,

    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message
    User,

    /// Assistant message
    Assistant,

    /// System message
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// A single chat-completion request
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model identifier, e.g. "gpt-4.1-mini"
    pub model: String,

    /// Sampling temperature; `None` means the provider default
    pub temperature: Option<f64>,

    /// Server-side prompt cache key, for providers that support it
    pub prompt_cache_key: Option<String>,

    /// Conversation to complete
    pub messages: Vec<Message>,
}

/// Rate-limit headers captured from a provider response.
///
/// Mirrors the `x-ratelimit-*` response headers OpenAI-compatible APIs emit.
/// All fields are optional; providers that do not send the headers (Ollama)
/// leave the snapshot empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    pub limit_requests: Option<u64>,
    pub limit_tokens: Option<u64>,
    pub remaining_requests: Option<u64>,
    pub remaining_tokens: Option<u64>,
}

impl RateLimitSnapshot {
    pub fn is_empty(&self) -> bool {
        self.limit_requests.is_none()
            && self.limit_tokens.is_none()
            && self.remaining_requests.is_none()
            && self.remaining_tokens.is_none()
    }
}

/// A completed chat call: the text plus usage metadata
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    /// Raw assistant text
    pub content: String,

    /// Model that produced the completion
    pub model: String,

    /// Total tokens consumed, when the provider reports usage
    pub total_tokens: Option<u64>,

    /// Rate-limit headers captured from the response
    pub rate_limit: RateLimitSnapshot,
}

/// LLM provider trait that all providers must implement
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "openai", "ollama")
    fn name(&self) -> &str;

    /// Run one chat completion
    async fn chat(&self, request: &ChatRequest) -> Result<ChatOutcome>;

    /// Check if the provider is currently healthy and available.
    /// Default implementation returns true.
    async fn check_health(&self) -> bool {
        true
    }
}

/// Build the provider selected by the configuration.
pub fn provider_from_config(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    match config.default_provider.as_str() {
        "openai" => {
            let api_key = SecretString::from_env("OPENAI_API_KEY");
            Ok(Arc::new(openai::OpenAiProvider::new(
                config.openai.clone(),
                api_key,
            )))
        }
        "ollama" => Ok(Arc::new(ollama::OllamaProvider::new(
            config.ollama.base_url.clone(),
        ))),
        other => Err(LlmError::ProviderUnavailable(format!(
            "Unknown provider '{}'",
            other
        ))),
    }
}

/// Extract a JSON payload (object or array) from raw model output.
///
/// Handles the formats the planner actually sees:
/// 1. The entire trimmed content is the payload
/// 2. Fenced JSON (with or without trailing prose): ` ```json\n{...}\n``` `
/// 3. JSON embedded in prose — scans for the first balanced `{...}` or `[...]`
pub fn extract_json(content: &str) -> Option<&str> {
    let trimmed = content.trim();

    // Pattern 1: whole content already parses
    if serde_json::from_str::<serde_json::Value>(trimmed).is_ok() {
        return Some(trimmed);
    }

    // Pattern 2: inside a markdown code fence (even with trailing text)
    if let Some(inner) = extract_fenced_block(trimmed) {
        let inner = inner.trim();
        if serde_json::from_str::<serde_json::Value>(inner).is_ok() {
            return Some(inner);
        }
    }

    // Pattern 3: first balanced object or array anywhere in the content
    let object_start = trimmed.find('{');
    let array_start = trimmed.find('[');
    let start = match (object_start, array_start) {
        (Some(o), Some(a)) => Some(o.min(a)),
        (Some(o), None) => Some(o),
        (None, Some(a)) => Some(a),
        (None, None) => None,
    }?;

    extract_balanced_json(&trimmed[start..])
}

/// Extract the body of the first markdown code fence in the text.
///
/// Works even when there is trailing prose after the closing ```.
/// Returns `None` if no fenced block is found.
fn extract_fenced_block(content: &str) -> Option<&str> {
    // Find opening fence
    let fence_start = content.find("```")?;
    let after_opening = &content[fence_start + 3..];

    // Skip the language tag line (e.g. "json\n")
    let body_start_rel = after_opening.find('\n')? + 1;
    let body_start = fence_start + 3 + body_start_rel;

    // Find closing fence after the body starts
    let closing = content[body_start..].find("```")?;
    let body_end = body_start + closing;

    if body_start >= body_end {
        return None;
    }

    Some(&content[body_start..body_end])
}

/// Extract a balanced JSON object or array starting at position 0 of `s`.
///
/// Counts bracket depth, respecting string literals, to find the matching
/// close bracket.
fn extract_balanced_json(s: &str) -> Option<&str> {
    let open = s.chars().next()?;
    let close = match open {
        '{' => '}',
        '[' => ']',
        _ => return None,
    };

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            c if c == open && !in_string => depth += 1,
            c if c == close && !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
