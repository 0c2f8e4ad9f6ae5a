//! Retry with exponential backoff
//!
//! Every chat call the planner makes goes through [`chat_with_retry`].
//! Rate limits, server errors, timeouts, and network failures are retried
//! with doubling delays, up to five attempts; when the server supplied a
//! `Retry-After` on a 429 that wait is honored instead of the computed one.

use super::{ChatOutcome, ChatRequest, LlmError, LlmProvider, Result};
use std::time::Duration;
use tracing::warn;

/// Backoff parameters for chat calls
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Delay before the first retry; doubles each subsequent retry
    pub base_delay: Duration,

    /// Upper bound on any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based), before any
    /// `Retry-After` override.
    fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Run a chat call, retrying transient failures per the policy.
///
/// Returns the first success, or the last error once attempts are exhausted
/// or a non-retryable error occurs.
pub async fn chat_with_retry(
    provider: &dyn LlmProvider,
    request: &ChatRequest,
    policy: &RetryPolicy,
) -> Result<ChatOutcome> {
    let mut attempt = 0u32;

    loop {
        match provider.chat(request).await {
            Ok(outcome) => return Ok(outcome),
            Err(err) => {
                attempt += 1;
                if !err.is_retryable() || attempt >= policy.max_attempts {
                    return Err(err);
                }

                let delay = match &err {
                    LlmError::RateLimited {
                        retry_after_secs: Some(secs),
                    } => Duration::from_secs(*secs).min(policy.max_delay),
                    _ => policy.delay_for(attempt - 1),
                };

                warn!(
                    "Chat call to model {} failed (attempt {}/{}): {}. Retrying in {:.1}s",
                    request.model,
                    attempt,
                    policy.max_attempts,
                    err,
                    delay.as_secs_f64()
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Message, RateLimitSnapshot};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Provider that fails a fixed number of times before succeeding
    struct FlakyProvider {
        failures: u32,
        calls: AtomicU32,
        error_kind: fn() -> LlmError,
    }

    impl FlakyProvider {
        fn new(failures: u32, error_kind: fn() -> LlmError) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                error_kind,
            }
        }
    }

    #[async_trait]
    impl LlmProvider for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatOutcome> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err((self.error_kind)())
            } else {
                Ok(ChatOutcome {
                    content: "ok".to_string(),
                    model: request.model.clone(),
                    total_tokens: None,
                    rate_limit: RateLimitSnapshot::default(),
                })
            }
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    fn request() -> ChatRequest {
        ChatRequest {
            model: "test-model".to_string(),
            temperature: None,
            prompt_cache_key: None,
            messages: vec![Message::user("hi")],
        }
    }

    #[tokio::test]
    async fn test_retries_rate_limit_then_succeeds() {
        let provider = FlakyProvider::new(2, || LlmError::RateLimited {
            retry_after_secs: None,
        });

        let outcome = chat_with_retry(&provider, &request(), &fast_policy())
            .await
            .unwrap();
        assert_eq!(outcome.content, "ok");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let provider = FlakyProvider::new(u32::MAX, || LlmError::Server {
            status: 503,
            message: "overloaded".to_string(),
        });

        let err = chat_with_retry(&provider, &request(), &fast_policy())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Server { status: 503, .. }));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_no_retry_on_auth_failure() {
        let provider =
            FlakyProvider::new(u32::MAX, || LlmError::AuthenticationFailed("nope".to_string()));

        let err = chat_with_retry(&provider, &request(), &fast_policy())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::AuthenticationFailed(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(3),
        };

        assert_eq!(policy.delay_for(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        // Capped at max_delay from here on
        assert_eq!(policy.delay_for(3), Duration::from_secs(3));
        assert_eq!(policy.delay_for(10), Duration::from_secs(3));
    }
}
