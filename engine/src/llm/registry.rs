//! Chat client registry
//!
//! Planner nodes share configured chat clients through a registry keyed by
//! model parameters: two nodes configured with the same model, temperature,
//! and prompt cache key get the same [`ChatClient`] instance.

use super::retry::{chat_with_retry, RetryPolicy};
use super::{ChatOutcome, ChatRequest, LlmError, LlmProvider, Message};
use crate::config::NodeConfig;
use sdk::errors::EngineError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Models that only support their default sampling temperature.
/// A configured non-default temperature is ignored with a warning.
const DEFAULT_TEMPERATURE_ONLY_MODELS: &[&str] = &["gpt-5", "gpt-5-mini", "gpt-5-nano"];

/// Resolve the temperature to send for a model.
///
/// Temperature-restricted models get `None` (provider default); a configured
/// non-default value logs a warning. For everything else the configured
/// value passes through, defaulting to 0.0.
pub fn resolve_temperature(model: &str, configured: Option<f64>) -> Option<f64> {
    let temperature = configured.unwrap_or(0.0);

    if DEFAULT_TEMPERATURE_ONLY_MODELS.contains(&model) {
        if temperature != 1.0 && configured.is_some() {
            warn!(
                "Model {} only supports its default temperature; ignoring {}",
                model, temperature
            );
        }
        return None;
    }

    Some(temperature)
}

/// A chat client bound to one node's model parameters.
///
/// Wraps the provider with the retry policy and maps transport errors into
/// engine errors at the boundary the pipeline sees.
pub struct ChatClient {
    provider: Arc<dyn LlmProvider>,
    policy: RetryPolicy,
    model: String,
    temperature: Option<f64>,
    prompt_cache_key: Option<String>,
}

impl ChatClient {
    pub fn new(provider: Arc<dyn LlmProvider>, node: &NodeConfig, policy: RetryPolicy) -> Self {
        Self {
            provider,
            policy,
            model: node.model.clone(),
            temperature: resolve_temperature(&node.model, node.temperature),
            prompt_cache_key: node.prompt_cache_key.clone(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one chat completion with retry.
    pub async fn chat(&self, messages: Vec<Message>) -> Result<ChatOutcome, EngineError> {
        let request = ChatRequest {
            model: self.model.clone(),
            temperature: self.temperature,
            prompt_cache_key: self.prompt_cache_key.clone(),
            messages,
        };

        chat_with_retry(self.provider.as_ref(), &request, &self.policy)
            .await
            .map_err(|err| match err {
                LlmError::RateLimited { .. } => EngineError::RateLimitExhausted {
                    model: self.model.clone(),
                    attempts: self.policy.max_attempts,
                },
                LlmError::AuthenticationFailed(msg) => {
                    EngineError::AuthenticationFailed(format!("{}: {}", self.provider.name(), msg))
                }
                other => EngineError::Llm(other.to_string()),
            })
    }
}

/// Cache key: model parameters that identify a configured client.
/// Temperature is stored in hundredths so the key stays hashable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    model: String,
    temperature_centi: Option<i64>,
    prompt_cache_key: Option<String>,
}

impl ClientKey {
    fn for_node(node: &NodeConfig) -> Self {
        Self {
            model: node.model.clone(),
            temperature_centi: resolve_temperature(&node.model, node.temperature)
                .map(|t| (t * 100.0).round() as i64),
            prompt_cache_key: node.prompt_cache_key.clone(),
        }
    }
}

/// Registry of chat clients, one per distinct parameter set.
pub struct ProviderRegistry {
    provider: Arc<dyn LlmProvider>,
    policy: RetryPolicy,
    clients: Mutex<HashMap<ClientKey, Arc<ChatClient>>>,
}

impl ProviderRegistry {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self::with_policy(provider, RetryPolicy::default())
    }

    pub fn with_policy(provider: Arc<dyn LlmProvider>, policy: RetryPolicy) -> Self {
        Self {
            provider,
            policy,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    /// Get or create the client for a node's parameters.
    pub fn client(&self, node: &NodeConfig) -> Arc<ChatClient> {
        let key = ClientKey::for_node(node);
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());

        Arc::clone(clients.entry(key).or_insert_with(|| {
            Arc::new(ChatClient::new(
                Arc::clone(&self.provider),
                node,
                self.policy.clone(),
            ))
        }))
    }

    /// Number of distinct clients created so far
    pub fn cached_clients(&self) -> usize {
        self.clients.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatRequest, RateLimitSnapshot, Result as LlmResult};
    use async_trait::async_trait;

    struct EchoProvider;

    #[async_trait]
    impl LlmProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn chat(&self, request: &ChatRequest) -> LlmResult<ChatOutcome> {
            Ok(ChatOutcome {
                content: request.messages.last().map(|m| m.content.clone()).unwrap_or_default(),
                model: request.model.clone(),
                total_tokens: None,
                rate_limit: RateLimitSnapshot::default(),
            })
        }
    }

    fn node(model: &str, temperature: Option<f64>, cache_key: Option<&str>) -> NodeConfig {
        NodeConfig {
            model: model.to_string(),
            temperature,
            prompt_cache_key: cache_key.map(String::from),
        }
    }

    #[test]
    fn test_resolve_temperature_passthrough() {
        assert_eq!(resolve_temperature("gpt-4.1", None), Some(0.0));
        assert_eq!(resolve_temperature("gpt-4.1", Some(0.7)), Some(0.7));
    }

    #[test]
    fn test_resolve_temperature_restricted_models() {
        assert_eq!(resolve_temperature("gpt-5", Some(0.7)), None);
        assert_eq!(resolve_temperature("gpt-5-mini", None), None);
        assert_eq!(resolve_temperature("gpt-5-nano", Some(1.0)), None);
    }

    #[test]
    fn test_registry_reuses_identical_parameters() {
        let registry = ProviderRegistry::new(Arc::new(EchoProvider));

        let a = registry.client(&node("gpt-4.1-mini", Some(0.0), Some("intent")));
        let b = registry.client(&node("gpt-4.1-mini", Some(0.0), Some("intent")));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.cached_clients(), 1);
    }

    #[test]
    fn test_registry_distinguishes_parameters() {
        let registry = ProviderRegistry::new(Arc::new(EchoProvider));

        registry.client(&node("gpt-4.1-mini", Some(0.0), None));
        registry.client(&node("gpt-4.1-mini", Some(0.5), None));
        registry.client(&node("gpt-4.1", Some(0.0), None));
        registry.client(&node("gpt-4.1-mini", Some(0.0), Some("other")));

        assert_eq!(registry.cached_clients(), 4);
    }

    #[test]
    fn test_registry_unifies_missing_and_zero_temperature() {
        // None and Some(0.0) resolve to the same request temperature,
        // so they share a client
        let registry = ProviderRegistry::new(Arc::new(EchoProvider));

        let a = registry.client(&node("gpt-4.1-mini", None, None));
        let b = registry.client(&node("gpt-4.1-mini", Some(0.0), None));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_chat_client_round_trip() {
        let registry = ProviderRegistry::new(Arc::new(EchoProvider));
        let client = registry.client(&node("gpt-4.1-mini", None, None));

        let outcome = client.chat(vec![Message::user("ping")]).await.unwrap();
        assert_eq!(outcome.content, "ping");
        assert_eq!(outcome.model, "gpt-4.1-mini");
    }
}
