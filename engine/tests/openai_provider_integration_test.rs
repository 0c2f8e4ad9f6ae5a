//! Integration tests for the OpenAI-compatible provider
//!
//! Validates request/response handling, error mapping, rate-limit header
//! capture, and retry behavior using mock servers.

use serde_json::json;
use wiremock::{
    matchers::{body_string_contains, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use waypoint_engine::config::{NodeConfig, OpenAiConfig};
use waypoint_engine::llm::openai::OpenAiProvider;
use waypoint_engine::llm::registry::{ChatClient, ProviderRegistry};
use waypoint_engine::llm::retry::{chat_with_retry, RetryPolicy};
use waypoint_engine::llm::{ChatRequest, LlmError, LlmProvider, Message};
use waypoint_engine::secrets::SecretString;

fn provider_for(server: &MockServer) -> OpenAiProvider {
    OpenAiProvider::new(
        OpenAiConfig {
            base_url: server.uri(),
        },
        Some(SecretString::new("test-key")),
    )
}

fn request() -> ChatRequest {
    ChatRequest {
        model: "gpt-4.1-mini".to_string(),
        temperature: Some(0.0),
        prompt_cache_key: Some("test-cache".to_string()),
        messages: vec![
            Message::system("You are a planner"),
            Message::user("Hello"),
        ],
    }
}

fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "model": "gpt-4.1-mini",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 20, "completion_tokens": 5, "total_tokens": 25}
    })
}

#[tokio::test]
async fn test_chat_success_captures_usage_and_headers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_string_contains("prompt_cache_key"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("Hi there!"))
                .insert_header("x-ratelimit-limit-requests", "500")
                .insert_header("x-ratelimit-remaining-requests", "499")
                .insert_header("x-ratelimit-remaining-tokens", "99975"),
        )
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let outcome = provider.chat(&request()).await.unwrap();

    assert_eq!(outcome.content, "Hi there!");
    assert_eq!(outcome.total_tokens, Some(25));
    assert_eq!(outcome.rate_limit.limit_requests, Some(500));
    assert_eq!(outcome.rate_limit.remaining_requests, Some(499));
    assert_eq!(outcome.rate_limit.remaining_tokens, Some(99975));
}

#[tokio::test]
async fn test_chat_maps_auth_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let err = provider.chat(&request()).await.unwrap_err();
    assert!(matches!(err, LlmError::AuthenticationFailed(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_chat_maps_rate_limit_with_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_string("rate limited")
                .insert_header("retry-after", "7"),
        )
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let err = provider.chat(&request()).await.unwrap_err();
    match err {
        LlmError::RateLimited { retry_after_secs } => {
            assert_eq!(retry_after_secs, Some(7));
        }
        other => panic!("Expected RateLimited, got {:?}", other),
    }
}

#[tokio::test]
async fn test_retry_recovers_from_rate_limit() {
    let server = MockServer::start().await;

    // First call is rate limited, then expires; the fallback mock succeeds
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_string("rate limited")
                .insert_header("retry-after", "0"),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("recovered")))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let policy = RetryPolicy {
        max_attempts: 3,
        base_delay: std::time::Duration::from_millis(1),
        max_delay: std::time::Duration::from_millis(10),
    };

    let outcome = chat_with_retry(&provider, &request(), &policy)
        .await
        .unwrap();
    assert_eq!(outcome.content, "recovered");
}

#[tokio::test]
async fn test_missing_api_key_fails_without_request() {
    // No mock server needed: the provider refuses before sending
    let provider = OpenAiProvider::new(
        OpenAiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
        },
        None,
    );

    let err = provider.chat(&request()).await.unwrap_err();
    assert!(matches!(err, LlmError::AuthenticationFailed(_)));
    assert!(!provider.check_health().await);
}

#[tokio::test]
async fn test_chat_client_maps_exhausted_rate_limit() {
    use sdk::errors::EngineError;
    use std::sync::Arc;

    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_string("rate limited")
                .insert_header("retry-after", "0"),
        )
        .mount(&server)
        .await;

    let registry = ProviderRegistry::with_policy(
        Arc::new(provider_for(&server)),
        RetryPolicy {
            max_attempts: 2,
            base_delay: std::time::Duration::from_millis(1),
            max_delay: std::time::Duration::from_millis(5),
        },
    );

    let client: Arc<ChatClient> = registry.client(&NodeConfig {
        model: "gpt-4.1-mini".to_string(),
        temperature: None,
        prompt_cache_key: None,
    });

    let err = client.chat(vec![Message::user("hi")]).await.unwrap_err();
    match err {
        EngineError::RateLimitExhausted { model, attempts } => {
            assert_eq!(model, "gpt-4.1-mini");
            assert_eq!(attempts, 2);
        }
        other => panic!("Expected RateLimitExhausted, got {:?}", other),
    }
}
