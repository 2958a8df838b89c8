//! End-to-end Router scenarios against stubbed upstreams (spec §8's seeded
//! scenarios 2-4), following the teacher pack's `wiremock`-backed
//! integration style (see `block-goose`'s `tests/client_integration.rs`).

use std::sync::Arc;
use std::time::Duration;

use aratta_gateway::core::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use aratta_gateway::core::health::HealthMonitor;
use aratta_gateway::core::registry::ProviderRegistry;
use aratta_gateway::core::router::Router;
use aratta_gateway::core::types::{ChatRequest, Message};
use aratta_gateway::{GatewayConfig, GatewayError};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request_for(model: &str) -> ChatRequest {
    ChatRequest {
        model: model.to_string(),
        messages: vec![Message::user("hi")],
        system: None,
        max_tokens: Some(64),
        temperature: None,
        tools: vec![],
        tool_choice: None,
        stream: false,
        thinking_budget: None,
    }
}

fn config_pointing_at(anthropic_uri: &str, openai_uri: &str) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    for provider in &mut config.providers {
        match provider.name.as_str() {
            "anthropic" => provider.base_url = Some(anthropic_uri.to_string()),
            "openai" => provider.base_url = Some(openai_uri.to_string()),
            "google" | "xai" => provider.enabled = false,
            "ollama" => {}
            _ => {}
        }
    }
    config
}

fn router_for(config: GatewayConfig) -> (Arc<Router>, Arc<CircuitBreaker>, Arc<HealthMonitor>) {
    let registry = Arc::new(ProviderRegistry::new(config));
    let circuit_breaker = Arc::new(CircuitBreaker::new(CircuitBreakerConfig {
        failure_threshold: 2,
        recovery_timeout: Duration::from_secs(60),
        success_threshold: 1,
    }));
    let health_monitor = Arc::new(HealthMonitor::new(Duration::from_secs(300), 3, Duration::from_secs(600)));
    let router = Arc::new(Router::new(registry, circuit_breaker.clone(), health_monitor.clone()));
    (router, circuit_breaker, health_monitor)
}

fn anthropic_success_body() -> serde_json::Value {
    json!({
        "id": "msg_123",
        "model": "claude-3-5-sonnet-20241022",
        "content": [{"type": "text", "text": "hello from anthropic"}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 5, "output_tokens": 3},
    })
}

fn openai_success_body() -> serde_json::Value {
    json!({
        "id": "chatcmpl-456",
        "model": "gpt-4o",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "hello from openai"},
            "finish_reason": "stop",
        }],
        "usage": {"prompt_tokens": 5, "completion_tokens": 3, "total_tokens": 8},
    })
}

#[tokio::test]
async fn simple_chat_against_a_healthy_primary() {
    let anthropic = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(anthropic_success_body()))
        .mount(&anthropic)
        .await;

    let (router, _, _) = router_for(config_pointing_at(&anthropic.uri(), "http://127.0.0.1:0"));
    let response = router.chat(request_for("sonnet")).await.unwrap();

    assert_eq!(response.lineage.provider, "anthropic");
    assert_eq!(response.finish_reason, aratta_gateway::core::types::FinishReason::Stop);
    assert_eq!(response.content.iter().filter_map(|c| c.as_text()).collect::<String>(), "hello from anthropic");
}

#[tokio::test]
async fn falls_back_to_secondary_on_primary_5xx() {
    let anthropic = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&anthropic)
        .await;

    let openai = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_success_body()))
        .mount(&openai)
        .await;

    let (router, circuit_breaker, _) = router_for(config_pointing_at(&anthropic.uri(), &openai.uri()));
    let response = router.chat(request_for("sonnet")).await.unwrap();

    assert_eq!(response.lineage.provider, "openai");
    assert_eq!(response.lineage.model, "gpt-4o");
    assert_eq!(response.lineage.fallback_from.as_deref(), Some("anthropic"));
    assert_eq!(circuit_breaker.failure_count("anthropic"), 1);
}

#[tokio::test]
async fn circuit_opens_after_threshold_then_refuses_without_fallback() {
    let anthropic = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&anthropic)
        .await;

    let mut config = config_pointing_at(&anthropic.uri(), "http://127.0.0.1:0");
    config.enable_fallback = false;
    let (router, circuit_breaker, _) = router_for(config);

    assert!(router.chat(request_for("sonnet")).await.is_err());
    assert!(router.chat(request_for("sonnet")).await.is_err());
    assert_eq!(circuit_breaker.state("anthropic"), CircuitState::Open);

    // candidate_order yields only the primary with fallback disabled; once
    // its circuit is open the loop skips it without attempting anything,
    // so there is no per-attempt error to surface, just "nothing to try".
    let third = router.chat(request_for("sonnet")).await;
    assert!(matches!(third, Err(GatewayError::NoProvidersAvailable(ref m)) if m == "sonnet"));
}

#[tokio::test]
async fn rate_limit_is_not_fallback_eligible() {
    let anthropic = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({"error": {"message": "rate limited"}})))
        .mount(&anthropic)
        .await;

    let openai = MockServer::start().await;
    // No mock mounted: if the Router ever calls openai here, wiremock
    // returns 404 by default and the test below would see that instead of
    // the rate-limit error, making a wrongful fallback observable.

    let (router, _, _) = router_for(config_pointing_at(&anthropic.uri(), &openai.uri()));
    let error = router.chat(request_for("sonnet")).await.unwrap_err();
    assert!(matches!(error, GatewayError::Provider(ref e) if format!("{e}").contains("rate limited")));
}
