//! Integration tests for the HTTP providers
//!
//! A local wiremock server stands in for the Anthropic and Ollama APIs.

use serde_json::json;
use tour_engine::config::AnthropicConfig;
use tour_engine::llm::anthropic::AnthropicProvider;
use tour_engine::llm::ollama::OllamaProvider;
use tour_engine::llm::{LLMError, LLMProvider, Message};
use tour_engine::secrets::SecretString;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn anthropic(server: &MockServer) -> AnthropicProvider {
    let config = AnthropicConfig {
        base_url: server.uri(),
        ..AnthropicConfig::default()
    };
    AnthropicProvider::new(config, SecretString::new("sk-ant-test"))
}

fn tour_messages() -> Vec<Message> {
    vec![
        Message::system("You are the history guide."),
        Message::user("Location: Kyoto"),
    ]
}

#[tokio::test]
async fn test_anthropic_generate_concatenates_text_blocks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(header("x-api-key", "sk-ant-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "max_tokens": 2048,
            "system": "You are the history guide.",
            "messages": [{ "role": "user", "content": "Location: Kyoto" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [
                { "type": "text", "text": "Kyoto was founded " },
                { "type": "text", "text": "in 794." }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let text = anthropic(&server)
        .generate(&tour_messages(), 2048)
        .await
        .unwrap();

    assert_eq!(text, "Kyoto was founded in 794.");
}

#[tokio::test]
async fn test_anthropic_status_mapping() {
    let cases = [
        (401, "auth"),
        (429, "rate"),
        (529, "unavailable"),
        (400, "invalid"),
    ];

    for (status, expected) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
            .mount(&server)
            .await;

        let err = anthropic(&server)
            .generate(&tour_messages(), 64)
            .await
            .unwrap_err();

        let matched = match (expected, &err) {
            ("auth", LLMError::AuthenticationFailed(_)) => true,
            ("rate", LLMError::RateLimitExceeded) => true,
            ("unavailable", LLMError::ProviderUnavailable(_)) => true,
            ("invalid", LLMError::InvalidRequest(_)) => true,
            _ => false,
        };
        assert!(matched, "status {} produced {:?}", status, err);
    }
}

#[tokio::test]
async fn test_anthropic_malformed_body_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "msg_1" })))
        .mount(&server)
        .await;

    let err = anthropic(&server)
        .generate(&tour_messages(), 64)
        .await
        .unwrap_err();

    assert!(matches!(err, LLMError::ParseError(_)));
}

#[tokio::test]
async fn test_anthropic_health_check_contacts_api() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .and(header("x-api-key", "sk-ant-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    assert!(anthropic(&server).check_health().await);
}

#[tokio::test]
async fn test_anthropic_health_check_rejected_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid x-api-key"))
        .mount(&server)
        .await;

    assert!(!anthropic(&server).check_health().await);

    let config = AnthropicConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        ..AnthropicConfig::default()
    };
    let unreachable = AnthropicProvider::new(config, SecretString::new("sk-ant-test"));
    assert!(!unreachable.check_health().await);
}

#[tokio::test]
async fn test_ollama_generate_non_streaming() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "model": "llama3.1:8b",
            "stream": false,
            "options": { "num_predict": 1024 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": { "role": "assistant", "content": "{\"introduction\": 1}" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OllamaProvider::new(server.uri(), "llama3.1:8b");
    let text = provider.generate(&tour_messages(), 1024).await.unwrap();

    assert_eq!(text, "{\"introduction\": 1}");
}

#[tokio::test]
async fn test_ollama_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&server)
        .await;

    let provider = OllamaProvider::new(server.uri(), "llama3.1:8b");
    let err = provider.generate(&tour_messages(), 64).await.unwrap_err();

    match err {
        LLMError::ProviderUnavailable(msg) => assert!(msg.contains("model not loaded")),
        other => panic!("Expected ProviderUnavailable, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_ollama_health_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "models": [] })))
        .mount(&server)
        .await;

    let healthy = OllamaProvider::new(server.uri(), "llama3.1:8b");
    assert!(healthy.check_health().await);

    let unreachable = OllamaProvider::new("http://127.0.0.1:9", "llama3.1:8b");
    assert!(!unreachable.check_health().await);
}
