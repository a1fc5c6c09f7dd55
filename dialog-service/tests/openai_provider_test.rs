mod common;

use common::{test_config, TestApp, TEST_USER_ID};
use dialog_service::services::providers::openai::{OpenAiConfig, OpenAiTextProvider};
use dialog_service::services::providers::{GenerationParams, ProviderError, TextProvider};
use secrecy::Secret;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> OpenAiTextProvider {
    OpenAiTextProvider::new(OpenAiConfig {
        api_key: Some(Secret::new("sk-test".to_string())),
        base_url: server.uri(),
        model: "gpt-4o-mini".to_string(),
        timeout: Duration::from_secs(5),
    })
    .expect("Failed to build provider")
}

fn completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "model": "gpt-4o-mini-2024-07-18",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}],
        "usage": {"prompt_tokens": 120, "completion_tokens": 1, "total_tokens": 121}
    })
}

#[tokio::test]
async fn sends_generation_options_and_parses_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(header("x-request-id", "req-1"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "max_tokens": 5,
            "seed": 7,
            "messages": [{"role": "user", "content": "prompt text"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("A")))
        .expect(1)
        .mount(&server)
        .await;

    let params = GenerationParams {
        temperature: Some(0.7),
        max_tokens: Some(5),
        seed: Some(7),
        request_id: Some("req-1".to_string()),
    };
    let response = provider(&server)
        .generate("prompt text", &params)
        .await
        .unwrap();

    assert_eq!(response.text, "A");
    assert_eq!(response.model, "gpt-4o-mini-2024-07-18");
    assert_eq!(response.prompt_tokens, 120);
    assert_eq!(response.completion_tokens, 1);
}

#[tokio::test]
async fn too_many_requests_maps_to_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let err = provider(&server)
        .generate("hi", &GenerationParams::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::RateLimited));
}

#[tokio::test]
async fn server_error_maps_to_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&server)
        .await;

    let err = provider(&server)
        .generate("hi", &GenerationParams::default())
        .await
        .unwrap_err();

    match err {
        ProviderError::ApiError(message) => assert!(message.contains("internal")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn no_choices_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let err = provider(&server)
        .generate("hi", &GenerationParams::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::EmptyResponse));
}

#[tokio::test]
async fn missing_key_never_calls_the_api() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("A")))
        .expect(0)
        .mount(&server)
        .await;

    let provider = OpenAiTextProvider::new(OpenAiConfig {
        api_key: None,
        base_url: server.uri(),
        model: "gpt-4o-mini".to_string(),
        timeout: Duration::from_secs(5),
    })
    .unwrap();

    let err = provider
        .generate("hi", &GenerationParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::NotConfigured(_)));
}

#[tokio::test]
async fn dialog_endpoint_uses_openai_backend() {
    let openai = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Sounds lovely!")))
        .expect(1)
        .mount(&openai)
        .await;

    let persona_engine = MockServer::start().await;
    let config = test_config(&persona_engine.uri());
    let app = TestApp::spawn_with(config, Arc::new(provider(&openai)), persona_engine).await;

    let response = app
        .post_dialog(TEST_USER_ID, &json!({"text": "I went hiking"}))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["response"], "Sounds lovely!");
    assert_eq!(body["data"]["meta"]["model"], "gpt-4o-mini-2024-07-18");
    assert_eq!(body["data"]["meta"]["completion_tokens"], 1);
}
