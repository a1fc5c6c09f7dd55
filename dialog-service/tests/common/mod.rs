#![allow(dead_code)]

use async_trait::async_trait;
use dialog_service::config::{
    DialogConfig, EvalDefaults, LlmConfig, LlmProviderKind, PersonaEngineConfig, SecurityConfig,
};
use dialog_service::services::providers::mock::MockTextProvider;
use dialog_service::services::providers::{
    GenerationParams, ProviderError, ProviderResponse, TextProvider,
};
use dialog_service::startup::Application;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::MockServer;

pub const TEST_USER_ID: &str = "test-user";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub persona_engine: MockServer,
    pub client: reqwest::Client,
}

pub fn test_config(persona_url: &str) -> DialogConfig {
    DialogConfig {
        common: service_core::config::Config {
            host: "127.0.0.1".to_string(),
            port: 0, // Random port
            ..Default::default()
        },
        llm: LlmConfig {
            provider: LlmProviderKind::Mock,
            model: "mock-model".to_string(),
            temperature: 0.7,
            timeout_seconds: 5,
            api_key: None,
            base_url: "http://127.0.0.1:1".to_string(),
        },
        persona_engine: PersonaEngineConfig {
            url: persona_url.to_string(),
            timeout_seconds: 2,
        },
        security: SecurityConfig {
            cors_origins: vec!["*".to_string()],
            api_rate_limit: 0,
        },
        eval: EvalDefaults::default(),
        otlp_endpoint: None,
    }
}

impl TestApp {
    /// App backed by the mock text provider and a fresh persona engine stub.
    pub async fn spawn() -> Self {
        Self::spawn_with_provider(Arc::new(MockTextProvider::new(true))).await
    }

    pub async fn spawn_with_provider(provider: Arc<dyn TextProvider>) -> Self {
        let persona_engine = MockServer::start().await;
        let config = test_config(&persona_engine.uri());
        Self::spawn_with(config, provider, persona_engine).await
    }

    pub async fn spawn_with(
        config: DialogConfig,
        provider: Arc<dyn TextProvider>,
        persona_engine: MockServer,
    ) -> Self {
        service_core::observability::init_test_tracing("info,dialog_service=debug");

        let app = Application::build_with_provider(config, provider)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to answer before handing it out
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        TestApp {
            address,
            port,
            persona_engine,
            client,
        }
    }

    pub async fn post_dialog(&self, user_id: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}/api/dialog/{}", self.address, user_id))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }
}

/// Address nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port listener");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

/// Records every prompt and parameter set and answers with a fixed reply.
pub struct RecordingProvider {
    reply: String,
    calls: Mutex<Vec<(String, GenerationParams)>>,
}

impl RecordingProvider {
    pub fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(String, GenerationParams)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> (String, GenerationParams) {
        self.calls()
            .pop()
            .expect("provider was never called")
    }
}

#[async_trait]
impl TextProvider for RecordingProvider {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), params.clone()));

        Ok(ProviderResponse {
            text: self.reply.clone(),
            model: "recording-model".to_string(),
            prompt_tokens: 42,
            completion_tokens: 1,
        })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// Always fails with the given error kind.
pub struct FailingProvider {
    rate_limited: bool,
}

impl FailingProvider {
    pub fn rate_limited() -> Arc<Self> {
        Arc::new(Self { rate_limited: true })
    }

    pub fn api_error() -> Arc<Self> {
        Arc::new(Self {
            rate_limited: false,
        })
    }
}

#[async_trait]
impl TextProvider for FailingProvider {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn generate(
        &self,
        _prompt: &str,
        _params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        if self.rate_limited {
            Err(ProviderError::RateLimited)
        } else {
            Err(ProviderError::ApiError("upstream exploded".to_string()))
        }
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Err(ProviderError::NotConfigured("always failing".to_string()))
    }
}
