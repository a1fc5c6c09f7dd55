#![allow(dead_code)]

use assessment_runner::inventory::InventoryItem;
use dialog_service::config::{
    DialogConfig, EvalDefaults, LlmConfig, LlmProviderKind, PersonaEngineConfig, SecurityConfig,
};
use dialog_service::services::providers::mock::MockTextProvider;
use dialog_service::startup::Application;
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;

/// A dialog orchestrator on a random port, backed by the mock provider and a
/// stubbed Persona Engine.
pub struct DialogApp {
    pub address: String,
    pub persona_engine: MockServer,
}

impl DialogApp {
    pub async fn spawn(answer: &str) -> Self {
        let persona_engine = MockServer::start().await;

        let config = DialogConfig {
            common: service_core::config::Config {
                host: "127.0.0.1".to_string(),
                port: 0,
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
                url: persona_engine.uri(),
                timeout_seconds: 2,
            },
            security: SecurityConfig {
                cors_origins: vec!["*".to_string()],
                api_rate_limit: 0,
            },
            eval: EvalDefaults::default(),
            otlp_endpoint: None,
        };

        let provider = Arc::new(MockTextProvider::new(true).with_answer(answer));
        let app = Application::build_with_provider(config, provider)
            .await
            .expect("Failed to build dialog application");
        let address = format!("http://127.0.0.1:{}", app.port());

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::new();
        for _ in 0..50 {
            if client.get(format!("{}/health", address)).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        DialogApp {
            address,
            persona_engine,
        }
    }
}

pub fn item(label: &str, text: &str, code: &str, key: i32) -> InventoryItem {
    InventoryItem {
        label_raw: label.to_string(),
        text: text.to_string(),
        label_ocean: code.to_string(),
        key,
    }
}
