//! LLM provider abstraction.
//!
//! The dialog flow only needs single-shot text completion, so one trait covers
//! both the OpenAI backend and the offline mock.

pub mod mock;
pub mod openai;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Provider returned no completion")]
    EmptyResponse,
}

impl ProviderError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::ApiError(_) => "api_error",
            ProviderError::RateLimited => "rate_limited",
            ProviderError::NetworkError(_) => "network_error",
            ProviderError::EmptyResponse => "empty_response",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub text: String,
    /// Model name as reported by the backend.
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

#[derive(Debug, Clone, Default)]
pub struct GenerationParams {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Best-effort determinism where the backend supports it.
    pub seed: Option<i64>,
    /// Propagated as `x-request-id` on the outbound call.
    pub request_id: Option<String>,
}

#[async_trait]
pub trait TextProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError>;

    /// Cheap readiness check; does not call the model.
    async fn health_check(&self) -> Result<(), ProviderError>;
}
