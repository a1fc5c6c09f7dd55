//! Offline provider for tests and `LLM_PROVIDER=mock`.

use super::{GenerationParams, ProviderError, ProviderResponse, TextProvider};
use async_trait::async_trait;

pub const MOCK_MODEL: &str = "mock-model";

/// Returns a fixed reply instead of calling a model.
///
/// When the prompt carries the MPI-AE format block the reply is the
/// configured answer letter, so assessment runs work end to end offline.
pub struct MockTextProvider {
    enabled: bool,
    reply: String,
    answer: String,
}

impl MockTextProvider {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            reply: "This is a mock response.".to_string(),
            answer: "C".to_string(),
        }
    }

    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = reply.into();
        self
    }

    pub fn with_answer(mut self, answer: impl Into<String>) -> Self {
        self.answer = answer.into();
        self
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn generate(
        &self,
        prompt: &str,
        _params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        if !self.enabled {
            return Err(ProviderError::NotConfigured(
                "Mock text provider not enabled".to_string(),
            ));
        }

        let text = if prompt.contains(crate::eval::MPI_AE_FORMAT) {
            self.answer.clone()
        } else {
            self.reply.clone()
        };

        Ok(ProviderResponse {
            completion_tokens: text.split_whitespace().count() as u32,
            prompt_tokens: (prompt.len() / 4) as u32,
            text,
            model: MOCK_MODEL.to_string(),
        })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.enabled {
            Ok(())
        } else {
            Err(ProviderError::NotConfigured(
                "Mock text provider not enabled".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn answers_letter_for_assessment_prompts() {
        let provider = MockTextProvider::new(true).with_answer("B");
        let prompt = format!("question\n{}", crate::eval::MPI_AE_FORMAT);
        let response = provider
            .generate(&prompt, &GenerationParams::default())
            .await
            .unwrap();
        assert_eq!(response.text, "B");
        assert_eq!(response.model, MOCK_MODEL);
    }

    #[tokio::test]
    async fn disabled_provider_is_not_configured() {
        let provider = MockTextProvider::new(false);
        assert!(provider.health_check().await.is_err());
        assert!(provider
            .generate("hi", &GenerationParams::default())
            .await
            .is_err());
    }
}
