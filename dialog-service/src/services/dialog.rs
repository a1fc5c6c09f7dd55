//! Generate-dialog use case: persona lookup, prompt, model call, optional
//! MPI-AE parsing.

use service_core::error::AppError;
use std::sync::Arc;
use std::time::Instant;

use super::metrics;
use super::persona::Persona;
use super::persona_client::{PersonaClient, PersonaError};
use super::prompt::compose_prompt;
use super::providers::{GenerationParams, ProviderError, TextProvider};
use crate::config::EvalDefaults;
use crate::dtos::{DialogData, EvalOptions, EvalResult, ResponseMeta};
use crate::eval::{parse_choice, EvalType, MPI_AE_FORMAT};

/// Eval options after defaults are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalSettings {
    pub eval_type: EvalType,
    pub strict_output: bool,
    pub seed: Option<i64>,
    pub format_id: String,
}

impl EvalSettings {
    pub fn resolve(options: Option<&EvalOptions>, defaults: &EvalDefaults) -> Self {
        let options = options.cloned().unwrap_or_default();
        Self {
            eval_type: options.eval_type,
            strict_output: options.strict_output.unwrap_or(defaults.strict_output),
            seed: options.seed,
            format_id: options
                .format_id
                .filter(|f| !f.trim().is_empty())
                .unwrap_or_else(|| defaults.format_id.clone()),
        }
    }

    pub fn is_assessment(&self) -> bool {
        self.eval_type == EvalType::MpiAe
    }

    /// Strict assessment asks the model for a bare letter.
    fn wants_letter_only(&self) -> bool {
        self.is_assessment() && self.strict_output
    }
}

#[derive(Clone)]
pub struct DialogService {
    persona_client: PersonaClient,
    provider: Arc<dyn TextProvider>,
    temperature: f32,
    eval_defaults: EvalDefaults,
}

impl DialogService {
    pub fn new(
        persona_client: PersonaClient,
        provider: Arc<dyn TextProvider>,
        temperature: f32,
        eval_defaults: EvalDefaults,
    ) -> Self {
        Self {
            persona_client,
            provider,
            temperature,
            eval_defaults,
        }
    }

    pub fn persona_client(&self) -> &PersonaClient {
        &self.persona_client
    }

    pub fn provider(&self) -> &Arc<dyn TextProvider> {
        &self.provider
    }

    pub fn eval_defaults(&self) -> &EvalDefaults {
        &self.eval_defaults
    }

    #[tracing::instrument(skip(self, text, eval, request_id), fields(text_len = text.len()))]
    pub async fn generate(
        &self,
        user_id: &str,
        text: &str,
        eval: Option<&EvalOptions>,
        request_id: Option<&str>,
    ) -> Result<DialogData, AppError> {
        let settings = EvalSettings::resolve(eval, &self.eval_defaults);

        let result = self.run(user_id, text, &settings, request_id).await;
        metrics::record_dialog(
            settings.eval_type,
            if result.is_ok() { "success" } else { "error" },
        );
        result
    }

    async fn run(
        &self,
        user_id: &str,
        text: &str,
        settings: &EvalSettings,
        request_id: Option<&str>,
    ) -> Result<DialogData, AppError> {
        let persona = self.fetch_persona(user_id, request_id).await?;

        let evaluation_format = if settings.wants_letter_only() {
            MPI_AE_FORMAT
        } else {
            ""
        };
        let prompt = compose_prompt(&persona, text, evaluation_format);

        let params = GenerationParams {
            temperature: Some(self.temperature),
            max_tokens: settings
                .wants_letter_only()
                .then_some(self.eval_defaults.strict_max_tokens),
            seed: settings.seed,
            request_id: request_id.map(str::to_string),
        };

        let started = Instant::now();
        let generated = self.provider.generate(&prompt, &params).await;
        let elapsed = started.elapsed();

        let generated = generated.map_err(|e| {
            metrics::record_provider_error(self.provider.name(), e.kind());
            provider_error(e)
        })?;

        metrics::record_provider_call(
            self.provider.name(),
            &generated.model,
            elapsed.as_secs_f64(),
        );
        metrics::record_tokens(
            &generated.model,
            generated.prompt_tokens,
            generated.completion_tokens,
        );

        let eval = settings.is_assessment().then(|| {
            let parsed_choice = parse_choice(&generated.text, settings.strict_output);
            metrics::record_choice(parsed_choice, settings.strict_output);
            tracing::info!(choice = %parsed_choice, format_id = %settings.format_id, "Parsed assessment answer");

            EvalResult {
                eval_type: settings.eval_type,
                parsed_choice,
                raw_output: generated.text.clone(),
                strict_output: settings.strict_output,
                format_id: settings.format_id.clone(),
                seed: settings.seed,
            }
        });

        tracing::info!(
            model = %generated.model,
            latency_ms = elapsed.as_millis() as u64,
            prompt_tokens = generated.prompt_tokens,
            completion_tokens = generated.completion_tokens,
            "Dialog generated"
        );

        Ok(DialogData {
            response: generated.text,
            eval,
            meta: ResponseMeta {
                latency_ms: elapsed.as_millis() as u64,
                model: generated.model,
                prompt_tokens: generated.prompt_tokens,
                completion_tokens: generated.completion_tokens,
            },
        })
    }

    async fn fetch_persona(
        &self,
        user_id: &str,
        request_id: Option<&str>,
    ) -> Result<Persona, AppError> {
        match self.persona_client.get_persona(user_id, request_id).await {
            Ok(persona) => {
                metrics::record_persona_lookup(if persona.is_empty() { "empty" } else { "found" });
                Ok(persona)
            }
            Err(e) => {
                metrics::record_persona_lookup("error");
                Err(persona_error(e))
            }
        }
    }
}

fn persona_error(err: PersonaError) -> AppError {
    match err {
        PersonaError::InvalidUrl(_) => AppError::BadRequest(anyhow::anyhow!(err)),
        _ => AppError::BadGateway(err.to_string()),
    }
}

fn provider_error(err: ProviderError) -> AppError {
    match err {
        ProviderError::RateLimited | ProviderError::NotConfigured(_) => {
            AppError::ServiceUnavailable(err.to_string())
        }
        ProviderError::ApiError(_) | ProviderError::NetworkError(_) | ProviderError::EmptyResponse => {
            AppError::BadGateway(err.to_string())
        }
    }
}
