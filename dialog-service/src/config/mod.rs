use secrecy::Secret;
use service_core::config::{self as core_config, env_or, get_env};
use service_core::error::AppError;

use crate::eval::DEFAULT_FORMAT_ID;

pub const SERVICE_NAME: &str = "dialog-orchestrator";
const DEFAULT_PORT: u16 = 5002;
const DEFAULT_STRICT_MAX_TOKENS: u32 = 5;
const PERSONA_TIMEOUT_SECONDS: u64 = 5;

#[derive(Debug, Clone)]
pub struct DialogConfig {
    pub common: core_config::Config,
    pub llm: LlmConfig,
    pub persona_engine: PersonaEngineConfig,
    pub security: SecurityConfig,
    pub eval: EvalDefaults,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProviderKind {
    OpenAi,
    Mock,
}

impl std::str::FromStr for LlmProviderKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(LlmProviderKind::OpenAi),
            "mock" => Ok(LlmProviderKind::Mock),
            other => Err(AppError::ConfigError(anyhow::anyhow!(
                "LLM_PROVIDER must be 'openai' or 'mock', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: LlmProviderKind,
    pub model: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
    /// Absent outside production means the provider reports itself unconfigured.
    pub api_key: Option<Secret<String>>,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct PersonaEngineConfig {
    pub url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub cors_origins: Vec<String>,
    /// Requests per minute per client IP; 0 disables the limiter.
    pub api_rate_limit: u32,
}

/// Defaults for the `eval` block of a dialog request.
#[derive(Debug, Clone)]
pub struct EvalDefaults {
    pub format_id: String,
    pub strict_output: bool,
    pub strict_max_tokens: u32,
}

impl Default for EvalDefaults {
    fn default() -> Self {
        Self {
            format_id: DEFAULT_FORMAT_ID.to_string(),
            strict_output: true,
            strict_max_tokens: DEFAULT_STRICT_MAX_TOKENS,
        }
    }
}

impl DialogConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load(DEFAULT_PORT)?;
        let is_prod = common.environment.is_prod();

        let provider: LlmProviderKind = env_or("LLM_PROVIDER", "openai").parse()?;
        let api_key = match (provider, is_prod) {
            (LlmProviderKind::OpenAi, true) => {
                Some(Secret::new(get_env("OPENAI_API_KEY", None, true)?))
            }
            _ => std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty())
                .map(Secret::new),
        };

        Ok(DialogConfig {
            common,
            llm: LlmConfig {
                provider,
                model: env_or("LLM_MODEL", "gpt-4o-mini"),
                temperature: parse_env("LLM_TEMPERATURE", 0.7)?,
                timeout_seconds: parse_env("LLM_TIMEOUT_SECONDS", 60)?,
                api_key,
                base_url: env_or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            },
            persona_engine: PersonaEngineConfig {
                url: get_env(
                    "PERSONA_ENGINE_URL",
                    Some("http://persona-engine-service:5001"),
                    is_prod,
                )?,
                timeout_seconds: PERSONA_TIMEOUT_SECONDS,
            },
            security: SecurityConfig {
                cors_origins: split_origins(&env_or("CORS_ORIGINS", "*")),
                api_rate_limit: parse_env("API_RATE_LIMIT", 100)?,
            },
            eval: EvalDefaults {
                format_id: env_or("EVAL_DEFAULT_FORMAT_ID", DEFAULT_FORMAT_ID),
                strict_output: parse_env("EVAL_DEFAULT_STRICT_OUTPUT", true)?,
                strict_max_tokens: parse_env("EVAL_STRICT_MAX_TOKENS", DEFAULT_STRICT_MAX_TOKENS)?,
            },
            otlp_endpoint: std::env::var("OTLP_ENDPOINT")
                .ok()
                .filter(|e| !e.trim().is_empty()),
        })
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e))
        }),
        Err(_) => Ok(default),
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}
