use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;

/// Deployment environment. `prod` turns missing secrets into startup errors.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Dev,
    Test,
    Prod,
}

impl Environment {
    pub fn is_prod(&self) -> bool {
        matches!(self, Environment::Prod)
    }

    /// Log filter used when neither `LOG_LEVEL` nor `RUST_LOG` is set.
    pub fn default_log_level(&self) -> &'static str {
        match self {
            Environment::Dev | Environment::Test => "debug",
            Environment::Prod => "info",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub log_level: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Config {
    /// Load the common settings from an optional `configuration` file and the
    /// process environment (`HOST`, `PORT`, `ENVIRONMENT`, `LOG_LEVEL`).
    ///
    /// `default_port` applies when neither source sets a port.
    pub fn load(default_port: u16) -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .set_default("port", i64::from(default_port))?
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::default().try_parsing(true))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn log_level(&self) -> &str {
        self.log_level
            .as_deref()
            .unwrap_or_else(|| self.environment.default_log_level())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: Environment::default(),
            log_level: None,
        }
    }
}

/// Read an environment variable, falling back to `default` outside production.
///
/// In production every variable must be set explicitly; a variable with no
/// default is required in every environment.
pub fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match std::env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

/// Like [`get_env`] but never required: unset means `default`, in every environment.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prod_environment_logs_at_info() {
        assert_eq!(Environment::Prod.default_log_level(), "info");
        assert_eq!(Environment::Dev.default_log_level(), "debug");
    }

    #[test]
    fn explicit_log_level_wins() {
        let config = Config {
            log_level: Some("trace".to_string()),
            ..Config::default()
        };
        assert_eq!(config.log_level(), "trace");
    }

    #[test]
    fn get_env_requires_value_in_prod() {
        let result = get_env("SERVICE_CORE_TEST_UNSET_VAR", Some("fallback"), true);
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }

    #[test]
    fn get_env_uses_default_outside_prod() {
        let value = get_env("SERVICE_CORE_TEST_UNSET_VAR", Some("fallback"), false).unwrap();
        assert_eq!(value, "fallback");
    }
}
