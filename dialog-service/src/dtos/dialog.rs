use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::eval::{Choice, EvalType};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DialogRequest {
    #[validate(length(min = 1, message = "Text cannot be empty"))]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval: Option<EvalOptions>,
}

/// Assessment options; unset fields fall back to the configured defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvalOptions {
    #[serde(rename = "type", default)]
    pub eval_type: EvalType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict_output: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogData {
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval: Option<EvalResult>,
    pub meta: ResponseMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalResult {
    #[serde(rename = "type")]
    pub eval_type: EvalType,
    pub parsed_choice: Choice,
    pub raw_output: String,
    pub strict_output: bool,
    pub format_id: String,
    pub seed: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMeta {
    pub latency_ms: u64,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Success envelope: `{"status": "success", "data": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            data,
        }
    }
}
