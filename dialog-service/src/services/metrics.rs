//! Dialog-level metrics, exported through the shared Prometheus recorder.

use metrics::{counter, histogram};

use crate::eval::{Choice, EvalType};

pub fn record_dialog(mode: EvalType, outcome: &'static str) {
    counter!("dialog_requests_total", "mode" => mode.as_str(), "outcome" => outcome).increment(1);
}

pub fn record_choice(choice: Choice, strict: bool) {
    counter!(
        "dialog_eval_choices_total",
        "choice" => choice.as_str(),
        "strict" => if strict { "true" } else { "false" }
    )
    .increment(1);
}

pub fn record_provider_call(provider: &'static str, model: &str, seconds: f64) {
    histogram!(
        "dialog_provider_latency_seconds",
        "provider" => provider,
        "model" => model.to_string()
    )
    .record(seconds);
}

pub fn record_provider_error(provider: &'static str, kind: &'static str) {
    counter!("dialog_provider_errors_total", "provider" => provider, "error_type" => kind)
        .increment(1);
}

pub fn record_tokens(model: &str, prompt_tokens: u32, completion_tokens: u32) {
    counter!("dialog_tokens_total", "model" => model.to_string(), "type" => "prompt")
        .increment(u64::from(prompt_tokens));
    counter!("dialog_tokens_total", "model" => model.to_string(), "type" => "completion")
        .increment(u64::from(completion_tokens));
}

pub fn record_persona_lookup(outcome: &'static str) {
    counter!("dialog_persona_lookups_total", "outcome" => outcome).increment(1);
}
