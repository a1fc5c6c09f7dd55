use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::config::SERVICE_NAME;
use crate::startup::AppState;

pub async fn index() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Liveness: answers as long as the process serves requests.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Readiness: the persona engine answers and the model provider is configured.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let persona = state.dialog.persona_client().health().await;
    let provider = state.dialog.provider().health_check().await;

    let check = |ok: bool| if ok { "ok" } else { "unavailable" };
    let ready = persona.is_ok() && provider.is_ok();

    if let Err(e) = &persona {
        tracing::warn!(error = %e, "Persona engine not ready");
    }
    if let Err(e) = &provider {
        tracing::warn!(error = %e, "Text provider not ready");
    }

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if ready { "ready" } else { "not_ready" },
            "service": SERVICE_NAME,
            "checks": {
                "persona_engine": check(persona.is_ok()),
                "llm_provider": check(provider.is_ok()),
            },
        })),
    )
}

pub async fn metrics() -> impl IntoResponse {
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4",
        )],
        service_core::middleware::render_metrics(),
    )
}
