//! Application startup and lifecycle management.

use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    create_ip_rate_limiter, init_metrics, ip_rate_limit_middleware, metrics_middleware,
    request_id_middleware, security_headers_middleware,
};
use service_core::observability::{extract_request_id, extract_traceparent, REQUEST_ID_HEADER};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{DialogConfig, LlmProviderKind};
use crate::handlers;
use crate::services::providers::mock::MockTextProvider;
use crate::services::providers::openai::{OpenAiConfig, OpenAiTextProvider};
use crate::services::providers::TextProvider;
use crate::services::{DialogService, PersonaClient};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<DialogConfig>,
    pub dialog: DialogService,
}

/// Pick the text provider named by `LLM_PROVIDER`.
pub fn build_provider(config: &DialogConfig) -> Result<Arc<dyn TextProvider>, AppError> {
    let provider: Arc<dyn TextProvider> = match config.llm.provider {
        LlmProviderKind::OpenAi => {
            let provider = OpenAiTextProvider::new(OpenAiConfig {
                api_key: config.llm.api_key.clone(),
                base_url: config.llm.base_url.clone(),
                model: config.llm.model.clone(),
                timeout: Duration::from_secs(config.llm.timeout_seconds),
            })
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?;

            if config.llm.api_key.is_none() {
                tracing::warn!("OPENAI_API_KEY not set - dialog requests will fail until configured");
            }
            Arc::new(provider)
        }
        LlmProviderKind::Mock => {
            tracing::warn!("Using mock text provider");
            Arc::new(MockTextProvider::new(true))
        }
    };

    tracing::info!(
        provider = provider.name(),
        model = %config.llm.model,
        "Initialized text provider"
    );
    Ok(provider)
}

pub fn build_state(
    config: DialogConfig,
    provider: Arc<dyn TextProvider>,
) -> Result<AppState, AppError> {
    let persona_client = PersonaClient::new(
        &config.persona_engine.url,
        Duration::from_secs(config.persona_engine.timeout_seconds),
    )
    .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?;
    tracing::info!(endpoint = %config.persona_engine.url, "Initialized persona client");

    let dialog = DialogService::new(
        persona_client,
        provider,
        config.llm.temperature,
        config.eval.clone(),
    );

    Ok(AppState {
        config: Arc::new(config),
        dialog,
    })
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() || origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|o| {
            o.parse::<HeaderValue>()
                .map_err(|e| tracing::error!("Invalid CORS origin '{}': {}", o, e))
                .ok()
        }))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers([header::RETRY_AFTER, header::HeaderName::from_static(REQUEST_ID_HEADER)])
}

pub fn build_router(state: AppState) -> Router {
    let mut api = Router::new().route("/api/dialog/:user_id", post(handlers::generate_dialog));

    if let Some(limiter) = create_ip_rate_limiter(state.config.security.api_rate_limit) {
        api = api.layer(from_fn_with_state(limiter, ip_rate_limit_middleware));
    }

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .merge(api)
        .fallback(fallback)
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config.security.cors_origins))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let headers = request.headers();
                let request_id = extract_request_id(headers).unwrap_or_else(|| "-".to_string());
                let traceparent = extract_traceparent(headers).unwrap_or_default();

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    traceparent = %traceparent,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        // Outermost, so the span above sees a minted id
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

async fn fallback(uri: axum::http::Uri) -> AppError {
    AppError::NotFound(anyhow::anyhow!("Resource not found: {}", uri.path()))
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build from configuration, choosing the provider from `LLM_PROVIDER`.
    pub async fn build(config: DialogConfig) -> Result<Self, AppError> {
        let provider = build_provider(&config)?;
        Self::build_with_provider(config, provider).await
    }

    /// Build with an explicit provider (tests inject mocks here).
    pub async fn build_with_provider(
        config: DialogConfig,
        provider: Arc<dyn TextProvider>,
    ) -> Result<Self, AppError> {
        init_metrics();

        let addr = format!("{}:{}", config.common.host, config.common.port);
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        let state = build_state(config, provider)?;
        let router = build_router(state);

        tracing::info!("Dialog orchestrator listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.run_with_shutdown(std::future::pending()).await
    }

    pub async fn run_with_shutdown<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
    }
}
