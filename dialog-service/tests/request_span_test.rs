mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::test_config;
use dialog_service::services::providers::mock::MockTextProvider;
use dialog_service::startup::{build_router, build_state};
use std::fmt;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::Subscriber;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;
use wiremock::MockServer;

/// Collects the `request_id` field of every `http_request` span.
#[derive(Clone, Default)]
struct RequestSpans(Arc<Mutex<Vec<String>>>);

impl RequestSpans {
    fn ids(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

struct RequestIdField(Option<String>);

impl Visit for RequestIdField {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "request_id" {
            self.0 = Some(format!("{:?}", value));
        }
    }
}

impl<S: Subscriber> Layer<S> for RequestSpans {
    fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
        if attrs.metadata().name() != "http_request" {
            return;
        }
        let mut field = RequestIdField(None);
        attrs.record(&mut field);
        if let Some(id) = field.0 {
            self.0.lock().unwrap().push(id);
        }
    }
}

async fn router() -> axum::Router {
    let persona_engine = MockServer::start().await;
    let state = build_state(
        test_config(&persona_engine.uri()),
        Arc::new(MockTextProvider::new(true)),
    )
    .unwrap();
    build_router(state)
}

#[tokio::test]
async fn request_span_records_minted_request_id() {
    let spans = RequestSpans::default();
    let _guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(spans.clone()));

    let response = router()
        .await
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let minted = response.headers()["x-request-id"].to_str().unwrap().to_string();
    assert_ne!(minted, "-");
    assert_eq!(spans.ids(), vec![minted]);
}

#[tokio::test]
async fn request_span_records_caller_request_id() {
    let spans = RequestSpans::default();
    let _guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(spans.clone()));

    let response = router()
        .await
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "caller-7")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "caller-7");
    assert_eq!(spans.ids(), vec!["caller-7".to_string()]);
}
