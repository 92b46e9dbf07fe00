//! Web server module for receiving signed webhooks.
//!
//! Routes:
//! - `GET /health`: liveness
//! - `<WEBHOOK_PATH>`: single-tenant endpoint (default source or `SOURCE_HEADER`)
//! - `/webhooks/:source`: multi-tenant endpoint, source taken from the URL
//!
//! Webhook routes accept only the configured method. The body limit is applied
//! before buffering, so oversized requests are refused without hashing.

pub mod handlers;
pub mod request;

use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, on, MethodFilter},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{
    evaluate, health, ingest_default, ingest_source, method_not_allowed, AppState,
    HealthResponse, WebhookResponse,
};
pub use request::RawRequest;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let filter = method_filter(&state.config.method);
    let webhook_path = state.config.webhook_path.clone();
    let max_body_bytes = state.config.max_body_bytes;

    Router::new()
        .route("/health", get(health))
        .route(
            &webhook_path,
            on(filter, ingest_default).fallback(method_not_allowed),
        )
        .route(
            "/webhooks/:source",
            on(filter, ingest_source).fallback(method_not_allowed),
        )
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Configuration only admits body-bearing methods.
fn method_filter(method: &Method) -> MethodFilter {
    if method == Method::PUT {
        MethodFilter::PUT
    } else if method == Method::PATCH {
        MethodFilter::PATCH
    } else {
        MethodFilter::POST
    }
}
