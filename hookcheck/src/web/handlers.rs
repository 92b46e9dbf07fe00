//! Webhook endpoint handlers.
//!
//! The ingest handlers only:
//! 1. Read the body into one immutable buffer (bounded by the body limit)
//! 2. Verify the signature over those exact bytes
//! 3. Respond, and hand accepted events to the sink in the background
//!
//! Every verification failure gets the same 401 response. The reason is only
//! visible in the server logs.

use std::sync::Arc;

use axum::{
    extract::{rejection::BytesRejection, Path, State},
    http::{header::ALLOW, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::forward::{EventSink, VerifiedEvent};
use crate::secrets::{SecretStore, SourceEntry};
use crate::signature::{HmacVerifier, SignatureVerifier, VerificationOutcome};
use crate::web::request::RawRequest;
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub secrets: SecretStore,
    pub sink: Arc<dyn EventSink>,
}

impl AppState {
    pub fn new(config: Config, secrets: SecretStore, sink: Arc<dyn EventSink>) -> Self {
        Self {
            config: Arc::new(config),
            secrets,
            sink,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Webhook Ingestion
// =============================================================================

/// Webhook response. Deliberately says nothing about why a request failed.
#[derive(Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
}

fn reply(code: StatusCode, status: &'static str) -> Response {
    (code, Json(WebhookResponse { status })).into_response()
}

/// Decide the outcome for one request.
///
/// A missing signature short-circuits before the verifier is consulted, and so
/// does a source with no configured secrets.
pub fn evaluate<V>(
    verifier: &V,
    entry: Option<&SourceEntry>,
    claimed: Option<&str>,
    body: &[u8],
) -> VerificationOutcome
where
    V: SignatureVerifier + ?Sized,
{
    let Some(claimed) = claimed else {
        return VerificationOutcome::MissingSignature;
    };
    let Some(entry) = entry else {
        return VerificationOutcome::UnknownSecret;
    };
    verifier.verify(&entry.scheme, &entry.secrets, body, claimed)
}

/// Single-tenant endpoint.
///
/// The source is the configured default, or the value of `SOURCE_HEADER` when
/// that header is configured and present.
pub async fn ingest_default(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let source = state
        .config
        .source_header
        .as_ref()
        .and_then(|name| headers.get(name))
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| state.config.default_source.clone());

    ingest(state, source, method, uri, headers, body).await
}

/// Multi-tenant endpoint: the source is the last path segment.
pub async fn ingest_source(
    State(state): State<AppState>,
    Path(source): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    ingest(state, source, method, uri, headers, body).await
}

async fn ingest(
    state: AppState,
    source: String,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            warn!(
                path = %uri.path(),
                source = %source,
                max_body_bytes = state.config.max_body_bytes,
                "webhook_body_too_large"
            );
            return reply(StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large");
        }
        Err(rejection) => {
            // Client went away or sent a broken body; nothing gets verified.
            warn!(
                path = %uri.path(),
                source = %source,
                error = %rejection.body_text(),
                "webhook_body_read_failed"
            );
            return reply(StatusCode::BAD_REQUEST, "bad_request");
        }
    };

    let request = RawRequest::new(method, headers, body);

    info!(
        method = %request.method(),
        path = %uri.path(),
        source = %source,
        body_length = request.body().len(),
        "webhook_received"
    );

    if state.config.log_payloads {
        info!(
            source = %source,
            payload = %String::from_utf8_lossy(request.body()),
            "webhook_payload"
        );
    }

    let table = state.secrets.snapshot();
    let claimed = request.header_str(&state.config.signature_header);
    let outcome = evaluate(&HmacVerifier, table.get(&source), claimed, request.body());

    match outcome {
        VerificationOutcome::Valid => {
            info!(source = %source, outcome = outcome.kind(), "webhook_verified");

            let (_, headers, body) = request.into_parts();
            let event = VerifiedEvent::new(source, headers, body);
            let sink = Arc::clone(&state.sink);
            tokio::spawn(async move {
                if let Err(e) = sink.deliver(event).await {
                    error!(error = %e, "webhook_forward_failed");
                }
            });

            reply(StatusCode::OK, "accepted")
        }
        VerificationOutcome::Invalid
        | VerificationOutcome::MalformedSignature
        | VerificationOutcome::MissingSignature
        | VerificationOutcome::UnknownSecret => {
            warn!(
                path = %uri.path(),
                source = %source,
                outcome = outcome.kind(),
                "webhook_rejected"
            );
            reply(StatusCode::UNAUTHORIZED, "unauthorized")
        }
    }
}

/// Any method other than the configured one. The body is never read.
pub async fn method_not_allowed(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    warn!(method = %method, path = %uri.path(), "webhook_method_not_allowed");
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(ALLOW, state.config.method.to_string())],
        Json(WebhookResponse {
            status: "method_not_allowed",
        }),
    )
        .into_response()
}
