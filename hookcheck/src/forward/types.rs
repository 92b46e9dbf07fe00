//! Verified event handed to downstream sinks.

use axum::http::{header::CONTENT_TYPE, HeaderMap};
use bytes::Bytes;

/// Queue name for verified webhook bodies.
pub const VERIFIED_QUEUE: &str = "verified_webhooks";

/// A request whose signature checked out.
///
/// `body` is the exact byte buffer that was verified. `parsed` is decoded from
/// those same bytes after verification and is never used to rebuild them.
#[derive(Debug, Clone)]
pub struct VerifiedEvent {
    pub source: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub parsed: Option<serde_json::Value>,
}

impl VerifiedEvent {
    /// Build an event, decoding the body as JSON when it is JSON.
    pub fn new(source: String, headers: HeaderMap, body: Bytes) -> Self {
        let parsed = serde_json::from_slice(&body).ok();
        Self {
            source,
            headers,
            body,
            parsed,
        }
    }

    /// The `event` field of a JSON body, e.g. `User.Created`.
    pub fn event_name(&self) -> Option<&str> {
        self.parsed.as_ref()?.get("event")?.as_str()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }
}
