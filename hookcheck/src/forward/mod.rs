//! Downstream forwarding of verified webhooks.
//!
//! Sinks run after the response has been decided. A sink failure is logged and
//! never changes whether the request was accepted.

pub mod publisher;
pub mod types;

use anyhow::Result;
use futures::future::BoxFuture;
use tracing::info;

pub use publisher::QueuePublisher;
pub use types::{VerifiedEvent, VERIFIED_QUEUE};

/// Receiver of verified events.
pub trait EventSink: Send + Sync {
    fn deliver(&self, event: VerifiedEvent) -> BoxFuture<'static, Result<()>>;
}

/// Sink used when no broker is configured: records the event and drops it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn deliver(&self, event: VerifiedEvent) -> BoxFuture<'static, Result<()>> {
        Box::pin(async move {
            info!(
                source = %event.source,
                event = event.event_name().unwrap_or("unknown"),
                body_length = event.body.len(),
                parsed = event.parsed.is_some(),
                "webhook_event_delivered"
            );
            Ok(())
        })
    }
}
