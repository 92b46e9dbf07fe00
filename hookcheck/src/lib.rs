//! Hookcheck - signed webhook receiver.
//!
//! This library provides the modules shared by the two binaries:
//! - `hookcheck`: web server that verifies and accepts webhooks
//! - `hookcheck-verify`: offline tool for debugging signature mismatches
//!
//! ## Architecture
//!
//! ```text
//! Network → Web Server → raw body bytes → Verifier → accept/reject → Sink (log or RabbitMQ)
//! ```
//!
//! The signature is always checked over the body bytes exactly as received.
//! Parsing happens only after a request is accepted.

pub mod config;
pub mod error;
pub mod forward;
pub mod secrets;
pub mod signature;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use error::{ConfigError, SecretStoreError};
pub use forward::{EventSink, LogSink, QueuePublisher, VerifiedEvent};
pub use secrets::{SecretStore, SecretTable, SigningSecret, SourceEntry};
pub use signature::{
    sign, DigestAlgorithm, HmacVerifier, SignatureEncoding, SignatureScheme, SignatureVerifier,
    VerificationOutcome,
};
pub use web::{router, AppState, RawRequest};
