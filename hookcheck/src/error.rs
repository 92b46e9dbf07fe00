//! Operational error types.
//!
//! Signature verification never produces these: a rejected webhook is a
//! [`VerificationOutcome`](crate::signature::VerificationOutcome), not an error.
//! Everything here is a configuration or infrastructure fault.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Invalid configuration value.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unsupported webhook method: {0} (expected POST, PUT or PATCH)")]
    UnsupportedMethod(String),

    #[error("invalid header name in {var}: {value:?}")]
    InvalidHeaderName { var: &'static str, value: String },

    #[error("webhook path must be a literal path starting with '/' outside /health and /webhooks/: {0:?}")]
    InvalidPath(String),

    #[error("unknown digest algorithm: {0:?}")]
    UnknownAlgorithm(String),

    #[error("unknown signature encoding: {0:?}")]
    UnknownEncoding(String),

    #[error("empty signing secret configured for source {0:?}")]
    EmptySecret(String),

    #[error("source {0:?} has no signing secrets")]
    NoSecrets(String),
}

/// Failure to load the secrets table.
#[derive(Debug, Error)]
pub enum SecretStoreError {
    #[error("failed to read secrets file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse secrets file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
