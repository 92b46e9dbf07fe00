//! Webhook signature verification.
//!
//! The sender signs the raw request body with a shared secret. Verification
//! recomputes the keyed hash over the received bytes and compares the result
//! with the claimed signature in constant time.
//!
//! Verification failures are ordinary results, not errors: every call returns a
//! [`VerificationOutcome`].

pub mod scheme;
pub mod verifier;

pub use scheme::{DigestAlgorithm, SignatureEncoding, SignatureScheme};
pub use verifier::{keyed_hash, sign, HmacVerifier, SignatureVerifier};

/// Result of checking one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The signature matches one of the active secrets.
    Valid,
    /// The signature decoded but does not match.
    Invalid,
    /// The signature header is present but not valid in the configured encoding.
    MalformedSignature,
    /// The request carried no signature header.
    MissingSignature,
    /// No secrets are configured for the requested source.
    UnknownSecret,
}

impl VerificationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerificationOutcome::Valid)
    }

    /// Stable name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            VerificationOutcome::Valid => "valid",
            VerificationOutcome::Invalid => "invalid",
            VerificationOutcome::MalformedSignature => "malformed_signature",
            VerificationOutcome::MissingSignature => "missing_signature",
            VerificationOutcome::UnknownSecret => "unknown_secret",
        }
    }
}
