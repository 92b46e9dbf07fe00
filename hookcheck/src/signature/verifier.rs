//! HMAC signature verification over raw request bytes.
//!
//! Senders compute `HMAC(secret, body)` over the exact bytes they put on the
//! wire. The verifier recomputes the MAC over the bytes it received, unchanged,
//! and compares in constant time. It never looks inside the body.

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384, Sha512};

use super::scheme::{DigestAlgorithm, SignatureScheme};
use super::VerificationOutcome;
use crate::secrets::SigningSecret;

type HmacSha256 = Hmac<Sha256>;
type HmacSha384 = Hmac<Sha384>;
type HmacSha512 = Hmac<Sha512>;

/// Decides whether a claimed signature was produced over `body` by a holder of
/// one of `secrets`.
///
/// Implementations must be pure: the same inputs always give the same outcome.
pub trait SignatureVerifier: Send + Sync {
    fn verify(
        &self,
        scheme: &SignatureScheme,
        secrets: &[SigningSecret],
        body: &[u8],
        claimed: &str,
    ) -> VerificationOutcome;
}

/// The production verifier. Shared by the server and the offline tool.
#[derive(Debug, Clone, Copy, Default)]
pub struct HmacVerifier;

impl SignatureVerifier for HmacVerifier {
    /// Verify `claimed` against every active secret.
    ///
    /// # Arguments
    ///
    /// * `scheme` - Digest, encoding and prefix the sender uses
    /// * `secrets` - Active secrets for the source; more than one during rotation
    /// * `body` - Request body exactly as received
    /// * `claimed` - Header value as received
    ///
    /// # Returns
    ///
    /// `Valid` if any secret matches, `MalformedSignature` if `claimed` does not
    /// decode, `Invalid` otherwise.
    fn verify(
        &self,
        scheme: &SignatureScheme,
        secrets: &[SigningSecret],
        body: &[u8],
        claimed: &str,
    ) -> VerificationOutcome {
        let Some(claimed) = scheme.decode_claimed(claimed) else {
            return VerificationOutcome::MalformedSignature;
        };

        // Every candidate is checked; no early exit on the first match.
        let mut matched = false;
        for secret in secrets {
            matched |= mac_matches(scheme.algorithm, secret.expose(), body, &claimed);
        }

        if matched {
            VerificationOutcome::Valid
        } else {
            VerificationOutcome::Invalid
        }
    }
}

/// Compute the raw keyed hash of `body`.
pub fn keyed_hash(algorithm: DigestAlgorithm, secret: &[u8], body: &[u8]) -> Option<Vec<u8>> {
    match algorithm {
        DigestAlgorithm::Sha256 => compute::<HmacSha256>(secret, body),
        DigestAlgorithm::Sha384 => compute::<HmacSha384>(secret, body),
        DigestAlgorithm::Sha512 => compute::<HmacSha512>(secret, body),
    }
}

/// Produce the header value a sender using `scheme` would attach to `body`.
pub fn sign(scheme: &SignatureScheme, secret: &SigningSecret, body: &[u8]) -> Option<String> {
    keyed_hash(scheme.algorithm, secret.expose(), body).map(|mac| scheme.render(&mac))
}

fn mac_matches(algorithm: DigestAlgorithm, secret: &[u8], body: &[u8], claimed: &[u8]) -> bool {
    match algorithm {
        DigestAlgorithm::Sha256 => check::<HmacSha256>(secret, body, claimed),
        DigestAlgorithm::Sha384 => check::<HmacSha384>(secret, body, claimed),
        DigestAlgorithm::Sha512 => check::<HmacSha512>(secret, body, claimed),
    }
}

fn compute<M: Mac + KeyInit>(secret: &[u8], body: &[u8]) -> Option<Vec<u8>> {
    let mut mac = <M as Mac>::new_from_slice(secret).ok()?;
    mac.update(body);
    Some(mac.finalize().into_bytes().to_vec())
}

/// `verify_slice` checks the length once, then compares in constant time.
fn check<M: Mac + KeyInit>(secret: &[u8], body: &[u8], claimed: &[u8]) -> bool {
    match <M as Mac>::new_from_slice(secret) {
        Ok(mut mac) => {
            mac.update(body);
            mac.verify_slice(claimed).is_ok()
        }
        Err(_) => false,
    }
}
