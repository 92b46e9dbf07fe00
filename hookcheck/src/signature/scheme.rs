//! Signing scheme: which digest the sender uses and how it transmits the result.
//!
//! A scheme is fixed per source. It must match the sender exactly; nothing here
//! tries to guess or normalize beyond what the configured encoding documents.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;

use crate::error::ConfigError;

/// Digest used inside the HMAC construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum DigestAlgorithm {
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha384 => "sha384",
            DigestAlgorithm::Sha512 => "sha512",
        }
    }

    /// Length of the raw MAC output in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha384 => 48,
            DigestAlgorithm::Sha512 => 64,
        }
    }
}

impl FromStr for DigestAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(DigestAlgorithm::Sha256),
            "sha384" | "sha-384" => Ok(DigestAlgorithm::Sha384),
            "sha512" | "sha-512" => Ok(DigestAlgorithm::Sha512),
            _ => Err(ConfigError::UnknownAlgorithm(s.to_string())),
        }
    }
}

impl TryFrom<String> for DigestAlgorithm {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text encoding of the signature in the request header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum SignatureEncoding {
    /// Lowercase hexadecimal. Uppercase digits fail to decode.
    #[default]
    Hex,
    /// Hexadecimal in either case. Must be opted into explicitly.
    HexAnyCase,
    /// Standard base64 alphabet with padding.
    Base64,
}

impl SignatureEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureEncoding::Hex => "hex",
            SignatureEncoding::HexAnyCase => "hex-any-case",
            SignatureEncoding::Base64 => "base64",
        }
    }

    /// Decode a transmitted signature into raw MAC bytes.
    ///
    /// Returns `None` for anything that is not a well-formed, non-empty value in
    /// this encoding. Callers must treat `None` as a failed verification.
    pub fn decode(&self, text: &str) -> Option<Vec<u8>> {
        if text.is_empty() {
            return None;
        }

        match self {
            SignatureEncoding::Hex => {
                if text.bytes().any(|b| b.is_ascii_uppercase()) {
                    return None;
                }
                hex::decode(text).ok()
            }
            SignatureEncoding::HexAnyCase => hex::decode(text).ok(),
            SignatureEncoding::Base64 => STANDARD.decode(text).ok(),
        }
    }

    /// Encode raw MAC bytes the way a sender using this encoding would.
    pub fn encode(&self, bytes: &[u8]) -> String {
        match self {
            SignatureEncoding::Hex | SignatureEncoding::HexAnyCase => hex::encode(bytes),
            SignatureEncoding::Base64 => STANDARD.encode(bytes),
        }
    }
}

impl FromStr for SignatureEncoding {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hex" => Ok(SignatureEncoding::Hex),
            "hex-any-case" | "hex_any_case" => Ok(SignatureEncoding::HexAnyCase),
            "base64" => Ok(SignatureEncoding::Base64),
            _ => Err(ConfigError::UnknownEncoding(s.to_string())),
        }
    }
}

impl TryFrom<String> for SignatureEncoding {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for SignatureEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to turn `(secret, bytes)` into the header value a sender emits.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignatureScheme {
    pub algorithm: DigestAlgorithm,
    pub encoding: SignatureEncoding,
    /// Literal prefix in front of the encoded digest, e.g. `sha256=`.
    pub prefix: Option<String>,
}

impl SignatureScheme {
    pub fn new(algorithm: DigestAlgorithm, encoding: SignatureEncoding) -> Self {
        Self {
            algorithm,
            encoding,
            prefix: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = if prefix.is_empty() { None } else { Some(prefix) };
        self
    }

    /// Strip the configured prefix. A missing prefix is a malformed signature.
    pub fn strip_prefix<'a>(&self, claimed: &'a str) -> Option<&'a str> {
        match &self.prefix {
            Some(prefix) => claimed.strip_prefix(prefix.as_str()),
            None => Some(claimed),
        }
    }

    /// Full decode path from header text to raw MAC bytes.
    pub fn decode_claimed(&self, claimed: &str) -> Option<Vec<u8>> {
        self.strip_prefix(claimed)
            .and_then(|encoded| self.encoding.decode(encoded))
    }

    /// Render raw MAC bytes as a header value.
    pub fn render(&self, mac: &[u8]) -> String {
        format!(
            "{}{}",
            self.prefix.as_deref().unwrap_or(""),
            self.encoding.encode(mac)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_parse() {
        assert_eq!("sha256".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha256);
        assert_eq!("SHA-512".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha512);
        assert!("md5".parse::<DigestAlgorithm>().is_err());
    }

    #[test]
    fn test_encoding_parse() {
        assert_eq!("hex".parse::<SignatureEncoding>().unwrap(), SignatureEncoding::Hex);
        assert_eq!(
            "hex-any-case".parse::<SignatureEncoding>().unwrap(),
            SignatureEncoding::HexAnyCase
        );
        assert_eq!("Base64".parse::<SignatureEncoding>().unwrap(), SignatureEncoding::Base64);
        assert!("base32".parse::<SignatureEncoding>().is_err());
    }

    #[test]
    fn test_hex_rejects_uppercase() {
        assert_eq!(SignatureEncoding::Hex.decode("ab01"), Some(vec![0xab, 0x01]));
        assert_eq!(SignatureEncoding::Hex.decode("AB01"), None);
        assert_eq!(SignatureEncoding::HexAnyCase.decode("AB01"), Some(vec![0xab, 0x01]));
    }

    #[test]
    fn test_malformed_values_do_not_decode() {
        assert_eq!(SignatureEncoding::Hex.decode(""), None);
        assert_eq!(SignatureEncoding::Hex.decode("abc"), None);
        assert_eq!(SignatureEncoding::Hex.decode("zz"), None);
        assert_eq!(SignatureEncoding::Base64.decode("not*base64"), None);
        assert_eq!(SignatureEncoding::Base64.decode(""), None);
    }

    #[test]
    fn test_prefix_required_when_configured() {
        let scheme = SignatureScheme::default().with_prefix("sha256=");
        assert_eq!(scheme.decode_claimed("sha256=ff"), Some(vec![0xff]));
        assert_eq!(scheme.decode_claimed("ff"), None);
        assert_eq!(scheme.render(&[0xff]), "sha256=ff");
    }

    #[test]
    fn test_empty_prefix_is_no_prefix() {
        let scheme = SignatureScheme::default().with_prefix("");
        assert_eq!(scheme.prefix, None);
    }

    #[test]
    fn test_scheme_deserializes_from_names() {
        let algorithm: DigestAlgorithm = serde_json::from_str("\"sha384\"").unwrap();
        assert_eq!(algorithm, DigestAlgorithm::Sha384);
        let encoding: Result<SignatureEncoding, _> = serde_json::from_str("\"rot13\"");
        assert!(encoding.is_err());
    }
}
