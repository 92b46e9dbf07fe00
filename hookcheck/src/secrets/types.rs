//! Signing secrets and the per-source lookup table.

use std::collections::HashMap;
use std::fmt;

use crate::signature::SignatureScheme;

/// Shared secret bytes. Never logged: `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    /// Wrap secret bytes. Empty secrets are refused.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Option<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            None
        } else {
            Some(Self(bytes))
        }
    }

    /// Secrets configured as text are used as their UTF-8 bytes.
    pub fn from_text(text: &str) -> Option<Self> {
        Self::new(text.as_bytes())
    }

    pub fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(<redacted>)")
    }
}

/// Verification settings for one event source.
#[derive(Debug, Clone)]
pub struct SourceEntry {
    pub scheme: SignatureScheme,
    /// Active secrets; any of them may have signed a request.
    pub secrets: Vec<SigningSecret>,
}

impl SourceEntry {
    pub fn new(scheme: SignatureScheme, secrets: Vec<SigningSecret>) -> Self {
        Self { scheme, secrets }
    }
}

/// Immutable map from lookup key to source settings.
///
/// Tables are never mutated once built; rotation swaps in a whole new table.
#[derive(Debug, Clone, Default)]
pub struct SecretTable {
    entries: HashMap<String, SourceEntry>,
}

impl SecretTable {
    pub fn new(entries: HashMap<String, SourceEntry>) -> Self {
        Self { entries }
    }

    pub fn get(&self, source: &str) -> Option<&SourceEntry> {
        self.entries.get(source)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Source names, sorted, for startup logging.
    pub fn sources(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
