//! Signing secret resolution.
//!
//! Secrets are looked up by source name (the single-tenant default source, a
//! URL segment, or a configured header). The table is read-only; runtime
//! rotation swaps in a new table atomically.

pub mod store;
pub mod types;

pub use store::{load_table, SecretStore};
pub use types::{SecretTable, SigningSecret, SourceEntry};
