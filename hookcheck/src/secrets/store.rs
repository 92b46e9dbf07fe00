//! Loading the secrets table and swapping it at runtime.
//!
//! Readers take an `Arc` snapshot of the current table and keep using it for the
//! whole request. A reload builds a complete new table first and only then
//! replaces the pointer, so a reader never sees a half-updated table.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Deserialize;
use tracing::{info, warn};

use super::types::{SecretTable, SigningSecret, SourceEntry};
use crate::error::{ConfigError, SecretStoreError};
use crate::signature::{DigestAlgorithm, SignatureEncoding, SignatureScheme};
use crate::Config;

/// One source in the secrets file. Scheme fields default to the configured scheme.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileEntry {
    secrets: Vec<String>,
    #[serde(default)]
    algorithm: Option<DigestAlgorithm>,
    #[serde(default)]
    encoding: Option<SignatureEncoding>,
    #[serde(default)]
    prefix: Option<String>,
}

/// Build a table from the environment settings and, if configured, the secrets file.
///
/// Entries from the file take precedence over `WEBHOOK_SECRET` for the same source.
pub fn load_table(config: &Config) -> Result<SecretTable, SecretStoreError> {
    let mut entries = HashMap::new();

    if !config.webhook_secrets.is_empty() {
        entries.insert(
            config.default_source.clone(),
            SourceEntry::new(config.default_scheme.clone(), config.webhook_secrets.clone()),
        );
    }

    if let Some(path) = &config.secrets_file {
        let raw = fs::read_to_string(path).map_err(|source| SecretStoreError::Read {
            path: path.clone(),
            source,
        })?;

        for (source, entry) in parse_secrets_file(path, &raw, &config.default_scheme)? {
            if entries.contains_key(&source) {
                warn!(source = %source, "secrets_file_overrides_env_source");
            }
            entries.insert(source, entry);
        }
    }

    Ok(SecretTable::new(entries))
}

fn parse_secrets_file(
    path: &Path,
    raw: &str,
    default_scheme: &SignatureScheme,
) -> Result<HashMap<String, SourceEntry>, SecretStoreError> {
    let parsed: HashMap<String, FileEntry> =
        serde_json::from_str(raw).map_err(|source| SecretStoreError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    parsed
        .into_iter()
        .map(|(source, entry)| -> Result<_, SecretStoreError> {
            let entry = build_entry(&source, entry, default_scheme)?;
            Ok((source, entry))
        })
        .collect()
}

fn build_entry(
    source: &str,
    entry: FileEntry,
    default_scheme: &SignatureScheme,
) -> Result<SourceEntry, ConfigError> {
    if entry.secrets.is_empty() {
        return Err(ConfigError::NoSecrets(source.to_string()));
    }

    let secrets = entry
        .secrets
        .iter()
        .map(|s| SigningSecret::from_text(s).ok_or_else(|| ConfigError::EmptySecret(source.to_string())))
        .collect::<Result<Vec<_>, _>>()?;

    let mut scheme = SignatureScheme::new(
        entry.algorithm.unwrap_or(default_scheme.algorithm),
        entry.encoding.unwrap_or(default_scheme.encoding),
    );
    scheme.prefix = match entry.prefix {
        Some(prefix) => Some(prefix).filter(|p| !p.is_empty()),
        None => default_scheme.prefix.clone(),
    };

    Ok(SourceEntry::new(scheme, secrets))
}

/// Shared handle to the current secrets table.
#[derive(Clone, Default)]
pub struct SecretStore {
    current: Arc<RwLock<Arc<SecretTable>>>,
}

impl SecretStore {
    pub fn new(table: SecretTable) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(table))),
        }
    }

    /// Load the initial table from configuration.
    pub fn load(config: &Config) -> Result<Self, SecretStoreError> {
        Ok(Self::new(load_table(config)?))
    }

    /// The table in effect right now. Later swaps do not affect the snapshot.
    pub fn snapshot(&self) -> Arc<SecretTable> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the whole table at once.
    pub fn replace(&self, table: SecretTable) {
        let table = Arc::new(table);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = table;
    }

    /// Rebuild the table from configuration and swap it in.
    ///
    /// On failure the previous table stays active.
    pub fn reload(&self, config: &Config) -> Result<usize, SecretStoreError> {
        let table = load_table(config)?;
        let sources = table.len();
        self.replace(table);
        info!(sources = sources, "secrets_table_swapped");
        Ok(sources)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;
    use std::thread;

    use super::*;

    fn config_with_secret(secret: &str) -> Config {
        Config {
            webhook_secrets: vec![SigningSecret::from_text(secret).unwrap()],
            ..Config::default()
        }
    }

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "hookcheck-{}-{}.json",
            name,
            std::process::id()
        ));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_env_secret_becomes_default_source() {
        let table = load_table(&config_with_secret("s3cr3t")).unwrap();
        let entry = table.get("default").unwrap();
        assert_eq!(entry.secrets[0].expose(), b"s3cr3t");
        assert_eq!(entry.scheme, SignatureScheme::default());
    }

    #[test]
    fn test_no_secrets_gives_empty_table() {
        let table = load_table(&Config::default()).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_file_entries_inherit_default_scheme() {
        let path = Path::new("secrets.json");
        let raw = r#"{
            "logto": { "secrets": ["new", "old"] },
            "billing": { "secrets": ["b"], "algorithm": "sha512", "encoding": "base64", "prefix": "v1=" }
        }"#;
        let default_scheme = SignatureScheme::default().with_prefix("sha256=");

        let entries = parse_secrets_file(path, raw, &default_scheme).unwrap();

        let logto = &entries["logto"];
        assert_eq!(logto.secrets.len(), 2);
        assert_eq!(logto.scheme, default_scheme);

        let billing = &entries["billing"];
        assert_eq!(billing.scheme.algorithm, DigestAlgorithm::Sha512);
        assert_eq!(billing.scheme.encoding, SignatureEncoding::Base64);
        assert_eq!(billing.scheme.prefix.as_deref(), Some("v1="));
    }

    #[test]
    fn test_file_rejects_empty_and_missing_secrets() {
        let path = Path::new("secrets.json");
        let scheme = SignatureScheme::default();

        let empty = parse_secrets_file(path, r#"{"a": {"secrets": [""]}}"#, &scheme);
        assert!(matches!(
            empty,
            Err(SecretStoreError::Config(ConfigError::EmptySecret(_)))
        ));

        let none = parse_secrets_file(path, r#"{"a": {"secrets": []}}"#, &scheme);
        assert!(matches!(
            none,
            Err(SecretStoreError::Config(ConfigError::NoSecrets(_)))
        ));

        let garbage = parse_secrets_file(path, "not json", &scheme);
        assert!(matches!(garbage, Err(SecretStoreError::Parse { .. })));
    }

    #[test]
    fn test_file_overrides_env_source() {
        let path = temp_file("override", r#"{"default": {"secrets": ["from-file"]}}"#);
        let config = Config {
            secrets_file: Some(path.clone()),
            ..config_with_secret("from-env")
        };

        let table = load_table(&config).unwrap();
        assert_eq!(table.get("default").unwrap().secrets[0].expose(), b"from-file");

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let config = Config {
            secrets_file: Some(PathBuf::from("/nonexistent/hookcheck/secrets.json")),
            ..Config::default()
        };
        assert!(matches!(
            load_table(&config),
            Err(SecretStoreError::Read { .. })
        ));
    }

    #[test]
    fn test_snapshot_survives_replace() {
        let store = SecretStore::load(&config_with_secret("first")).unwrap();
        let before = store.snapshot();

        store.reload(&config_with_secret("second")).unwrap();

        assert_eq!(before.get("default").unwrap().secrets[0].expose(), b"first");
        assert_eq!(
            store.snapshot().get("default").unwrap().secrets[0].expose(),
            b"second"
        );
    }

    #[test]
    fn test_failed_reload_keeps_previous_table() {
        let store = SecretStore::load(&config_with_secret("first")).unwrap();
        let broken = Config {
            secrets_file: Some(PathBuf::from("/nonexistent/hookcheck/secrets.json")),
            ..Config::default()
        };

        assert!(store.reload(&broken).is_err());
        assert_eq!(
            store.snapshot().get("default").unwrap().secrets[0].expose(),
            b"first"
        );
    }

    #[test]
    fn test_readers_always_see_complete_tables() {
        let table_of = |n: usize| {
            let entries = (0..n)
                .map(|i| {
                    (
                        format!("source-{i}"),
                        SourceEntry::new(
                            SignatureScheme::default(),
                            vec![SigningSecret::from_text(&format!("generation-{n}")).unwrap()],
                        ),
                    )
                })
                .collect();
            SecretTable::new(entries)
        };

        let store = SecretStore::new(table_of(4));
        let writer = {
            let store = store.clone();
            thread::spawn(move || {
                for round in 0..200 {
                    store.replace(table_of(if round % 2 == 0 { 8 } else { 4 }));
                }
            })
        };

        for _ in 0..2_000 {
            let table = store.snapshot();
            let n = table.len();
            assert!(n == 4 || n == 8);
            let expected = format!("generation-{n}");
            for source in table.sources() {
                assert_eq!(table.get(source).unwrap().secrets[0].expose(), expected.as_bytes());
            }
        }

        writer.join().unwrap();
    }
}
