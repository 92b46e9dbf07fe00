//! Configuration module for environment variable parsing.
//!
//! All settings come from environment variables. Numeric values that fail to
//! parse fall back to their defaults with a warning; values that affect how
//! signatures are checked (method, headers, scheme) are hard errors instead.

use std::env;
use std::path::PathBuf;

use axum::http::{HeaderName, Method};
use tracing::warn;

use crate::error::ConfigError;
use crate::secrets::SigningSecret;
use crate::signature::{DigestAlgorithm, SignatureEncoding, SignatureScheme};

/// Default body limit: 1 MiB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// The only HTTP method accepted on webhook routes
    pub method: Method,

    /// Route for the single-tenant webhook endpoint
    pub webhook_path: String,

    /// Header carrying the claimed signature
    pub signature_header: HeaderName,

    /// Optional header naming the source on the single-tenant route
    pub source_header: Option<HeaderName>,

    /// Bodies larger than this are rejected before buffering completes
    pub max_body_bytes: usize,

    /// Scheme used by sources that do not override it
    pub default_scheme: SignatureScheme,

    /// Lookup key for the single-tenant source
    pub default_source: String,

    /// Active secrets for the default source (several during rotation)
    pub webhook_secrets: Vec<SigningSecret>,

    /// Optional JSON file with per-source secrets and schemes
    pub secrets_file: Option<PathBuf>,

    /// RabbitMQ URL; verified events are published there when set
    pub amqp_url: Option<String>,

    /// Log full payloads. Debugging only.
    pub log_payloads: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 3132,
            method: Method::POST,
            webhook_path: "/webhook".to_string(),
            signature_header: HeaderName::from_static("x-signature"),
            source_header: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            default_scheme: SignatureScheme::default(),
            default_source: "default".to_string(),
            webhook_secrets: Vec::new(),
            secrets_file: None,
            amqp_url: None,
            log_payloads: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let method = match var("WEBHOOK_METHOD") {
            Some(raw) => parse_method(&raw)?,
            None => defaults.method,
        };

        let webhook_path = match var("WEBHOOK_PATH") {
            Some(path) => parse_webhook_path(path)?,
            None => defaults.webhook_path,
        };

        let signature_header = match var("SIGNATURE_HEADER") {
            Some(raw) => parse_header_name("SIGNATURE_HEADER", &raw)?,
            None => defaults.signature_header,
        };

        let source_header = var("SOURCE_HEADER")
            .map(|raw| parse_header_name("SOURCE_HEADER", &raw))
            .transpose()?;

        let algorithm = match var("SIGNATURE_ALGORITHM") {
            Some(raw) => raw.parse::<DigestAlgorithm>()?,
            None => DigestAlgorithm::default(),
        };

        let encoding = match var("SIGNATURE_ENCODING") {
            Some(raw) => raw.parse::<SignatureEncoding>()?,
            None => SignatureEncoding::default(),
        };

        let mut default_scheme = SignatureScheme::new(algorithm, encoding);
        if let Some(prefix) = var("SIGNATURE_PREFIX") {
            default_scheme = default_scheme.with_prefix(prefix);
        }

        let default_source = var("DEFAULT_SOURCE")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.default_source);

        let webhook_secrets = parse_csv(var("WEBHOOK_SECRET"))
            .unwrap_or_default()
            .iter()
            .map(|s| {
                SigningSecret::from_text(s)
                    .ok_or_else(|| ConfigError::EmptySecret(default_source.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Config {
            port: parse_number(&var, "PORT", defaults.port),
            method,
            webhook_path,
            signature_header,
            source_header,
            max_body_bytes: parse_number(&var, "MAX_BODY_BYTES", defaults.max_body_bytes),
            default_scheme,
            default_source,
            webhook_secrets,
            secrets_file: var("SECRETS_FILE")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            amqp_url: var("AMQP_URL").filter(|s| !s.trim().is_empty()),
            log_payloads: parse_bool(&var, "LOG_PAYLOADS", defaults.log_payloads),
        })
    }
}

/// Webhooks carry a body, so only body-bearing methods are accepted.
fn parse_method(raw: &str) -> Result<Method, ConfigError> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "PATCH" => Ok(Method::PATCH),
        _ => Err(ConfigError::UnsupportedMethod(raw.to_string())),
    }
}

/// The single-tenant route must be a literal path that does not collide with
/// `/health` or the `/webhooks/:source` route.
fn parse_webhook_path(path: String) -> Result<String, ConfigError> {
    let literal = path.starts_with('/')
        && path
            .split('/')
            .all(|segment| !segment.starts_with(':') && !segment.starts_with('*'));
    let reserved = path == "/health" || path.starts_with("/webhooks/");

    if literal && !reserved {
        Ok(path)
    } else {
        Err(ConfigError::InvalidPath(path))
    }
}

fn parse_header_name(var: &'static str, raw: &str) -> Result<HeaderName, ConfigError> {
    HeaderName::from_bytes(raw.trim().as_bytes()).map_err(|_| ConfigError::InvalidHeaderName {
        var,
        value: raw.to_string(),
    })
}

/// Parse a numeric variable, warning and falling back to `default` on bad input.
fn parse_number<F, T>(var: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match var(name) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(env_var = name, value = %raw, "Invalid number, using default");
                default
            }
        },
        None => default,
    }
}

fn parse_bool<F>(var: &F, name: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match var(name).map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        Some(v) => {
            warn!(env_var = name, value = %v, "Invalid boolean, using default");
            default
        }
        None => default,
    }
}

/// Parse a comma-separated list of strings.
fn parse_csv(raw: Option<String>) -> Option<Vec<String>> {
    raw.map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}
