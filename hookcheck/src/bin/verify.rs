//! Hookcheck offline verifier.
//!
//! Checks a payload and signature against a secret without running the server,
//! using the same verification code the server uses. The payload is read as
//! raw bytes: pass the body exactly as it arrived, not a re-serialized copy.
//!
//! Without `--signature` it prints the signature the payload should carry.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hookcheck::{
    sign, DigestAlgorithm, HmacVerifier, SignatureEncoding, SignatureScheme, SignatureVerifier,
    SigningSecret,
};

#[derive(Debug, Parser)]
#[command(name = "hookcheck-verify", version, about = "Verify a webhook signature offline")]
struct Args {
    /// Signing secret shared with the sender
    #[arg(long)]
    secret: String,

    /// Payload given literally on the command line
    #[arg(long, conflicts_with = "payload_file")]
    payload: Option<String>,

    /// File holding the exact payload bytes (stdin is read if neither is given)
    #[arg(long)]
    payload_file: Option<PathBuf>,

    /// Signature as received in the request header
    #[arg(long)]
    signature: Option<String>,

    /// Digest algorithm: sha256, sha384 or sha512
    #[arg(long, default_value = "sha256")]
    algorithm: DigestAlgorithm,

    /// Signature encoding: hex, hex-any-case or base64
    #[arg(long, default_value = "hex")]
    encoding: SignatureEncoding,

    /// Literal prefix in front of the signature, e.g. "sha256="
    #[arg(long)]
    prefix: Option<String>,
}

fn main() -> Result<ExitCode> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();

    let secret = SigningSecret::from_text(&args.secret).context("Secret must not be empty")?;
    let payload = read_payload(&args)?;

    let mut scheme = SignatureScheme::new(args.algorithm, args.encoding);
    if let Some(prefix) = &args.prefix {
        scheme = scheme.with_prefix(prefix.as_str());
    }

    let computed = sign(&scheme, &secret, &payload).context("Failed to compute signature")?;

    println!("Payload bytes:       {}", payload.len());
    println!("Scheme:              hmac-{} / {}", scheme.algorithm, scheme.encoding);
    println!("Computed signature:  {computed}");

    let Some(claimed) = &args.signature else {
        return Ok(ExitCode::SUCCESS);
    };

    println!("Received signature:  {claimed}");

    let outcome = HmacVerifier.verify(&scheme, std::slice::from_ref(&secret), &payload, claimed);
    if outcome.is_valid() {
        println!("Signature is VALID");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("Signature is INVALID ({})", outcome.kind());
        Ok(ExitCode::FAILURE)
    }
}

/// Payload bytes exactly as supplied. Nothing is trimmed or re-encoded.
fn read_payload(args: &Args) -> Result<Vec<u8>> {
    if let Some(payload) = &args.payload {
        return Ok(payload.as_bytes().to_vec());
    }

    if let Some(path) = &args.payload_file {
        return fs::read(path).with_context(|| format!("Failed to read {}", path.display()));
    }

    let mut buffer = Vec::new();
    io::stdin()
        .read_to_end(&mut buffer)
        .context("Failed to read payload from stdin")?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["hookcheck-verify", "--secret", "s3cr3t"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_payload_file_is_read_verbatim() {
        let contents: &[u8] = b"{\"a\":1}\r\n";
        let path = std::env::temp_dir().join(format!("hookcheck-verify-{}.json", std::process::id()));
        fs::File::create(&path).unwrap().write_all(contents).unwrap();

        let payload = read_payload(&args(&["--payload-file", path.to_str().unwrap()])).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(payload, contents);
    }

    #[test]
    fn test_literal_payload_keeps_whitespace() {
        let payload = read_payload(&args(&["--payload", "  {\"a\":1}\n"])).unwrap();
        assert_eq!(payload, b"  {\"a\":1}\n");
    }

    #[test]
    fn test_trailing_newline_changes_signature() {
        let secret = SigningSecret::from_text("s3cr3t").unwrap();
        let scheme = SignatureScheme::default();
        let signature = sign(&scheme, &secret, b"{\"a\":1}").unwrap();

        let outcome = HmacVerifier.verify(
            &scheme,
            std::slice::from_ref(&secret),
            b"{\"a\":1}\r\n",
            &signature,
        );
        assert!(!outcome.is_valid());
    }

    #[test]
    fn test_payload_and_file_conflict() {
        let argv = [
            "hookcheck-verify",
            "--secret",
            "s3cr3t",
            "--payload",
            "x",
            "--payload-file",
            "x.json",
        ];
        assert!(Args::try_parse_from(argv).is_err());
    }
}
