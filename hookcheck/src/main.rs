//! Hookcheck web server.
//!
//! Receives webhooks, verifies their HMAC signatures over the raw body bytes,
//! and hands accepted events to the configured sink.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hookcheck::{router, AppState, Config, EventSink, LogSink, QueuePublisher, SecretStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    let config = Config::from_env().context("Invalid configuration")?;
    let secrets = SecretStore::load(&config).context("Failed to load signing secrets")?;

    let table = secrets.snapshot();
    info!(
        port = config.port,
        method = %config.method,
        webhook_path = %config.webhook_path,
        signature_header = %config.signature_header,
        max_body_bytes = config.max_body_bytes,
        sources = ?table.sources(),
        forwarding_to_queue = config.amqp_url.is_some(),
        log_payloads = config.log_payloads,
        "config_loaded"
    );
    if table.is_empty() {
        warn!("no_signing_secrets_configured");
    }

    let publisher = config.amqp_url.clone().map(QueuePublisher::new);
    let sink: Arc<dyn EventSink> = match &publisher {
        Some(publisher) => Arc::new(publisher.clone()),
        None => Arc::new(LogSink),
    };

    spawn_secret_reloader(secrets.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = router(AppState::new(config, secrets, sink));

    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(publisher) = publisher {
        publisher.close().await;
    }

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Reload secrets on SIGHUP. A failed reload keeps the current table.
#[cfg(unix)]
fn spawn_secret_reloader(store: SecretStore) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(hangup) => hangup,
            Err(e) => {
                warn!(error = %e, "secret_reload_signal_unavailable");
                return;
            }
        };

        while hangup.recv().await.is_some() {
            info!("secret_reload_requested");
            let result = Config::from_env()
                .map_err(anyhow::Error::from)
                .and_then(|config| store.reload(&config).map_err(anyhow::Error::from));
            if let Err(e) = result {
                error!(error = %format!("{e:#}"), "secret_reload_failed");
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_secret_reloader(_store: SecretStore) {}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "ctrl_c_handler_unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "sigterm_handler_unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
