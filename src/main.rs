use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use keystone_auth::config::LogFormat;
use keystone_auth::{AppState, Config, KeystoneClient, build_router, metrics};

#[tokio::main]
async fn main() -> ExitCode {
    // .env may carry RUST_LOG / LOG_FORMAT, so load it before logging starts
    let _ = dotenvy::dotenv();
    init_tracing(Config::log_format_from_env().unwrap_or(LogFormat::Pretty));

    info!(
        "Starting Keystone Auth Middleware v{}",
        env!("CARGO_PKG_VERSION")
    );

    match run().await {
        Ok(()) => ExitCode::from(exitcode::OK as u8),
        Err(exit_code) => ExitCode::from(exit_code as u8),
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

/// Run the application, returning an exit code on error.
async fn run() -> Result<(), exitcode::ExitCode> {
    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {e}");
        exitcode::CONFIG
    })?;
    info!(
        host = %config.host,
        port = %config.port,
        keystone_url = %config.keystone_url,
        timeout_ms = config.keystone_timeout.as_millis() as u64,
        cache_enabled = config.token_cache_enabled,
        "Configuration loaded"
    );

    if let Some(addr) = config.metrics_addr() {
        metrics::try_init_metrics(addr);
    }

    let keystone = KeystoneClient::new(config.keystone_options()).map_err(|e| {
        error!("Failed to create Keystone client: {e}");
        exitcode::SOFTWARE
    })?;
    info!(url = %keystone.tokens_url(), "Validating tokens against Keystone");

    let state = AppState::new(Arc::new(keystone), config.clone());
    let app = build_router(state.clone());

    let addr: SocketAddr = config.server_addr().parse().map_err(|e| {
        error!("Invalid server address: {e}");
        exitcode::CONFIG
    })?;
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to {addr}: {e}");
        exitcode::UNAVAILABLE
    })?;

    info!("Server listening on http://{addr}");
    info!("  GET  /health  - Health check");
    info!("  GET  /whoami  - Identity asserted for the X-Auth-Token caller");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!("Server error: {e}");
            exitcode::SOFTWARE
        })?;

    info!("HTTP server stopped, shutting down background tasks...");
    state.shutdown().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM.
///
/// If a handler cannot be installed that source is logged and ignored, so
/// the server keeps running and can still be stopped by the other one.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
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
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => warn!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
