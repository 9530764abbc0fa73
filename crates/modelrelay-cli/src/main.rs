//! modelrelay binary: configure, bind, serve until Ctrl-C.

use anyhow::Context;
use clap::Parser;
use modelrelay_cli::Args;
use modelrelay_core::RelaySettings;
use modelrelay_proxy::{RelayState, serve};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before clap reads the environment
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    let settings = RelaySettings::from_raw(&args.into_raw()).context("invalid configuration")?;

    info!(
        upstream = %settings.upstream,
        fallback_models = ?settings.fallback_models,
        default_timeout = ?settings.timeouts.default_timeout,
        fallback_default_timeout = ?settings.timeouts.fallback_default_timeout,
        no_retry = ?settings.no_retry.iter().collect::<Vec<_>>(),
        "Starting modelrelay"
    );

    let addr = settings.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let state = RelayState::new(settings).context("failed to build upstream client")?;

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown requested"),
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C; shutting down"),
        }
        shutdown.cancel();
    });

    serve(listener, state, cancel).await
}
