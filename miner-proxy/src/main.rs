use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use tokio::signal::unix::{self, SignalKind};
use tokio_util::sync::CancellationToken;

use miner_proxy::api::{self, AppState};
use miner_proxy::config::Config;
use miner_proxy::tracing::{self, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    let _guard = tracing::init(&config.log_dir)?;
    config.validate()?;

    let addr = SocketAddr::new(config.listen, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    info!(%addr, "Started.");

    let running = CancellationToken::new();
    let shutdown = running.clone();
    let mut sigint = unix::signal(SignalKind::interrupt())?;
    let mut sigterm = unix::signal(SignalKind::terminate())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => {},
            _ = sigterm.recv() => {},
        }
        trace!("Shutting down.");
        shutdown.cancel();
    });

    axum::serve(listener, api::routes(AppState::new(config)))
        .with_graceful_shutdown(running.cancelled_owned())
        .await?;

    info!("Exiting.");
    Ok(())
}
