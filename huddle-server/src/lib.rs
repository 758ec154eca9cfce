mod config;
mod relay;
mod signaling;

pub use config::*;
pub use relay::*;
pub use signaling::*;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tracing::info;

pub fn router(relay: Relay) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(|| async { "ok" }))
        .with_state(relay)
}

/// Binds `config.listen` and serves the relay until the listener fails.
pub async fn serve(config: RelayConfig) -> Result<()> {
    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen))?;

    serve_on(listener, Relay::new(config.ice_servers)).await
}

pub async fn serve_on(listener: TcpListener, relay: Relay) -> Result<()> {
    let addr = listener.local_addr()?;
    info!("Relay listening on ws://{}/ws", addr);

    axum::serve(listener, router(relay))
        .await
        .context("Relay server stopped")
}
