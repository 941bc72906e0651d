//! StreamPay server: loads the token/network registry and serves the
//! intent authorization API.

mod config;

use std::sync::Arc;

use streampay_http_api::{ApiState, build_router};
use streampay_runtime::Registry;

use crate::config::ServerConfig;

fn setup_log() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};
    if tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .try_init()
        .is_err()
    {}
}

fn load_registry(config: &ServerConfig) -> anyhow::Result<Registry> {
    let registry = match &config.registry_path {
        Some(path) => Registry::load(path)?,
        None => {
            tracing::info!("STREAMPAY_REGISTRY_PATH not set, using built-in local registry");
            Registry::local_dev()
        }
    };
    Ok(match &config.network {
        Some(network) => registry.with_active(network)?,
        None => registry,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_log();

    // ── 1. Configuration + registry ──────────────────────────────────────
    let config = ServerConfig::from_env()?;
    let registry = Arc::new(load_registry(&config)?);
    let active = registry.active();
    tracing::info!(
        network = %active.name,
        chain_id = active.chain_id,
        tokens = active.tokens.len(),
        replay_protection = config.api.replay_protection,
        "registry ready"
    );

    // ── 2. Services + router ─────────────────────────────────────────────
    let state = Arc::new(ApiState::new(registry, &config.api)?);
    let router = build_router(state);

    // ── 3. Serve ─────────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port)).await?;
    tracing::info!("StreamPay HTTP server listening on port {}", config.http_port);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("StreamPay server shutting down...");
        })
        .await?;

    Ok(())
}
