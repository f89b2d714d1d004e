//! sharecoin-server — ShareCoin cloud-mining simulation backend.
//!
//! Serves the session control API under `/api`, runs the discovery tick
//! that draws pseudo-blocks for active subscribers, and periodically
//! batch-mints pending blocks on the ShareCoin contract.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

mod chain;
mod config;
mod routes;

use chain::EvmGateway;
use config::Config;
use sharecoin_sim::history::BlockTimeHistory;
use sharecoin_sim::{ChainGateway, DiscoveryScheduler, MinerService, MinerState, SettlementScheduler};

/// Shared application state passed to every Axum handler.
#[derive(Clone)]
pub struct AppState {
    pub service: MinerService,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("Failed to load server configuration")?;

    info!(
        rpc = %config.rpc_url,
        contract = %config.contract_address,
        bind = %config.bind_addr,
        discovery_secs = config.discovery_interval.as_secs(),
        settlement_secs = config.settlement_interval.as_secs(),
        "Starting sharecoin-server"
    );

    let gateway: Arc<dyn ChainGateway> =
        Arc::new(EvmGateway::connect(&config).context("Failed to set up chain gateway")?);

    // Pseudo-block numbers continue from what the contract has recorded.
    let confirmed = gateway
        .confirmed_block_count()
        .await
        .context("Failed to read confirmed block count from the contract")?;
    info!(confirmed, "Block counter seeded from chain");

    let state = MinerState::with_history(
        confirmed,
        BlockTimeHistory::with_capacity(config.history_capacity),
    )
    .into_shared();

    let discovery = tokio::spawn(
        DiscoveryScheduler::new(state.clone(), gateway.clone()).run(config.discovery_interval),
    );
    let settlement = tokio::spawn(
        SettlementScheduler::new(state.clone(), gateway.clone()).run(config.settlement_interval),
    );

    let app = routes::router(AppState {
        service: MinerService::new(state, gateway),
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!("Listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    discovery.abort();
    settlement.abort();
    info!("sharecoin-server shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl+C, shutting down..."),
        Err(e) => warn!(error = %e, "Failed to listen for Ctrl+C; shutting down"),
    }
}
