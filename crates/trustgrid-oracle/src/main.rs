//! TrustGrid oracle daemon - node registry, heartbeat monitor, consensus engine

use std::time::Duration;
use trustgrid_common::TrustGridConfig;
use trustgrid_oracle::OracleNetwork;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(version = trustgrid_common::VERSION, "Starting TrustGrid oracle...");

    let config = TrustGridConfig::load()?;
    let settings = config.oracle.clone();

    let network = OracleNetwork::new(config.oracle);
    let prometheus = prometheus::Registry::new();
    network.metrics.register(&prometheus)?;

    let sweep = Duration::from_secs(settings.heartbeat_sweep_interval_secs.max(1));
    let monitor = network.registry.spawn_heartbeat_monitor(sweep);
    let prune = Duration::from_secs(settings.freshness_window_secs.max(1) as u64);
    let pruner = network.engine.spawn_stale_pruner(prune);

    tracing::info!(
        threshold = settings.consensus_threshold,
        max_nodes = settings.max_nodes,
        min_stake = %settings.min_stake,
        heartbeat_timeout_secs = settings.heartbeat_timeout_secs,
        "TrustGrid oracle started successfully"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");
    monitor.abort();
    pruner.abort();

    let stats = network.registry.network_stats();
    tracing::info!(
        nodes = stats.total_nodes,
        active = stats.active_nodes,
        total_stake = %stats.total_stake,
        pending_keys = network.engine.tracked_keys(),
        "Final network state"
    );

    Ok(())
}
