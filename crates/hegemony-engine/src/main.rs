//! Coordinator binary for Hegemony.
//!
//! Wires configuration, persistence, the coordinator, the broadcast hub,
//! and the control API together, then runs until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `hegemony-config.yaml` (plus env overrides)
//! 2. Initialize structured logging (tracing)
//! 3. Open the state store: `PostgreSQL` when `store.database_url` is set,
//!    in-memory otherwise; connect the optional Dragonfly hot cache
//! 4. Build the broadcast hub and bootstrap the coordinator
//! 5. Bind the control API, start the reaper and the shard loops
//! 6. On `Ctrl-C`: drain every shard, flush, stop the API and the reaper

mod error;

use std::path::Path;
use std::sync::Arc;

use hegemony_core::config::LoggingConfig;
use hegemony_core::{Coordinator, CoordinatorConfig, LoadGauge};
use hegemony_db::{
    DragonflyPool, MemoryStore, PostgresPool, PostgresStore, StateStore, StoreConfig,
};
use hegemony_hub::{AppState, BroadcastHub, spawn_server};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

const CONFIG_PATH: &str = "hegemony-config.yaml";

#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let config = CoordinatorConfig::load(Path::new(CONFIG_PATH))?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!(
        shards = config.scheduler.shards,
        cycle_budget_ms = config.scheduler.cycle_budget_ms,
        task_deadline_ms = config.scheduler.task_deadline_ms,
        max_queue_depth = config.scheduler.max_queue_depth,
        port = config.server.port,
        "hegemony-engine starting"
    );

    // 3. Persistence.
    let (store, pool) = open_store(&config.store).await?;
    let hot = open_hot_cache(&config.store).await;

    // 4. Hub and coordinator.
    let gauge = Arc::new(LoadGauge::new(config.hub.high_connections));
    let hub = Arc::new(BroadcastHub::new(config.hub.clone(), Arc::clone(&gauge)));
    let server_config = config.server.clone();
    let coordinator = Coordinator::bootstrap(config, store, hot, gauge, hub.clone()).await?;

    // 5. Control API, reaper, shard loops.
    let (stop_tx, stop_rx) = watch::channel(false);
    let state = Arc::new(AppState::new(Arc::clone(&coordinator), Arc::clone(&hub)));
    let server = spawn_server(&server_config, state, stop_rx.clone()).await?;
    let reaper = hub.spawn_reaper(stop_rx);
    let tasks = coordinator.spawn()?;
    info!(
        factions = coordinator.factions().len(),
        shards = coordinator.shard_count(),
        "coordinator running"
    );

    // 6. Wait for Ctrl-C, then drain.
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| EngineError::Signal {
            message: format!("{e}"),
        })?;
    info!("shutdown requested, draining shards");

    tasks.shutdown().await?;
    stop_tx.send_replace(true);
    if let Err(e) = server.await {
        warn!(error = %e, "control API task failed");
    }
    if let Err(e) = reaper.await {
        warn!(error = %e, "reaper task failed");
    }
    if let Some(pool) = pool {
        pool.close().await;
    }

    info!(
        abandoned_tasks = coordinator.abandoned_tasks(),
        dropped_frames = hub.dropped(),
        "hegemony-engine shutdown complete"
    );
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over `logging.level`.
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    if config.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// `PostgreSQL` when a URL is configured, the in-memory store otherwise.
async fn open_store(
    config: &StoreConfig,
) -> Result<(Arc<dyn StateStore>, Option<PostgresPool>), EngineError> {
    let Some(url) = config.database_url.as_deref() else {
        info!("no database_url configured, using the in-memory store");
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        return Ok((store, None));
    };
    let pool = PostgresPool::connect_url(url).await?;
    pool.run_migrations().await?;
    let store: Arc<dyn StateStore> = Arc::new(PostgresStore::new(&pool));
    Ok((store, Some(pool)))
}

/// The hot cache is optional; a failed connection is logged and skipped.
async fn open_hot_cache(config: &StoreConfig) -> Option<DragonflyPool> {
    let url = config.dragonfly_url.as_deref()?;
    match DragonflyPool::connect(url).await {
        Ok(pool) => Some(pool),
        Err(e) => {
            warn!(error = %e, "Dragonfly unavailable, running without the hot cache");
            None
        }
    }
}
