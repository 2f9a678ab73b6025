//! Local Cache daemon
//!
//! Runs the cache engine over a JSON file store and keeps it reconciled with
//! periodic sync passes until interrupted.

use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use local_cache::sync::SyncEventKind;
use local_cache::{
    CacheEngine, Config, JsonFileStore, PersistentStore, SyncOptions, SyncOrchestrator,
};

/// Main entry point for the local cache daemon.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the file store and initialize the cache engine
/// 4. Start the sync orchestrator (and its auto-sync task)
/// 5. Log sync events until a shutdown signal arrives
/// 6. Dispose the orchestrator and report final statistics
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" for this crate, can be overridden with RUST_LOG
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "local_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting local cache daemon");

    let config = Config::from_env();
    info!(
        "Configuration loaded: memory_capacity={}, soft_limit={}, sync_enabled={}, sync_interval={}s, store={}",
        config.memory_capacity,
        config.memory_soft_limit,
        config.sync_enabled,
        config.sync_interval,
        config.store_path.display()
    );

    let store: Arc<dyn PersistentStore> = Arc::new(JsonFileStore::new(config.store_path.clone()));
    let cache = Arc::new(CacheEngine::from_config(&config, store.clone()));
    cache
        .initialize()
        .await
        .with_context(|| format!("failed to open cache at {}", config.store_path.display()))?;

    let orchestrator = Arc::new(SyncOrchestrator::from_config(&config, cache.clone(), store));
    orchestrator
        .initialize(SyncOptions::from_config(&config))
        .await
        .context("failed to start sync orchestrator")?;

    let mut events = orchestrator.subscribe().await;
    let event_logger = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event.kind {
                SyncEventKind::Failed => warn!("Sync event: {}", event.message),
                _ => info!("Sync event: {}", event.message),
            }
        }
    });

    let initial = orchestrator.perform_sync().await;
    info!("Initial sync: {}", initial.message);

    shutdown_signal().await;

    orchestrator.dispose().await;
    // The logger ends once the event channel closes
    if let Err(err) = event_logger.await {
        warn!("Event logger ended abnormally: {}", err);
    }

    let optimized = orchestrator
        .optimize_storage()
        .await
        .context("final storage optimization failed")?;
    info!(
        "Final optimization removed {} expired and {} corrupt persisted entries",
        optimized.expired_disk, optimized.corrupt_disk
    );

    let cache_stats = cache.get_statistics().await.context("failed to read cache statistics")?;
    let sync_stats = orchestrator.get_statistics().await;
    info!(
        "Cache: {} hits, {} misses ({:.1}% hit rate), {} in memory, {} on disk",
        cache_stats.hits,
        cache_stats.misses,
        cache_stats.hit_rate() * 100.0,
        cache_stats.memory_entries,
        cache_stats.disk_entries
    );
    info!(
        "Sync: {} succeeded, {} failed ({:.1}% success rate)",
        sync_stats.successful_syncs,
        sync_stats.failed_syncs,
        sync_stats.success_rate() * 100.0
    );

    info!("Local cache daemon shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
