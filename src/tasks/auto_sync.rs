//! Auto-Sync Task
//!
//! Background task that periodically runs a full sync pass.

use std::sync::Weak;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::sync::SyncOrchestrator;

/// Spawns a background task that calls `perform_sync` every `interval`.
///
/// The first pass runs one interval after spawning. A tick that finds a pass
/// already running is skipped, and ticks missed while a slow pass ran are
/// dropped rather than replayed.
///
/// The task only holds a weak handle, upgraded for the length of each pass,
/// so it never keeps the orchestrator alive.
///
/// # Arguments
/// * `orchestrator` - Orchestrator to drive. The task exits at the first tick
///   after the last strong reference is gone.
/// * `interval` - Time between passes
/// * `shutdown` - The task exits once this becomes `true` or its sender is
///   dropped. A pass in flight is finished first.
///
/// # Example
/// ```ignore
/// let (shutdown_tx, shutdown_rx) = watch::channel(false);
/// let handle = spawn_auto_sync_task(
///     Arc::downgrade(&orchestrator),
///     Duration::from_secs(300),
///     shutdown_rx,
/// );
/// // Later, during shutdown:
/// shutdown_tx.send(true)?;
/// handle.await?;
/// ```
pub fn spawn_auto_sync_task(
    orchestrator: Weak<SyncOrchestrator>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting auto-sync task with interval of {:?}", interval);

        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let Some(orchestrator) = orchestrator.upgrade() else {
                        debug!("Auto-sync orchestrator dropped");
                        break;
                    };
                    if orchestrator.is_syncing() {
                        debug!("Auto-sync tick skipped: sync already in progress");
                        continue;
                    }

                    let result = orchestrator.perform_sync().await;
                    if result.success {
                        debug!("Auto-sync: {}", result.message);
                    } else if result.was_skipped() {
                        debug!("Auto-sync tick skipped: sync already in progress");
                    } else {
                        warn!("Auto-sync: {}", result.message);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Auto-sync task stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheEngine, CacheSettings};
    use crate::store::{MemoryStore, PersistentStore};
    use crate::sync::SyncSettings;
    use std::sync::Arc;
    use tokio::time::sleep;

    async fn orchestrator() -> Arc<SyncOrchestrator> {
        let store: Arc<dyn PersistentStore> = Arc::new(MemoryStore::new());
        let cache = Arc::new(CacheEngine::new(store.clone(), CacheSettings::default()));
        cache.initialize().await.unwrap();
        Arc::new(SyncOrchestrator::new(cache, store, SyncSettings::default()))
    }

    #[tokio::test]
    async fn test_auto_sync_task_runs_periodically() {
        let orchestrator = orchestrator().await;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = spawn_auto_sync_task(
            Arc::downgrade(&orchestrator),
            Duration::from_millis(30),
            shutdown_rx,
        );
        sleep(Duration::from_millis(110)).await;

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        let stats = orchestrator.get_statistics().await;
        assert!(stats.successful_syncs >= 2, "got {}", stats.successful_syncs);
    }

    #[tokio::test]
    async fn test_auto_sync_task_waits_one_interval() {
        let orchestrator = orchestrator().await;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = spawn_auto_sync_task(
            Arc::downgrade(&orchestrator),
            Duration::from_secs(3600),
            shutdown_rx,
        );
        sleep(Duration::from_millis(50)).await;
        assert_eq!(orchestrator.get_statistics().await.successful_syncs, 0);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_auto_sync_task_stops_when_sender_dropped() {
        let orchestrator = orchestrator().await;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = spawn_auto_sync_task(
            Arc::downgrade(&orchestrator),
            Duration::from_secs(3600),
            shutdown_rx,
        );
        drop(shutdown_tx);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("task should stop once the shutdown sender is gone")
            .unwrap();
    }

    #[tokio::test]
    async fn test_auto_sync_task_stops_when_orchestrator_dropped() {
        let orchestrator = orchestrator().await;
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = spawn_auto_sync_task(
            Arc::downgrade(&orchestrator),
            Duration::from_millis(20),
            shutdown_rx,
        );
        drop(orchestrator);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("task should stop once the orchestrator is gone")
            .unwrap();
    }
}
