//! Sync Orchestrator Module
//!
//! Reconciles the fixed set of [`SyncCategory`] data sets from the persistent
//! store into the cache, broadcasting progress and tracking outcomes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::cache::{CacheEngine, CacheLevel, CacheOptions, OptimizeReport};
use crate::config::Config;
use crate::error::{CacheError, Result, SyncError};
use crate::store::PersistentStore;
use crate::structures::PriorityQueue;
use crate::sync::category::{record_count, SYNC_CACHE_CATEGORY};
use crate::sync::{SyncCategory, SyncEvent, SyncFailure, SyncResult, SyncStats};
use crate::tasks::spawn_auto_sync_task;

/// Store key holding the completion time of the last successful pass.
pub const LAST_SYNC_KEY: &str = "meta:last_sync";

// == Settings ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    /// TTL applied to synced cache entries
    pub cache_ttl: Duration,
    /// Events buffered per subscriber before it starts lagging
    pub event_capacity: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(3600),
            event_capacity: 64,
        }
    }
}

impl From<&Config> for SyncSettings {
    fn from(config: &Config) -> Self {
        Self {
            cache_ttl: config.sync_cache_ttl(),
            event_capacity: config.sync_event_capacity,
        }
    }
}

/// Arguments to [`SyncOrchestrator::initialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub enable_auto_sync: bool,
    pub interval: Duration,
}

impl SyncOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            enable_auto_sync: config.sync_enabled,
            interval: config.sync_interval(),
        }
    }
}

struct AutoSync {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct Lifecycle {
    initialized: bool,
    disposed: bool,
    auto_sync: Option<AutoSync>,
}

/// Holds the syncing flag for the duration of a pass.
struct SyncGuard<'a>(&'a AtomicBool);

impl<'a> SyncGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SyncGuard(flag))
    }
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// == Sync Orchestrator ==
/// Runs sync passes, at most one at a time.
///
/// A call made while a pass is running returns at once with a skipped
/// [`SyncResult`]; it is never queued.
pub struct SyncOrchestrator {
    cache: Arc<CacheEngine>,
    store: Arc<dyn PersistentStore>,
    settings: SyncSettings,
    events: RwLock<Option<broadcast::Sender<SyncEvent>>>,
    syncing: AtomicBool,
    stats: Mutex<SyncStats>,
    lifecycle: Mutex<Lifecycle>,
}

impl SyncOrchestrator {
    // == Constructor ==
    pub fn new(
        cache: Arc<CacheEngine>,
        store: Arc<dyn PersistentStore>,
        settings: SyncSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(settings.event_capacity.max(1));
        Self {
            cache,
            store,
            settings,
            events: RwLock::new(Some(events)),
            syncing: AtomicBool::new(false),
            stats: Mutex::new(SyncStats::default()),
            lifecycle: Mutex::new(Lifecycle::default()),
        }
    }

    pub fn from_config(
        config: &Config,
        cache: Arc<CacheEngine>,
        store: Arc<dyn PersistentStore>,
    ) -> Self {
        Self::new(cache, store, SyncSettings::from(config))
    }

    // == Initialize ==
    /// Initializes the cache engine and, if requested, starts periodic sync.
    ///
    /// Only the first call has any effect. Fails after [`dispose`](Self::dispose).
    pub async fn initialize(self: &Arc<Self>, options: SyncOptions) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.disposed {
            return Err(CacheError::Internal(
                "sync orchestrator already disposed".to_string(),
            ));
        }
        if lifecycle.initialized {
            debug!("Sync orchestrator already initialized");
            return Ok(());
        }

        self.cache.initialize().await?;

        if options.enable_auto_sync {
            let (shutdown, shutdown_rx) = watch::channel(false);
            let task = spawn_auto_sync_task(Arc::downgrade(self), options.interval, shutdown_rx);
            lifecycle.auto_sync = Some(AutoSync { shutdown, task });
        }
        lifecycle.initialized = true;

        info!(
            "Sync orchestrator initialized (auto-sync: {}, interval: {:?})",
            options.enable_auto_sync, options.interval
        );
        Ok(())
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    // == Perform Sync ==
    /// Syncs every category in priority order.
    ///
    /// Best-effort: a failing category is recorded and the pass moves on.
    pub async fn perform_sync(&self) -> SyncResult {
        self.run_pass(&SyncCategory::ALL).await
    }

    /// Syncs a single category, with the same contract as a full pass.
    pub async fn sync_category(&self, category: SyncCategory) -> SyncResult {
        self.run_pass(&[category]).await
    }

    async fn run_pass(&self, categories: &[SyncCategory]) -> SyncResult {
        let Some(_guard) = SyncGuard::acquire(&self.syncing) else {
            debug!("Sync requested while another pass is running, skipping");
            return SyncResult::already_running();
        };

        self.emit(SyncEvent::started(categories.len())).await;

        let mut queue = PriorityQueue::min_ordered();
        queue.extend(categories.iter().copied());

        let mut synced = 0;
        let mut failures = Vec::new();
        while let Some(category) = queue.remove_first() {
            match self.sync_one(category).await {
                Ok(records) => {
                    synced += 1;
                    debug!("Synced {} ({} records)", category, records);
                    self.emit(SyncEvent::item_synced(category, records, synced)).await;
                }
                Err(err) => {
                    warn!("Sync of {} failed: {}", category, err);
                    failures.push(SyncFailure {
                        category,
                        error: err.to_string(),
                    });
                }
            }
        }

        let result = SyncResult::finished(synced, failures);
        let finished_at = Utc::now();

        if result.success {
            if let Err(err) = self.record_last_sync(finished_at).await {
                warn!("Could not persist last sync time: {}", err);
            }
            self.stats.lock().await.record_success(finished_at);
            info!("{}", result.message);
            self.emit(SyncEvent::completed(synced)).await;
        } else {
            self.stats.lock().await.record_failure();
            warn!("Sync pass failed: {}", result.message);
            self.emit(SyncEvent::failed(result.message.clone(), synced)).await;
        }

        result
    }

    /// Copies one category from the store into the cache.
    ///
    /// # Returns
    /// Number of records in the synced payload. A category with no stored
    /// value syncs as empty and drops any cached copy.
    async fn sync_one(&self, category: SyncCategory) -> std::result::Result<usize, SyncError> {
        let Some(bytes) = self.store.get(&category.store_key()).await? else {
            self.cache.remove_cached_data(&category.cache_key()).await?;
            return Ok(0);
        };

        let payload: Value = serde_json::from_slice(&bytes)?;
        let options = CacheOptions::default()
            .category(SYNC_CACHE_CATEGORY)
            .ttl(self.settings.cache_ttl)
            .level(CacheLevel::Memory);
        self.cache
            .cache_data(&category.cache_key(), &payload, options)
            .await?;

        Ok(record_count(&payload))
    }

    async fn record_last_sync(&self, at: DateTime<Utc>) -> std::result::Result<(), SyncError> {
        let bytes = serde_json::to_vec(&at)?;
        self.store.put(LAST_SYNC_KEY, bytes).await?;
        Ok(())
    }

    /// Completion time of the last successful pass as persisted in the store,
    /// which survives restarts unlike [`SyncStats::last_sync_time`].
    pub async fn persisted_last_sync(&self) -> std::result::Result<Option<DateTime<Utc>>, SyncError> {
        match self.store.get(LAST_SYNC_KEY).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    // == Optimize Storage ==
    /// Optimizes the cache, then compacts the persistent store.
    pub async fn optimize_storage(&self) -> Result<OptimizeReport> {
        let report = self.cache.optimize_cache().await?;
        self.store.compact().await?;
        info!("Storage optimized");
        Ok(report)
    }

    // == Events ==
    async fn emit(&self, event: SyncEvent) {
        if let Some(sender) = self.events.read().await.as_ref() {
            // No subscribers is fine
            let _ = sender.send(event);
        }
    }

    /// Subscribes to sync events published from now on.
    ///
    /// After [`dispose`](Self::dispose) the returned receiver is already
    /// closed.
    pub async fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        match self.events.read().await.as_ref() {
            Some(sender) => sender.subscribe(),
            None => broadcast::channel(1).1,
        }
    }

    /// Sync events as a `Stream`. A subscriber that falls behind skips the
    /// events it missed.
    pub async fn event_stream(&self) -> impl Stream<Item = SyncEvent> + Unpin + Send + 'static {
        BroadcastStream::new(self.subscribe().await).filter_map(|event| match event {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(missed)) => {
                warn!("Sync event subscriber lagged, skipped {} events", missed);
                None
            }
        })
    }

    // == Statistics ==
    pub async fn get_statistics(&self) -> SyncStats {
        let mut stats = self.stats.lock().await.clone();
        stats.is_currently_syncing = self.is_syncing();
        stats
    }

    // == Dispose ==
    /// Stops periodic sync and closes the event channel.
    ///
    /// A pass already running is allowed to finish first. Repeated calls are
    /// no-ops.
    pub async fn dispose(&self) {
        let auto_sync = {
            let mut lifecycle = self.lifecycle.lock().await;
            if lifecycle.disposed {
                return;
            }
            lifecycle.disposed = true;
            lifecycle.auto_sync.take()
        };

        if let Some(AutoSync { shutdown, task }) = auto_sync {
            let _ = shutdown.send(true);
            if let Err(err) = task.await {
                warn!("Auto-sync task ended abnormally: {}", err);
            }
        }

        self.events.write().await.take();
        info!("Sync orchestrator disposed");
    }
}
