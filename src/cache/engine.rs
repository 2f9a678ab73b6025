//! Cache Engine Module
//!
//! Two-tier cache combining an LRU-bounded memory tier with a disk tier
//! persisted through a [`PersistentStore`].

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard, OnceCell};
use tracing::{debug, info, warn};

use crate::cache::disk::DiskTier;
use crate::cache::preload::{PreloadFailure, PreloadReport, ValueLoader};
use crate::cache::{current_timestamp_ms, CacheEntry, CacheOptions, CacheStats};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::store::PersistentStore;
use crate::structures::matcher::{fuzzy_match, similarity};
use crate::structures::{BloomFilter, LruCache, PriorityQueue, Trie};

/// Disk reads attempted by one lookup before it gives up on promotion.
const READ_ATTEMPTS: usize = 3;

// == Cache Settings ==
/// Sizing parameters for a [`CacheEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// Hard capacity of the memory tier
    pub memory_capacity: usize,
    /// Size `optimize_cache` trims the memory tier down to
    pub memory_soft_limit: usize,
    /// Expected persisted keys, sizes the disk-key bloom filter
    pub expected_disk_keys: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            memory_capacity: 500,
            memory_soft_limit: 400,
            expected_disk_keys: 1000,
        }
    }
}

impl From<&Config> for CacheSettings {
    fn from(config: &Config) -> Self {
        Self {
            memory_capacity: config.memory_capacity,
            memory_soft_limit: config.memory_soft_limit,
            expected_disk_keys: config.expected_disk_keys,
        }
    }
}

// == Optimize Report ==
/// What a single `optimize_cache` pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OptimizeReport {
    pub expired_memory: usize,
    pub expired_disk: usize,
    /// Disk records that could not be decoded
    pub corrupt_disk: usize,
    /// Live memory entries evicted to get under the soft limit
    pub evicted_memory: usize,
}

/// Mutable engine state. Everything here is guarded by one lock, which is
/// never held across store I/O.
struct EngineState {
    memory: LruCache<String, CacheEntry>,
    stats: CacheStats,
    /// Every live key known to either tier
    index: Trie<()>,
    /// Keys ever written to the disk tier since the last full clear
    disk_keys: BloomFilter,
}

impl EngineState {
    /// Puts `entry` into the memory tier, handling LRU overflow.
    fn admit(&mut self, entry: CacheEntry) {
        if let Some((evicted_key, evicted)) = self.memory.put(entry.key.clone(), entry) {
            self.stats.record_evictions(1);
            if !evicted.level.includes_disk() {
                self.index.remove(&evicted_key);
            }
            debug!("Memory tier full, evicted {:?}", evicted_key);
        }
    }

    fn forget(&mut self, key: &str) {
        self.memory.remove(key);
        self.index.remove(key);
    }
}

/// Exclusive right to mutate the disk tier.
///
/// Dropping it advances the write generation before the lock is released,
/// so a disk read that overlapped the write can tell it is stale.
struct WriteGuard<'a> {
    _lock: MutexGuard<'a, ()>,
    generation: &'a AtomicU64,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.generation.fetch_add(1, AtomicOrdering::AcqRel);
    }
}

enum MemoryLookup {
    Hit(CacheEntry),
    Expired(CacheEntry),
    /// `generation` is the write generation observed at the miss
    Miss { maybe_on_disk: bool, generation: u64 },
}

// == Cache Engine ==
/// Multi-level cache with TTL, categories and hit/miss accounting.
///
/// Construct one per process and share it behind an `Arc`. Call
/// [`initialize`](Self::initialize) before anything else.
///
/// Operations that change the disk tier run one at a time. Reads run
/// concurrently with them and never promote a disk record into memory
/// unless no write overlapped the disk read.
pub struct CacheEngine {
    state: Mutex<EngineState>,
    disk: DiskTier,
    settings: CacheSettings,
    ready: OnceCell<()>,
    writer: Mutex<()>,
    generation: AtomicU64,
}

impl CacheEngine {
    // == Constructor ==
    pub fn new(store: Arc<dyn PersistentStore>, settings: CacheSettings) -> Self {
        let settings = CacheSettings {
            memory_capacity: settings.memory_capacity.max(1),
            memory_soft_limit: settings.memory_soft_limit.min(settings.memory_capacity),
            ..settings
        };

        Self {
            state: Mutex::new(EngineState {
                memory: LruCache::new(settings.memory_capacity),
                stats: CacheStats::new(),
                index: Trie::new(),
                disk_keys: BloomFilter::new(settings.expected_disk_keys),
            }),
            disk: DiskTier::new(store),
            settings,
            ready: OnceCell::new(),
            writer: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &Config, store: Arc<dyn PersistentStore>) -> Self {
        Self::new(store, CacheSettings::from(config))
    }

    pub fn settings(&self) -> CacheSettings {
        self.settings
    }

    // == Initialize ==
    /// Opens the backing store and indexes persisted entries.
    ///
    /// Safe to call repeatedly and concurrently; only the first call does work.
    pub async fn initialize(&self) -> Result<()> {
        self.ready
            .get_or_try_init(|| async {
                self.disk.open().await?;
                let records = self.disk.scan().await?;

                let now = current_timestamp_ms();
                let mut state = self.state.lock().await;
                for record in &records {
                    state.disk_keys.add(record.key.as_str());
                    if record.entry.as_ref().is_some_and(|e| !e.is_expired_at(now)) {
                        state.index.insert(&record.key, ());
                    }
                }

                info!(
                    "Cache engine initialized: {} persisted entries, memory capacity {}",
                    records.len(),
                    self.settings.memory_capacity
                );
                Ok::<(), CacheError>(())
            })
            .await?;
        Ok(())
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.ready.initialized() {
            Ok(())
        } else {
            Err(CacheError::NotInitialized)
        }
    }

    async fn begin_write(&self) -> WriteGuard<'_> {
        WriteGuard {
            _lock: self.writer.lock().await,
            generation: &self.generation,
        }
    }

    // == Cache Data ==
    /// Stores `value` under `key`, replacing any existing entry.
    ///
    /// The memory tier is updated before the disk write starts, so a read
    /// issued right after this call returns sees the new value.
    pub async fn cache_data<T>(&self, key: &str, value: &T, options: CacheOptions) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.ensure_initialized()?;
        let entry = CacheEntry::new(key, serde_json::to_value(value)?, &options);
        let level = entry.level;

        let _write = self.begin_write().await;
        let stale_on_disk = {
            let mut state = self.state.lock().await;
            let stale_on_disk = !level.includes_disk() && state.disk_keys.might_contain(key);

            state.index.insert(key, ());
            if level.includes_disk() {
                state.disk_keys.add(key);
            }
            if level.includes_memory() {
                state.admit(entry.clone());
            } else {
                state.memory.remove(key);
            }
            stale_on_disk
        };

        if level.includes_disk() {
            self.disk.write(&entry).await?;
        } else if stale_on_disk {
            self.disk.delete(key).await?;
        }

        debug!("Cached {:?} (category {:?}, level {:?})", key, options.category, level);
        Ok(())
    }

    // == Get Cached Data ==
    /// Reads `key` as `T`.
    ///
    /// Checks memory first, then disk; a live disk hit is promoted into the
    /// memory tier. Expired entries are deleted from the tier holding them.
    /// A value that cannot be read as `T` is reported as absent.
    pub async fn get_cached_data<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.ensure_initialized()?;

        let decoded = self.find_entry(key).await?.and_then(|entry| {
            entry
                .decode::<T>()
                .map_err(|err| {
                    warn!(
                        "Cached value for {:?} does not match {}: {}",
                        key,
                        std::any::type_name::<T>(),
                        err
                    )
                })
                .ok()
        });

        let mut state = self.state.lock().await;
        if decoded.is_some() {
            state.stats.record_hit();
        } else {
            state.stats.record_miss();
        }
        Ok(decoded)
    }

    async fn find_entry(&self, key: &str) -> Result<Option<CacheEntry>> {
        match self.lookup_memory(key).await {
            MemoryLookup::Hit(entry) => Ok(Some(entry)),
            MemoryLookup::Expired(entry) => {
                if entry.level.includes_disk() {
                    self.delete_if_expired(key).await?;
                }
                Ok(None)
            }
            MemoryLookup::Miss {
                maybe_on_disk: false,
                ..
            } => Ok(None),
            MemoryLookup::Miss {
                maybe_on_disk: true,
                generation,
            } => self.read_through(key, generation).await,
        }
    }

    async fn lookup_memory(&self, key: &str) -> MemoryLookup {
        let mut state = self.state.lock().await;
        let expired = match state.memory.peek(key) {
            Some(entry) => entry.is_expired(),
            None => {
                return MemoryLookup::Miss {
                    maybe_on_disk: state.disk_keys.might_contain(key),
                    generation: self.generation.load(AtomicOrdering::Acquire),
                }
            }
        };

        if expired {
            let entry = state.memory.remove(key);
            state.index.remove(key);
            state.stats.record_expired(1);
            debug!("Dropped expired memory entry {:?}", key);
            return match entry {
                Some(entry) => MemoryLookup::Expired(entry),
                None => MemoryLookup::Miss {
                    maybe_on_disk: false,
                    generation: 0,
                },
            };
        }

        match state.memory.get(key) {
            Some(entry) => MemoryLookup::Hit(entry.clone()),
            None => MemoryLookup::Miss {
                maybe_on_disk: false,
                generation: 0,
            },
        }
    }

    /// Disk lookup with promotion into the memory tier.
    ///
    /// A read that overlapped a finished write is retried, since that write
    /// may have replaced or removed what was read. While a write is still in
    /// flight the record is returned without being promoted.
    async fn read_through(&self, key: &str, mut generation: u64) -> Result<Option<CacheEntry>> {
        for _ in 0..READ_ATTEMPTS {
            let found = self.disk.read(key).await?;

            let mut state = self.state.lock().await;
            // A concurrent write landed while the disk read was in flight
            if let Some(newer) = state.memory.get(key) {
                return Ok(Some(newer.clone()));
            }
            let Ok(idle_writer) = self.writer.try_lock() else {
                return Ok(found.filter(|entry| !entry.is_expired()));
            };
            let current = self.generation.load(AtomicOrdering::Acquire);
            if current != generation {
                generation = current;
                continue;
            }

            let Some(entry) = found else {
                return Ok(None);
            };

            if entry.is_expired() {
                state.index.remove(key);
                state.stats.record_expired(1);
                drop(state);

                let _write = WriteGuard {
                    _lock: idle_writer,
                    generation: &self.generation,
                };
                self.disk.delete(key).await?;
                debug!("Dropped expired disk entry {:?}", key);
                return Ok(None);
            }

            state.admit(entry.clone());
            debug!("Promoted {:?} from disk to memory", key);
            return Ok(Some(entry));
        }

        debug!("Disk read of {:?} kept overlapping writes, reporting a miss", key);
        Ok(None)
    }

    /// Deletes the persisted copy of `key` if it is still expired.
    async fn delete_if_expired(&self, key: &str) -> Result<()> {
        let _write = self.begin_write().await;
        if self.disk.read(key).await?.is_some_and(|entry| entry.is_expired()) {
            self.disk.delete(key).await?;
        }
        Ok(())
    }

    // == Contains Key ==
    /// Returns true if `key` is live in either tier, without touching
    /// recency or hit/miss statistics.
    pub async fn contains_key(&self, key: &str) -> Result<bool> {
        self.ensure_initialized()?;
        let maybe_on_disk = {
            let state = self.state.lock().await;
            if let Some(entry) = state.memory.peek(key) {
                if !entry.is_expired() {
                    return Ok(true);
                }
            }
            state.disk_keys.might_contain(key)
        };

        if !maybe_on_disk {
            return Ok(false);
        }
        Ok(self
            .disk
            .read(key)
            .await?
            .is_some_and(|entry| !entry.is_expired()))
    }

    // == Remove Cached Data ==
    /// Removes `key` from both tiers. Removing a missing key is a no-op.
    pub async fn remove_cached_data(&self, key: &str) -> Result<()> {
        self.ensure_initialized()?;
        let _write = self.begin_write().await;
        self.state.lock().await.forget(key);
        self.disk.delete(key).await?;
        debug!("Removed {:?}", key);
        Ok(())
    }

    // == Clear By Category ==
    /// Removes every entry tagged `category` from both tiers.
    ///
    /// # Returns
    /// Number of distinct keys removed.
    pub async fn clear_cache_by_category(&self, category: &str) -> Result<usize> {
        self.ensure_initialized()?;
        let _write = self.begin_write().await;
        let mut removed: HashSet<String> = {
            let mut state = self.state.lock().await;
            let dropped = state.memory.retain(|_, entry| entry.category != category);
            for (key, _) in &dropped {
                state.index.remove(key);
            }
            dropped.into_iter().map(|(key, _)| key).collect()
        };

        let mut disk_removed = Vec::new();
        for record in self.disk.scan().await? {
            if record.entry.is_some_and(|entry| entry.category == category) {
                self.disk.delete(&record.key).await?;
                disk_removed.push(record.key);
            }
        }

        if !disk_removed.is_empty() {
            let mut state = self.state.lock().await;
            for key in &disk_removed {
                state.forget(key);
            }
        }
        removed.extend(disk_removed);

        info!("Cleared {} entries in category {:?}", removed.len(), category);
        Ok(removed.len())
    }

    // == Clear All ==
    /// Empties both tiers. Hit/miss counters are kept.
    pub async fn clear_all_cache(&self) -> Result<()> {
        self.ensure_initialized()?;
        let _write = self.begin_write().await;
        {
            let mut state = self.state.lock().await;
            state.memory.clear();
            state.index.clear();
            state.disk_keys.clear();
        }
        let removed = self.disk.clear().await?;
        info!("Cleared all cache entries ({} persisted)", removed);
        Ok(())
    }

    // == Preload ==
    /// Runs every loader concurrently and caches each successful result.
    ///
    /// Best-effort: a failing loader (or a failing write of its value) is
    /// recorded in the report and leaves its key absent; it never stops the
    /// other keys from loading.
    pub async fn preload_data<I>(&self, loaders: I, options: CacheOptions) -> Result<PreloadReport>
    where
        I: IntoIterator<Item = (String, ValueLoader)>,
    {
        self.ensure_initialized()?;

        let outcomes = join_all(
            loaders
                .into_iter()
                .map(|(key, load)| async move { (key, load().await) }),
        )
        .await;

        let mut report = PreloadReport::default();
        for (key, outcome) in outcomes {
            let stored = match outcome {
                Ok(value) => self
                    .cache_data(&key, &value, options.clone())
                    .await
                    .map_err(|err| err.to_string()),
                Err(err) => Err(format!("{err:#}")),
            };
            match stored {
                Ok(()) => report.loaded.push(key),
                Err(reason) => {
                    warn!("Preload of {:?} failed: {}", key, reason);
                    report.failed.push(PreloadFailure { key, reason });
                }
            }
        }

        info!(
            "Preloaded {} keys ({} failed)",
            report.loaded.len(),
            report.failed.len()
        );
        Ok(report)
    }

    // == Optimize ==
    /// Sweeps expired entries from both tiers, drops undecodable disk records
    /// and evicts least recently used memory entries above the soft limit.
    ///
    /// Never increases the number of memory entries.
    pub async fn optimize_cache(&self) -> Result<OptimizeReport> {
        self.ensure_initialized()?;
        let _write = self.begin_write().await;
        let now = current_timestamp_ms();
        let mut report = OptimizeReport::default();

        {
            let mut state = self.state.lock().await;
            let expired = state.memory.retain(|_, entry| !entry.is_expired_at(now));
            for (key, _) in &expired {
                state.index.remove(key);
            }
            report.expired_memory = expired.len();

            while state.memory.len() > self.settings.memory_soft_limit {
                let Some((key, entry)) = state.memory.pop_lru() else {
                    break;
                };
                if !entry.level.includes_disk() {
                    state.index.remove(&key);
                }
                report.evicted_memory += 1;
            }

            state.stats.record_expired(report.expired_memory);
            state.stats.record_evictions(report.evicted_memory);
        }

        let mut dead_keys = Vec::new();
        for record in self.disk.scan().await? {
            match record.entry {
                None => report.corrupt_disk += 1,
                Some(entry) if entry.is_expired_at(now) => report.expired_disk += 1,
                Some(_) => continue,
            }
            self.disk.delete(&record.key).await?;
            dead_keys.push(record.key);
        }

        if !dead_keys.is_empty() {
            let mut state = self.state.lock().await;
            for key in &dead_keys {
                // A memory-only copy can outlive a corrupt disk record
                if !state.memory.contains(key.as_str()) {
                    state.index.remove(key);
                }
            }
            state.stats.record_expired(report.expired_disk);
        }

        info!(
            "Cache optimized: {} expired in memory, {} expired on disk, {} corrupt, {} evicted",
            report.expired_memory, report.expired_disk, report.corrupt_disk, report.evicted_memory
        );
        Ok(report)
    }

    // == Statistics ==
    /// Returns cumulative counters and live entry counts for both tiers.
    pub async fn get_statistics(&self) -> Result<CacheStats> {
        self.ensure_initialized()?;
        let now = current_timestamp_ms();

        let mut stats = {
            let state = self.state.lock().await;
            let mut stats = state.stats.clone();
            stats.memory_entries = state
                .memory
                .keys()
                .filter_map(|key| state.memory.peek(key))
                .filter(|entry| !entry.is_expired_at(now))
                .count();
            stats
        };

        stats.disk_entries = self
            .disk
            .scan()
            .await?
            .into_iter()
            .filter(|record| {
                record
                    .entry
                    .as_ref()
                    .is_some_and(|entry| !entry.is_expired_at(now))
            })
            .count();

        Ok(stats)
    }

    // == Key Lookup ==
    /// Known keys starting with `prefix`, in lexicographic order.
    ///
    /// Expired keys drop out once an access or sweep notices them.
    pub async fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.state.lock().await.index.autocomplete_suggestions(prefix)
    }

    /// Known keys fuzzy-matching `pattern`, best matches first, at most `limit`.
    pub async fn search_keys(&self, pattern: &str, limit: usize) -> Vec<String> {
        if limit == 0 {
            return Vec::new();
        }

        let candidates = self.state.lock().await.index.autocomplete_suggestions("");

        // Higher similarity sorts first; bounded to keep only the best `limit`
        let mut ranked = PriorityQueue::bounded(
            |a: &(f64, String), b: &(f64, String)| {
                b.0.partial_cmp(&a.0)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| a.1.cmp(&b.1))
            },
            limit,
        );
        ranked.extend(
            candidates
                .into_iter()
                .filter(|key| fuzzy_match(pattern, key))
                .map(|key| (similarity(pattern, &key), key)),
        );

        ranked.drain_ordered().into_iter().map(|(_, key)| key).collect()
    }
}
