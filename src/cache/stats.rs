//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, and evictions.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
///
/// `hits`, `misses`, `evictions` and `expired_removed` are cumulative for the
/// engine's lifetime. `memory_entries` and `disk_entries` are live
/// (non-expired) counts filled in when a snapshot is taken.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Reads answered by either tier
    pub hits: u64,
    /// Reads that found nothing usable (absent, expired or undecodable)
    pub misses: u64,
    /// Entries pushed out of the memory tier by capacity or optimization
    pub evictions: u64,
    /// Expired entries removed lazily or by a sweep
    pub expired_removed: u64,
    pub memory_entries: usize,
    pub disk_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    pub fn record_expired(&mut self, count: usize) {
        self.expired_removed += count as u64;
    }
}
