//! Configuration Module
//!
//! Handles loading cache and synchronization settings from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Runtime configuration for the cache engine and sync orchestrator.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Hard capacity of the in-memory LRU tier
    pub memory_capacity: usize,
    /// Memory tier size that `optimize_cache` trims down to
    pub memory_soft_limit: usize,
    /// Expected number of persisted keys, used to size the disk-key bloom filter
    pub expected_disk_keys: usize,
    /// Whether the orchestrator starts its periodic sync task
    pub sync_enabled: bool,
    /// Periodic sync interval in seconds
    pub sync_interval: u64,
    /// TTL in seconds applied to values cached by a sync pass
    pub sync_cache_ttl: u64,
    /// Buffered events per sync event subscriber
    pub sync_event_capacity: usize,
    /// Location of the JSON snapshot used by the file store
    pub store_path: PathBuf,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MEMORY_CAPACITY` - Memory tier capacity (default: 500)
    /// - `CACHE_SOFT_LIMIT` - Memory tier soft limit (default: 400)
    /// - `CACHE_EXPECTED_KEYS` - Expected persisted keys (default: 1000)
    /// - `SYNC_ENABLED` - Start periodic sync (default: true)
    /// - `SYNC_INTERVAL` - Sync interval in seconds (default: 300)
    /// - `SYNC_CACHE_TTL` - TTL for synced values in seconds (default: 3600)
    /// - `SYNC_EVENT_CAPACITY` - Event buffer per subscriber (default: 64)
    /// - `STORE_PATH` - File store location (default: ./data/store.json)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            memory_capacity: env_or("CACHE_MEMORY_CAPACITY", defaults.memory_capacity),
            memory_soft_limit: env_or("CACHE_SOFT_LIMIT", defaults.memory_soft_limit),
            expected_disk_keys: env_or("CACHE_EXPECTED_KEYS", defaults.expected_disk_keys),
            sync_enabled: env_or("SYNC_ENABLED", defaults.sync_enabled),
            sync_interval: env_or("SYNC_INTERVAL", defaults.sync_interval),
            sync_cache_ttl: env_or("SYNC_CACHE_TTL", defaults.sync_cache_ttl),
            sync_event_capacity: env_or("SYNC_EVENT_CAPACITY", defaults.sync_event_capacity),
            store_path: env::var("STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.store_path),
        }
    }

    /// Periodic sync interval as a `Duration`.
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval.max(1))
    }

    /// TTL applied to synced values as a `Duration`.
    pub fn sync_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.sync_cache_ttl)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            memory_capacity: 500,
            memory_soft_limit: 400,
            expected_disk_keys: 1000,
            sync_enabled: true,
            sync_interval: 300,
            sync_cache_ttl: 3600,
            sync_event_capacity: 64,
            store_path: PathBuf::from("./data/store.json"),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.memory_capacity, 500);
        assert_eq!(config.memory_soft_limit, 400);
        assert_eq!(config.expected_disk_keys, 1000);
        assert!(config.sync_enabled);
        assert_eq!(config.sync_interval, 300);
        assert_eq!(config.sync_cache_ttl, 3600);
        assert_eq!(config.sync_event_capacity, 64);
        assert_eq!(config.store_path, PathBuf::from("./data/store.json"));
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        for name in [
            "CACHE_MEMORY_CAPACITY",
            "CACHE_SOFT_LIMIT",
            "CACHE_EXPECTED_KEYS",
            "SYNC_ENABLED",
            "SYNC_INTERVAL",
            "SYNC_CACHE_TTL",
            "SYNC_EVENT_CAPACITY",
            "STORE_PATH",
        ] {
            env::remove_var(name);
        }

        let config = Config::from_env();
        assert_eq!(config.memory_capacity, 500);
        assert_eq!(config.sync_interval(), Duration::from_secs(300));
        assert_eq!(config.sync_cache_ttl(), Duration::from_secs(3600));
        assert!(config.sync_enabled);
    }

    #[test]
    fn test_sync_interval_never_zero() {
        let config = Config {
            sync_interval: 0,
            ..Config::default()
        };
        assert_eq!(config.sync_interval(), Duration::from_secs(1));
    }
}
