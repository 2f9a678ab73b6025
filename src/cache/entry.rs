//! Cache Entry Module
//!
//! Defines individual cache entries with category, storage level and TTL.

use std::time::Duration;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Category assigned to entries cached without an explicit one.
pub const DEFAULT_CATEGORY: &str = "default";

// == Cache Level ==
/// Storage tier(s) an entry is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheLevel {
    Memory,
    Disk,
    #[default]
    Both,
}

impl CacheLevel {
    pub fn includes_memory(self) -> bool {
        matches!(self, CacheLevel::Memory | CacheLevel::Both)
    }

    pub fn includes_disk(self) -> bool {
        matches!(self, CacheLevel::Disk | CacheLevel::Both)
    }
}

// == Cache Options ==
/// Per-write settings for [`CacheEngine::cache_data`](crate::cache::CacheEngine::cache_data).
///
/// Defaults: category `"default"`, no TTL, both tiers.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheOptions {
    pub category: String,
    pub ttl: Option<Duration>,
    pub level: CacheLevel,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            category: DEFAULT_CATEGORY.to_string(),
            ttl: None,
            level: CacheLevel::Both,
        }
    }
}

impl CacheOptions {
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn level(mut self, level: CacheLevel) -> Self {
        self.level = level;
        self
    }
}

// == Cache Entry ==
/// A single cached value with its metadata.
///
/// This is also the record persisted by the disk tier, so it round-trips
/// through serde unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    /// The stored value, kept as a JSON tree so heterogeneous types share one key space
    pub value: Value,
    pub category: String,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Time to live in milliseconds, None = no expiration
    pub ttl_ms: Option<u64>,
    pub level: CacheLevel,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped with the current time.
    pub fn new(key: impl Into<String>, value: Value, options: &CacheOptions) -> Self {
        Self {
            key: key.into(),
            value,
            category: options.category.clone(),
            created_at: current_timestamp_ms(),
            ttl_ms: options
                .ttl
                .map(|ttl| u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)),
            level: options.level,
        }
    }

    /// Expiration timestamp (Unix milliseconds), if the entry has a TTL.
    pub fn expires_at(&self) -> Option<u64> {
        self.ttl_ms.map(|ttl| self.created_at.saturating_add(ttl))
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches `created_at + ttl`,
    /// so a read exactly at the boundary already misses.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        self.expires_at().is_some_and(|expires| now_ms >= expires)
    }

    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires_at()
            .map(|expires| expires.saturating_sub(current_timestamp_ms()))
    }

    // == Decode ==
    /// Interprets the stored value as `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.value)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}
