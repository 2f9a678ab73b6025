//! Local Cache - a client-side acceleration layer
//!
//! Multi-level cache with TTL expiry and category invalidation, a library of
//! classical data structures, and a background orchestrator that reconciles
//! persisted application data into the cache.

pub mod cache;
pub mod config;
pub mod error;
pub mod store;
pub mod structures;
pub mod sync;
pub mod tasks;

pub use cache::{CacheEngine, CacheLevel, CacheOptions, CacheSettings, CacheStats};
pub use config::Config;
pub use error::{CacheError, Result, StoreError, SyncError};
pub use store::{JsonFileStore, MemoryStore, PersistentStore};
pub use sync::{SyncCategory, SyncEvent, SyncOptions, SyncOrchestrator, SyncResult, SyncStats};
