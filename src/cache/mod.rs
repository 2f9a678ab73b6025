//! Cache Module
//!
//! Two-tier cache engine: an LRU-bounded memory tier in front of a disk tier
//! persisted through a [`PersistentStore`](crate::store::PersistentStore).

mod disk;
mod engine;
mod entry;
mod preload;
mod stats;


// Re-export public types
pub use engine::{CacheEngine, CacheSettings, OptimizeReport};
pub use entry::{current_timestamp_ms, CacheEntry, CacheLevel, CacheOptions, DEFAULT_CATEGORY};
pub use preload::{loader, LoaderFuture, PreloadFailure, PreloadReport, ValueLoader};
pub use stats::CacheStats;
