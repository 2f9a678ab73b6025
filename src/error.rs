//! Error types for the cache and synchronization layer
//!
//! Provides unified error handling using thiserror. Missing or expired keys are
//! not errors: lookups return `Option` and only backing-store or encoding
//! failures surface here.

use thiserror::Error;

// == Store Error Enum ==
/// Failure reported by a persistent store implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem failure in a file-backed store
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot or record could not be encoded/decoded
    #[error("Store encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Store-specific failure
    #[error("Store backend error: {0}")]
    Backend(String),

    /// Snapshot produced by an incompatible store version
    #[error("Unsupported snapshot version {found} (expected {expected})")]
    UnsupportedSnapshot { found: u32, expected: u32 },
}

// == Cache Error Enum ==
/// Unified error type for cache engine operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// An operation was attempted before `initialize()` completed
    #[error("Cache engine used before initialization")]
    NotInitialized,

    /// A value could not be serialized for storage
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The disk tier's persistent store failed
    #[error("Backing store error: {0}")]
    BackingStore(#[from] StoreError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == Sync Error Enum ==
/// Failure while reconciling a single sync category.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Reading from or writing to the persistent store failed
    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    /// Writing the synced value into the cache failed
    #[error("cache failure: {0}")]
    Cache(#[from] CacheError),

    /// The stored payload is not valid JSON
    #[error("payload decode failure: {0}")]
    Decode(#[from] serde_json::Error),
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
