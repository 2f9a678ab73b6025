//! Sync Module
//!
//! Periodic reconciliation of persisted application data into the cache.
//!
//! # Components
//! - Categories: the data sets a pass visits, in priority order
//! - Orchestrator: runs passes, one at a time, and owns the auto-sync task
//! - Events: broadcast progress of every pass

mod category;
mod event;
mod orchestrator;
mod stats;

pub use category::{SyncCategory, DATA_NAMESPACE, SYNC_CACHE_CATEGORY};
pub use event::{SyncEvent, SyncEventKind};
pub use orchestrator::{SyncOptions, SyncOrchestrator, SyncSettings, LAST_SYNC_KEY};
pub use stats::{SyncFailure, SyncResult, SyncStats};
