//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the orchestrator is
//! alive.
//!
//! # Tasks
//! - Auto-sync: runs a sync pass at a fixed interval until shut down

mod auto_sync;

pub use auto_sync::spawn_auto_sync_task;
