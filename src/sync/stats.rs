//! Sync Statistics Module
//!
//! Outcome of individual passes and counters aggregated over the
//! orchestrator's lifetime.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::sync::SyncCategory;

// == Sync Stats ==
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncStats {
    pub successful_syncs: u64,
    pub failed_syncs: u64,
    /// Completion time of the last fully successful pass
    pub last_sync_time: Option<DateTime<Utc>>,
    pub is_currently_syncing: bool,
}

impl SyncStats {
    /// Fraction of finished passes that succeeded, 0.0 before the first one.
    pub fn success_rate(&self) -> f64 {
        let total = self.successful_syncs + self.failed_syncs;
        if total == 0 {
            0.0
        } else {
            self.successful_syncs as f64 / total as f64
        }
    }

    pub(crate) fn record_success(&mut self, at: DateTime<Utc>) {
        self.successful_syncs += 1;
        self.last_sync_time = Some(at);
    }

    pub(crate) fn record_failure(&mut self) {
        self.failed_syncs += 1;
    }
}

// == Sync Result ==
/// A category that could not be synced in a pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncFailure {
    pub category: SyncCategory,
    pub error: String,
}

/// Outcome of one `perform_sync` or `sync_category` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncResult {
    /// False if any category failed or the pass did not run
    pub success: bool,
    /// Categories synced successfully
    pub synced_items: usize,
    pub failures: Vec<SyncFailure>,
    pub message: String,
}

impl SyncResult {
    pub(crate) fn already_running() -> Self {
        Self {
            success: false,
            synced_items: 0,
            failures: Vec::new(),
            message: "sync already in progress".to_string(),
        }
    }

    pub(crate) fn finished(synced_items: usize, failures: Vec<SyncFailure>) -> Self {
        let message = if failures.is_empty() {
            format!("synced {synced_items} categories")
        } else {
            let details: Vec<String> = failures
                .iter()
                .map(|failure| format!("{}: {}", failure.category, failure.error))
                .collect();
            format!(
                "{} of {} categories failed: {}",
                failures.len(),
                failures.len() + synced_items,
                details.join("; ")
            )
        };

        Self {
            success: failures.is_empty(),
            synced_items,
            failures,
            message,
        }
    }

    /// True when the call was turned away because another pass was running.
    pub fn was_skipped(&self) -> bool {
        !self.success && self.failures.is_empty()
    }
}
