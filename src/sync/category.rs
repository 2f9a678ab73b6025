//! Sync Categories
//!
//! The fixed set of data sets reconciled between the persistent store and the
//! cache.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::namespaced_key;

/// Store namespace holding the authoritative copy of each category.
pub const DATA_NAMESPACE: &str = "data";

/// Cache category tag applied to every synced entry.
pub const SYNC_CACHE_CATEGORY: &str = "sync";

// == Sync Category ==
/// A data set reconciled by the orchestrator.
///
/// Variants are declared in sync priority order, so the derived `Ord` is the
/// order a pass processes them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncCategory {
    UserPreferences,
    Bookmarks,
    Presets,
    RecentFiles,
}

impl SyncCategory {
    pub const ALL: [SyncCategory; 4] = [
        SyncCategory::UserPreferences,
        SyncCategory::Bookmarks,
        SyncCategory::Presets,
        SyncCategory::RecentFiles,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SyncCategory::UserPreferences => "user_preferences",
            SyncCategory::Bookmarks => "bookmarks",
            SyncCategory::Presets => "presets",
            SyncCategory::RecentFiles => "recent_files",
        }
    }

    /// Key of the authoritative copy in the persistent store.
    pub fn store_key(self) -> String {
        namespaced_key(DATA_NAMESPACE, self.name())
    }

    /// Key the synced copy is cached under.
    pub fn cache_key(self) -> String {
        format!("{}:{}", SYNC_CACHE_CATEGORY, self.name())
    }
}

impl fmt::Display for SyncCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Number of records in a synced payload: array or object length, zero for
/// null and one for any scalar.
pub(crate) fn record_count(payload: &Value) -> usize {
    match payload {
        Value::Null => 0,
        Value::Array(items) => items.len(),
        Value::Object(fields) => fields.len(),
        _ => 1,
    }
}
