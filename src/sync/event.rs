//! Sync Events
//!
//! Lifecycle notifications broadcast to every subscriber of the orchestrator.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::sync::SyncCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncEventKind {
    Started,
    ItemSynced,
    Completed,
    Failed,
}

// == Sync Event ==
/// One step of a sync pass.
///
/// Within a pass, `Started` precedes every `ItemSynced`, which all precede the
/// single terminal `Completed` or `Failed`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncEvent {
    pub kind: SyncEventKind,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    /// Categories synced so far in the pass, where meaningful
    pub synced_items: Option<usize>,
}

impl SyncEvent {
    fn new(kind: SyncEventKind, message: String, synced_items: Option<usize>) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
            message,
            synced_items,
        }
    }

    pub fn started(categories: usize) -> Self {
        Self::new(
            SyncEventKind::Started,
            format!("sync started for {categories} categories"),
            None,
        )
    }

    pub fn item_synced(category: SyncCategory, records: usize, synced_so_far: usize) -> Self {
        Self::new(
            SyncEventKind::ItemSynced,
            format!("synced {category} ({records} records)"),
            Some(synced_so_far),
        )
    }

    pub fn completed(synced: usize) -> Self {
        Self::new(
            SyncEventKind::Completed,
            format!("sync completed: {synced} categories"),
            Some(synced),
        )
    }

    pub fn failed(message: impl Into<String>, synced: usize) -> Self {
        Self::new(SyncEventKind::Failed, message.into(), Some(synced))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, SyncEventKind::Completed | SyncEventKind::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_constructors() {
        let started = SyncEvent::started(4);
        assert_eq!(started.kind, SyncEventKind::Started);
        assert_eq!(started.synced_items, None);
        assert!(!started.is_terminal());

        let item = SyncEvent::item_synced(SyncCategory::Presets, 7, 2);
        assert_eq!(item.message, "synced presets (7 records)");
        assert_eq!(item.synced_items, Some(2));

        assert!(SyncEvent::completed(4).is_terminal());
        assert!(SyncEvent::failed("boom", 3).is_terminal());
    }

    #[test]
    fn test_event_serializes_kind_snake_case() {
        let value = serde_json::to_value(SyncEvent::item_synced(SyncCategory::Bookmarks, 1, 1)).unwrap();
        assert_eq!(value["kind"], "item_synced");
        assert!(value["timestamp"].is_string());
    }
}
