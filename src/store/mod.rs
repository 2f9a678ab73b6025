//! Persistent Store Module
//!
//! The narrow key-value contract that the cache's disk tier and the sync
//! orchestrator are written against, plus two implementations.
//!
//! Keys are namespaced as `<category>:<name>`; the category of a key is the
//! text before its first `:`.

mod file;
mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Snapshot format version written by [`PersistentStore::export_all`].
pub const SNAPSHOT_VERSION: u32 = 1;

// == Store Snapshot ==
/// Versioned copy of an entire store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub entries: BTreeMap<String, Vec<u8>>,
}

impl StoreSnapshot {
    pub fn new(entries: BTreeMap<String, Vec<u8>>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            exported_at: Utc::now(),
            entries,
        }
    }

    /// Rejects snapshots written by a different format version.
    pub fn check_version(&self) -> Result<(), StoreError> {
        if self.version == SNAPSHOT_VERSION {
            Ok(())
        } else {
            Err(StoreError::UnsupportedSnapshot {
                found: self.version,
                expected: SNAPSHOT_VERSION,
            })
        }
    }
}

// == Persistent Store ==
/// Durable key-value store consumed by the cache and sync layers.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// Acquires backing resources. Called once per engine initialization;
    /// implementations must tolerate repeated calls.
    async fn open(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    /// Deletes `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Lists keys in namespace `category`, in ascending order.
    async fn list_keys_by_category(&self, category: &str) -> Result<Vec<String>, StoreError>;

    async fn export_all(&self) -> Result<StoreSnapshot, StoreError>;

    /// Replaces the whole store content with `snapshot`.
    async fn import_all(&self, snapshot: StoreSnapshot) -> Result<(), StoreError>;

    /// Reclaims storage where the implementation supports it.
    async fn compact(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Builds a namespaced store key.
pub fn namespaced_key(category: &str, name: &str) -> String {
    format!("{category}:{name}")
}

/// Returns the category of a namespaced key, if it has one.
pub fn key_category(key: &str) -> Option<&str> {
    key.split_once(':').map(|(category, _)| category)
}

fn keys_in_category<'a, I>(keys: I, category: &str) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    keys.into_iter()
        .filter(|key| key_category(key) == Some(category))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaced_key_roundtrip() {
        let key = namespaced_key("cache", "reports:2024");
        assert_eq!(key, "cache:reports:2024");
        assert_eq!(key_category(&key), Some("cache"));
        assert_eq!(key_category("plain"), None);
    }

    #[test]
    fn test_keys_in_category_exact_namespace() {
        let keys = vec![
            "cache:a".to_string(),
            "cacheable:b".to_string(),
            "data:c".to_string(),
            "cache:d".to_string(),
        ];
        assert_eq!(keys_in_category(&keys, "cache"), vec!["cache:a", "cache:d"]);
    }

    #[test]
    fn test_snapshot_version_check() {
        let mut snapshot = StoreSnapshot::new(BTreeMap::new());
        assert!(snapshot.check_version().is_ok());

        snapshot.version = 7;
        assert!(matches!(
            snapshot.check_version(),
            Err(StoreError::UnsupportedSnapshot { found: 7, .. })
        ));
    }
}
