//! Disk Tier Module
//!
//! Persists cache entries as JSON records in the `cache` namespace of a
//! [`PersistentStore`].

use std::sync::Arc;

use tracing::warn;

use crate::cache::CacheEntry;
use crate::error::StoreError;
use crate::store::{namespaced_key, PersistentStore};

/// Store namespace holding cache entries.
pub const DISK_NAMESPACE: &str = "cache";

/// A persisted record found while scanning the tier.
#[derive(Debug)]
pub(crate) struct DiskRecord {
    pub key: String,
    /// `None` when the payload could not be decoded
    pub entry: Option<CacheEntry>,
}

// == Disk Tier ==
pub(crate) struct DiskTier {
    store: Arc<dyn PersistentStore>,
}

impl DiskTier {
    pub fn new(store: Arc<dyn PersistentStore>) -> Self {
        Self { store }
    }

    pub async fn open(&self) -> Result<(), StoreError> {
        self.store.open().await
    }

    // == Read ==
    /// Loads the record for `key`.
    ///
    /// A record that fails to decode is reported as absent.
    pub async fn read(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        let Some(bytes) = self.store.get(&namespaced_key(DISK_NAMESPACE, key)).await? else {
            return Ok(None);
        };
        Ok(decode_record(key, &bytes))
    }

    pub async fn write(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(entry)?;
        self.store
            .put(&namespaced_key(DISK_NAMESPACE, &entry.key), bytes)
            .await
    }

    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.store.delete(&namespaced_key(DISK_NAMESPACE, key)).await
    }

    // == Scan ==
    /// Reads every record in the tier.
    pub async fn scan(&self) -> Result<Vec<DiskRecord>, StoreError> {
        let prefix_len = DISK_NAMESPACE.len() + 1;
        let mut records = Vec::new();

        for store_key in self.store.list_keys_by_category(DISK_NAMESPACE).await? {
            let key = store_key[prefix_len..].to_string();
            // Deleted concurrently between list and get
            let Some(bytes) = self.store.get(&store_key).await? else {
                continue;
            };
            let entry = decode_record(&key, &bytes);
            records.push(DiskRecord { key, entry });
        }

        Ok(records)
    }

    /// Deletes every record, returning how many were removed.
    pub async fn clear(&self) -> Result<usize, StoreError> {
        let keys = self.store.list_keys_by_category(DISK_NAMESPACE).await?;
        for store_key in &keys {
            self.store.delete(store_key).await?;
        }
        Ok(keys.len())
    }
}

fn decode_record(key: &str, bytes: &[u8]) -> Option<CacheEntry> {
    match serde_json::from_slice(bytes) {
        Ok(entry) => Some(entry),
        Err(err) => {
            warn!("Ignoring undecodable disk record for key {:?}: {}", key, err);
            None
        }
    }
}
