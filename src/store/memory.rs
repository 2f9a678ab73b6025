//! In-process store backed by an ordered map.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{keys_in_category, PersistentStore, StoreSnapshot};
use crate::error::StoreError;

/// Volatile [`PersistentStore`]; content lives as long as the value does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn list_keys_by_category(&self, category: &str) -> Result<Vec<String>, StoreError> {
        Ok(keys_in_category(self.entries.read().await.keys(), category))
    }

    async fn export_all(&self) -> Result<StoreSnapshot, StoreError> {
        Ok(StoreSnapshot::new(self.entries.read().await.clone()))
    }

    async fn import_all(&self, snapshot: StoreSnapshot) -> Result<(), StoreError> {
        snapshot.check_version()?;
        *self.entries.write().await = snapshot.entries;
        Ok(())
    }
}
