//! File-backed store persisting a JSON snapshot.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{keys_in_category, PersistentStore, StoreSnapshot};
use crate::error::StoreError;

#[derive(Debug, Default)]
struct FileState {
    entries: BTreeMap<String, Vec<u8>>,
    opened: bool,
}

// == JSON File Store ==
/// [`PersistentStore`] that keeps its content in memory and rewrites a
/// snapshot file after every mutation.
///
/// The file is replaced atomically (write to `<path>.tmp`, then rename), so a
/// crash leaves either the old or the new snapshot on disk.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    state: RwLock<FileState>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: RwLock::new(FileState::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, entries: &BTreeMap<String, Vec<u8>>) -> Result<(), StoreError> {
        let snapshot = StoreSnapshot::new(entries.clone());
        let bytes = serde_json::to_vec(&snapshot)?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, &self.path).await?;

        debug!("Persisted {} store entries to {}", entries.len(), self.path.display());
        Ok(())
    }
}

fn not_opened() -> StoreError {
    StoreError::Backend("file store used before open()".to_string())
}

#[async_trait]
impl PersistentStore for JsonFileStore {
    async fn open(&self) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.opened {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        state.entries = match fs::read(&self.path).await {
            Ok(bytes) => {
                let snapshot: StoreSnapshot = serde_json::from_slice(&bytes)?;
                snapshot.check_version()?;
                snapshot.entries
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        state.opened = true;

        info!(
            "Opened file store at {} with {} entries",
            self.path.display(),
            state.entries.len()
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let state = self.state.read().await;
        if !state.opened {
            return Err(not_opened());
        }
        Ok(state.entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if !state.opened {
            return Err(not_opened());
        }
        state.entries.insert(key.to_string(), value);
        self.persist(&state.entries).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if !state.opened {
            return Err(not_opened());
        }
        if state.entries.remove(key).is_some() {
            self.persist(&state.entries).await?;
        }
        Ok(())
    }

    async fn list_keys_by_category(&self, category: &str) -> Result<Vec<String>, StoreError> {
        let state = self.state.read().await;
        if !state.opened {
            return Err(not_opened());
        }
        Ok(keys_in_category(state.entries.keys(), category))
    }

    async fn export_all(&self) -> Result<StoreSnapshot, StoreError> {
        let state = self.state.read().await;
        if !state.opened {
            return Err(not_opened());
        }
        Ok(StoreSnapshot::new(state.entries.clone()))
    }

    async fn import_all(&self, snapshot: StoreSnapshot) -> Result<(), StoreError> {
        snapshot.check_version()?;
        let mut state = self.state.write().await;
        if !state.opened {
            return Err(not_opened());
        }
        self.persist(&snapshot.entries).await?;
        state.entries = snapshot.entries;
        Ok(())
    }

    /// Rewrites the snapshot file from the in-memory view.
    ///
    /// Stored values, empty ones included, are kept as they are.
    async fn compact(&self) -> Result<(), StoreError> {
        let state = self.state.write().await;
        if !state.opened {
            return Err(not_opened());
        }
        self.persist(&state.entries).await?;

        info!("Compacted file store: {} entries rewritten", state.entries.len());
        Ok(())
    }
}
