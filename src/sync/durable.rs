//! Named-record storage that survives restarts of the client.

use super::SyncError;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Mutex,
};
use tokio::fs;
use tracing::{error, warn};

#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Returns `None` when the record was never written.
    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>, SyncError>;

    /// Replaces the record as a whole.
    async fn write(&self, name: &str, bytes: Vec<u8>) -> Result<(), SyncError>;
}

/// One JSON file per record inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

#[async_trait]
impl DurableStore for FileStore {
    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>, SyncError> {
        match fs::read(self.path(name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn write(&self, name: &str, bytes: Vec<u8>) -> Result<(), SyncError> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.path(name);
        let tmp = self.dir.join(format!("{name}.json.tmp"));
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

/// Keeps records in memory; used by tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_raw(&self, name: &str, bytes: impl Into<Vec<u8>>) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(name.to_string(), bytes.into());
    }

    pub fn raw(&self, name: &str) -> Option<Vec<u8>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
            .cloned()
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>, SyncError> {
        Ok(self.raw(name))
    }

    async fn write(&self, name: &str, bytes: Vec<u8>) -> Result<(), SyncError> {
        self.insert_raw(name, bytes);
        Ok(())
    }
}

/// Loads a JSON record. Missing, unreadable and unparseable records all come
/// back as `None`.
pub(crate) async fn read_record<T: DeserializeOwned>(store: &dyn DurableStore, name: &str) -> Option<T> {
    let bytes = match store.read(name).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return None,
        Err(err) => {
            warn!(record = name, "failed to read record, starting empty: {err}");
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(record = name, "corrupt record, starting empty: {err}");
            None
        }
    }
}

/// Best effort: a failed write is logged and otherwise ignored.
pub(crate) async fn write_record<T: Serialize + ?Sized>(store: &dyn DurableStore, name: &str, value: &T) {
    let bytes = match serde_json::to_vec(value) {
        Ok(bytes) => bytes,
        Err(err) => {
            error!(record = name, "failed to encode record: {err}");
            return;
        }
    };
    if let Err(err) = store.write(name, bytes).await {
        error!(record = name, "failed to persist record: {err}");
    }
}
