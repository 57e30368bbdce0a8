//! Key-value storage port
//!
//! Stores never touch a backend directly; they read and write JSON strings
//! through a [`StoragePort`]. Two records live behind it, each under its
//! own namespaced key:
//!
//! ```text
//! mailfind.search-history     # JSON array of HistoryEntry, newest first
//! mailfind.search-analytics   # JSON array of AnalyticsEvent, oldest first
//! ```
//!
//! Writes are whole-record replacements. Two processes sharing one backend
//! race on read-modify-write and the last writer wins.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Result, StoreError};

/// Key of the persisted search history
pub const HISTORY_KEY: &str = "mailfind.search-history";

/// Key of the persisted analytics event log
pub const ANALYTICS_KEY: &str = "mailfind.search-analytics";

/// Read/write access to a string-valued key space
pub trait StoragePort: Send + Sync {
    /// Read the value under `key`, `None` if absent
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value under `key`
    fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key` if present
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory storage, shared by clones of its `Arc`
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoragePort for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// File-backed storage: one `{key}.json` file per key in a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open (creating if needed) a storage directory
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        debug!("Opened file storage at {:?}", dir);
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
        if !valid || key.starts_with('.') {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl StoragePort for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path)?))
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

/// Load a JSON array record, treating absence or corruption as empty
pub fn load_records<T: DeserializeOwned>(storage: &dyn StoragePort, key: &str) -> Vec<T> {
    let raw = match storage.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!("No stored record under {}", key);
            return Vec::new();
        }
        Err(e) => {
            warn!("Failed to read {}: {}", key, e);
            return Vec::new();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(records) => records,
        Err(e) => {
            warn!("Discarding malformed record under {}: {}", key, e);
            Vec::new()
        }
    }
}

/// Persist a JSON array record
pub fn save_records<T: Serialize>(storage: &dyn StoragePort, key: &str, records: &[T]) -> Result<()> {
    let json = serde_json::to_string(records)?;
    storage.write(key, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.read("k").unwrap(), None);
        storage.write("k", "[1]").unwrap();
        assert_eq!(storage.read("k").unwrap().as_deref(), Some("[1]"));
        storage.remove("k").unwrap();
        assert_eq!(storage.read("k").unwrap(), None);
    }

    #[test]
    fn test_file_storage_persists_between_opens() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::open(dir.path().join("data")).unwrap();
        storage.write(HISTORY_KEY, "[]").unwrap();
        assert!(dir.path().join("data").join("mailfind.search-history.json").exists());

        let reopened = FileStorage::open(dir.path().join("data")).unwrap();
        assert_eq!(reopened.read(HISTORY_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_file_storage_rejects_path_keys() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        assert!(matches!(storage.write("../escape", "x"), Err(StoreError::InvalidKey(_))));
        assert!(matches!(storage.read(""), Err(StoreError::InvalidKey(_))));
    }

    #[test]
    fn test_load_records_treats_corruption_as_empty() {
        let storage = MemoryStorage::new();
        storage.write("bad", "{not json").unwrap();
        let records: Vec<u32> = load_records(&storage, "bad");
        assert!(records.is_empty());

        let missing: Vec<u32> = load_records(&storage, "missing");
        assert!(missing.is_empty());

        save_records(&storage, "good", &[1u32, 2, 3]).unwrap();
        let good: Vec<u32> = load_records(&storage, "good");
        assert_eq!(good, vec![1, 2, 3]);
    }
}
