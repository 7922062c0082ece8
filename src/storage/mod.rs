//! Persistent key-value storage for session state
//!
//! The session manager keeps two text blobs (the message log and the
//! suggestion cache) under fixed keys. This module provides the synchronous
//! get/set/remove contract it relies on, backed by an embedded `sled`
//! database on disk or by an in-memory map for tests and ephemeral runs.

use crate::error::{CliExpertError, Result};
use directories::ProjectDirs;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Key holding the serialized message log
pub const HISTORY_KEY: &str = "history";

/// Key holding the serialized suggestion list
pub const SUGGESTIONS_KEY: &str = "suggestions";

/// Synchronous string key-value storage surviving process restarts
///
/// Implementations must be safe to share between the session manager and
/// its background suggestion tasks.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, `None` when absent
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`; removing an absent key is not an error
    fn remove(&self, key: &str) -> Result<()>;
}

/// Resolve the default session database directory
///
/// Uses the platform data directory (e.g. `~/.local/share/cliexpert` on
/// Linux) with a `session.db` subdirectory.
pub fn default_store_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "cliexpert", "cliexpert")
        .ok_or_else(|| CliExpertError::Storage("Could not determine data directory".into()))?;
    Ok(proj_dirs.data_dir().join("session.db"))
}

/// Key-value store backed by an embedded `sled` database
///
/// Every write is flushed before returning so a crash right after a submit
/// never loses the message that was just appended.
pub struct SledStore {
    db: sled::Db,
    path: PathBuf,
}

impl SledStore {
    /// Open or create a store at `path`
    ///
    /// # Errors
    ///
    /// Returns `CliExpertError::Storage` if the database cannot be opened
    ///
    /// # Examples
    ///
    /// ```
    /// use cliexpert::storage::{KeyValueStore, SledStore};
    ///
    /// # fn main() -> cliexpert::error::Result<()> {
    /// let dir = tempfile::tempdir()?;
    /// let store = SledStore::open(dir.path().join("session.db"))?;
    /// store.set("history", "[]")?;
    /// assert_eq!(store.get("history")?.as_deref(), Some("[]"));
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CliExpertError::Storage(format!("Failed to create data directory: {}", e))
            })?;
        }

        let db = sled::open(&path)
            .map_err(|e| CliExpertError::Storage(format!("Failed to open database: {}", e)))?;

        tracing::debug!("Opened session store at {}", path.display());
        Ok(Self { db, path })
    }

    /// Open the store at the configured path, or the platform default
    pub fn open_default(configured: Option<&str>) -> Result<Self> {
        match configured {
            Some(path) => Self::open(path),
            None => Self::open(default_store_path()?),
        }
    }

    /// Location of the database on disk
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self
            .db
            .get(key.as_bytes())
            .map_err(|e| CliExpertError::Storage(format!("Get failed: {}", e)))?
        {
            Some(bytes) => {
                let value = String::from_utf8(bytes.to_vec()).map_err(|e| {
                    CliExpertError::Storage(format!("Stored value is not UTF-8: {}", e))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.db
            .insert(key.as_bytes(), value.as_bytes())
            .map_err(|e| CliExpertError::Storage(format!("Insert failed: {}", e)))?;

        self.db
            .flush()
            .map_err(|e| CliExpertError::Storage(format!("Flush failed: {}", e)))?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.db
            .remove(key.as_bytes())
            .map_err(|e| CliExpertError::Storage(format!("Remove failed: {}", e)))?;

        self.db
            .flush()
            .map_err(|e| CliExpertError::Storage(format!("Flush failed: {}", e)))?;

        Ok(())
    }
}

/// In-memory key-value store
///
/// Used for `--ephemeral` chat sessions and throughout the tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given entries
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: Mutex::new(map),
        }
    }

    /// Whether `key` currently holds a value
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .map(|entries| entries.contains_key(key))
            .unwrap_or(false)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| CliExpertError::Storage("Store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CliExpertError::Storage("Store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CliExpertError::Storage("Store lock poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::temp_store;
    use tempfile::tempdir;

    #[test]
    fn test_sled_get_missing_key_returns_none() {
        let (store, _dir) = temp_store();
        assert!(store.get(HISTORY_KEY).expect("get failed").is_none());
    }

    #[test]
    fn test_sled_set_then_get() {
        let (store, _dir) = temp_store();
        store.set(SUGGESTIONS_KEY, r#"["a","b","c","d"]"#).unwrap();
        assert_eq!(
            store.get(SUGGESTIONS_KEY).unwrap().as_deref(),
            Some(r#"["a","b","c","d"]"#)
        );
    }

    #[test]
    fn test_sled_set_overwrites() {
        let (store, _dir) = temp_store();
        store.set(HISTORY_KEY, "first").unwrap();
        store.set(HISTORY_KEY, "second").unwrap();
        assert_eq!(store.get(HISTORY_KEY).unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn test_sled_remove_is_idempotent() {
        let (store, _dir) = temp_store();
        store.set(HISTORY_KEY, "[]").unwrap();
        store.remove(HISTORY_KEY).expect("first remove failed");
        store.remove(HISTORY_KEY).expect("second remove failed");
        assert!(store.get(HISTORY_KEY).unwrap().is_none());
    }

    #[test]
    fn test_sled_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.db");
        {
            let store = SledStore::open(&path).unwrap();
            store.set(HISTORY_KEY, "[1]").unwrap();
        }
        let reopened = SledStore::open(&path).unwrap();
        assert_eq!(reopened.get(HISTORY_KEY).unwrap().as_deref(), Some("[1]"));
    }

    #[test]
    fn test_sled_open_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("session.db");
        let store = SledStore::open(&path).unwrap();
        assert_eq!(store.path(), path.as_path());
        assert!(path.parent().unwrap().exists());
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.get("k").unwrap().is_none());
        store.set("k", "v").unwrap();
        assert!(store.contains("k"));
        store.remove("k").unwrap();
        assert!(!store.contains("k"));
    }

    #[test]
    fn test_memory_store_with_entries() {
        let store = MemoryStore::with_entries([(HISTORY_KEY, "[]")]);
        assert_eq!(store.get(HISTORY_KEY).unwrap().as_deref(), Some("[]"));
    }
}
