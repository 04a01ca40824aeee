//! Key-value persistence port and its backends
//!
//! The session core never touches a concrete storage medium directly; it
//! talks to a [`KeyValuePort`]. Two backends ship with the crate:
//!
//! - [`MemoryStorage`]: process-local map, the default for tests
//! - [`FileStorage`]: one JSON document on disk, survives a restart

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::{AuthError, Result};

/// Durable string key-value storage.
///
/// Each call is synchronous and independent. `remove` on a missing key is
/// not an error.
pub trait KeyValuePort: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

// ─── In-memory backend ───

/// Process-local storage backed by a `HashMap`
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyValuePort for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

// ─── File backend ───

/// Storage persisted as a single JSON object on disk.
///
/// Every write rewrites the whole document through a sibling temp file and
/// a rename, so a crash mid-write leaves the previous document intact.
/// A missing file reads as empty. An unparsable file is an error on `get`;
/// `set` and `remove` log it and replace the document, so a corrupt file
/// never blocks signing in again.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    /// Open (lazily) the document at `path`. Parent directories are created
    /// on first write.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(HashMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Load for a read-modify-write. Returns the entries and whether the
    /// document on disk was unreadable and must be rewritten.
    fn load_for_write(&self) -> Result<(HashMap<String, String>, bool)> {
        match self.load() {
            Ok(entries) => Ok((entries, false)),
            Err(AuthError::Serialization(e)) => {
                warn!(path = %self.path.display(), error = %e, "Session storage unreadable, replacing it");
                Ok((HashMap::new(), true))
            }
            Err(e) => Err(e),
        }
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(serde_json::to_string_pretty(entries)?.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), keys = entries.len(), "Session storage persisted");
        Ok(())
    }
}

impl KeyValuePort for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let (mut entries, _) = self.load_for_write()?;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let (mut entries, reset) = self.load_for_write()?;
        if entries.remove(key).is_none() && !reset {
            return Ok(());
        }
        self.persist(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthError;

    #[test]
    fn test_memory_roundtrip() {
        let storage = MemoryStorage::new();
        assert!(storage.is_empty());

        storage.set("token", "abc").unwrap();
        assert_eq!(storage.get("token").unwrap().as_deref(), Some("abc"));
        assert_eq!(storage.len(), 1);

        storage.remove("token").unwrap();
        storage.remove("token").unwrap();
        assert_eq!(storage.get("token").unwrap(), None);
    }

    #[test]
    fn test_file_survives_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("session.json");

        FileStorage::new(&path).set("token", "abc").unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.get("token").unwrap().as_deref(), Some("abc"));
        assert_eq!(reopened.get("user").unwrap(), None);
    }

    #[test]
    fn test_file_missing_reads_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path().join("absent.json"));
        assert_eq!(storage.get("token").unwrap(), None);
        storage.remove("token").unwrap();
        assert!(!storage.path().exists());
    }

    #[test]
    fn test_file_corrupt_document_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();

        let err = FileStorage::new(&path).get("token").unwrap_err();
        assert!(matches!(err, AuthError::Serialization(_)));
    }

    #[test]
    fn test_file_corrupt_document_is_replaced_on_write() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("session.json");

        fs::write(&path, "{not json").unwrap();
        let storage = FileStorage::new(&path);
        storage.remove("user").unwrap();
        assert_eq!(storage.get("token").unwrap(), None);

        fs::write(&path, "{not json").unwrap();
        storage.set("token", "abc").unwrap();
        assert_eq!(storage.get("token").unwrap().as_deref(), Some("abc"));
    }
}
