//! Scoped durable key-value storage for client-side checkout state.
//!
//! Writes are synchronous: when `save` returns, the value survives a reload. The state machine
//! only sees [`DurableStore`]; which medium backs it is the caller's choice.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StorageError {
    #[error("Storage I/O failed for {key}: {message}")]
    Io { key: String, message: String },

    #[error("Corrupt value under {key}: {message}")]
    Corrupt { key: String, message: String },
}

pub trait DurableStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;
    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DurableStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values().remove(key);
        Ok(())
    }
}

/// One file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| StorageError::Io {
            key: dir.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(file_name(key))
    }
}

/// Percent-encoded, so distinct keys never share a file.
fn file_name(key: &str) -> String {
    urlencoding::encode(key).into_owned()
}

fn io_error(key: &str, error: std::io::Error) -> StorageError {
    StorageError::Io {
        key: key.to_string(),
        message: error.to_string(),
    }
}

impl DurableStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(key, e)),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path(key);
        // `%t` never occurs in an encoded key.
        let staging = self.dir.join(format!("%tmp.{}", file_name(key)));
        fs::write(&staging, value).map_err(|e| io_error(key, e))?;
        fs::rename(&staging, &path).map_err(|e| io_error(key, e))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(key, e)),
        }
    }
}

/// Prefixes every key with `scope.`, so several visitors can share one backing store.
#[derive(Clone)]
pub struct ScopedStore {
    inner: Arc<dyn DurableStore>,
    scope: String,
}

impl ScopedStore {
    pub fn new(inner: Arc<dyn DurableStore>, scope: impl Into<String>) -> Self {
        Self {
            inner,
            scope: scope.into(),
        }
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}.{key}", self.scope)
    }
}

impl DurableStore for ScopedStore {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.load(&self.scoped(key))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.save(&self.scoped(key), value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(&self.scoped(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testresult::TestResult;

    #[test]
    fn file_store_survives_reopen() -> TestResult {
        let dir = tempfile::tempdir()?;
        let store = FileStore::open(dir.path())?;
        store.save("checkout.current_step", "2")?;

        let reopened = FileStore::open(dir.path())?;
        assert_eq!(reopened.load("checkout.current_step")?, Some("2".to_string()));

        reopened.remove("checkout.current_step")?;
        reopened.remove("checkout.current_step")?;
        assert_eq!(reopened.load("checkout.current_step")?, None);
        Ok(())
    }

    #[test]
    fn file_store_keeps_similar_keys_apart() -> TestResult {
        let dir = tempfile::tempdir()?;
        let store = FileStore::open(dir.path())?;
        store.save("guest:a.x", "colon")?;
        store.save("guest_a.x", "underscore")?;
        store.save("guest/a.x", "slash")?;

        assert_eq!(store.load("guest:a.x")?, Some("colon".to_string()));
        assert_eq!(store.load("guest_a.x")?, Some("underscore".to_string()));
        assert_eq!(store.load("guest/a.x")?, Some("slash".to_string()));
        Ok(())
    }

    #[test]
    fn scopes_do_not_see_each_other() -> TestResult {
        let shared: Arc<dyn DurableStore> = Arc::new(MemoryStore::default());
        let alice = ScopedStore::new(shared.clone(), "guest:a");
        let bob = ScopedStore::new(shared.clone(), "guest:b");

        alice.save("form_data", "{}")?;
        assert_eq!(bob.load("form_data")?, None);
        assert_eq!(shared.load("guest:a.form_data")?, Some("{}".to_string()));
        Ok(())
    }
}
