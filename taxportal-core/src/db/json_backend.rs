//! JSON file storage backend
//!
//! This backend keeps the whole key-value area in a single JSON file, using
//! the Storage implementation for file locking.

use anyhow::Result;
use std::path::{Path, PathBuf};

use super::traits::{BackendType, KeyValueBackend};
use crate::storage::Storage;

/// JSON file backend implementation
pub struct JsonBackend {
    storage: Storage,
    path: PathBuf,
}

impl JsonBackend {
    /// Creates a new JSON backend for the given file path
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            storage: Storage::new(&path),
            path,
        }
    }

    /// Gets a reference to the underlying Storage
    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}

impl KeyValueBackend for JsonBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Json
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.storage.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.storage.update_atomically(|doc| {
            doc.insert(key.to_string(), value.to_string());
        })?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.storage.update_atomically(|doc| {
            doc.remove(key);
        })?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        // BTreeMap keys are already sorted
        Ok(self.storage.load()?.into_keys().collect())
    }

    /// Check-and-write under a single exclusive lock
    fn seed(&self, key: &str, value: &str) -> Result<bool> {
        let mut wrote = false;
        self.storage.update_atomically(|doc| {
            if !doc.contains_key(key) {
                doc.insert(key.to_string(), value.to_string());
                wrote = true;
            }
        })?;
        Ok(wrote)
    }
}
