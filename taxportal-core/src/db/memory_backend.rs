//! In-process backend; nothing is written to disk.

use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::traits::{BackendType, KeyValueBackend};

#[derive(Default)]
pub struct MemoryBackend {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            path: PathBuf::from(":memory:"),
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut BTreeMap<String, String>) -> T) -> Result<T> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow!("memory backend mutex poisoned"))?;
        Ok(f(&mut entries))
    }
}

impl KeyValueBackend for MemoryBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Memory
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_entries(|e| e.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.with_entries(|e| {
            e.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.with_entries(|e| {
            e.remove(key);
        })
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.with_entries(|e| e.keys().cloned().collect())
    }

    fn seed(&self, key: &str, value: &str) -> Result<bool> {
        self.with_entries(|e| {
            if e.contains_key(key) {
                return false;
            }
            e.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn exists(&self) -> bool {
        true
    }
}
