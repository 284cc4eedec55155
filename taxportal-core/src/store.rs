//! Typed record store over a key-value backend
//!
//! Collections are stored whole under a single key and overwritten wholesale
//! on every save. Reads seed missing keys and fail closed on corrupt payloads:
//! an unparseable value is discarded and replaced by the seed.

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;

use crate::db::{self, BackendType, DatabaseConfig, KeyValueBackend, MemoryBackend};

pub struct RecordStore {
    backend: Box<dyn KeyValueBackend>,
}

impl RecordStore {
    pub fn new(backend: Box<dyn KeyValueBackend>) -> Self {
        Self { backend }
    }

    /// Opens the store at `path`, inferring the backend from the extension
    pub fn open(path: &Path, backend_type: Option<BackendType>) -> Result<Self> {
        Ok(Self::new(db::create_backend(path, backend_type)?))
    }

    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Ok(Self::new(db::open_backend(config)?))
    }

    /// A store that lives only as long as the process
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryBackend::new()))
    }

    pub fn backend(&self) -> &dyn KeyValueBackend {
        self.backend.as_ref()
    }

    /// Returns the value under `key`, writing and returning `seed` if the key
    /// is absent or its payload cannot be parsed
    ///
    /// An absent key is filled through [`KeyValueBackend::seed`], so a value
    /// written by another process in the meantime is kept and returned.
    pub fn load<T, F>(&self, key: &str, seed: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        let corrupt = match self.backend.get(key)? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    debug!("Loaded '{}' ({} bytes)", key, raw.len());
                    return Ok(value);
                }
                Err(e) => {
                    warn!("Discarding corrupt payload under '{}': {}", key, e);
                    true
                }
            },
            None => false,
        };

        let value = seed();
        if corrupt {
            self.save(key, &value)?;
            debug!("Reseeded '{}'", key);
            return Ok(value);
        }

        let raw = serde_json::to_string(&value)
            .with_context(|| format!("Failed to serialize '{}'", key))?;
        if self.backend.seed(key, &raw)? {
            debug!("Seeded '{}'", key);
            return Ok(value);
        }

        // Lost the race to another writer; theirs wins
        match self.backend.get(key)? {
            Some(existing) => match serde_json::from_str(&existing) {
                Ok(current) => Ok(current),
                Err(e) => {
                    warn!("Discarding corrupt payload under '{}': {}", key, e);
                    self.backend.set(key, &raw)?;
                    Ok(value)
                }
            },
            None => {
                self.backend.set(key, &raw)?;
                Ok(value)
            }
        }
    }

    /// Returns the value under `key` if present and parseable
    ///
    /// A corrupt payload is removed so the next read starts clean.
    pub fn load_optional<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let Some(raw) = self.backend.get(key)? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("Removing corrupt payload under '{}': {}", key, e);
                self.backend.remove(key)?;
                Ok(None)
            }
        }
    }

    /// Overwrites the value under `key`
    pub fn save<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let raw = serde_json::to_string(value)
            .with_context(|| format!("Failed to serialize '{}'", key))?;
        self.backend.set(key, &raw)?;
        debug!("Saved '{}' ({} bytes)", key, raw.len());
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.backend.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_seeds_missing_key() {
        let store = RecordStore::in_memory();
        let loaded: Vec<u32> = store.load("numbers", || vec![1, 2, 3]).unwrap();
        assert_eq!(loaded, vec![1, 2, 3]);
        assert_eq!(store.backend().get("numbers").unwrap().as_deref(), Some("[1,2,3]"));

        // Seed is not consulted once the key exists
        let again: Vec<u32> = store.load("numbers", Vec::new).unwrap();
        assert_eq!(again, vec![1, 2, 3]);
    }

    /// Backend where another writer fills the key just before `seed` runs
    struct ContendedBackend {
        inner: MemoryBackend,
        other_writer: &'static str,
    }

    impl KeyValueBackend for ContendedBackend {
        fn backend_type(&self) -> BackendType {
            BackendType::Memory
        }

        fn path(&self) -> &Path {
            self.inner.path()
        }

        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.inner.remove(key)
        }

        fn keys(&self) -> Result<Vec<String>> {
            self.inner.keys()
        }

        fn seed(&self, key: &str, value: &str) -> Result<bool> {
            self.inner.set(key, self.other_writer)?;
            self.inner.seed(key, value)
        }
    }

    #[test]
    fn test_load_keeps_value_written_during_seed() {
        let store = RecordStore::new(Box::new(ContendedBackend {
            inner: MemoryBackend::new(),
            other_writer: "[42]",
        }));

        let loaded: Vec<u32> = store.load("numbers", || vec![1, 2, 3]).unwrap();
        assert_eq!(loaded, vec![42]);
        assert_eq!(store.backend().get("numbers").unwrap().as_deref(), Some("[42]"));
    }

    #[test]
    fn test_save_overwrites_wholesale() {
        let store = RecordStore::in_memory();
        store.save("numbers", &vec![1, 2]).unwrap();
        store.save("numbers", &vec![9]).unwrap();
        let loaded: Vec<u32> = store.load("numbers", Vec::new).unwrap();
        assert_eq!(loaded, vec![9]);
    }

    #[test]
    fn test_corrupt_payload_is_reseeded() {
        let store = RecordStore::in_memory();
        store.backend().set("numbers", "[1, 2,").unwrap();

        let loaded: Vec<u32> = store.load("numbers", || vec![7]).unwrap();
        assert_eq!(loaded, vec![7]);
        assert_eq!(store.backend().get("numbers").unwrap().as_deref(), Some("[7]"));
    }

    #[test]
    fn test_load_optional_removes_corrupt_payload() {
        let store = RecordStore::in_memory();
        assert_eq!(store.load_optional::<String>("demoUser").unwrap(), None);

        store.backend().set("demoUser", "not json").unwrap();
        assert_eq!(store.load_optional::<String>("demoUser").unwrap(), None);
        assert!(store.backend().get("demoUser").unwrap().is_none());
    }

    #[test]
    fn test_open_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("portal.json");
        {
            let store = RecordStore::open(&path, None).unwrap();
            store.save("notes", &"hello").unwrap();
        }
        let store = RecordStore::open(&path, None).unwrap();
        assert_eq!(store.load_optional::<String>("notes").unwrap().as_deref(), Some("hello"));
    }
}
