//! Key-value backend abstraction
//!
//! This module defines the port every persistent area must implement. Values
//! are opaque JSON strings; typed access lives in [`crate::store::RecordStore`].

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Types of key-value backends available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// Single JSON file with advisory locking
    Json,
    /// SQLite database with a single `kv_store` table
    Sqlite,
    /// Process-local map, nothing touches disk
    Memory,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::Json => write!(f, "JSON"),
            BackendType::Sqlite => write!(f, "SQLite"),
            BackendType::Memory => write!(f, "memory"),
        }
    }
}

impl BackendType {
    /// Infers the backend from a file extension, defaulting to JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("db") | Some("sqlite") | Some("sqlite3") => BackendType::Sqlite,
            _ => BackendType::Json,
        }
    }
}

/// Configuration for key-value backends
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the backing file
    pub path: PathBuf,
    /// Backend type
    pub backend_type: BackendType,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("portal.json"),
            backend_type: BackendType::Json,
        }
    }
}

/// Core trait for key-value backends
///
/// The contract mirrors browser local storage: string keys, string values,
/// whole-value overwrites and last writer wins.
pub trait KeyValueBackend: Send + Sync {
    /// Returns the backend type
    fn backend_type(&self) -> BackendType;

    /// Returns the path to the backing file
    fn path(&self) -> &Path;

    /// Reads the raw value stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrites the raw value stored under `key`
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<()>;

    /// Lists every stored key in ascending order
    fn keys(&self) -> Result<Vec<String>>;

    /// Writes `value` only when `key` is absent; returns true if it wrote
    fn seed(&self, key: &str, value: &str) -> Result<bool> {
        if self.get(key)?.is_some() {
            return Ok(false);
        }
        self.set(key, value)?;
        Ok(true)
    }

    // =========================================================================
    // Utility Operations
    // =========================================================================

    /// Returns true if the backing file exists
    fn exists(&self) -> bool {
        self.path().exists()
    }

    /// Returns statistics about the backend
    fn stats(&self) -> Result<DatabaseStats> {
        let keys = self.keys()?;
        let mut total_bytes = 0;
        for key in &keys {
            total_bytes += self.get(key)?.map(|v| v.len()).unwrap_or(0);
        }
        Ok(DatabaseStats {
            key_count: keys.len(),
            total_bytes,
            backend_type: self.backend_type(),
        })
    }
}

/// Statistics about a key-value area
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub key_count: usize,
    pub total_bytes: usize,
    pub backend_type: BackendType,
}
