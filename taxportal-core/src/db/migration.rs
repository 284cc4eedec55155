//! Migration utilities for moving a key-value area between backends
//!
//! This module copies every key between JSON and SQLite backends, and dumps
//! or restores the whole area as a JSON backup file.

use anyhow::{Context, Result};
use log::{info, warn};
use serde_json::{Map, Value};
use std::path::Path;

use super::traits::KeyValueBackend;
use super::{JsonBackend, SqliteBackend};

/// Copies every key from `source` into `target`, overwriting existing keys
///
/// # Returns
/// The number of keys copied
pub fn copy_all(source: &dyn KeyValueBackend, target: &dyn KeyValueBackend) -> Result<usize> {
    let keys = source.keys()?;
    for key in &keys {
        if let Some(value) = source.get(key)? {
            target.set(key, &value)?;
        }
    }
    info!(
        "Copied {} keys from {} ({:?}) to {} ({:?})",
        keys.len(),
        source.backend_type(),
        source.path(),
        target.backend_type(),
        target.path()
    );
    Ok(keys.len())
}

/// Migrates data from a JSON file to a SQLite database
///
/// # Returns
/// The number of keys migrated
pub fn migrate_json_to_sqlite<P1: AsRef<Path>, P2: AsRef<Path>>(
    json_path: P1,
    sqlite_path: P2,
) -> Result<usize> {
    let json_backend = JsonBackend::new(json_path);
    let sqlite_backend = SqliteBackend::new(sqlite_path)?;
    copy_all(&json_backend, &sqlite_backend).context("Failed to migrate JSON to SQLite")
}

/// Migrates data from a SQLite database to a JSON file
///
/// # Returns
/// The number of keys migrated
pub fn migrate_sqlite_to_json<P1: AsRef<Path>, P2: AsRef<Path>>(
    sqlite_path: P1,
    json_path: P2,
) -> Result<usize> {
    let sqlite_backend = SqliteBackend::new(sqlite_path)?;
    let json_backend = JsonBackend::new(json_path);
    copy_all(&sqlite_backend, &json_backend).context("Failed to migrate SQLite to JSON")
}

/// Exports every key of a backend to a pretty-printed JSON object
///
/// Values are embedded as parsed JSON so the backup is readable. A value that
/// does not parse is left out with a warning, the same way the record store
/// discards corrupt payloads.
///
/// # Returns
/// The number of keys exported
pub fn export_to_json<P: AsRef<Path>>(backend: &dyn KeyValueBackend, json_path: P) -> Result<usize> {
    let mut object = Map::new();
    for key in backend.keys()? {
        if let Some(raw) = backend.get(&key)? {
            match serde_json::from_str(&raw) {
                Ok(value) => {
                    object.insert(key, value);
                }
                Err(e) => warn!("Skipping corrupt payload under '{}' in export: {}", key, e),
            }
        }
    }

    let count = object.len();
    let json = serde_json::to_string_pretty(&Value::Object(object))
        .context("Failed to serialize to JSON")?;
    std::fs::write(json_path, json).context("Failed to write JSON file")?;

    Ok(count)
}

/// Imports a JSON backup produced by [`export_to_json`] into a backend
///
/// # Returns
/// The number of keys written
pub fn import_from_json<P: AsRef<Path>>(backend: &dyn KeyValueBackend, json_path: P) -> Result<usize> {
    let json = std::fs::read_to_string(json_path).context("Failed to read JSON file")?;
    let object: Map<String, Value> =
        serde_json::from_str(&json).context("Backup file is not a JSON object")?;

    for (key, value) in &object {
        backend.set(key, &value.to_string())?;
    }

    Ok(object.len())
}
