//! Key-value storage layer for the tax portal
//!
//! This module provides a trait-based abstraction for the persistent area
//! the portal keeps its collections in, allowing the same store to run over a
//! JSON file, a SQLite database or an in-memory map.

mod json_backend;
mod memory_backend;
mod migration;
mod sqlite_backend;
mod traits;

pub use json_backend::JsonBackend;
pub use memory_backend::MemoryBackend;
pub use migration::{
    copy_all, export_to_json, import_from_json, migrate_json_to_sqlite, migrate_sqlite_to_json,
};
pub use sqlite_backend::SqliteBackend;
pub use traits::{BackendType, DatabaseConfig, DatabaseStats, KeyValueBackend};

use anyhow::Result;
use std::path::Path;

/// Creates a backend based on the file extension or explicit type
pub fn create_backend(
    path: &Path,
    backend_type: Option<BackendType>,
) -> Result<Box<dyn KeyValueBackend>> {
    let bt = backend_type.unwrap_or_else(|| BackendType::from_path(path));

    match bt {
        BackendType::Json => Ok(Box::new(JsonBackend::new(path))),
        BackendType::Sqlite => Ok(Box::new(SqliteBackend::new(path)?)),
        BackendType::Memory => Ok(Box::new(MemoryBackend::new())),
    }
}

/// Creates a backend from a resolved configuration
pub fn open_backend(config: &DatabaseConfig) -> Result<Box<dyn KeyValueBackend>> {
    create_backend(&config.path, Some(config.backend_type))
}
