//! Append-only audit trail of record mutations, stored under `activityLog`

use anyhow::Result;
use chrono::Utc;
use log::debug;

use crate::models::{ActivityLogEntry, ACTIVITY_KEY};
use crate::store::RecordStore;

/// Entity type recorded for tax return mutations
pub const ENTITY_TAX_RETURN: &str = "Tax Return";

pub struct ActivityLog<'a> {
    store: &'a RecordStore,
}

impl<'a> ActivityLog<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    /// Appends an entry stamped with the current time
    ///
    /// The log is unbounded; nothing is ever rotated out.
    pub fn append(&self, action: &str, entity_type: &str, description: &str) -> Result<ActivityLogEntry> {
        let entry = ActivityLogEntry {
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            description: description.to_string(),
            timestamp: Utc::now(),
        };

        let mut entries = self.entries()?;
        entries.push(entry.clone());
        self.store.save(ACTIVITY_KEY, &entries)?;
        debug!("Activity: {} - {}", action, description);

        Ok(entry)
    }

    /// All entries, oldest first
    pub fn entries(&self) -> Result<Vec<ActivityLogEntry>> {
        self.store.load(ACTIVITY_KEY, Vec::new)
    }

    /// The `limit` most recent entries, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<ActivityLogEntry>> {
        Ok(self.entries()?.into_iter().rev().take(limit).collect())
    }
}
