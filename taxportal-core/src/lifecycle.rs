//! Return lifecycle: create, edit, status changes and deletion
//!
//! Every mutation loads the `returns` collection, applies the change,
//! persists the whole collection and appends an activity-log entry.
//! Validation failures leave storage untouched.

use log::info;

use crate::activity::{ActivityLog, ENTITY_TAX_RETURN};
use crate::error::{PortalError, PortalResult};
use crate::models::{
    new_id, today, ReturnInput, ReturnPatch, ReturnStats, ReturnStatus, TaxReturn, RETURNS_KEY,
};
use crate::seed::seed_returns;
use crate::store::RecordStore;

/// Message shown when a return is submitted without attachments
pub const NO_DOCUMENTS_MESSAGE: &str = "Please upload at least one document";

pub struct ReturnController<'a> {
    store: &'a RecordStore,
    activity: ActivityLog<'a>,
}

impl<'a> ReturnController<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self {
            store,
            activity: ActivityLog::new(store),
        }
    }

    /// All returns, newest first; seeds the demo returns on first access
    pub fn list(&self) -> PortalResult<Vec<TaxReturn>> {
        Ok(self.store.load(RETURNS_KEY, seed_returns)?)
    }

    pub fn get(&self, id: &str) -> PortalResult<TaxReturn> {
        self.list()?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| PortalError::NotFound(id.to_string()))
    }

    pub fn stats(&self) -> PortalResult<ReturnStats> {
        Ok(ReturnStats::from_returns(&self.list()?))
    }

    fn save(&self, returns: &[TaxReturn]) -> PortalResult<()> {
        Ok(self.store.save(RETURNS_KEY, returns)?)
    }

    /// Creates a Pending return and puts it at the head of the collection
    pub fn create(&self, input: ReturnInput) -> PortalResult<TaxReturn> {
        if input.documents.is_empty() {
            return Err(PortalError::validation(NO_DOCUMENTS_MESSAGE));
        }

        let mut returns = self.list()?;
        let now = today();
        let tax_return = TaxReturn {
            id: new_id(),
            name: input.name.filter(|n| !n.trim().is_empty()),
            return_type: input.return_type,
            status: ReturnStatus::Pending,
            document_count: input.documents.len(),
            documents: input.documents,
            notes: input.notes,
            created_date: now,
            last_updated: now,
        };

        returns.insert(0, tax_return.clone());
        self.save(&returns)?;
        self.activity.append(
            "Tax Return Created",
            ENTITY_TAX_RETURN,
            &format!("New {} return created", tax_return.return_type),
        )?;

        info!("Created return {} ({})", tax_return.id, tax_return.return_type);
        Ok(tax_return)
    }

    /// Merges `patch` into the return with `id`
    pub fn update(&self, id: &str, patch: ReturnPatch) -> PortalResult<TaxReturn> {
        if matches!(&patch.documents, Some(docs) if docs.is_empty()) {
            return Err(PortalError::validation(NO_DOCUMENTS_MESSAGE));
        }

        let mut returns = self.list()?;
        let existing = returns
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| PortalError::NotFound(id.to_string()))?;

        if let Some(name) = patch.name {
            existing.name = Some(name).filter(|n| !n.trim().is_empty());
        }
        if let Some(return_type) = patch.return_type {
            existing.return_type = return_type;
        }
        if let Some(documents) = patch.documents {
            existing.documents = documents;
        }
        if let Some(notes) = patch.notes {
            existing.notes = notes;
        }
        existing.document_count = existing.documents.len();
        existing.last_updated = today();

        let updated = existing.clone();
        self.save(&returns)?;
        self.activity.append(
            "Tax Return Updated",
            ENTITY_TAX_RETURN,
            &format!("Return #{} was modified", updated.id),
        )?;

        info!("Updated return {}", updated.id);
        Ok(updated)
    }

    /// Overwrites the status; every transition is permitted
    pub fn set_status(&self, id: &str, status: ReturnStatus) -> PortalResult<TaxReturn> {
        let mut returns = self.list()?;
        let existing = returns
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| PortalError::NotFound(id.to_string()))?;

        existing.status = status;
        existing.last_updated = today();

        let updated = existing.clone();
        self.save(&returns)?;
        self.activity.append(
            "Status Updated",
            ENTITY_TAX_RETURN,
            &format!(
                "Return {} status changed to {}",
                updated.name.clone().unwrap_or_else(|| format!("#{}", updated.id)),
                status
            ),
        )?;

        info!("Return {} is now {}", updated.id, status);
        Ok(updated)
    }

    /// Physically removes the return with `id`
    pub fn delete(&self, id: &str) -> PortalResult<()> {
        let mut returns = self.list()?;
        let original_len = returns.len();
        returns.retain(|r| r.id != id);
        if returns.len() == original_len {
            return Err(PortalError::NotFound(id.to_string()));
        }

        self.save(&returns)?;
        self.activity.append(
            "Tax Return Deleted",
            ENTITY_TAX_RETURN,
            &format!("Return #{} was deleted", id),
        )?;

        info!("Deleted return {}", id);
        Ok(())
    }
}

/// Case-insensitive substring search over name, type and status
///
/// An empty term matches everything; order is preserved.
pub fn filter<'r>(returns: &'r [TaxReturn], term: &str) -> Vec<&'r TaxReturn> {
    let needle = term.to_lowercase();
    returns
        .iter()
        .filter(|r| {
            r.name
                .as_deref()
                .is_some_and(|n| n.to_lowercase().contains(&needle))
                || r.return_type.code().contains(&needle)
                || r.status.label().to_lowercase().contains(&needle)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachments::{AttachmentPolicy, FileCandidate};
    use crate::models::{Document, ReturnType, ACTIVITY_KEY};

    fn documents(n: usize) -> Vec<Document> {
        let policy = AttachmentPolicy::default();
        let files: Vec<_> = (0..n)
            .map(|i| FileCandidate::new(format!("doc{}.pdf", i), "application/pdf", 1024))
            .collect();
        policy.accept_batch(&files).accepted
    }

    fn input(n_docs: usize) -> ReturnInput {
        ReturnInput {
            documents: documents(n_docs),
            notes: "first filing".to_string(),
            ..ReturnInput::new(ReturnType::Form1040)
        }
    }

    #[test]
    fn test_create_persists_pending_return_at_head() {
        let store = RecordStore::in_memory();
        let controller = ReturnController::new(&store);

        let created = controller.create(input(2)).unwrap();
        assert_eq!(created.status, ReturnStatus::Pending);
        assert_eq!(created.document_count, 2);
        assert_eq!(created.created_date, today());
        assert_eq!(created.last_updated, today());

        let returns: Vec<TaxReturn> = store.load(RETURNS_KEY, Vec::new).unwrap();
        assert_eq!(returns[0], created);
        assert_eq!(returns.len(), seed_returns().len() + 1);

        let log = ActivityLog::new(&store).entries().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].action, "Tax Return Created");
        assert_eq!(log[0].description, "New 1040 return created");
    }

    #[test]
    fn test_create_assigns_unique_ids() {
        let store = RecordStore::in_memory();
        let controller = ReturnController::new(&store);
        let a = controller.create(input(1)).unwrap();
        let b = controller.create(input(1)).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_create_without_documents_has_no_side_effects() {
        let store = RecordStore::in_memory();
        let controller = ReturnController::new(&store);

        let err = controller.create(input(0)).unwrap_err();
        assert!(matches!(err, PortalError::Validation(_)));
        assert_eq!(err.to_string(), "Please upload at least one document");
        assert!(store.backend().keys().unwrap().is_empty());
    }

    #[test]
    fn test_update_merges_fields_and_refreshes_count() {
        let store = RecordStore::in_memory();
        let controller = ReturnController::new(&store);
        let created = controller.create(input(1)).unwrap();

        let updated = controller
            .update(
                &created.id,
                ReturnPatch {
                    return_type: Some(ReturnType::Form1065),
                    documents: Some(documents(3)),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.return_type, ReturnType::Form1065);
        assert_eq!(updated.document_count, 3);
        assert_eq!(updated.notes, "first filing");
        assert_eq!(updated.status, ReturnStatus::Pending);
        assert_eq!(controller.get(&created.id).unwrap(), updated);

        let log = ActivityLog::new(&store).recent(1).unwrap();
        assert_eq!(log[0].description, format!("Return #{} was modified", created.id));
    }

    #[test]
    fn test_update_rejects_emptying_documents() {
        let store = RecordStore::in_memory();
        let controller = ReturnController::new(&store);
        let created = controller.create(input(1)).unwrap();

        let err = controller
            .update(
                &created.id,
                ReturnPatch {
                    documents: Some(Vec::new()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.to_string(), NO_DOCUMENTS_MESSAGE);
        assert_eq!(controller.get(&created.id).unwrap().document_count, 1);
    }

    #[test]
    fn test_update_unknown_id() {
        let store = RecordStore::in_memory();
        let controller = ReturnController::new(&store);
        let err = controller.update("nope", ReturnPatch::default()).unwrap_err();
        assert!(matches!(err, PortalError::NotFound(id) if id == "nope"));
    }

    #[test]
    fn test_set_status_allows_any_transition() {
        let store = RecordStore::in_memory();
        let controller = ReturnController::new(&store);

        // Seeded return "1" is Completed
        let reopened = controller.set_status("1", ReturnStatus::Pending).unwrap();
        assert_eq!(reopened.status, ReturnStatus::Pending);
        assert_eq!(reopened.last_updated, today());
        assert_eq!(controller.get("1").unwrap().status, ReturnStatus::Pending);

        let log = ActivityLog::new(&store).entries().unwrap();
        assert_eq!(log[0].action, "Status Updated");
        assert_eq!(log[0].description, "Return John Smith status changed to Pending");
    }

    #[test]
    fn test_status_log_for_unnamed_return_uses_id() {
        let store = RecordStore::in_memory();
        let controller = ReturnController::new(&store);
        let created = controller.create(input(1)).unwrap();
        assert_eq!(created.display_name(), format!("Return #{}", created.id));

        controller.set_status(&created.id, ReturnStatus::Completed).unwrap();
        let log = ActivityLog::new(&store).entries().unwrap();
        assert_eq!(
            log.last().unwrap().description,
            format!("Return #{} status changed to Completed", created.id)
        );
    }

    #[test]
    fn test_delete_removes_record() {
        let store = RecordStore::in_memory();
        let controller = ReturnController::new(&store);
        let created = controller.create(input(1)).unwrap();

        controller.delete(&created.id).unwrap();
        let returns: Vec<TaxReturn> = store.load(RETURNS_KEY, Vec::new).unwrap();
        assert!(returns.iter().all(|r| r.id != created.id));

        assert!(matches!(
            controller.delete(&created.id),
            Err(PortalError::NotFound(_))
        ));

        let raw = store.backend().get(ACTIVITY_KEY).unwrap().unwrap();
        assert!(raw.contains(&format!("Return #{} was deleted", created.id)));
    }

    #[test]
    fn test_filter() {
        let returns = seed_returns();

        let all = filter(&returns, "");
        assert_eq!(all.len(), returns.len());
        assert!(all.iter().zip(&returns).all(|(a, b)| a.id == b.id));

        let by_name = filter(&returns, "SMITH");
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].id, "1");

        let by_type = filter(&returns, "1065");
        assert_eq!(by_type.len(), 1);

        let by_status = filter(&returns, "in review");
        assert_eq!(by_status.len(), 1);
        assert_eq!(by_status[0].id, "2");

        assert!(filter(&returns, "zzz").is_empty());
    }

    #[test]
    fn test_stats_follow_mutations() {
        let store = RecordStore::in_memory();
        let controller = ReturnController::new(&store);
        let before = controller.stats().unwrap();

        controller.create(input(1)).unwrap();
        let after = controller.stats().unwrap();
        assert_eq!(after.total, before.total + 1);
        assert_eq!(after.pending, before.pending + 1);
    }
}
