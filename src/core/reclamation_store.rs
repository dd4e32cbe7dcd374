//! Thread-safe reclamation storage
//!
//! The `reclamations` table. The status column is shared mutable state; it is
//! only changed through [`ReclamationStore::update`], which holds the row's
//! entry lock for the whole closure.

use crate::types::{
    EntityType, LedgerError, Reclamation, ReclamationCounts, ReclamationId, ReclamationStatus,
    StudentId,
};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe reclamation table
#[derive(Debug)]
pub struct ReclamationStore {
    pub(crate) reclamations: DashMap<ReclamationId, Reclamation>,
    next_id: AtomicU64,
}

impl ReclamationStore {
    pub fn new() -> Self {
        Self {
            reclamations: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn allocate_id(&self) -> ReclamationId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn insert(&self, reclamation: Reclamation) {
        self.reclamations.insert(reclamation.id, reclamation);
    }

    pub fn get(&self, id: ReclamationId) -> Option<Reclamation> {
        self.reclamations.get(&id).map(|r| r.value().clone())
    }

    /// Update a reclamation transactionally
    ///
    /// The closure runs on a copy while the row lock is held; concurrent
    /// updates of the same reclamation are serialized, so a status guard
    /// checked inside the closure cannot be raced.
    pub fn update<T, F>(&self, id: ReclamationId, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Reclamation) -> Result<T, LedgerError>,
    {
        let mut entry = self
            .reclamations
            .get_mut(&id)
            .ok_or_else(|| LedgerError::not_found(EntityType::Reclamation, id))?;

        let mut draft = entry.value().clone();
        let result = f(&mut draft)?;
        *entry.value_mut() = draft;
        Ok(result)
    }

    /// Reclamations, newest first, optionally filtered by status
    pub fn list(&self, status: Option<ReclamationStatus>) -> Vec<Reclamation> {
        let mut items: Vec<Reclamation> = self
            .reclamations
            .iter()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .map(|r| r.value().clone())
            .collect();
        items.sort_by(|a, b| b.id.cmp(&a.id));
        items
    }

    /// Aggregate count per status
    pub fn counts(&self) -> ReclamationCounts {
        let mut counts = ReclamationCounts::default();
        for r in self.reclamations.iter() {
            counts.record(r.status);
        }
        counts
    }

    /// Whether any reclamation, in any status, references the student
    pub fn references(&self, student_id: &StudentId) -> bool {
        self.reclamations
            .iter()
            .any(|r| &r.student_id == student_id)
    }
}

impl Default for ReclamationStore {
    fn default() -> Self {
        Self::new()
    }
}
