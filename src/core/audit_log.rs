//! Activity audit log
//!
//! This module provides the append-only audit trail of every balance mutation
//! and entity lifecycle event.
//!
//! # Failure Policy
//!
//! - Mutating operations call [`AuditLog::record`] / [`AuditLog::record_all`]
//!   while their own row locks are held and before they commit; an audit
//!   failure aborts the mutation, so a change never exists without its entry.
//! - Read-only events go through [`AuditLog::log_view`], which swallows
//!   failures after logging a warning.

use super::traits::AuditStore;
use crate::config::LedgerConfig;
use crate::types::{
    ActivityAction, ActivityLogEntry, EntityType, LedgerError, NewActivity, Page, UserId,
};
use chrono::Utc;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// In-memory audit store
///
/// Entries are kept in insertion order behind a single read-write lock, so a
/// group append is visible all at once.
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    entries: RwLock<Vec<ActivityLogEntry>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl AuditStore for InMemoryAuditStore {
    fn append(&self, entries: &[ActivityLogEntry]) -> Result<(), LedgerError> {
        self.entries.write().extend_from_slice(entries);
        Ok(())
    }

    fn entries_for(&self, entity_type: EntityType, entity_id: &str) -> Vec<ActivityLogEntry> {
        self.entries
            .read()
            .iter()
            .filter(|entry| entry.entity_type == entity_type && entry.entity_id == entity_id)
            .cloned()
            .collect()
    }
}

/// Audit log front-end: assigns ids and timestamps, applies the failure policy
#[derive(Debug)]
pub struct AuditLog {
    store: Arc<dyn AuditStore>,
    next_id: AtomicU64,
    default_page_size: usize,
    max_page_size: usize,
}

impl AuditLog {
    pub fn new(store: Arc<dyn AuditStore>, config: &LedgerConfig) -> Self {
        Self {
            store,
            next_id: AtomicU64::new(1),
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
        }
    }

    fn stamp(&self, activity: NewActivity) -> ActivityLogEntry {
        ActivityLogEntry {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            user_id: activity.user_id,
            action: activity.action,
            entity_type: activity.entity_type,
            entity_id: activity.entity_id,
            details: activity.details,
            created_at: Utc::now(),
        }
    }

    /// Append one entry; errors propagate to the calling transaction
    pub fn record(&self, activity: NewActivity) -> Result<ActivityLogEntry, LedgerError> {
        let entry = self.stamp(activity);
        self.store.append(std::slice::from_ref(&entry))?;
        Ok(entry)
    }

    /// Append several entries as one unit; errors propagate
    pub fn record_all(
        &self,
        activities: Vec<NewActivity>,
    ) -> Result<Vec<ActivityLogEntry>, LedgerError> {
        let entries: Vec<ActivityLogEntry> =
            activities.into_iter().map(|a| self.stamp(a)).collect();
        self.store.append(&entries)?;
        Ok(entries)
    }

    /// Append one entry from its parts
    pub fn log(
        &self,
        user_id: UserId,
        action: ActivityAction,
        entity_type: EntityType,
        entity_id: &str,
        details: serde_json::Value,
    ) -> Result<(), LedgerError> {
        self.record(NewActivity::new(
            user_id,
            action,
            entity_type,
            entity_id,
            details,
        ))
        .map(|_| ())
    }

    /// Best-effort logging of a read-only event
    pub fn log_view(&self, user_id: UserId, entity_type: EntityType, entity_id: &str) {
        let activity = NewActivity::new(
            user_id,
            ActivityAction::View,
            entity_type,
            entity_id,
            serde_json::Value::Null,
        );
        if let Err(e) = self.record(activity) {
            tracing::warn!(
                entity_type = %entity_type,
                entity_id,
                error = %e,
                "Failed to log view event"
            );
        }
    }

    /// Entries for one entity, newest first
    ///
    /// # Arguments
    ///
    /// * `entity_type` - Kind of entity
    /// * `entity_id` - Identifier of the entity
    /// * `page` - Offset and limit; a zero limit uses the configured default,
    ///   and limits are capped at the configured maximum
    pub fn get(&self, entity_type: EntityType, entity_id: &str, page: Page) -> Vec<ActivityLogEntry> {
        let limit = match page.limit {
            0 => self.default_page_size,
            n => n.min(self.max_page_size),
        };

        let mut entries = self.store.entries_for(entity_type, entity_id);
        // Ids are assigned monotonically, so they order entries even when
        // timestamps collide
        entries.sort_by(|a, b| b.id.cmp(&a.id));
        entries.into_iter().skip(page.offset).take(limit).collect()
    }
}
