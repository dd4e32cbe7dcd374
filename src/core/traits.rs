//! Core traits for audit persistence and card number generation
//!
//! These are the seams where the ledger core meets interchangeable
//! implementations: the in-memory audit store used in production and tests,
//! or a deterministic card number source for tests that need collisions.

use crate::types::{ActivityLogEntry, CardNumber, EntityType, LedgerError};
use std::fmt::Debug;

/// Trait for persisting audit entries
///
/// Appends are all-or-nothing: either every entry of a call is stored or none
/// is. Entries are never updated or deleted.
pub trait AuditStore: Debug + Send + Sync {
    /// Append a group of entries atomically
    fn append(&self, entries: &[ActivityLogEntry]) -> Result<(), LedgerError>;

    /// All entries for one entity, in insertion order
    fn entries_for(&self, entity_type: EntityType, entity_id: &str) -> Vec<ActivityLogEntry>;
}

/// Trait for producing candidate card numbers
///
/// Implementations carry no uniqueness knowledge; provisioning retries when a
/// candidate collides with an existing card.
pub trait CardNumberSource: Debug + Send + Sync {
    /// Produce the next candidate card number
    fn next_number(&self) -> CardNumber;
}
