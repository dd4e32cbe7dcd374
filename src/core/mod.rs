//! Core business logic module
//!
//! This module contains the ledger core components:
//! - `traits` - Trait abstractions for audit persistence and card number sources
//! - `card_number` - Card number generation
//! - `card_store`, `student_store`, `reclamation_store` - Thread-safe tables
//! - `audit_log` - Append-only activity trail
//! - `ledger` - Balance adjustments (the only balance writer)
//! - `provisioning` - Student and card lifecycle
//! - `reclamation` - Reclamation state machine
//! - `engine` - Facade wiring the components together
//! - `batch_import` - Concurrent roster provisioning
//!
//! # Lock Order
//!
//! Operations that hold more than one row lock take them in this order:
//! students, reclamations, cn index, card number index, cards, audit log.

mod access;
pub mod audit_log;
pub mod batch_import;
pub mod card_number;
pub mod card_store;
pub mod engine;
pub mod ledger;
pub mod provisioning;
pub mod reclamation;
pub mod reclamation_store;
pub mod student_store;
pub mod traits;

pub use audit_log::{AuditLog, InMemoryAuditStore};
pub use batch_import::{ImportOutcome, ImportSummary, RosterImporter};
pub use card_number::RandomCardNumbers;
pub use card_store::CardStore;
pub use engine::CardEngine;
pub use ledger::{Adjustment, BalanceLedger};
pub use provisioning::{ProvisionedStudent, Provisioning};
pub use reclamation::ReclamationWorkflow;
pub use reclamation_store::ReclamationStore;
pub use student_store::StudentStore;
pub use traits::{AuditStore, CardNumberSource};
