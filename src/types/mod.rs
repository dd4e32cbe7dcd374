//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `actor`: Caller identity and roles
//! - `card`: Cards, card numbers and balance changes
//! - `student`: Students, student ids and cn numbers
//! - `reclamation`: Reclamations and their workflow status
//! - `activity`: Audit log entries
//! - `money`: Two-decimal amount handling
//! - `error`: Error types for the ledger core

pub mod activity;
pub mod actor;
pub mod card;
pub mod error;
pub mod money;
pub mod reclamation;
pub mod student;

pub use activity::{ActivityAction, ActivityId, ActivityLogEntry, EntityType, NewActivity, Page};
pub use actor::{Actor, Role, UserId};
pub use card::{BalanceChange, Card, CardId, CardNumber, Operation};
pub use error::LedgerError;
pub use reclamation::{
    Decision, NewReclamation, Reclamation, ReclamationCounts, ReclamationId, ReclamationStatus,
};
pub use student::{Cn, NewStudent, QrPayload, Student, StudentChanges, StudentId};
