//! University Card Ledger Library
//! # Overview
//!
//! This library keeps the prepaid balances of university cards, provisions
//! students together with their cards, and settles staff-filed reclamations
//! against those balances. Every mutation leaves an entry in an append-only
//! activity log.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Card, Student, Reclamation, LedgerError, etc.)
//! - [`config`] - Runtime configuration with defaults
//! - [`core`] - Business logic components:
//!   - [`core::ledger`] - Balance adjustments, the only writer of card balances
//!   - [`core::provisioning`] - Atomic student + card creation and lifecycle
//!   - [`core::reclamation`] - Reclamation state machine and settlement
//!   - [`core::audit_log`] - Activity audit trail
//!   - [`core::card_number`] - Card number generation
//!   - [`core::engine`] - Facade shared by the API and roster imports
//! - [`io`] - Roster CSV input and import report output
//! - [`api`] - HTTP surface (axum)
//! - [`cli`] - CLI arguments parsing
//!
//! # Roles
//!
//! - **admin**: Everything, including subtracting funds and settling reclamations
//! - **staff**: Adding funds, provisioning students, filing reclamations
//! - **viewer**: Read-only
//!
//! # Reclamation States
//!
//! ```text
//! pending ──reject──▶ rejected
//!    │
//!    └─approve──▶ approved ──settled──▶ processed
//!                     └──settlement failed──▶ error
//! ```

// Module declarations
pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod types;

pub use crate::core::{Adjustment, CardEngine, ProvisionedStudent, RosterImporter};
pub use io::write_import_report_csv;
pub use types::{
    Actor, Card, CardId, CardNumber, LedgerError, Reclamation, ReclamationId, ReclamationStatus,
    Role, Student, StudentId,
};
