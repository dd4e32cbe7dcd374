//! Reclamation types
//!
//! A reclamation is a staff-filed dispute against a student's card. It moves
//! through a small state machine:
//!
//! ```text
//! pending ──┬──> rejected
//!           └──> approved ──┬──> processed
//!                           └──> error
//! ```
//!
//! `rejected`, `processed` and `error` are terminal.

use super::actor::UserId;
use super::card::CardId;
use super::student::StudentId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reclamation identifier, assigned by the system
pub type ReclamationId = u64;

/// Workflow status of a reclamation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReclamationStatus {
    /// Filed by staff, awaiting an administrator decision
    Pending,

    /// Administrator accepted the claim; settlement is in progress
    Approved,

    /// Administrator refused the claim
    Rejected,

    /// Approved and the deduction was applied to the card
    Processed,

    /// Approved but the deduction could not be applied
    Error,
}

impl ReclamationStatus {
    pub const ALL: [ReclamationStatus; 5] = [
        ReclamationStatus::Pending,
        ReclamationStatus::Approved,
        ReclamationStatus::Rejected,
        ReclamationStatus::Processed,
        ReclamationStatus::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReclamationStatus::Pending => "pending",
            ReclamationStatus::Approved => "approved",
            ReclamationStatus::Rejected => "rejected",
            ReclamationStatus::Processed => "processed",
            ReclamationStatus::Error => "error",
        }
    }
}

impl fmt::Display for ReclamationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Administrator decision on a pending reclamation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Rejected,
}

/// A dispute filed by staff against a student's card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reclamation {
    pub id: ReclamationId,

    /// Staff member who filed the reclamation
    pub staff_id: UserId,

    /// Student whose card is charged on approval
    pub student_id: StudentId,

    /// Card of the target student, captured when the reclamation is filed
    pub card_id: CardId,

    /// Amount to deduct on approval, positive, scale 2
    pub amount: Decimal,

    pub reason: String,
    pub evidence: Option<String>,
    pub status: ReclamationStatus,

    /// Administrator who decided the reclamation
    pub admin_id: Option<UserId>,

    /// Administrator notes; settlement failures are appended here
    pub admin_notes: Option<String>,

    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reclamation {
    /// Append a line to the administrator notes
    pub fn append_note(&mut self, note: &str) {
        self.admin_notes = Some(match self.admin_notes.take() {
            Some(existing) if !existing.trim().is_empty() => format!("{existing}\n{note}"),
            _ => note.to_string(),
        });
    }
}

/// Unvalidated input for filing a reclamation
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewReclamation {
    pub student_id: String,
    pub amount: Decimal,
    pub reason: String,
    #[serde(default)]
    pub evidence: Option<String>,
}

/// Number of reclamations per status, for dashboard summaries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReclamationCounts {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub processed: usize,
    pub error: usize,
}

impl ReclamationCounts {
    /// Count one more reclamation in the given status
    pub fn record(&mut self, status: ReclamationStatus) {
        match status {
            ReclamationStatus::Pending => self.pending += 1,
            ReclamationStatus::Approved => self.approved += 1,
            ReclamationStatus::Rejected => self.rejected += 1,
            ReclamationStatus::Processed => self.processed += 1,
            ReclamationStatus::Error => self.error += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.approved + self.rejected + self.processed + self.error
    }
}
