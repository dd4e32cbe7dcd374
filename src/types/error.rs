//! Error types for the university card ledger
//!
//! This module defines every error the ledger core can surface to a caller.
//! Each variant carries the context a caller needs to render a specific,
//! actionable message (which field was duplicated, what the current balance is)
//! and maps to a stable machine-readable code via [`LedgerError::code`].
//!
//! # Error Categories
//!
//! - **Input Errors**: malformed amounts, student ids, cn numbers, empty reasons
//! - **Access Errors**: unresolved caller identity, role not allowed for the operation
//! - **State Errors**: missing entities, duplicates, insufficient funds, reclamations
//!   that are no longer pending
//! - **Infrastructure Errors**: card number space exhausted, storage failures

use super::activity::EntityType;
use super::actor::Role;
use super::card::CardId;
use super::reclamation::{ReclamationId, ReclamationStatus};
use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for the ledger core
///
/// Callers branch on the variant (or on [`LedgerError::code`]), never on the
/// rendered message.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Malformed input, always tied to a single field
    #[error("Invalid {field}: {message}")]
    ValidationError {
        /// Name of the offending input field
        field: String,
        /// Description of what is wrong with it
        message: String,
    },

    /// No resolved caller identity was supplied
    #[error("Caller identity is required")]
    Unauthorized,

    /// The caller's role is not allowed to perform the operation
    #[error("Role '{role}' is not allowed to {operation}")]
    Forbidden {
        /// Role of the rejected caller
        role: Role,
        /// Operation that was attempted
        operation: String,
    },

    /// Card, student or reclamation does not exist
    #[error("{entity} '{id}' not found")]
    NotFound {
        /// Kind of entity that was looked up
        entity: EntityType,
        /// Identifier that was looked up
        id: String,
    },

    /// Uniqueness violation on student_id, cn or card_number
    #[error("Duplicate {field}: '{value}' is already in use")]
    DuplicateEntry {
        /// Field whose uniqueness was violated
        field: String,
        /// Value that is already taken
        value: String,
    },

    /// A subtraction exceeds the card balance
    ///
    /// The balance is left unchanged.
    #[error(
        "Insufficient funds on card {card_id}: current balance {current_balance}, requested {requested}"
    )]
    InsufficientFunds {
        /// Card that was charged
        card_id: CardId,
        /// Balance at the time of the attempt
        current_balance: Decimal,
        /// Amount that was requested
        requested: Decimal,
    },

    /// A reclamation was processed after it left `pending`
    #[error("Reclamation {reclamation_id} is {status}, expected pending")]
    InvalidState {
        /// Reclamation that was processed
        reclamation_id: ReclamationId,
        /// Status it is currently in
        status: ReclamationStatus,
    },

    /// Card number generation collided on every attempt
    #[error("Could not generate a unique card number after {attempts} attempts")]
    ResourceExhausted {
        /// Number of generation attempts made
        attempts: usize,
    },

    /// Storage or transport failure
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the failure
        message: String,
    },
}

impl LedgerError {
    /// Stable machine-readable code for this error kind
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::ValidationError { .. } => "validation_error",
            LedgerError::Unauthorized => "unauthorized",
            LedgerError::Forbidden { .. } => "forbidden",
            LedgerError::NotFound { .. } => "not_found",
            LedgerError::DuplicateEntry { .. } => "duplicate_entry",
            LedgerError::InsufficientFunds { .. } => "insufficient_funds",
            LedgerError::InvalidState { .. } => "invalid_state",
            LedgerError::ResourceExhausted { .. } => "resource_exhausted",
            LedgerError::Internal { .. } => "internal",
        }
    }

    /// Create a ValidationError error
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        LedgerError::ValidationError {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Create a Forbidden error
    pub fn forbidden(role: Role, operation: &str) -> Self {
        LedgerError::Forbidden {
            role,
            operation: operation.to_string(),
        }
    }

    /// Create a NotFound error
    pub fn not_found(entity: EntityType, id: impl ToString) -> Self {
        LedgerError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Create a DuplicateEntry error
    pub fn duplicate(field: &str, value: impl ToString) -> Self {
        LedgerError::DuplicateEntry {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(card_id: CardId, current_balance: Decimal, requested: Decimal) -> Self {
        LedgerError::InsufficientFunds {
            card_id,
            current_balance,
            requested,
        }
    }

    /// Create an InvalidState error
    pub fn invalid_state(reclamation_id: ReclamationId, status: ReclamationStatus) -> Self {
        LedgerError::InvalidState {
            reclamation_id,
            status,
        }
    }

    /// Create an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        LedgerError::Internal {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(error: serde_json::Error) -> Self {
        LedgerError::internal(format!("serialization failed: {error}"))
    }
}
