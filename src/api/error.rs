//! HTTP error mapping to RFC-9457 Problem Details
//!
//! Every `LedgerError` becomes a problem document carrying the stable error
//! `code`, plus the context a client needs for a specific message: the
//! offending `field` for validation and duplicate errors, and the
//! `current_balance` for insufficient funds.

use crate::types::LedgerError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;

/// RFC-9457 Problem Details for HTTP API errors
#[derive(Debug, Serialize)]
pub struct Problem {
    /// A URI reference that identifies the problem type
    #[serde(rename = "type")]
    pub type_uri: String,

    /// A short, human-readable summary of the problem type
    pub title: String,

    /// The HTTP status code
    pub status: u16,

    /// Stable machine-readable error code
    pub code: String,

    /// A human-readable explanation specific to this occurrence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Input field the problem refers to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Card balance at the time of an insufficient-funds failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_balance: Option<Decimal>,
}

impl Problem {
    /// Create a new Problem Details response
    pub fn new(status: StatusCode, title: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            type_uri: format!("https://httpstatuses.io/{}", status.as_u16()),
            title: title.into(),
            status: status.as_u16(),
            code: code.into(),
            detail: None,
            field: None,
            current_balance: None,
        }
    }

    /// Add detail message
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_current_balance(mut self, balance: Decimal) -> Self {
        self.current_balance = Some(balance);
        self
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Status code for each error kind
pub fn status_for(error: &LedgerError) -> StatusCode {
    match error {
        LedgerError::ValidationError { .. } => StatusCode::BAD_REQUEST,
        LedgerError::Unauthorized => StatusCode::UNAUTHORIZED,
        LedgerError::Forbidden { .. } => StatusCode::FORBIDDEN,
        LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
        LedgerError::DuplicateEntry { .. } => StatusCode::CONFLICT,
        LedgerError::InsufficientFunds { .. } => StatusCode::BAD_REQUEST,
        LedgerError::InvalidState { .. } => StatusCode::CONFLICT,
        LedgerError::ResourceExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
        LedgerError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Map ledger errors to HTTP Problem Details
pub fn map_domain_error(error: LedgerError) -> Problem {
    let status = status_for(&error);
    let problem = match &error {
        LedgerError::ValidationError { field, .. } => {
            Problem::new(status, "Validation Error", error.code()).with_field(field)
        }
        LedgerError::Unauthorized => Problem::new(status, "Unauthorized", error.code()),
        LedgerError::Forbidden { .. } => Problem::new(status, "Forbidden", error.code()),
        LedgerError::NotFound { entity, .. } => {
            Problem::new(status, format!("{} Not Found", entity), error.code())
        }
        LedgerError::DuplicateEntry { field, .. } => {
            Problem::new(status, "Duplicate Entry", error.code()).with_field(field)
        }
        LedgerError::InsufficientFunds {
            current_balance, ..
        } => Problem::new(status, "Insufficient Funds", error.code())
            .with_current_balance(*current_balance),
        LedgerError::InvalidState { .. } => Problem::new(status, "Invalid State", error.code()),
        LedgerError::ResourceExhausted { .. } => {
            Problem::new(status, "Resource Exhausted", error.code())
        }
        LedgerError::Internal { message } => {
            tracing::error!(error = %message, "Internal error");
            return Problem::new(status, "Internal Server Error", error.code())
                .with_detail("An unexpected error occurred");
        }
    };
    problem.with_detail(error.to_string())
}

impl From<LedgerError> for Problem {
    fn from(error: LedgerError) -> Self {
        map_domain_error(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityType, ReclamationStatus, Role};
    use rstest::rstest;

    #[rstest]
    #[case(LedgerError::validation("amount", "x"), StatusCode::BAD_REQUEST)]
    #[case(LedgerError::Unauthorized, StatusCode::UNAUTHORIZED)]
    #[case(LedgerError::forbidden(Role::Staff, "subtract funds"), StatusCode::FORBIDDEN)]
    #[case(LedgerError::not_found(EntityType::Card, 1), StatusCode::NOT_FOUND)]
    #[case(LedgerError::duplicate("cn", "12345678"), StatusCode::CONFLICT)]
    #[case(
        LedgerError::insufficient_funds(1, Decimal::ONE, Decimal::TEN),
        StatusCode::BAD_REQUEST
    )]
    #[case(
        LedgerError::invalid_state(1, ReclamationStatus::Rejected),
        StatusCode::CONFLICT
    )]
    #[case(
        LedgerError::ResourceExhausted { attempts: 5 },
        StatusCode::SERVICE_UNAVAILABLE
    )]
    #[case(LedgerError::internal("disk"), StatusCode::INTERNAL_SERVER_ERROR)]
    fn test_status_mapping(#[case] error: LedgerError, #[case] expected: StatusCode) {
        assert_eq!(status_for(&error), expected);
        assert_eq!(map_domain_error(error).status, expected.as_u16());
    }

    #[test]
    fn test_problem_carries_context() {
        let duplicate = map_domain_error(LedgerError::duplicate("cn", "12345678"));
        assert_eq!(duplicate.code, "duplicate_entry");
        assert_eq!(duplicate.field.as_deref(), Some("cn"));

        let funds = map_domain_error(LedgerError::insufficient_funds(
            3,
            Decimal::new(2000, 2),
            Decimal::new(3000, 2),
        ));
        assert_eq!(funds.current_balance, Some(Decimal::new(2000, 2)));
    }

    #[test]
    fn test_internal_detail_is_not_leaked() {
        let problem = map_domain_error(LedgerError::internal("connection string secret"));
        assert_eq!(problem.detail.as_deref(), Some("An unexpected error occurred"));
    }
}
