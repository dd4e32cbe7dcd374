//! Request and response bodies of the HTTP surface
//!
//! Domain types that already have the right wire shape (`Card`, `Student`,
//! `Reclamation`, `BalanceChange`, ...) are serialized directly; this module
//! only holds the shapes that exist purely at the HTTP boundary.

use crate::core::Adjustment;
use crate::types::{CardId, Decision, Operation, ReclamationStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Body of `PUT /cards/{card_id}/balance`
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceRequest {
    pub amount: Decimal,
    pub operation: Operation,
    #[serde(default)]
    pub reason: Option<String>,
}

impl BalanceRequest {
    pub fn into_adjustment(self, card_id: CardId) -> Adjustment {
        Adjustment {
            card_id,
            amount: self.amount,
            operation: self.operation,
            reason: self.reason,
        }
    }
}

/// Body of `PUT /reclamations/{id}/process`
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessRequest {
    pub status: Decision,
    #[serde(default)]
    pub admin_notes: Option<String>,
}

/// Query of `GET /reclamations`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReclamationListQuery {
    #[serde(default)]
    pub status: Option<ReclamationStatus>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_request_accepts_numbers_and_strings() {
        let from_number: BalanceRequest =
            serde_json::from_str(r#"{"amount": 12.5, "operation": "add"}"#).unwrap();
        let from_string: BalanceRequest =
            serde_json::from_str(r#"{"amount": "12.50", "operation": "subtract", "reason": "fine"}"#)
                .unwrap();

        assert_eq!(from_number.amount, Decimal::new(125, 1));
        assert_eq!(from_string.operation, Operation::Subtract);

        let adjustment = from_string.into_adjustment(4);
        assert_eq!(adjustment.card_id, 4);
        assert_eq!(adjustment.reason.as_deref(), Some("fine"));
    }

    #[test]
    fn test_process_request_rejects_unknown_decision() {
        let result: Result<ProcessRequest, _> =
            serde_json::from_str(r#"{"status": "processed"}"#);
        assert!(result.is_err());
    }
}
