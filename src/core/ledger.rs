//! Balance ledger
//!
//! This module provides the `BalanceLedger` struct, the only component that
//! mutates a card balance after provisioning.
//!
//! # Design
//!
//! Every adjustment runs inside [`CardStore::update`]: the balance is read,
//! checked, and written while the card's entry lock is held, and the audit
//! entry is appended before the new balance is written back. If the audit
//! append fails, the closure returns an error and the card is left untouched,
//! so a balance delta never exists without exactly one audit entry.
//!
//! # Check Order
//!
//! 1. Amount is positive after truncation to two decimals
//! 2. Caller identity is present
//! 3. Subtraction requires the `admin` role
//! 4. The `viewer` role may not adjust at all
//! 5. The card exists
//! 6. A subtraction does not exceed the current balance

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use super::{access, AuditLog, CardStore};
use crate::types::{
    money, ActivityAction, Actor, BalanceChange, Card, CardId, EntityType, LedgerError,
    NewActivity, Operation, Reclamation, ReclamationId, Role,
};

/// A requested balance adjustment
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Adjustment {
    pub card_id: CardId,
    pub amount: Decimal,
    pub operation: Operation,
    /// Free-text reason recorded in the audit details
    #[serde(default)]
    pub reason: Option<String>,
}

impl Adjustment {
    pub fn add(card_id: CardId, amount: Decimal) -> Self {
        Self {
            card_id,
            amount,
            operation: Operation::Add,
            reason: None,
        }
    }

    pub fn subtract(card_id: CardId, amount: Decimal) -> Self {
        Self {
            card_id,
            amount,
            operation: Operation::Subtract,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: &str) -> Self {
        self.reason = Some(reason.to_string());
        self
    }
}

/// Audit context of a single balance mutation
struct Posting<'a> {
    actor: &'a Actor,
    action: ActivityAction,
    reason: Option<&'a str>,
    reclamation_id: Option<ReclamationId>,
}

/// Authoritative card balances
#[derive(Debug)]
pub struct BalanceLedger {
    cards: Arc<CardStore>,
    audit: Arc<AuditLog>,
}

impl BalanceLedger {
    pub fn new(cards: Arc<CardStore>, audit: Arc<AuditLog>) -> Self {
        Self { cards, audit }
    }

    /// Add funds to or subtract funds from a card
    ///
    /// # Arguments
    ///
    /// * `request` - Card, amount, direction and optional reason
    /// * `actor` - Resolved caller identity, if any
    ///
    /// # Returns
    ///
    /// * `Ok(BalanceChange)` - Previous and new balance after the commit
    /// * `Err(LedgerError::ValidationError)` - If the amount is not positive
    /// * `Err(LedgerError::Unauthorized)` - If no actor was supplied
    /// * `Err(LedgerError::Forbidden)` - If the actor's role may not perform the operation
    /// * `Err(LedgerError::NotFound)` - If the card does not exist
    /// * `Err(LedgerError::InsufficientFunds)` - If a subtraction exceeds the balance
    /// * `Err(LedgerError::Internal)` - If the audit entry could not be stored
    pub fn adjust(
        &self,
        request: Adjustment,
        actor: Option<&Actor>,
    ) -> Result<BalanceChange, LedgerError> {
        let amount = money::positive_amount("amount", request.amount)?;
        let actor = authorize_adjust(actor, request.operation)?;
        let reason = request
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty());

        let action = match request.operation {
            Operation::Add => ActivityAction::AddFunds,
            Operation::Subtract => ActivityAction::SubtractFunds,
        };

        self.post(
            request.card_id,
            amount,
            request.operation,
            Posting {
                actor,
                action,
                reason,
                reclamation_id: None,
            },
        )
    }

    /// Deduct an approved reclamation's amount from its card
    ///
    /// Goes through the same checked path as [`BalanceLedger::adjust`], with
    /// the audit entry recorded as `deduct_funds_admin` and carrying the
    /// reclamation id and reason.
    pub(crate) fn settle(
        &self,
        reclamation: &Reclamation,
        admin: &Actor,
    ) -> Result<BalanceChange, LedgerError> {
        let amount = money::positive_amount("amount", reclamation.amount)?;
        let admin = authorize_adjust(Some(admin), Operation::Subtract)?;

        self.post(
            reclamation.card_id,
            amount,
            Operation::Subtract,
            Posting {
                actor: admin,
                action: ActivityAction::DeductFundsAdmin,
                reason: Some(reclamation.reason.as_str()),
                reclamation_id: Some(reclamation.id),
            },
        )
    }

    /// Read-modify-write of one card balance under its entry lock
    fn post(
        &self,
        card_id: CardId,
        amount: Decimal,
        operation: Operation,
        posting: Posting<'_>,
    ) -> Result<BalanceChange, LedgerError> {
        let actor_id = posting.actor.id;
        let result = self.cards.update(card_id, |card| {
            let previous_balance = card.balance;
            let new_balance = match operation {
                Operation::Add => previous_balance.checked_add(amount).ok_or_else(|| {
                    LedgerError::validation("amount", "balance would exceed the supported range")
                })?,
                Operation::Subtract => {
                    if previous_balance < amount {
                        return Err(LedgerError::insufficient_funds(
                            card_id,
                            previous_balance,
                            amount,
                        ));
                    }
                    previous_balance - amount
                }
            };

            let mut details = json!({
                "previous_balance": previous_balance,
                "new_balance": new_balance,
                "amount": amount,
                "operation": operation,
            });
            if let Some(reason) = posting.reason {
                details["reason"] = json!(reason);
            }
            if let Some(reclamation_id) = posting.reclamation_id {
                details["reclamation_id"] = json!(reclamation_id);
            }

            self.audit.record(NewActivity::new(
                actor_id,
                posting.action,
                EntityType::Card,
                card_id,
                details,
            ))?;

            card.balance = new_balance;
            card.updated_at = Utc::now();
            card.updated_by = actor_id;

            Ok(BalanceChange {
                card_id,
                previous_balance,
                new_balance,
                amount,
                operation,
            })
        });

        match &result {
            Ok(change) => tracing::info!(
                card_id,
                actor_id,
                operation = %operation,
                amount = %amount,
                new_balance = %change.new_balance,
                "Card balance adjusted"
            ),
            Err(e) => tracing::warn!(
                card_id,
                actor_id,
                operation = %operation,
                amount = %amount,
                error = %e,
                "Card balance adjustment rejected"
            ),
        }

        result
    }

    /// Mark a card as used
    ///
    /// Marking a card that is already used changes nothing and records no
    /// second audit entry.
    ///
    /// # Returns
    ///
    /// * `Ok(Card)` - The card after the update
    /// * `Err(LedgerError::Unauthorized)` - If no actor was supplied
    /// * `Err(LedgerError::Forbidden)` - If the actor is a viewer
    /// * `Err(LedgerError::NotFound)` - If the card does not exist
    pub fn mark_used(&self, card_id: CardId, actor: Option<&Actor>) -> Result<Card, LedgerError> {
        let actor = access::require(actor, access::WRITERS, "mark cards as used")?;

        self.cards.update(card_id, |card| {
            if card.used {
                return Ok(card.clone());
            }

            self.audit.record(NewActivity::new(
                actor.id,
                ActivityAction::MarkUsed,
                EntityType::Card,
                card_id,
                json!({ "used": true }),
            ))?;

            card.used = true;
            card.updated_at = Utc::now();
            card.updated_by = actor.id;
            tracing::info!(card_id, actor_id = actor.id, "Card marked as used");
            Ok(card.clone())
        })
    }
}

/// Resolve and authorize the caller of a balance adjustment
fn authorize_adjust(actor: Option<&Actor>, operation: Operation) -> Result<&Actor, LedgerError> {
    let actor = access::resolve(actor)?;

    if operation == Operation::Subtract && actor.role != Role::Admin {
        return Err(LedgerError::forbidden(actor.role, "subtract funds"));
    }
    if actor.role == Role::Viewer {
        return Err(LedgerError::forbidden(actor.role, "add funds"));
    }

    Ok(actor)
}
