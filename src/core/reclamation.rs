//! Reclamation workflow
//!
//! This module provides the `ReclamationWorkflow` struct, which turns a
//! staff-filed dispute into an approved, rejected, processed or error outcome.
//!
//! # Processing
//!
//! `process` runs entirely inside [`ReclamationStore::update`], so the
//! `pending` guard and every status change happen under the reclamation's
//! entry lock. Two admins processing the same reclamation are serialized; the
//! second one sees a non-pending status and fails with `InvalidState`, which
//! rules out a double deduction.
//!
//! An approval moves the reclamation to `approved` and immediately settles it
//! through the ledger:
//!
//! - settlement succeeds: `processed`
//! - settlement fails: `error`, with the failure appended to `admin_notes`,
//!   and the failure is returned to the caller
//! - the card is gone: `NotFound`, and the reclamation stays `pending`

use std::sync::Arc;

use chrono::Utc;

use super::{access, BalanceLedger, ReclamationStore, StudentStore};
use crate::types::{
    money, Actor, Decision, EntityType, LedgerError, NewReclamation, Reclamation,
    ReclamationCounts, ReclamationId, ReclamationStatus, Role, StudentId,
};

/// Reclamation state machine on top of the ledger
#[derive(Debug)]
pub struct ReclamationWorkflow {
    students: Arc<StudentStore>,
    reclamations: Arc<ReclamationStore>,
    ledger: Arc<BalanceLedger>,
}

impl ReclamationWorkflow {
    pub fn new(
        students: Arc<StudentStore>,
        reclamations: Arc<ReclamationStore>,
        ledger: Arc<BalanceLedger>,
    ) -> Self {
        Self {
            students,
            reclamations,
            ledger,
        }
    }

    /// File a reclamation against a student's card
    ///
    /// # Arguments
    ///
    /// * `request` - Target student, disputed amount, reason and optional evidence
    /// * `actor` - Resolved caller identity; must be staff
    ///
    /// # Returns
    ///
    /// * `Ok(Reclamation)` - The new reclamation in `pending`
    /// * `Err(LedgerError::ValidationError)` - If the student id, amount or reason is malformed
    /// * `Err(LedgerError::Forbidden)` - If the actor is not staff
    /// * `Err(LedgerError::NotFound)` - If the student or its card does not exist
    pub fn create(
        &self,
        request: NewReclamation,
        actor: Option<&Actor>,
    ) -> Result<Reclamation, LedgerError> {
        let actor = access::require(actor, &[Role::Staff], "file reclamations")?;

        let student_id = StudentId::parse(&request.student_id)?;
        let amount = money::positive_amount("amount", request.amount)?;
        let reason = request.reason.trim();
        if reason.is_empty() {
            return Err(LedgerError::validation("reason", "must not be empty"));
        }
        let evidence = super::provisioning::optional_text(request.evidence);

        // Holding the student row keeps a concurrent delete from removing
        // the target before the reclamation is visible
        let student = self
            .students
            .students
            .get(&student_id)
            .ok_or_else(|| LedgerError::not_found(EntityType::Student, &student_id))?;
        let card_id = student.card_id.ok_or_else(|| {
            LedgerError::not_found(EntityType::Card, format!("student {student_id}"))
        })?;

        let now = Utc::now();
        let reclamation = Reclamation {
            id: self.reclamations.allocate_id(),
            staff_id: actor.id,
            student_id: student_id.clone(),
            card_id,
            amount,
            reason: reason.to_string(),
            evidence,
            status: ReclamationStatus::Pending,
            admin_id: None,
            admin_notes: None,
            processed_at: None,
            created_at: now,
            updated_at: now,
        };
        self.reclamations.insert(reclamation.clone());
        drop(student);

        tracing::info!(
            reclamation_id = reclamation.id,
            student_id = %student_id,
            card_id,
            amount = %amount,
            actor_id = actor.id,
            "Reclamation filed"
        );
        Ok(reclamation)
    }

    /// Approve or reject a pending reclamation
    ///
    /// # Arguments
    ///
    /// * `id` - Reclamation to process
    /// * `decision` - `approved` settles the amount against the card, `rejected` closes it
    /// * `admin_notes` - Optional notes from the administrator
    /// * `actor` - Resolved caller identity; must be admin
    ///
    /// # Returns
    ///
    /// * `Ok(Reclamation)` - The reclamation in `rejected` or `processed`
    /// * `Err(LedgerError::NotFound)` - If the reclamation or its card does not exist
    /// * `Err(LedgerError::InvalidState)` - If the reclamation is no longer pending
    /// * `Err(LedgerError)` - The settlement failure; the reclamation is left in `error`
    pub fn process(
        &self,
        id: ReclamationId,
        decision: Decision,
        admin_notes: Option<String>,
        actor: Option<&Actor>,
    ) -> Result<Reclamation, LedgerError> {
        let admin = access::require(actor, &[Role::Admin], "process reclamations")?;
        let admin_notes = super::provisioning::optional_text(admin_notes);

        let outcome = self.reclamations.update(id, |reclamation| {
            if reclamation.status != ReclamationStatus::Pending {
                return Err(LedgerError::invalid_state(id, reclamation.status));
            }

            let now = Utc::now();
            reclamation.admin_id = Some(admin.id);
            reclamation.admin_notes = admin_notes;
            reclamation.processed_at = Some(now);
            reclamation.updated_at = now;

            if decision == Decision::Rejected {
                reclamation.status = ReclamationStatus::Rejected;
                return Ok(Ok(reclamation.clone()));
            }

            reclamation.status = ReclamationStatus::Approved;
            tracing::debug!(reclamation_id = id, admin_id = admin.id, "Reclamation approved");

            match self.ledger.settle(reclamation, admin) {
                Ok(change) => {
                    reclamation.status = ReclamationStatus::Processed;
                    tracing::info!(
                        reclamation_id = id,
                        card_id = change.card_id,
                        new_balance = %change.new_balance,
                        "Reclamation settled"
                    );
                    Ok(Ok(reclamation.clone()))
                }
                // Nothing was mutated; discarding the draft keeps it pending
                Err(e @ LedgerError::NotFound { .. }) => Err(e),
                Err(e) => {
                    reclamation.status = ReclamationStatus::Error;
                    reclamation.append_note(&format!("Settlement failed: {e}"));
                    tracing::warn!(reclamation_id = id, error = %e, "Reclamation settlement failed");
                    Ok(Err(e))
                }
            }
        });

        outcome?
    }

    /// Look up a reclamation
    pub fn get(&self, id: ReclamationId, actor: Option<&Actor>) -> Result<Reclamation, LedgerError> {
        access::resolve(actor)?;
        self.reclamations
            .get(id)
            .ok_or_else(|| LedgerError::not_found(EntityType::Reclamation, id))
    }

    /// Reclamations, newest first, optionally filtered by status
    pub fn list(
        &self,
        status: Option<ReclamationStatus>,
        actor: Option<&Actor>,
    ) -> Result<Vec<Reclamation>, LedgerError> {
        access::resolve(actor)?;
        Ok(self.reclamations.list(status))
    }

    /// Aggregate count per status
    pub fn counts(&self, actor: Option<&Actor>) -> Result<ReclamationCounts, LedgerError> {
        access::resolve(actor)?;
        Ok(self.reclamations.counts())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::core::ledger::Adjustment;
    use crate::core::traits::AuditStore;
    use crate::core::{AuditLog, CardStore, InMemoryAuditStore, Provisioning, RandomCardNumbers};
    use crate::types::{ActivityAction, CardId, NewStudent};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    struct Fixture {
        workflow: ReclamationWorkflow,
        cards: Arc<CardStore>,
        store: Arc<InMemoryAuditStore>,
        card_id: CardId,
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    /// One student "10001" whose card holds `balance`
    fn fixture(balance: &str) -> Fixture {
        let students = Arc::new(StudentStore::new());
        let cards = Arc::new(CardStore::new());
        let reclamations = Arc::new(ReclamationStore::new());
        let store = Arc::new(InMemoryAuditStore::new());
        let audit = Arc::new(AuditLog::new(store.clone(), &LedgerConfig::default()));
        let ledger = Arc::new(BalanceLedger::new(cards.clone(), audit.clone()));
        let provisioning = Provisioning::new(
            students.clone(),
            cards.clone(),
            reclamations.clone(),
            audit,
            Arc::new(RandomCardNumbers),
            5,
        );

        let admin = Actor::admin(1);
        let card_id = provisioning
            .provision(NewStudent::new("10001", "John Smith"), Some(&admin))
            .unwrap()
            .card
            .card_id;
        ledger
            .adjust(Adjustment::add(card_id, dec(balance)), Some(&admin))
            .unwrap();

        Fixture {
            workflow: ReclamationWorkflow::new(students, reclamations, ledger),
            cards,
            store,
            card_id,
        }
    }

    fn file(f: &Fixture, amount: &str) -> Reclamation {
        f.workflow
            .create(
                NewReclamation {
                    student_id: "10001".to_string(),
                    amount: dec(amount),
                    reason: "charged twice for lunch".to_string(),
                    evidence: None,
                },
                Some(&Actor::staff(2)),
            )
            .unwrap()
    }

    #[test]
    fn test_create_is_pending_and_snapshots_card() {
        let f = fixture("10");
        let r = file(&f, "4.999");
        assert_eq!(r.status, ReclamationStatus::Pending);
        assert_eq!(r.card_id, f.card_id);
        assert_eq!(r.amount.to_string(), "4.99");
        assert_eq!(r.staff_id, 2);
    }

    #[test]
    fn test_create_validation() {
        let f = fixture("10");
        let staff = Actor::staff(2);
        let request = |student: &str, amount: &str, reason: &str| NewReclamation {
            student_id: student.to_string(),
            amount: dec(amount),
            reason: reason.to_string(),
            evidence: None,
        };

        assert!(matches!(
            f.workflow.create(request("10001", "0", "x"), Some(&staff)),
            Err(LedgerError::ValidationError { ref field, .. }) if field == "amount"
        ));
        assert!(matches!(
            f.workflow.create(request("10001", "1", "  "), Some(&staff)),
            Err(LedgerError::ValidationError { ref field, .. }) if field == "reason"
        ));
        assert!(matches!(
            f.workflow.create(request("20002", "1", "x"), Some(&staff)),
            Err(LedgerError::NotFound { entity: EntityType::Student, .. })
        ));
        assert!(matches!(
            f.workflow.create(request("10001", "1", "x"), Some(&Actor::admin(1))),
            Err(LedgerError::Forbidden { .. })
        ));
    }

    #[test]
    fn test_reject_closes_without_touching_balance() {
        let f = fixture("10");
        let r = file(&f, "5");

        let processed = f
            .workflow
            .process(r.id, Decision::Rejected, Some("not a duplicate".to_string()), Some(&Actor::admin(1)))
            .unwrap();

        assert_eq!(processed.status, ReclamationStatus::Rejected);
        assert_eq!(processed.admin_id, Some(1));
        assert_eq!(processed.admin_notes.as_deref(), Some("not a duplicate"));
        assert!(processed.processed_at.is_some());
        assert_eq!(f.cards.get(f.card_id).unwrap().balance, dec("10.00"));
    }

    #[test]
    fn test_approve_settles_and_logs_admin_deduction() {
        let f = fixture("10");
        let r = file(&f, "4");

        let processed = f
            .workflow
            .process(r.id, Decision::Approved, None, Some(&Actor::admin(1)))
            .unwrap();

        assert_eq!(processed.status, ReclamationStatus::Processed);
        assert_eq!(f.cards.get(f.card_id).unwrap().balance, dec("6.00"));

        let entries = f.store.entries_for(EntityType::Card, &f.card_id.to_string());
        let deduction = entries.last().unwrap();
        assert_eq!(deduction.action, ActivityAction::DeductFundsAdmin);
        assert_eq!(deduction.details["reclamation_id"], r.id);
        assert_eq!(deduction.details["new_balance"], "6.00");
    }

    #[test]
    fn test_insufficient_funds_moves_to_error() {
        let f = fixture("40");
        let r = file(&f, "100");

        let result = f.workflow.process(
            r.id,
            Decision::Approved,
            Some("checked receipts".to_string()),
            Some(&Actor::admin(1)),
        );

        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
        let stored = f.workflow.get(r.id, Some(&Actor::viewer(3))).unwrap();
        assert_eq!(stored.status, ReclamationStatus::Error);
        let notes = stored.admin_notes.unwrap();
        assert!(notes.starts_with("checked receipts\nSettlement failed: Insufficient funds"));
        assert_eq!(f.cards.get(f.card_id).unwrap().balance, dec("40.00"));

        let counts = f.workflow.counts(Some(&Actor::viewer(3))).unwrap();
        assert_eq!(counts.error, 1);
        assert_eq!(counts.approved, 0);
    }

    #[test]
    fn test_second_process_is_invalid_state() {
        let f = fixture("10");
        let r = file(&f, "1");
        let admin = Actor::admin(1);
        f.workflow
            .process(r.id, Decision::Approved, None, Some(&admin))
            .unwrap();

        let again = f.workflow.process(r.id, Decision::Approved, None, Some(&admin));

        assert_eq!(
            again,
            Err(LedgerError::invalid_state(r.id, ReclamationStatus::Processed))
        );
        assert_eq!(f.cards.get(f.card_id).unwrap().balance, dec("9.00"));
    }

    #[test]
    fn test_missing_card_keeps_reclamation_pending() {
        let f = fixture("10");
        let r = file(&f, "1");
        f.cards.cards.remove(&f.card_id);

        let result = f
            .workflow
            .process(r.id, Decision::Approved, None, Some(&Actor::admin(1)));

        assert_eq!(result, Err(LedgerError::not_found(EntityType::Card, f.card_id)));
        let stored = f.workflow.get(r.id, Some(&Actor::admin(1))).unwrap();
        assert_eq!(stored.status, ReclamationStatus::Pending);
        assert!(stored.admin_id.is_none());
    }

    #[test]
    fn test_only_admin_processes() {
        let f = fixture("10");
        let r = file(&f, "1");
        let result = f
            .workflow
            .process(r.id, Decision::Approved, None, Some(&Actor::staff(2)));
        assert_eq!(
            result,
            Err(LedgerError::forbidden(Role::Staff, "process reclamations"))
        );
        let stored = f.workflow.get(r.id, Some(&Actor::staff(2))).unwrap();
        assert_eq!(stored.status, ReclamationStatus::Pending);
    }
}
