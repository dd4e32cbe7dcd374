//! Card ledger engine
//!
//! This module provides the `CardEngine` struct, the facade that wires the
//! ledger core together and is shared by the HTTP surface and roster imports.
//!
//! # Architecture
//!
//! ```text
//! CardEngine
//!     ├── Arc<BalanceLedger>        (add / subtract / mark used)
//!     ├── Arc<Provisioning>         (student + card lifecycle)
//!     ├── Arc<ReclamationWorkflow>  (pending -> approved/rejected -> processed/error)
//!     └── Arc<AuditLog>             (append-only activity trail)
//!
//! all backed by the shared CardStore, StudentStore and ReclamationStore
//! ```
//!
//! # Thread Safety
//!
//! The engine is cheap to clone; every clone shares the same state. Each
//! operation takes the caller identity explicitly and never reads ambient
//! session state.

use std::sync::Arc;

use super::card_number::RandomCardNumbers;
use super::ledger::Adjustment;
use super::provisioning::ProvisionedStudent;
use super::traits::{AuditStore, CardNumberSource};
use super::{
    access, AuditLog, BalanceLedger, CardStore, InMemoryAuditStore, Provisioning,
    ReclamationStore, ReclamationWorkflow, StudentStore,
};
use crate::config::LedgerConfig;
use crate::types::{
    ActivityLogEntry, Actor, BalanceChange, Card, CardId, Decision, EntityType, LedgerError,
    NewReclamation, NewStudent, Page, Reclamation, ReclamationCounts, ReclamationId,
    ReclamationStatus, Student, StudentChanges,
};

/// Facade over the ledger core
#[derive(Debug, Clone)]
pub struct CardEngine {
    ledger: Arc<BalanceLedger>,
    provisioning: Arc<Provisioning>,
    reclamations: Arc<ReclamationWorkflow>,
    audit: Arc<AuditLog>,
}

impl CardEngine {
    /// Create an engine with in-memory audit storage and random card numbers
    pub fn new(config: LedgerConfig) -> Self {
        Self::with_parts(
            config,
            Arc::new(InMemoryAuditStore::new()),
            Arc::new(RandomCardNumbers),
        )
    }

    /// Create an engine from explicit collaborators
    ///
    /// # Arguments
    ///
    /// * `config` - Ledger configuration (retry bound, page sizes)
    /// * `audit_store` - Where audit entries are persisted
    /// * `numbers` - Source of candidate card numbers
    pub fn with_parts(
        config: LedgerConfig,
        audit_store: Arc<dyn AuditStore>,
        numbers: Arc<dyn CardNumberSource>,
    ) -> Self {
        let config = config.normalized();
        let students = Arc::new(StudentStore::new());
        let cards = Arc::new(CardStore::new());
        let reclamation_store = Arc::new(ReclamationStore::new());
        let audit = Arc::new(AuditLog::new(audit_store, &config));

        let ledger = Arc::new(BalanceLedger::new(Arc::clone(&cards), Arc::clone(&audit)));
        let provisioning = Arc::new(Provisioning::new(
            Arc::clone(&students),
            Arc::clone(&cards),
            Arc::clone(&reclamation_store),
            Arc::clone(&audit),
            numbers,
            config.card_number_attempts,
        ));
        let reclamations = Arc::new(ReclamationWorkflow::new(
            students,
            reclamation_store,
            Arc::clone(&ledger),
        ));

        Self {
            ledger,
            provisioning,
            reclamations,
            audit,
        }
    }

    /// Add funds to or subtract funds from a card
    ///
    /// See [`BalanceLedger::adjust`] for the check order and failure modes.
    pub fn adjust(
        &self,
        request: Adjustment,
        actor: Option<&Actor>,
    ) -> Result<BalanceChange, LedgerError> {
        self.ledger.adjust(request, actor)
    }

    pub fn mark_used(&self, card_id: CardId, actor: Option<&Actor>) -> Result<Card, LedgerError> {
        self.ledger.mark_used(card_id, actor)
    }

    /// Create a student and its card as one unit
    pub fn provision(
        &self,
        request: NewStudent,
        actor: Option<&Actor>,
    ) -> Result<ProvisionedStudent, LedgerError> {
        self.provisioning.provision(request, actor)
    }

    pub fn update_student(
        &self,
        student_id: &str,
        changes: StudentChanges,
        actor: Option<&Actor>,
    ) -> Result<Student, LedgerError> {
        self.provisioning.update_student(student_id, changes, actor)
    }

    pub fn delete_student(
        &self,
        student_id: &str,
        actor: Option<&Actor>,
    ) -> Result<Student, LedgerError> {
        self.provisioning.delete_student(student_id, actor)
    }

    pub fn get_student(&self, student_id: &str, actor: Option<&Actor>) -> Result<Student, LedgerError> {
        self.provisioning.get_student(student_id, actor)
    }

    pub fn get_card(&self, card_id: CardId, actor: Option<&Actor>) -> Result<Card, LedgerError> {
        self.provisioning.get_card(card_id, actor)
    }

    pub fn card_for_student(
        &self,
        student_id: &str,
        actor: Option<&Actor>,
    ) -> Result<Card, LedgerError> {
        self.provisioning.card_for_student(student_id, actor)
    }

    /// File a reclamation (staff only)
    pub fn create_reclamation(
        &self,
        request: NewReclamation,
        actor: Option<&Actor>,
    ) -> Result<Reclamation, LedgerError> {
        self.reclamations.create(request, actor)
    }

    /// Approve or reject a reclamation (admin only)
    pub fn process_reclamation(
        &self,
        id: ReclamationId,
        decision: Decision,
        admin_notes: Option<String>,
        actor: Option<&Actor>,
    ) -> Result<Reclamation, LedgerError> {
        self.reclamations.process(id, decision, admin_notes, actor)
    }

    pub fn get_reclamation(
        &self,
        id: ReclamationId,
        actor: Option<&Actor>,
    ) -> Result<Reclamation, LedgerError> {
        self.reclamations.get(id, actor)
    }

    pub fn list_reclamations(
        &self,
        status: Option<ReclamationStatus>,
        actor: Option<&Actor>,
    ) -> Result<Vec<Reclamation>, LedgerError> {
        self.reclamations.list(status, actor)
    }

    pub fn reclamation_counts(&self, actor: Option<&Actor>) -> Result<ReclamationCounts, LedgerError> {
        self.reclamations.counts(actor)
    }

    /// Audit entries for one entity, newest first
    pub fn activity(
        &self,
        entity_type: EntityType,
        entity_id: &str,
        page: Page,
        actor: Option<&Actor>,
    ) -> Result<Vec<ActivityLogEntry>, LedgerError> {
        access::resolve(actor)?;
        Ok(self.audit.get(entity_type, entity_id, page))
    }
}

impl Default for CardEngine {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_clones_share_state() {
        let engine = CardEngine::default();
        let other = engine.clone();
        let admin = Actor::admin(1);

        let created = engine
            .provision(NewStudent::new("10001", "John Smith"), Some(&admin))
            .unwrap();
        other
            .adjust(
                Adjustment::add(created.card.card_id, Decimal::new(1500, 2)),
                Some(&admin),
            )
            .unwrap();

        let card = engine.get_card(created.card.card_id, Some(&admin)).unwrap();
        assert_eq!(card.balance, Decimal::new(1500, 2));
    }

    #[test]
    fn test_activity_requires_identity() {
        let engine = CardEngine::default();
        let result = engine.activity(EntityType::Card, "1", Page::default(), None);
        assert_eq!(result, Err(LedgerError::Unauthorized));
    }

    #[test]
    fn test_activity_lists_card_history_newest_first() {
        let engine = CardEngine::default();
        let admin = Actor::admin(1);
        let card_id = engine
            .provision(NewStudent::new("10001", "A"), Some(&admin))
            .unwrap()
            .card
            .card_id;
        engine
            .adjust(Adjustment::add(card_id, Decimal::new(500, 2)), Some(&admin))
            .unwrap();

        let entries = engine
            .activity(EntityType::Card, &card_id.to_string(), Page::default(), Some(&admin))
            .unwrap();

        let actions: Vec<_> = entries.iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![
                crate::types::ActivityAction::AddFunds,
                crate::types::ActivityAction::CreateCard
            ]
        );
    }
}
