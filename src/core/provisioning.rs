//! Student and card provisioning
//!
//! This module provides the `Provisioning` struct, which creates a student and
//! its card as one unit and manages the rest of the student lifecycle.
//!
//! # Atomicity
//!
//! Provisioning reserves every unique key before anything becomes visible:
//!
//! ```text
//! students entry (student_id) ──> cn index entry ──> card number entry
//!                                                         │
//!                    audit (create_student + create_card) ┘
//!                                                         │
//!             insert card, index entries, then the student ┘
//! ```
//!
//! The reservations are vacant map entries whose locks are held until the
//! final inserts. Any failure before that point drops them, which leaves no
//! student row, no card row and no index entry behind. A concurrent request
//! for the same student id or cn blocks on the held entry and then observes
//! the committed row, so exactly one of them succeeds.

use std::sync::Arc;

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use serde_json::json;

use super::traits::CardNumberSource;
use super::{access, AuditLog, CardStore, ReclamationStore, StudentStore};
use crate::types::{
    money, ActivityAction, Actor, Card, CardId, Cn, EntityType, LedgerError, NewActivity,
    NewStudent, QrPayload, Role, Student, StudentChanges, StudentId,
};

/// A student together with the card created for it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvisionedStudent {
    pub student: Student,
    pub card: Card,
}

/// Student/card lifecycle manager
#[derive(Debug)]
pub struct Provisioning {
    students: Arc<StudentStore>,
    cards: Arc<CardStore>,
    reclamations: Arc<ReclamationStore>,
    audit: Arc<AuditLog>,
    numbers: Arc<dyn CardNumberSource>,
    card_number_attempts: usize,
}

impl Provisioning {
    pub fn new(
        students: Arc<StudentStore>,
        cards: Arc<CardStore>,
        reclamations: Arc<ReclamationStore>,
        audit: Arc<AuditLog>,
        numbers: Arc<dyn CardNumberSource>,
        card_number_attempts: usize,
    ) -> Self {
        Self {
            students,
            cards,
            reclamations,
            audit,
            numbers,
            card_number_attempts: card_number_attempts.max(1),
        }
    }

    /// Create a student and its card as one unit
    ///
    /// # Arguments
    ///
    /// * `request` - Unvalidated student fields
    /// * `actor` - Resolved caller identity; must be staff or admin
    ///
    /// # Returns
    ///
    /// * `Ok(ProvisionedStudent)` - The committed student and its zero-balance card
    /// * `Err(LedgerError::ValidationError)` - If student_id, cn or full_name is malformed
    /// * `Err(LedgerError::DuplicateEntry)` - If student_id or cn is already in use
    /// * `Err(LedgerError::ResourceExhausted)` - If every card number candidate collided
    /// * `Err(LedgerError::Internal)` - If the audit entries could not be stored
    pub fn provision(
        &self,
        request: NewStudent,
        actor: Option<&Actor>,
    ) -> Result<ProvisionedStudent, LedgerError> {
        let actor = access::require(actor, access::WRITERS, "create students")?;

        let student_id = StudentId::parse(&request.student_id)?;
        let cn = Cn::parse_optional(request.cn.as_deref())?;
        let full_name = required_text("full_name", &request.full_name)?;
        let university_id = optional_text(request.university_id);
        let profile_image = optional_text(request.profile_image);

        let student_slot = match self.students.students.entry(student_id.clone()) {
            Entry::Occupied(_) => return Err(duplicate("student_id", &student_id)),
            Entry::Vacant(slot) => slot,
        };

        let cn_slot = match &cn {
            Some(cn) => match self.students.cn_index.entry(cn.clone()) {
                Entry::Occupied(_) => return Err(duplicate("cn", cn)),
                Entry::Vacant(slot) => Some(slot),
            },
            None => None,
        };

        let mut number_slot = None;
        for attempt in 1..=self.card_number_attempts {
            let candidate = self.numbers.next_number();
            match self.cards.numbers.entry(candidate.clone()) {
                Entry::Vacant(slot) => {
                    number_slot = Some((candidate, slot));
                    break;
                }
                Entry::Occupied(_) => {
                    tracing::debug!(attempt, card_number = %candidate, "Card number collision");
                }
            }
        }
        let Some((card_number, number_slot)) = number_slot else {
            tracing::warn!(
                student_id = %student_id,
                attempts = self.card_number_attempts,
                "Card number generation exhausted"
            );
            return Err(LedgerError::ResourceExhausted {
                attempts: self.card_number_attempts,
            });
        };

        let now = Utc::now();
        let card_id = self.cards.allocate_id();
        let card = Card {
            card_id,
            student_id: student_id.clone(),
            card_number: card_number.clone(),
            balance: money::zero(),
            used: false,
            created_at: now,
            updated_at: now,
            created_by: actor.id,
            updated_by: actor.id,
        };

        let qr_payload = encode_qr(&QrPayload {
            student_id: student_id.clone(),
            cn: cn.clone(),
            full_name: full_name.clone(),
            card_number: card_number.clone(),
            university_id: university_id.clone(),
        })?;

        let student = Student {
            student_id: student_id.clone(),
            cn: cn.clone(),
            full_name,
            profile_image,
            university_id,
            card_id: Some(card_id),
            qr_payload: Some(qr_payload),
            created_at: now,
            updated_at: now,
            created_by: actor.id,
            updated_by: actor.id,
        };

        self.audit
            .record_all(vec![
                NewActivity::new(
                    actor.id,
                    ActivityAction::CreateStudent,
                    EntityType::Student,
                    &student_id,
                    json!({
                        "full_name": student.full_name,
                        "cn": student.cn,
                        "university_id": student.university_id,
                        "card_id": card_id,
                    }),
                ),
                NewActivity::new(
                    actor.id,
                    ActivityAction::CreateCard,
                    EntityType::Card,
                    card_id,
                    json!({
                        "student_id": student_id,
                        "card_number": card_number,
                        "balance": card.balance,
                    }),
                ),
            ])
            .inspect_err(|e| {
                tracing::error!(student_id = %student_id, error = %e, "Provisioning rolled back");
            })?;

        // Commit: the card first, the student last, so a visible student
        // always has its card
        self.cards.cards.insert(card_id, card.clone());
        number_slot.insert(card_id);
        if let Some(slot) = cn_slot {
            slot.insert(student_id.clone());
        }
        student_slot.insert(student.clone());

        tracing::info!(
            student_id = %student_id,
            card_id,
            card_number = %card_number,
            actor_id = actor.id,
            "Student provisioned"
        );

        Ok(ProvisionedStudent { student, card })
    }

    /// Update a student's descriptive fields
    ///
    /// The QR payload is rebuilt from the updated record.
    pub fn update_student(
        &self,
        student_id: &str,
        changes: StudentChanges,
        actor: Option<&Actor>,
    ) -> Result<Student, LedgerError> {
        let actor = access::require(actor, access::WRITERS, "update students")?;
        let student_id = StudentId::parse(student_id)?;

        let full_name = changes
            .full_name
            .as_deref()
            .map(|name| required_text("full_name", name))
            .transpose()?;
        if full_name.is_none() && changes.university_id.is_none() && changes.profile_image.is_none()
        {
            return Err(LedgerError::validation(
                "changes",
                "at least one of full_name, university_id, profile_image is required",
            ));
        }

        self.students.update(&student_id, |student| {
            let mut changed = serde_json::Map::new();
            if let Some(name) = full_name {
                changed.insert("full_name".to_string(), json!(name));
                student.full_name = name;
            }
            if let Some(university_id) = changes.university_id {
                student.university_id = optional_text(Some(university_id));
                changed.insert("university_id".to_string(), json!(student.university_id));
            }
            if let Some(profile_image) = changes.profile_image {
                student.profile_image = optional_text(Some(profile_image));
                changed.insert("profile_image".to_string(), json!(student.profile_image));
            }

            if let Some(card) = student.card_id.and_then(|id| self.cards.get(id)) {
                student.qr_payload = Some(encode_qr(&QrPayload {
                    student_id: student.student_id.clone(),
                    cn: student.cn.clone(),
                    full_name: student.full_name.clone(),
                    card_number: card.card_number,
                    university_id: student.university_id.clone(),
                })?);
            }

            self.audit.record(NewActivity::new(
                actor.id,
                ActivityAction::UpdateStudent,
                EntityType::Student,
                &student.student_id,
                serde_json::Value::Object(changed),
            ))?;

            student.updated_at = Utc::now();
            student.updated_by = actor.id;
            tracing::info!(student_id = %student.student_id, actor_id = actor.id, "Student updated");
            Ok(student.clone())
        })
    }

    /// Delete a student together with its card
    ///
    /// Refused while any reclamation references the student, whatever its
    /// status. The cn and card-number index entries and the card row are held
    /// from the snapshot through the removal, so a concurrent adjustment either
    /// commits before the `delete_card` entry records the balance or fails
    /// with `NotFound` afterwards.
    ///
    /// # Returns
    ///
    /// * `Ok(Student)` - The removed student record
    /// * `Err(LedgerError::Forbidden)` - If the actor is not an admin
    /// * `Err(LedgerError::NotFound)` - If the student does not exist
    /// * `Err(LedgerError::ValidationError)` - If reclamations reference the student
    pub fn delete_student(
        &self,
        student_id: &str,
        actor: Option<&Actor>,
    ) -> Result<Student, LedgerError> {
        let actor = access::require(actor, &[Role::Admin], "delete students")?;
        let student_id = StudentId::parse(student_id)?;

        let Entry::Occupied(entry) = self.students.students.entry(student_id.clone()) else {
            return Err(LedgerError::not_found(EntityType::Student, &student_id));
        };

        if self.reclamations.references(&student_id) {
            return Err(LedgerError::validation(
                "student_id",
                format!("student {student_id} is referenced by reclamations"),
            ));
        }

        let student = entry.get().clone();

        // Card numbers never change, so the unlocked read only locates the index entry
        let card_number = student
            .card_id
            .and_then(|id| self.cards.get(id))
            .map(|card| card.card_number);
        let cn_entry = student.cn.clone().and_then(|cn| match self.students.cn_index.entry(cn) {
            Entry::Occupied(held) => Some(held),
            Entry::Vacant(_) => None,
        });
        let number_entry = card_number.and_then(|number| match self.cards.numbers.entry(number) {
            Entry::Occupied(held) => Some(held),
            Entry::Vacant(_) => None,
        });
        let card_entry = student.card_id.and_then(|id| match self.cards.cards.entry(id) {
            Entry::Occupied(held) => Some(held),
            Entry::Vacant(_) => None,
        });
        let card = card_entry.as_ref().map(|held| held.get().clone());

        let mut activities = Vec::with_capacity(2);
        if let Some(card) = &card {
            activities.push(NewActivity::new(
                actor.id,
                ActivityAction::DeleteCard,
                EntityType::Card,
                card.card_id,
                json!({
                    "student_id": student_id,
                    "card_number": card.card_number,
                    "balance": card.balance,
                }),
            ));
        }
        activities.push(NewActivity::new(
            actor.id,
            ActivityAction::DeleteStudent,
            EntityType::Student,
            &student_id,
            json!({ "full_name": student.full_name, "card_id": student.card_id }),
        ));
        self.audit.record_all(activities)?;

        if let Some(held) = card_entry {
            held.remove();
        }
        if let Some(held) = number_entry {
            held.remove();
        }
        if let Some(held) = cn_entry {
            held.remove();
        }
        entry.remove();

        tracing::info!(student_id = %student_id, actor_id = actor.id, "Student deleted");
        Ok(student)
    }

    /// Look up a student
    pub fn get_student(&self, student_id: &str, actor: Option<&Actor>) -> Result<Student, LedgerError> {
        let actor = access::resolve(actor)?;
        let student_id = StudentId::parse(student_id)?;
        let student = self
            .students
            .get(&student_id)
            .ok_or_else(|| LedgerError::not_found(EntityType::Student, &student_id))?;
        self.audit
            .log_view(actor.id, EntityType::Student, student_id.as_str());
        Ok(student)
    }

    /// Look up a card
    pub fn get_card(&self, card_id: CardId, actor: Option<&Actor>) -> Result<Card, LedgerError> {
        let actor = access::resolve(actor)?;
        let card = self
            .cards
            .get(card_id)
            .ok_or_else(|| LedgerError::not_found(EntityType::Card, card_id))?;
        self.audit
            .log_view(actor.id, EntityType::Card, &card_id.to_string());
        Ok(card)
    }

    /// Look up the card owned by a student
    pub fn card_for_student(&self, student_id: &str, actor: Option<&Actor>) -> Result<Card, LedgerError> {
        access::resolve(actor)?;
        let student_id = StudentId::parse(student_id)?;
        let card_id = self
            .students
            .get(&student_id)
            .ok_or_else(|| LedgerError::not_found(EntityType::Student, &student_id))?
            .card_id
            .ok_or_else(|| LedgerError::not_found(EntityType::Card, format!("student {student_id}")))?;
        self.get_card(card_id, actor)
    }
}

fn duplicate(field: &str, value: impl ToString) -> LedgerError {
    let error = LedgerError::duplicate(field, value);
    tracing::warn!(error = %error, "Provisioning refused");
    error
}

fn encode_qr(payload: &QrPayload) -> Result<String, LedgerError> {
    Ok(serde_json::to_string(payload)?)
}

/// Trimmed non-empty text
fn required_text(field: &str, value: &str) -> Result<String, LedgerError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(LedgerError::validation(field, "must not be empty"));
    }
    Ok(value.to_string())
}

/// Trimmed text, with blanks treated as absent
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::core::card_number::RandomCardNumbers;
    use crate::core::traits::AuditStore;
    use crate::core::InMemoryAuditStore;
    use crate::types::CardNumber;
    use parking_lot::Mutex;
    use rstest::rstest;

    /// Hands out a fixed sequence of card numbers, repeating the last one
    #[derive(Debug)]
    struct Sequence(Mutex<Vec<&'static str>>);

    impl CardNumberSource for Sequence {
        fn next_number(&self) -> CardNumber {
            let mut numbers = self.0.lock();
            let next = if numbers.len() > 1 { numbers.remove(0) } else { numbers[0] };
            CardNumber::parse(next).unwrap()
        }
    }

    struct Fixture {
        provisioning: Provisioning,
        students: Arc<StudentStore>,
        cards: Arc<CardStore>,
        store: Arc<InMemoryAuditStore>,
    }

    fn fixture_with(numbers: Arc<dyn CardNumberSource>) -> Fixture {
        let students = Arc::new(StudentStore::new());
        let cards = Arc::new(CardStore::new());
        let store = Arc::new(InMemoryAuditStore::new());
        let audit = Arc::new(AuditLog::new(store.clone(), &LedgerConfig::default()));
        Fixture {
            provisioning: Provisioning::new(
                students.clone(),
                cards.clone(),
                Arc::new(ReclamationStore::new()),
                audit,
                numbers,
                3,
            ),
            students,
            cards,
            store,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Arc::new(RandomCardNumbers))
    }

    #[test]
    fn test_provision_creates_linked_student_and_card() {
        let f = fixture();
        let staff = Actor::staff(2);

        let created = f
            .provisioning
            .provision(NewStudent::new("10001", "John Smith").with_cn("12345678"), Some(&staff))
            .unwrap();

        assert_eq!(created.card.balance.to_string(), "0.00");
        assert_eq!(created.student.card_id, Some(created.card.card_id));
        assert_eq!(created.card.student_id, created.student.student_id);
        assert_eq!(created.card.card_number.as_str().len(), 9);

        let qr: QrPayload =
            serde_json::from_str(created.student.qr_payload.as_deref().unwrap()).unwrap();
        assert_eq!(qr.card_number, created.card.card_number);
        assert_eq!(qr.cn.unwrap().as_str(), "12345678");

        assert_eq!(f.students.len(), 1);
        assert_eq!(f.cards.len(), 1);
        assert_eq!(f.store.len(), 2);
    }

    #[rstest]
    #[case::bad_student_id(NewStudent::new("1001", "A"), "student_id")]
    #[case::bad_cn(NewStudent::new("10001", "A").with_cn("1234"), "cn")]
    #[case::blank_name(NewStudent::new("10001", "  "), "full_name")]
    fn test_provision_validation(#[case] request: NewStudent, #[case] expected_field: &str) {
        let f = fixture();
        let result = f.provisioning.provision(request, Some(&Actor::admin(1)));
        assert!(matches!(
            result,
            Err(LedgerError::ValidationError { ref field, .. }) if field == expected_field
        ));
        assert!(f.students.is_empty());
        assert!(f.cards.is_empty());
    }

    #[test]
    fn test_duplicate_student_id_and_cn_are_distinct() {
        let f = fixture();
        let admin = Actor::admin(1);
        f.provisioning
            .provision(NewStudent::new("10001", "A").with_cn("11112222"), Some(&admin))
            .unwrap();

        let same_id = f
            .provisioning
            .provision(NewStudent::new("10001", "B"), Some(&admin));
        assert_eq!(same_id, Err(LedgerError::duplicate("student_id", "10001")));

        let same_cn = f
            .provisioning
            .provision(NewStudent::new("10002", "C").with_cn("11112222"), Some(&admin));
        assert_eq!(same_cn, Err(LedgerError::duplicate("cn", "11112222")));

        assert_eq!(f.students.len(), 1);
        assert_eq!(f.cards.len(), 1);
    }

    #[test]
    fn test_card_number_collision_retries() {
        let f = fixture_with(Arc::new(Sequence(Mutex::new(vec![
            "AAAA00001",
            "AAAA00001",
            "BBBB00002",
        ]))));
        let admin = Actor::admin(1);

        let first = f
            .provisioning
            .provision(NewStudent::new("10001", "A"), Some(&admin))
            .unwrap();
        let second = f
            .provisioning
            .provision(NewStudent::new("10002", "B"), Some(&admin))
            .unwrap();

        assert_eq!(first.card.card_number.as_str(), "AAAA00001");
        assert_eq!(second.card.card_number.as_str(), "BBBB00002");
    }

    #[test]
    fn test_card_number_exhaustion_leaves_nothing_behind() {
        let f = fixture_with(Arc::new(Sequence(Mutex::new(vec!["AAAA00001"]))));
        let admin = Actor::admin(1);
        f.provisioning
            .provision(NewStudent::new("10001", "A"), Some(&admin))
            .unwrap();

        let result = f
            .provisioning
            .provision(NewStudent::new("10002", "B").with_cn("87654321"), Some(&admin));

        assert_eq!(result, Err(LedgerError::ResourceExhausted { attempts: 3 }));
        assert_eq!(f.students.len(), 1);
        assert_eq!(f.cards.len(), 1);
        assert!(f
            .students
            .find_by_cn(&Cn::parse("87654321").unwrap())
            .is_none());
    }

    #[test]
    fn test_viewer_cannot_provision() {
        let f = fixture();
        let result = f
            .provisioning
            .provision(NewStudent::new("10001", "A"), Some(&Actor::viewer(3)));
        assert!(matches!(result, Err(LedgerError::Forbidden { .. })));
    }

    #[test]
    fn test_update_student_rewrites_qr_payload() {
        let f = fixture();
        let staff = Actor::staff(2);
        f.provisioning
            .provision(NewStudent::new("10001", "John Smith"), Some(&staff))
            .unwrap();

        let updated = f
            .provisioning
            .update_student(
                "10001",
                StudentChanges {
                    full_name: Some("John A. Smith".to_string()),
                    ..Default::default()
                },
                Some(&staff),
            )
            .unwrap();

        let qr: QrPayload = serde_json::from_str(updated.qr_payload.as_deref().unwrap()).unwrap();
        assert_eq!(qr.full_name, "John A. Smith");
        let entries = f.store.entries_for(EntityType::Student, "10001");
        assert_eq!(entries.last().unwrap().action, ActivityAction::UpdateStudent);
    }

    #[test]
    fn test_delete_student_removes_card_and_reservations() {
        let f = fixture();
        let admin = Actor::admin(1);
        let created = f
            .provisioning
            .provision(NewStudent::new("10001", "A").with_cn("12345678"), Some(&admin))
            .unwrap();

        f.provisioning.delete_student("10001", Some(&admin)).unwrap();

        assert!(f.students.is_empty());
        assert!(f.cards.is_empty());
        assert!(f.cards.find_by_number(&created.card.card_number).is_none());

        // The freed identifiers can be provisioned again
        f.provisioning
            .provision(NewStudent::new("10001", "A").with_cn("12345678"), Some(&admin))
            .unwrap();
    }

    #[test]
    fn test_delete_requires_admin() {
        let f = fixture();
        let staff = Actor::staff(2);
        f.provisioning
            .provision(NewStudent::new("10001", "A"), Some(&staff))
            .unwrap();
        let result = f.provisioning.delete_student("10001", Some(&staff));
        assert_eq!(result, Err(LedgerError::forbidden(Role::Staff, "delete students")));
        assert_eq!(f.students.len(), 1);
    }

    #[test]
    fn test_reads_require_identity_and_log_views() {
        let f = fixture();
        let created = f
            .provisioning
            .provision(NewStudent::new("10001", "A"), Some(&Actor::staff(2)))
            .unwrap();

        assert_eq!(
            f.provisioning.get_student("10001", None),
            Err(LedgerError::Unauthorized)
        );

        let card = f
            .provisioning
            .card_for_student("10001", Some(&Actor::viewer(3)))
            .unwrap();
        assert_eq!(card.card_id, created.card.card_id);

        let views = f
            .store
            .entries_for(EntityType::Card, &card.card_id.to_string())
            .into_iter()
            .filter(|e| e.action == ActivityAction::View)
            .count();
        assert_eq!(views, 1);
    }
}
