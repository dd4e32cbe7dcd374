//! Thread-safe student storage
//!
//! The `students` table keyed by student id, plus the unique `cn` index.
//! Uniqueness of both keys is enforced with map entry locks held across the
//! check and the insert, never with a separate lookup beforehand.

use crate::types::{Cn, EntityType, LedgerError, Student, StudentId};
use dashmap::DashMap;

/// Thread-safe student table
#[derive(Debug, Default)]
pub struct StudentStore {
    pub(crate) students: DashMap<StudentId, Student>,

    /// Unique index: cn to student id
    pub(crate) cn_index: DashMap<Cn, StudentId>,
}

impl StudentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a student
    pub fn get(&self, student_id: &StudentId) -> Option<Student> {
        self.students.get(student_id).map(|s| s.value().clone())
    }

    /// Student id registered for a cn
    pub fn find_by_cn(&self, cn: &Cn) -> Option<StudentId> {
        self.cn_index.get(cn).map(|id| id.value().clone())
    }

    /// Update a student transactionally (copy, modify, write back on success)
    pub fn update<T, F>(&self, student_id: &StudentId, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Student) -> Result<T, LedgerError>,
    {
        let mut entry = self
            .students
            .get_mut(student_id)
            .ok_or_else(|| LedgerError::not_found(EntityType::Student, student_id))?;

        let mut draft = entry.value().clone();
        let result = f(&mut draft)?;
        *entry.value_mut() = draft;
        Ok(result)
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }
}
