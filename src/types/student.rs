//! Student-related types
//!
//! Student ids and cn numbers are externally assigned numeric codes. Both are
//! validated once at the edge and carried as newtypes afterwards.

use super::actor::UserId;
use super::card::{CardId, CardNumber};
use super::error::LedgerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

fn parse_digits(field: &str, value: &str, len: usize) -> Result<String, LedgerError> {
    let value = value.trim();
    if value.len() != len || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LedgerError::validation(
            field,
            format!("'{value}' must be exactly {len} digits"),
        ));
    }
    Ok(value.to_string())
}

/// Externally assigned 5-digit student identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StudentId(String);

impl StudentId {
    pub const LEN: usize = 5;

    pub fn parse(value: &str) -> Result<Self, LedgerError> {
        parse_digits("student_id", value, Self::LEN).map(StudentId)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for StudentId {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        StudentId::parse(&value)
    }
}

impl From<StudentId> for String {
    fn from(value: StudentId) -> Self {
        value.0
    }
}

/// Optional 8-digit cn number, unique when present
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cn(String);

impl Cn {
    pub const LEN: usize = 8;

    pub fn parse(value: &str) -> Result<Self, LedgerError> {
        parse_digits("cn", value, Self::LEN).map(Cn)
    }

    /// Parse an optional cn, treating blank input as absent
    pub fn parse_optional(value: Option<&str>) -> Result<Option<Self>, LedgerError> {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Cn::parse(v).map(Some),
            _ => Ok(None),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Cn {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Cn::parse(&value)
    }
}

impl From<Cn> for String {
    fn from(value: Cn) -> Self {
        value.0
    }
}

/// Student record
///
/// `card_id` stays `None` until provisioning commits, and only ever points at
/// the card owned by this student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub student_id: StudentId,
    pub cn: Option<Cn>,
    pub full_name: String,
    pub profile_image: Option<String>,
    pub university_id: Option<String>,
    pub card_id: Option<CardId>,

    /// JSON document encoded into the printed QR code
    pub qr_payload: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: UserId,
    pub updated_by: UserId,
}

/// Unvalidated input for provisioning a student and its card
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NewStudent {
    pub student_id: String,
    #[serde(default)]
    pub cn: Option<String>,
    pub full_name: String,
    #[serde(default)]
    pub university_id: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
}

impl NewStudent {
    pub fn new(student_id: &str, full_name: &str) -> Self {
        NewStudent {
            student_id: student_id.to_string(),
            full_name: full_name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_cn(mut self, cn: &str) -> Self {
        self.cn = Some(cn.to_string());
        self
    }
}

/// Partial update of a student's descriptive fields
///
/// Identifiers (student_id, cn, card) are immutable after provisioning.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StudentChanges {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub university_id: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
}

/// Payload encoded into the student's QR code for downstream consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QrPayload {
    pub student_id: StudentId,
    pub cn: Option<Cn>,
    pub full_name: String,
    pub card_number: CardNumber,
    pub university_id: Option<String>,
}
