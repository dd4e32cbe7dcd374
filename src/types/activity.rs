//! Activity audit log types

use super::actor::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Audit entry identifier
pub type ActivityId = u64;

/// Kind of entity an audit entry or lookup refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Card,
    Student,
    Reclamation,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Card => "card",
            EntityType::Student => "student",
            EntityType::Reclamation => "reclamation",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(EntityType::Card),
            "student" => Ok(EntityType::Student),
            "reclamation" => Ok(EntityType::Reclamation),
            other => Err(format!("unknown entity type '{other}'")),
        }
    }
}

/// Audited action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    AddFunds,
    SubtractFunds,
    CreateCard,
    UpdateCard,
    CreateStudent,
    UpdateStudent,
    DeleteStudent,
    DeleteCard,
    /// Deduction applied by reclamation settlement
    DeductFundsAdmin,
    MarkUsed,
    /// Read-only access; logged best-effort
    View,
}

/// One append-only audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: ActivityId,

    /// Actor who performed the action
    pub user_id: UserId,

    pub action: ActivityAction,
    pub entity_type: EntityType,
    pub entity_id: String,

    /// Structured payload (balances, amounts, reasons, ...)
    pub details: serde_json::Value,

    pub created_at: DateTime<Utc>,
}

/// Audit record before an id and timestamp are assigned
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub user_id: UserId,
    pub action: ActivityAction,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub details: serde_json::Value,
}

impl NewActivity {
    pub fn new(
        user_id: UserId,
        action: ActivityAction,
        entity_type: EntityType,
        entity_id: impl ToString,
        details: serde_json::Value,
    ) -> Self {
        NewActivity {
            user_id,
            action,
            entity_type,
            entity_id: entity_id.to_string(),
            details,
        }
    }
}

/// Offset pagination for audit lookups
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Page {
    /// Maximum number of entries; 0 means the configured default
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

impl Page {
    pub fn new(limit: usize, offset: usize) -> Self {
        Page { limit, offset }
    }
}
