//! Caller identity types
//!
//! The ledger core never resolves identities itself. Every operation receives
//! the already-resolved caller as an explicit parameter.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User identifier of staff, administrators and viewers
pub type UserId = u64;

/// Role of a resolved caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access, including subtracting funds and settling reclamations
    Admin,

    /// Can add funds, provision students and file reclamations
    Staff,

    /// Read-only access; rejected by every mutating operation
    Viewer,
}

impl Role {
    /// Lowercase name used on the wire and in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "staff" => Ok(Role::Staff),
            "viewer" => Ok(Role::Viewer),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// A resolved caller: who is acting, and in which role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: UserId, role: Role) -> Self {
        Actor { id, role }
    }

    pub fn admin(id: UserId) -> Self {
        Actor::new(id, Role::Admin)
    }

    pub fn staff(id: UserId) -> Self {
        Actor::new(id, Role::Staff)
    }

    pub fn viewer(id: UserId) -> Self {
        Actor::new(id, Role::Viewer)
    }
}
