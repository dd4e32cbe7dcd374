//! Caller identity and role checks shared by the core operations

use crate::types::{Actor, LedgerError, Role};

/// Resolve the caller, failing with `Unauthorized` when there is none
pub(crate) fn resolve(actor: Option<&Actor>) -> Result<&Actor, LedgerError> {
    actor.ok_or(LedgerError::Unauthorized)
}

/// Resolve the caller and require one of the given roles
///
/// # Arguments
///
/// * `actor` - Resolved caller identity, if any
/// * `allowed` - Roles permitted to perform the operation
/// * `operation` - Operation name reported in the `Forbidden` error
pub(crate) fn require<'a>(
    actor: Option<&'a Actor>,
    allowed: &[Role],
    operation: &str,
) -> Result<&'a Actor, LedgerError> {
    let actor = resolve(actor)?;
    if !allowed.contains(&actor.role) {
        tracing::warn!(
            actor_id = actor.id,
            role = %actor.role,
            operation,
            "Operation refused for role"
        );
        return Err(LedgerError::forbidden(actor.role, operation));
    }
    Ok(actor)
}

/// Roles allowed to create and edit records
pub(crate) const WRITERS: &[Role] = &[Role::Admin, Role::Staff];
