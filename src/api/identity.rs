//! Caller identity extraction
//!
//! The ledger core takes the caller as an explicit parameter. Over HTTP the
//! caller arrives in two headers:
//!
//! ```text
//! x-user-id:   42
//! x-user-role: admin | staff | viewer
//! ```
//!
//! Requests without either header are passed on with no actor, so the core
//! decides between public and `Unauthorized`. A request that carries only one
//! of the headers, or an unparsable value, is rejected here.

use super::error::Problem;
use crate::types::{Actor, Role, UserId};
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Resolved caller of a request, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub Option<Actor>);

impl Caller {
    pub fn actor(&self) -> Option<&Actor> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Problem;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        resolve_caller(&parts.headers).map(Caller)
    }
}

/// Read the identity headers
///
/// # Returns
///
/// * `Ok(None)` - Neither header is present
/// * `Ok(Some(actor))` - Both headers are present and well formed
/// * `Err(Problem)` - 401 for a partial or malformed identity
pub fn resolve_caller(headers: &HeaderMap) -> Result<Option<Actor>, Problem> {
    let id = header_str(headers, USER_ID_HEADER)?;
    let role = header_str(headers, USER_ROLE_HEADER)?;

    match (id, role) {
        (None, None) => Ok(None),
        (Some(id), Some(role)) => {
            let id: UserId = id
                .trim()
                .parse()
                .map_err(|_| unauthorized(format!("{USER_ID_HEADER} must be an unsigned integer")))?;
            let role: Role = role.parse().map_err(unauthorized)?;
            Ok(Some(Actor::new(id, role)))
        }
        _ => Err(unauthorized(format!(
            "{USER_ID_HEADER} and {USER_ROLE_HEADER} must be sent together"
        ))),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, Problem> {
    headers
        .get(name)
        .map(|value| {
            value
                .to_str()
                .map_err(|_| unauthorized(format!("{name} is not valid text")))
        })
        .transpose()
}

fn unauthorized(detail: String) -> Problem {
    Problem::new(StatusCode::UNAUTHORIZED, "Unauthorized", "unauthorized").with_detail(detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use rstest::rstest;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[rstest]
    #[case::admin(&[("x-user-id", "1"), ("x-user-role", "admin")], Actor::admin(1))]
    #[case::staff_mixed_case(&[("x-user-id", " 7 "), ("x-user-role", "Staff")], Actor::staff(7))]
    #[case::viewer(&[("x-user-id", "9"), ("x-user-role", "viewer")], Actor::viewer(9))]
    fn test_resolves_actor(#[case] pairs: &[(&'static str, &'static str)], #[case] expected: Actor) {
        assert_eq!(resolve_caller(&headers(pairs)).unwrap(), Some(expected));
    }

    #[test]
    fn test_no_headers_is_anonymous() {
        assert_eq!(resolve_caller(&HeaderMap::new()).unwrap(), None);
    }

    #[rstest]
    #[case::missing_role(&[("x-user-id", "1")])]
    #[case::missing_id(&[("x-user-role", "admin")])]
    #[case::negative_id(&[("x-user-id", "-1"), ("x-user-role", "admin")])]
    #[case::unknown_role(&[("x-user-id", "1"), ("x-user-role", "root")])]
    fn test_rejects_malformed_identity(#[case] pairs: &[(&'static str, &'static str)]) {
        let problem = resolve_caller(&headers(pairs)).unwrap_err();
        assert_eq!(problem.status, 401);
        assert_eq!(problem.code, "unauthorized");
    }
}
