//! Bearer-token authentication and role gating.
//!
//! The two stages are separate layers: `authenticate` rejects with 401 and
//! `authorize` with 403, so callers can tell a bad session from a missing
//! permission.

use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;
use uuid::Uuid;

use crate::auth::TokenError;
use crate::models::Role;
use crate::state::AppState;
use crate::utils::error::AppError;

const MISSING_TOKEN: &str = "Missing or malformed bearer token";

/// Identity attached to a request once its token has been verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: Role,
}

/// Roles permitted through an `authorize` stage.
#[derive(Debug, Clone, Copy)]
pub struct AllowedRoles(pub &'static [Role]);

pub const ORGANIZERS: AllowedRoles = AllowedRoles(&[Role::Organizer, Role::Admin]);
pub const ANY_ROLE: AllowedRoles = AllowedRoles(&[Role::Attendee, Role::Organizer, Role::Admin]);

impl AllowedRoles {
    pub fn permits(&self, role: Role) -> bool {
        self.0.contains(&role)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| AppError::unauthorized(MISSING_TOKEN))?;

    let claims = state.tokens.verify_token(token).map_err(|e| {
        debug!(error = %e, "Token rejected");
        match e {
            TokenError::Expired => AppError::unauthorized("Token has expired"),
            _ => AppError::unauthorized("Invalid token"),
        }
    })?;

    request.extensions_mut().insert(AuthContext {
        user_id: claims.sub,
        role: claims.role,
    });

    Ok(next.run(request).await)
}

pub async fn authorize(
    State(allowed): State<AllowedRoles>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let context = request
        .extensions()
        .get::<AuthContext>()
        .copied()
        .ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    if !allowed.permits(context.role) {
        debug!(user_id = %context.user_id, role = %context.role, "Role not allowed");
        return Err(AppError::forbidden("Insufficient role for this operation"));
    }

    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .copied()
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(
            bearer_token(&headers("Bearer abc.def.ghi")),
            Some("abc.def.ghi")
        );
        assert_eq!(bearer_token(&headers("bearer   abc")), Some("abc"));
    }

    #[test]
    fn test_reject_malformed_authorization() {
        assert_eq!(bearer_token(&headers("abc.def.ghi")), None);
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_allowed_roles() {
        assert!(ORGANIZERS.permits(Role::Organizer));
        assert!(ORGANIZERS.permits(Role::Admin));
        assert!(!ORGANIZERS.permits(Role::Attendee));
        assert!(ANY_ROLE.permits(Role::Attendee));
    }
}
