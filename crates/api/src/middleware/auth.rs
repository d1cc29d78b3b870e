//! Authentication and authorization extractors.
//!
//! Resolution runs once per request, in order:
//!
//! 1. [`Identified`] parses `Authorization: Bearer <token>` and asks the
//!    identity provider to verify it (401 when absent or rejected).
//! 2. [`Authenticated`] loads the profile sharing the identity's id
//!    (404 "User not found" when the profile is missing).
//! 3. [`Authorized<C>`] checks the profile's role against the capability set
//!    of `C` (403 when the role is not admitted).
//!
//! Handlers receive the resolved [`Subject`] and pass it explicitly to the
//! lifecycle services.

use std::marker::PhantomData;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::Span;

use atelier_core::access::authorize;
use atelier_core::{Capabilities, Subject};

use crate::error::{AppError, set_sentry_user};
use crate::models::Profile;
use crate::services::AuthIdentity;
use crate::state::AppState;

/// Extract the bearer token from an `Authorization` header value.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// A caller holding a valid credential, whether or not a profile exists.
///
/// Used by the endpoints that repair or inspect a half-registered account.
pub struct Identified(pub AuthIdentity);

impl FromRequestParts<AppState> for Identified {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthenticated("unauthorized".to_string()))?;

        let identity = state
            .identity()
            .verify(token)
            .await?
            .ok_or_else(|| AppError::Unauthenticated("unauthorized".to_string()))?;

        Ok(Self(identity))
    }
}

/// A caller with a valid credential and a local profile.
pub struct Authenticated {
    pub identity: AuthIdentity,
    pub profile: Profile,
}

impl Authenticated {
    /// The subject this caller acts as.
    #[must_use]
    pub const fn subject(&self) -> Subject {
        self.profile.subject()
    }
}

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Identified(identity) = Identified::from_request_parts(parts, state).await?;

        let profile = state
            .stores()
            .profiles
            .get(identity.id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Span::current().record("user_id", tracing::field::display(profile.id));
        set_sentry_user(&profile.id, Some(profile.email.as_str()));

        Ok(Self { identity, profile })
    }
}

/// A capability marker naming the roles admitted to an operation.
pub trait Capability: Send + Sync + 'static {
    /// Roles admitted.
    const ROLES: Capabilities;
    /// Label used in denial messages and logs.
    const LABEL: &'static str;
}

/// Any authenticated subject.
pub struct AnyRole;

/// Designers and admins.
pub struct DesignerOrAdmin;

/// Admins only.
pub struct AdminOnly;

impl Capability for AnyRole {
    const ROLES: Capabilities = Capabilities::ANY;
    const LABEL: &'static str = "any role";
}

impl Capability for DesignerOrAdmin {
    const ROLES: Capabilities = Capabilities::DESIGNER;
    const LABEL: &'static str = "designer or admin";
}

impl Capability for AdminOnly {
    const ROLES: Capabilities = Capabilities::ADMIN;
    const LABEL: &'static str = "admin";
}

/// An authenticated caller whose role is admitted by `C`.
pub struct Authorized<C: Capability> {
    pub subject: Subject,
    pub profile: Profile,
    _capability: PhantomData<C>,
}

impl<C: Capability> FromRequestParts<AppState> for Authorized<C> {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let caller = Authenticated::from_request_parts(parts, state).await?;

        let subject = authorize(caller.subject(), C::ROLES, C::LABEL).inspect_err(|_| {
            tracing::warn!(
                user_id = %caller.profile.id,
                role = %caller.profile.role,
                required = C::LABEL,
                path = %parts.uri.path(),
                "Role check denied"
            );
        })?;

        Ok(Self {
            subject,
            profile: caller.profile,
            _capability: PhantomData,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/orders");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&parts(Some("bearer  abc "))), Some("abc"));
        assert_eq!(bearer_token(&parts(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts(None)), None);
    }

    #[test]
    fn test_capability_markers() {
        use atelier_core::Role;

        assert!(AnyRole::ROLES.admits(Role::Customer));
        assert!(!DesignerOrAdmin::ROLES.admits(Role::Customer));
        assert!(DesignerOrAdmin::ROLES.admits(Role::Admin));
        assert!(!AdminOnly::ROLES.admits(Role::Designer));
    }
}
