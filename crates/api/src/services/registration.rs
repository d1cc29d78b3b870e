//! Two-step registration: auth identity first, then the local profile.
//!
//! The identity provider and the profile table are separate systems. When the
//! first step succeeds and the second fails, the caller gets
//! [`AppError::ProfileIncomplete`] carrying the new user id, and can finish
//! with [`RegistrationService::complete_profile`] once signed in.

use secrecy::SecretString;

use atelier_core::{Email, Role};

use crate::db::{RepositoryError, Stores};
use crate::error::{AppError, Result};
use crate::models::{NewProfile, Profile};
use crate::services::identity::{AuthIdentity, IdentityProvider, UserMetadata};

/// Both halves of a completed registration.
#[derive(Debug, Clone)]
pub struct Registration {
    pub identity: AuthIdentity,
    pub profile: Profile,
}

/// Runs the registration saga against an identity provider and the stores.
pub struct RegistrationService<'a> {
    identity: &'a dyn IdentityProvider,
    stores: &'a Stores,
}

/// Display name to store, falling back to the email's local part.
fn display_name(name: &str, email: &Email) -> String {
    let name = name.trim();
    if name.is_empty() {
        email
            .as_str()
            .split_once('@')
            .map_or_else(|| email.to_string(), |(local, _)| local.to_owned())
    } else {
        name.to_owned()
    }
}

fn self_assignable(role: Role) -> Result<Role> {
    if role.is_self_assignable() {
        Ok(role)
    } else {
        Err(AppError::InvalidRequest(
            "role must be customer or designer".to_string(),
        ))
    }
}

impl<'a> RegistrationService<'a> {
    /// Create a registration service.
    #[must_use]
    pub const fn new(identity: &'a dyn IdentityProvider, stores: &'a Stores) -> Self {
        Self { identity, stores }
    }

    /// Create the auth identity, then the profile sharing its id.
    ///
    /// # Errors
    ///
    /// - `AppError::InvalidRequest` for an admin role or when the provider
    ///   refuses the signup (duplicate email, weak password, ...)
    /// - `AppError::Upstream` when the provider is unreachable
    /// - `AppError::ProfileIncomplete` when the identity exists but the
    ///   profile insert failed
    pub async fn register(
        &self,
        email: Email,
        password: &SecretString,
        name: &str,
        role: Role,
    ) -> Result<Registration> {
        let role = self_assignable(role)?;
        let name = display_name(name, &email);
        let metadata = UserMetadata {
            full_name: name.clone(),
            role,
        };

        let identity = self
            .identity
            .create_user(&email, password, &metadata)
            .await
            .map_err(|e| {
                tracing::warn!(email = %email, error = %e, "Auth user creation failed");
                if e.is_client_error() {
                    AppError::InvalidRequest(format!("failed creating auth user: {e}"))
                } else {
                    e.into()
                }
            })?;

        let new_profile = NewProfile {
            id: identity.id,
            name,
            email,
            role,
        };
        let profile = self.stores.profiles.insert(new_profile).await.map_err(|e| {
            tracing::error!(
                user_id = %identity.id,
                error = %e,
                "Profile creation failed after auth user was created"
            );
            sentry::capture_message(
                &format!("profile missing for auth user {}", identity.id),
                sentry::Level::Warning,
            );
            AppError::ProfileIncomplete {
                user_id: identity.id,
            }
        })?;

        tracing::info!(user_id = %profile.id, role = %profile.role, "User registered");
        Ok(Registration { identity, profile })
    }

    /// Create the missing profile for an already verified identity.
    ///
    /// An existing profile is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidRequest` for an admin role or an identity
    /// without a usable email, `AppError::Database` if the insert fails.
    pub async fn complete_profile(
        &self,
        identity: &AuthIdentity,
        name: &str,
        role: Role,
    ) -> Result<Profile> {
        if let Some(existing) = self.stores.profiles.get(identity.id).await? {
            return Ok(existing);
        }

        let role = self_assignable(role)?;
        let email = identity
            .email
            .as_deref()
            .and_then(|e| Email::parse(e).ok())
            .ok_or_else(|| AppError::InvalidRequest("identity has no valid email".to_string()))?;

        let new_profile = NewProfile {
            id: identity.id,
            name: display_name(name, &email),
            email,
            role,
        };

        match self.stores.profiles.insert(new_profile).await {
            Ok(profile) => {
                tracing::info!(user_id = %profile.id, role = %profile.role, "Profile completed");
                Ok(profile)
            }
            // A concurrent completion won the insert.
            Err(RepositoryError::Conflict(_)) => self
                .stores
                .profiles
                .get(identity.id)
                .await?
                .ok_or_else(|| AppError::NotFound("User not found".to_string())),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use atelier_core::ProfileId;

    use super::*;
    use crate::db::ProfileStore;
    use crate::services::identity::StaticIdentityProvider;

    struct BrokenProfiles;

    #[async_trait]
    impl ProfileStore for BrokenProfiles {
        async fn get(
            &self,
            _id: ProfileId,
        ) -> std::result::Result<Option<Profile>, RepositoryError> {
            Ok(None)
        }

        async fn insert(
            &self,
            _profile: NewProfile,
        ) -> std::result::Result<Profile, RepositoryError> {
            Err(RepositoryError::DataCorruption("disk full".into()))
        }

        async fn list_by_role(
            &self,
            _role: Role,
        ) -> std::result::Result<Vec<Profile>, RepositoryError> {
            Ok(Vec::new())
        }

        async fn count_by_role(&self, _role: Role) -> std::result::Result<i64, RepositoryError> {
            Ok(0)
        }
    }

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    fn password() -> SecretString {
        SecretString::from("correct horse battery")
    }

    #[tokio::test]
    async fn test_register_links_identity_and_profile() {
        let provider = StaticIdentityProvider::new();
        let stores = Stores::in_memory();
        let service = RegistrationService::new(&provider, &stores);

        let registration = service
            .register(email("dee@example.com"), &password(), "", Role::Designer)
            .await
            .unwrap();

        assert_eq!(registration.identity.id, registration.profile.id);
        assert_eq!(registration.profile.name, "dee");
        assert_eq!(registration.profile.role, Role::Designer);
    }

    #[tokio::test]
    async fn test_register_refuses_admin_role() {
        let provider = StaticIdentityProvider::new();
        let stores = Stores::in_memory();
        let err = RegistrationService::new(&provider, &stores)
            .register(email("root@example.com"), &password(), "Root", Role::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_provider_rejection_is_invalid_request() {
        let provider = StaticIdentityProvider::rejecting_signups();
        let stores = Stores::in_memory();
        let err = RegistrationService::new(&provider, &stores)
            .register(email("a@example.com"), &password(), "A", Role::Customer)
            .await
            .unwrap_err();
        match err {
            AppError::InvalidRequest(message) => {
                assert!(message.starts_with("failed creating auth user"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_profile_failure_then_completion() {
        let provider = StaticIdentityProvider::new();
        let broken = Stores::in_memory().with_profiles(Arc::new(BrokenProfiles));

        let err = RegistrationService::new(&provider, &broken)
            .register(email("half@example.com"), &password(), "Half", Role::Customer)
            .await
            .unwrap_err();
        let AppError::ProfileIncomplete { user_id } = err else {
            panic!("expected ProfileIncomplete, got {err:?}");
        };

        let identity = provider
            .verify(&StaticIdentityProvider::token_for("half@example.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(identity.id, user_id);

        let stores = Stores::in_memory();
        let service = RegistrationService::new(&provider, &stores);
        let profile = service
            .complete_profile(&identity, "Half", Role::Customer)
            .await
            .unwrap();
        assert_eq!(profile.id, user_id);

        let again = service
            .complete_profile(&identity, "Renamed", Role::Designer)
            .await
            .unwrap();
        assert_eq!(again, profile);
    }
}
