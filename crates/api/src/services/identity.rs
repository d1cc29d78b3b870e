//! Identity provider client.
//!
//! Credentials are issued and verified by a Supabase-compatible auth service.
//! This module only speaks to it; the local profile lives in the database and
//! shares the provider's user id.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use atelier_core::{Email, ProfileId, Role};

use crate::config::ProviderConfig;

/// Errors that can occur when talking to the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// HTTP request failed (connect, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider refused the request.
    #[error("API error: {status} - {message}")]
    Rejected { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl IdentityError {
    /// Whether the provider rejected the caller's input rather than failing.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Rejected { status, .. } if *status >= 400 && *status < 500)
    }
}

/// A verified identity as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthIdentity {
    pub id: ProfileId,
    pub email: Option<String>,
    /// Role claim from the identity's metadata. Informational only; the
    /// profile's role is what the gate checks.
    pub role: Option<String>,
    pub metadata: serde_json::Value,
}

/// Metadata attached to a new identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserMetadata {
    pub full_name: String,
    pub role: Role,
}

/// Opaque token grant returned by a password sign-in, passed through as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TokenGrant(pub serde_json::Value);

/// Issues and verifies bearer credentials.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer token. `Ok(None)` for any token the provider does not
    /// accept; `Err` only when the provider could not be asked.
    async fn verify(&self, token: &str) -> Result<Option<AuthIdentity>, IdentityError>;

    /// Create a confirmed identity.
    async fn create_user(
        &self,
        email: &Email,
        password: &SecretString,
        metadata: &UserMetadata,
    ) -> Result<AuthIdentity, IdentityError>;

    /// Exchange email and password for a token grant.
    async fn sign_in(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<TokenGrant, IdentityError>;
}

// =============================================================================
// Supabase adapter
// =============================================================================

/// User object as returned by the provider.
#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: Uuid,
    email: Option<String>,
    #[serde(default)]
    user_metadata: serde_json::Value,
}

impl From<ProviderUser> for AuthIdentity {
    fn from(user: ProviderUser) -> Self {
        let role = user
            .user_metadata
            .get("role")
            .and_then(serde_json::Value::as_str)
            .map(String::from);
        Self {
            id: ProfileId::new(user.id),
            email: user.email,
            role,
            metadata: user.user_metadata,
        }
    }
}

/// Identity provider backed by the Supabase auth REST API.
#[derive(Clone)]
pub struct SupabaseIdentity {
    client: reqwest::Client,
    base_url: Url,
    anon_key: SecretString,
    service_role_key: SecretString,
}

impl SupabaseIdentity {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns error if a key is not a valid header value or the HTTP client
    /// fails to build.
    pub fn new(config: &ProviderConfig) -> Result<Self, IdentityError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(config.anon_key.expose_secret())
                .map_err(|e| IdentityError::Parse(format!("Invalid anon key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
            anon_key: config.anon_key.clone(),
            service_role_key: config.service_role_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, IdentityError> {
        self.base_url
            .join(path)
            .map_err(|e| IdentityError::Parse(format!("invalid provider URL: {e}")))
    }
}

async fn rejected(response: reqwest::Response) -> IdentityError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    IdentityError::Rejected { status, message }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentity {
    async fn verify(&self, token: &str) -> Result<Option<AuthIdentity>, IdentityError> {
        let token = token.trim();
        if token.is_empty() {
            return Ok(None);
        }

        let response = self
            .client
            .get(self.endpoint("auth/v1/user")?)
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), "Bearer token not accepted");
            return Ok(None);
        }

        // A 200 whose body is not a user is treated like a rejected token.
        Ok(response
            .json::<ProviderUser>()
            .await
            .ok()
            .map(AuthIdentity::from))
    }

    async fn create_user(
        &self,
        email: &Email,
        password: &SecretString,
        metadata: &UserMetadata,
    ) -> Result<AuthIdentity, IdentityError> {
        let body = serde_json::json!({
            "email": email.as_str(),
            "password": password.expose_secret(),
            "user_metadata": metadata,
            "email_confirm": true,
        });

        let response = self
            .client
            .post(self.endpoint("auth/v1/admin/users")?)
            .header("apikey", self.service_role_key.expose_secret())
            .bearer_auth(self.service_role_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejected(response).await);
        }

        let user: ProviderUser = response
            .json()
            .await
            .map_err(|e| IdentityError::Parse(e.to_string()))?;
        Ok(user.into())
    }

    async fn sign_in(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<TokenGrant, IdentityError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let body = serde_json::json!({
            "email": email,
            "password": password.expose_secret(),
        });

        let response = self
            .client
            .post(url)
            .bearer_auth(self.anon_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejected(response).await);
        }

        let grant = response
            .json()
            .await
            .map_err(|e| IdentityError::Parse(e.to_string()))?;
        Ok(TokenGrant(grant))
    }
}

// =============================================================================
// Fixture provider
// =============================================================================

#[cfg(any(test, feature = "test-support"))]
pub use fixture::StaticIdentityProvider;

#[cfg(any(test, feature = "test-support"))]
mod fixture {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::{
        AuthIdentity, Email, IdentityError, IdentityProvider, ProfileId, SecretString, TokenGrant,
        UserMetadata, async_trait,
    };
    use secrecy::ExposeSecret;
    use uuid::Uuid;

    #[derive(Debug, Default)]
    struct Registry {
        tokens: HashMap<String, AuthIdentity>,
        passwords: HashMap<String, (String, String)>,
    }

    /// In-process identity provider mapping fixed tokens to identities.
    ///
    /// `create_user` registers the new identity under the token
    /// `token-<email>` so tests can act as freshly registered users.
    #[derive(Debug, Default)]
    pub struct StaticIdentityProvider {
        registry: Mutex<Registry>,
        fail_creation: bool,
    }

    impl StaticIdentityProvider {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// A provider whose `create_user` always fails with a 422.
        #[must_use]
        pub fn rejecting_signups() -> Self {
            Self {
                fail_creation: true,
                ..Self::default()
            }
        }

        /// Register `token` as a bearer credential for a new identity.
        pub fn issue(&self, token: &str, email: &str) -> ProfileId {
            let id = ProfileId::new(Uuid::new_v4());
            let identity = AuthIdentity {
                id,
                email: Some(email.to_owned()),
                role: None,
                metadata: serde_json::Value::Null,
            };
            if let Ok(mut registry) = self.registry.lock() {
                registry.tokens.insert(token.to_owned(), identity);
            }
            id
        }

        /// The token `create_user` issues for `email`.
        #[must_use]
        pub fn token_for(email: &str) -> String {
            format!("token-{email}")
        }
    }

    #[async_trait]
    impl IdentityProvider for StaticIdentityProvider {
        async fn verify(&self, token: &str) -> Result<Option<AuthIdentity>, IdentityError> {
            let registry = self
                .registry
                .lock()
                .map_err(|_| IdentityError::Parse("registry poisoned".into()))?;
            Ok(registry.tokens.get(token).cloned())
        }

        async fn create_user(
            &self,
            email: &Email,
            password: &SecretString,
            metadata: &UserMetadata,
        ) -> Result<AuthIdentity, IdentityError> {
            if self.fail_creation {
                return Err(IdentityError::Rejected {
                    status: 422,
                    message: "signups disabled".into(),
                });
            }

            let mut registry = self
                .registry
                .lock()
                .map_err(|_| IdentityError::Parse("registry poisoned".into()))?;
            if registry.passwords.contains_key(email.as_str()) {
                return Err(IdentityError::Rejected {
                    status: 422,
                    message: "user already registered".into(),
                });
            }

            let identity = AuthIdentity {
                id: ProfileId::new(Uuid::new_v4()),
                email: Some(email.as_str().to_owned()),
                role: Some(metadata.role.as_str().to_owned()),
                metadata: serde_json::to_value(metadata)
                    .map_err(|e| IdentityError::Parse(e.to_string()))?,
            };
            let token = Self::token_for(email.as_str());
            registry.passwords.insert(
                email.as_str().to_owned(),
                (password.expose_secret().to_owned(), token.clone()),
            );
            registry.tokens.insert(token, identity.clone());
            Ok(identity)
        }

        async fn sign_in(
            &self,
            email: &str,
            password: &SecretString,
        ) -> Result<TokenGrant, IdentityError> {
            let registry = self
                .registry
                .lock()
                .map_err(|_| IdentityError::Parse("registry poisoned".into()))?;
            match registry.passwords.get(email) {
                Some((stored, token)) if stored == password.expose_secret() => {
                    Ok(TokenGrant(serde_json::json!({
                        "access_token": token,
                        "token_type": "bearer",
                    })))
                }
                _ => Err(IdentityError::Rejected {
                    status: 400,
                    message: "Invalid login credentials".into(),
                }),
            }
        }
    }
}
