//! Registration, sign-in and identity routes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Value, json};

use atelier_core::{Email, Role};

use super::extract::AppJson;
use super::views::ProfileView;
use crate::error::{AppError, Result};
use crate::middleware::Identified;
use crate::services::{IdentityError, RegistrationService};
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/profile", post(complete_profile))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub name: Option<String>,
    pub role: Option<Role>,
}

/// Both credentials, or a 400.
fn credentials(
    email: Option<String>,
    password: Option<String>,
) -> Result<(String, SecretString)> {
    match (email, password) {
        (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
            Ok((email, SecretString::from(password)))
        }
        _ => Err(AppError::InvalidRequest(
            "email and password required".to_string(),
        )),
    }
}

/// Create the auth identity and the profile.
///
/// Returns 201 on success, and also 201 with code `profile_incomplete` when
/// only the identity was created.
///
/// # Errors
///
/// Returns 400 for missing fields, an invalid email, an admin role or a
/// refused signup.
pub async fn register(
    State(state): State<AppState>,
    AppJson(body): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let (email, password) = credentials(body.email, body.password)?;
    let email = Email::parse(&email).map_err(|e| AppError::InvalidRequest(e.to_string()))?;
    let role = body.role.unwrap_or(Role::Customer);

    let registration = RegistrationService::new(state.identity(), state.stores())
        .register(email, &password, body.name.as_deref().unwrap_or_default(), role)
        .await?;

    let profile = registration.profile;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "registered",
            "user": { "id": profile.id, "email": profile.email, "role": profile.role },
        })),
    ))
}

/// Finish a registration whose profile step failed.
///
/// # Errors
///
/// Returns 401 without a valid token, 400 for an admin role.
pub async fn complete_profile(
    State(state): State<AppState>,
    Identified(identity): Identified,
    AppJson(body): AppJson<ProfileRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let role = body.role.unwrap_or(Role::Customer);
    let profile = RegistrationService::new(state.identity(), state.stores())
        .complete_profile(&identity, body.name.as_deref().unwrap_or_default(), role)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "profile created", "profile": ProfileView::from(&profile) })),
    ))
}

/// Password sign-in. The provider's token grant is returned as-is.
///
/// # Errors
///
/// Returns 400 for missing fields, 401 when the provider refuses the
/// credentials, 502 when it is unreachable.
pub async fn login(
    State(state): State<AppState>,
    AppJson(body): AppJson<LoginRequest>,
) -> Result<Json<Value>> {
    let (email, password) = credentials(body.email, body.password)?;

    let grant = state
        .identity()
        .sign_in(email.trim(), &password)
        .await
        .map_err(|e: IdentityError| {
            if e.is_client_error() {
                tracing::info!(error = %e, "Sign-in refused");
                AppError::Unauthenticated("invalid credentials or auth error".to_string())
            } else {
                e.into()
            }
        })?;

    Ok(Json(grant.0))
}

/// The caller's identity and, when present, profile.
///
/// # Errors
///
/// Returns 401 without a valid token.
pub async fn me(
    State(state): State<AppState>,
    Identified(identity): Identified,
) -> Result<Json<Value>> {
    let profile = state.stores().profiles.get(identity.id).await?;

    Ok(Json(json!({
        "user": identity,
        "profile": profile.as_ref().map(ProfileView::from),
    })))
}
