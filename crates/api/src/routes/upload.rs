//! Signed upload URLs for direct-to-storage uploads.

use axum::{Json, Router, extract::State, routing::post};
use serde::Deserialize;
use serde_json::{Value, json};

use super::extract::AppJson;
use crate::error::{AppError, Result};
use crate::middleware::{AnyRole, Authorized};
use crate::state::AppState;

/// Bucket used when the request does not name one.
const DEFAULT_BUCKET: &str = "public";

/// Build the upload router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/upload/sign-url", post(sign_url))
}

#[derive(Debug, Deserialize)]
pub struct SignRequest {
    pub bucket: Option<String>,
    pub path: Option<String>,
}

/// Sign an upload URL valid for the configured TTL.
///
/// # Errors
///
/// Returns 400 for a missing or unsafe path, 502 if storage refuses.
pub async fn sign_url(
    State(state): State<AppState>,
    caller: Authorized<AnyRole>,
    AppJson(body): AppJson<SignRequest>,
) -> Result<Json<Value>> {
    let path = body
        .path
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| AppError::InvalidRequest("path required".to_string()))?;
    let bucket = body.bucket.unwrap_or_else(|| DEFAULT_BUCKET.to_owned());
    let ttl = state.config().storage.signed_url_ttl;

    let signed_url = state.blobs().sign_upload(&bucket, &path, ttl).await?;
    tracing::debug!(user_id = %caller.subject.id, %bucket, %path, "Upload URL signed");

    Ok(Json(json!({
        "signedUrl": signed_url,
        "bucket": bucket,
        "path": path,
        "expiresIn": ttl.as_secs(),
    })))
}
