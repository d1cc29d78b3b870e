//! Virtual try-on proxy.

use axum::{Json, Router, extract::State, routing::post};
use serde::Deserialize;
use serde_json::Value;

use super::extract::AppJson;
use crate::error::{AppError, Result};
use crate::middleware::{AnyRole, Authorized};
use crate::state::AppState;

/// Build the try-on router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/tryon", post(run))
}

#[derive(Debug, Deserialize)]
pub struct TryOnRequest {
    #[serde(alias = "modelName")]
    pub model_name: Option<String>,
    #[serde(default)]
    pub inputs: Value,
}

/// Forward to the synthesis service and return its JSON unchanged.
///
/// # Errors
///
/// Returns 500 when no API key is configured, 502 when the upstream fails or
/// times out.
pub async fn run(
    State(state): State<AppState>,
    caller: Authorized<AnyRole>,
    AppJson(body): AppJson<TryOnRequest>,
) -> Result<Json<Value>> {
    let client = state
        .synthesis()
        .ok_or_else(|| AppError::Internal("synthesis not configured".to_string()))?;

    let inputs = if body.inputs.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        body.inputs
    };

    tracing::info!(user_id = %caller.subject.id, model = ?body.model_name, "Try-on requested");
    let result = client.run(body.model_name.as_deref(), inputs).await?;
    Ok(Json(result))
}
