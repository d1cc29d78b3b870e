//! Design submission and review routes.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{delete, get, put},
};
use serde::Deserialize;
use serde_json::{Value, json};

use atelier_core::DesignId;
use atelier_core::design::NewDesign;

use super::extract::{AppJson, AppPath};
use super::views::{DesignView, many};
use crate::error::{AppError, Result};
use crate::middleware::{AdminOnly, AnyRole, Authorized, DesignerOrAdmin};
use crate::services::DesignService;
use crate::state::AppState;

/// Build the designs router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/designs", get(list).post(submit))
        .route("/api/designs/{id}", delete(remove))
        .route("/api/designs/{id}/approve", put(approve))
        .route("/api/designs/{id}/reject", put(reject))
}

#[derive(Debug, Deserialize)]
pub struct SubmitDesignRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: String,
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub reason: String,
}

/// All designs for admins, own designs for everyone else.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn list(
    State(state): State<AppState>,
    caller: Authorized<AnyRole>,
) -> Result<Json<Value>> {
    let designs = DesignService::new(state.stores()).list(&caller.subject).await?;
    Ok(Json(json!({ "designs": many::<_, DesignView>(&designs) })))
}

/// Submit a design for review.
///
/// # Errors
///
/// Returns 400 if the name or image is blank.
pub async fn submit(
    State(state): State<AppState>,
    caller: Authorized<DesignerOrAdmin>,
    AppJson(body): AppJson<SubmitDesignRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let submission = NewDesign::new(&body.name, &body.image, body.category.as_deref())?;
    let design = DesignService::new(state.stores())
        .submit(&caller.subject, submission)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Design submitted for approval",
            "design": DesignView::from(&design),
        })),
    ))
}

/// Approve a design.
///
/// # Errors
///
/// Returns 404 if the design does not exist.
pub async fn approve(
    State(state): State<AppState>,
    caller: Authorized<AdminOnly>,
    AppPath(id): AppPath<DesignId>,
) -> Result<Json<Value>> {
    let design = DesignService::new(state.stores())
        .approve(&caller.subject, id)
        .await?;
    Ok(Json(json!({
        "message": "Design approved successfully",
        "design": DesignView::from(&design),
    })))
}

/// Reject a design. The body is optional; the reason defaults to empty.
///
/// # Errors
///
/// Returns 404 if the design does not exist.
pub async fn reject(
    State(state): State<AppState>,
    caller: Authorized<AdminOnly>,
    AppPath(id): AppPath<DesignId>,
    body: Bytes,
) -> Result<Json<Value>> {
    let body: RejectRequest = if body.iter().all(u8::is_ascii_whitespace) {
        RejectRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::InvalidRequest(e.to_string()))?
    };
    let design = DesignService::new(state.stores())
        .reject(&caller.subject, id, &body.reason)
        .await?;
    Ok(Json(json!({
        "message": "Design rejected",
        "design": DesignView::from(&design),
    })))
}

/// Delete a design. Owner or admin.
///
/// # Errors
///
/// Returns 404 if missing, 403 for anyone else's design.
pub async fn remove(
    State(state): State<AppState>,
    caller: Authorized<AnyRole>,
    AppPath(id): AppPath<DesignId>,
) -> Result<Json<Value>> {
    DesignService::new(state.stores())
        .delete(&caller.subject, id)
        .await?;
    Ok(Json(json!({ "message": "Design deleted successfully" })))
}
