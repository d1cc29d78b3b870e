//! Admin reporting routes.

use axum::{Json, Router, extract::State, routing::get};
use serde_json::{Value, json};

use super::views::{OrderView, many};
use crate::error::Result;
use crate::middleware::{AdminOnly, Authorized};
use crate::services::{OrderService, ReportService};
use crate::state::AppState;

/// Build the admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/stats", get(stats))
        .route("/api/admin/designers", get(designers))
        .route("/api/admin/orders", get(orders))
}

/// Marketplace totals.
///
/// # Errors
///
/// Returns an error if a query fails.
pub async fn stats(
    State(state): State<AppState>,
    _caller: Authorized<AdminOnly>,
) -> Result<Json<Value>> {
    let stats = ReportService::new(state.stores()).stats().await?;
    Ok(Json(json!({ "stats": stats })))
}

/// Designer roster with derived earnings.
///
/// # Errors
///
/// Returns an error if a query fails.
pub async fn designers(
    State(state): State<AppState>,
    _caller: Authorized<AdminOnly>,
) -> Result<Json<Value>> {
    let designers = ReportService::new(state.stores()).designers().await?;
    Ok(Json(json!({ "designers": designers })))
}

/// Every order, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn orders(
    State(state): State<AppState>,
    caller: Authorized<AdminOnly>,
) -> Result<Json<Value>> {
    let orders = OrderService::new(state.stores()).list(&caller.subject).await?;
    Ok(Json(json!({ "orders": many::<_, OrderView>(&orders) })))
}
