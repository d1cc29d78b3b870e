//! Order routes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, put},
};
use serde::Deserialize;
use serde_json::{Value, json};

use atelier_core::order::{NewOrder, OrderItem};
use atelier_core::{Email, Money, OrderId, OrderStatus};

use super::extract::{AppJson, AppPath};
use super::views::{OrderView, many};
use crate::error::{AppError, Result};
use crate::middleware::{AdminOnly, AnyRole, Authorized};
use crate::services::OrderService;
use crate::state::AppState;

/// Build the orders router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(list).post(create))
        .route("/api/orders/{id}", get(show))
        .route("/api/orders/{id}/status", put(update_status))
}

/// Checkout body. Contact fields default to the caller's profile.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub total: Money,
    #[serde(default, alias = "shipping_address")]
    pub shipping_address: String,
    #[serde(alias = "customer_name")]
    pub customer_name: Option<String>,
    #[serde(alias = "customer_email")]
    pub customer_email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: Option<String>,
}

/// Orders visible to the caller, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn list(
    State(state): State<AppState>,
    caller: Authorized<AnyRole>,
) -> Result<Json<Value>> {
    let orders = OrderService::new(state.stores()).list(&caller.subject).await?;
    Ok(Json(json!({ "orders": many::<_, OrderView>(&orders) })))
}

/// Place an order.
///
/// # Errors
///
/// Returns 400 for empty items, a zero quantity, a blank address or an
/// invalid email.
pub async fn create(
    State(state): State<AppState>,
    caller: Authorized<AnyRole>,
    AppJson(body): AppJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let customer_email = match body.customer_email.as_deref().map(str::trim) {
        Some(email) if !email.is_empty() => {
            Email::parse(email).map_err(|e| AppError::InvalidRequest(e.to_string()))?
        }
        _ => caller.profile.email.clone(),
    };
    let customer_name = body
        .customer_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| caller.profile.name.clone());

    let checkout = NewOrder::new(
        body.items,
        body.total,
        &body.shipping_address,
        &customer_name,
        customer_email,
    )?;
    let order = OrderService::new(state.stores())
        .create(&caller.subject, checkout)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Order created successfully",
            "order": OrderView::from(&order),
        })),
    ))
}

/// One order, for its owner or an admin.
///
/// # Errors
///
/// Returns 404 if missing, 403 for anyone else's order.
pub async fn show(
    State(state): State<AppState>,
    caller: Authorized<AnyRole>,
    AppPath(id): AppPath<OrderId>,
) -> Result<Json<Value>> {
    let order = OrderService::new(state.stores())
        .get(&caller.subject, id)
        .await?;
    Ok(Json(json!({ "order": OrderView::from(&order) })))
}

/// Move an order to a new status under the configured transition policy.
///
/// # Errors
///
/// Returns 400 for an unknown status or a refused transition, 404 if missing.
pub async fn update_status(
    State(state): State<AppState>,
    caller: Authorized<AdminOnly>,
    AppPath(id): AppPath<OrderId>,
    AppJson(body): AppJson<StatusRequest>,
) -> Result<Json<Value>> {
    let status: OrderStatus = body
        .status
        .as_deref()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| AppError::InvalidRequest("Invalid status".to_string()))?;

    let order = OrderService::new(state.stores())
        .update_status(&caller.subject, id, status, state.transitions())
        .await?;

    Ok(Json(json!({
        "message": "Order status updated",
        "order": OrderView::from(&order),
    })))
}
