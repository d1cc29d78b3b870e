//! Cart routes. Every operation is scoped to the caller.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};

use atelier_core::{CartItemId, ProductId};

use super::extract::AppJson;
use super::views::{CartItemView, CartLineView, many};
use crate::error::{AppError, Result};
use crate::middleware::{AnyRole, Authorized};
use crate::state::AppState;

/// Build the cart router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/cart", get(list))
        .route("/api/cart/add", post(add))
        .route("/api/cart/remove", post(remove))
}

const fn one() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct AddRequest {
    #[serde(alias = "productId")]
    pub product_id: Option<ProductId>,
    #[serde(default = "one")]
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct RemoveRequest {
    #[serde(alias = "itemId")]
    pub item_id: Option<CartItemId>,
}

/// The caller's cart with product details.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn list(
    State(state): State<AppState>,
    caller: Authorized<AnyRole>,
) -> Result<Json<Value>> {
    let lines = state.stores().cart.list(caller.subject.id).await?;
    Ok(Json(json!({ "items": many::<_, CartLineView>(&lines) })))
}

/// Add a product, or increase its quantity if already in the cart.
///
/// # Errors
///
/// Returns 400 for a missing product id or zero quantity, 404 if the product
/// does not exist or is off sale.
pub async fn add(
    State(state): State<AppState>,
    caller: Authorized<AnyRole>,
    AppJson(body): AppJson<AddRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let product_id = body
        .product_id
        .ok_or_else(|| AppError::InvalidRequest("product_id required".to_string()))?;
    if body.quantity == 0 {
        return Err(AppError::InvalidRequest(
            "quantity must be at least 1".to_string(),
        ));
    }

    let available = state
        .stores()
        .products
        .get(product_id)
        .await?
        .is_some_and(|p| p.is_active);
    if !available {
        return Err(AppError::NotFound("Product not found".to_string()));
    }

    let item = state
        .stores()
        .cart
        .add(caller.subject.id, product_id, body.quantity)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "item": CartItemView::from(&item) })),
    ))
}

/// Remove one of the caller's cart rows.
///
/// # Errors
///
/// Returns 400 for a missing item id, 404 if the row is not the caller's.
pub async fn remove(
    State(state): State<AppState>,
    caller: Authorized<AnyRole>,
    AppJson(body): AppJson<RemoveRequest>,
) -> Result<Json<Value>> {
    let item_id = body
        .item_id
        .ok_or_else(|| AppError::InvalidRequest("item_id required".to_string()))?;

    if !state.stores().cart.remove(caller.subject.id, item_id).await? {
        return Err(AppError::NotFound("Cart item not found".to_string()));
    }
    Ok(Json(json!({ "message": "removed" })))
}
