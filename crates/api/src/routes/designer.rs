//! Designer dashboard and wallet routes.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};

use super::extract::AppJson;
use super::views::{DesignView, TransactionView, many};
use crate::error::Result;
use crate::middleware::{Authorized, DesignerOrAdmin};
use crate::services::{DesignService, WalletService};
use crate::state::AppState;

/// Build the designer router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/designer/stats", get(stats))
        .route("/api/designer/transactions", get(transactions))
        .route("/api/designer/withdraw", post(withdraw))
        .route("/api/designer/designs", get(designs))
}

#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    #[serde(default)]
    pub amount: Decimal,
}

/// Design counts, commission and ledger balances for the caller.
///
/// # Errors
///
/// Returns an error if a query fails.
pub async fn stats(
    State(state): State<AppState>,
    caller: Authorized<DesignerOrAdmin>,
) -> Result<Json<Value>> {
    let stats = WalletService::new(state.stores()).stats(&caller.subject).await?;
    Ok(Json(json!({ "stats": stats })))
}

/// The caller's ledger, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn transactions(
    State(state): State<AppState>,
    caller: Authorized<DesignerOrAdmin>,
) -> Result<Json<Value>> {
    let entries = WalletService::new(state.stores())
        .transactions(&caller.subject)
        .await?;
    Ok(Json(json!({ "transactions": many::<_, TransactionView>(&entries) })))
}

/// Request a withdrawal.
///
/// # Errors
///
/// Returns 400 for a non-positive amount or insufficient balance.
pub async fn withdraw(
    State(state): State<AppState>,
    caller: Authorized<DesignerOrAdmin>,
    AppJson(body): AppJson<WithdrawRequest>,
) -> Result<Json<Value>> {
    let entry = WalletService::new(state.stores())
        .withdraw(&caller.subject, body.amount)
        .await?;
    Ok(Json(json!({
        "message": "Withdrawal request submitted",
        "transaction": TransactionView::from(&entry),
    })))
}

/// The caller's own designs, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn designs(
    State(state): State<AppState>,
    caller: Authorized<DesignerOrAdmin>,
) -> Result<Json<Value>> {
    let designs = DesignService::new(state.stores())
        .list_own(&caller.subject)
        .await?;
    Ok(Json(json!({ "designs": many::<_, DesignView>(&designs) })))
}
