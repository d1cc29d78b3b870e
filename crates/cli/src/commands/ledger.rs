//! Wallet ledger commands.
//!
//! Sales are settled outside the API, so earnings enter the ledger here.
//! `reconcile` repairs a cached `profiles.wallet_balance` that has drifted
//! from the ledger sum.

use atelier_api::db::{LedgerStore, PgLedgerStore, PgProfileStore, ProfileStore};
use atelier_core::ledger::NewLedgerEntry;
use atelier_core::{Money, ProfileId, Role};
use rust_decimal::Decimal;

use super::{CommandError, connect};

/// Append a completed earning for `designer`.
///
/// # Errors
///
/// Returns an error for a non-positive amount, an unknown designer or a
/// database failure.
pub async fn record_earning(
    designer: ProfileId,
    amount: Decimal,
    description: Option<String>,
) -> Result<(), CommandError> {
    let amount = Money::new(amount).map_err(|e| CommandError::Invalid(e.to_string()))?;
    let entry = NewLedgerEntry::earning(designer, amount.round_cents(), description)
        .map_err(|e| CommandError::Invalid(e.to_string()))?;

    let pool = connect().await?;
    let recorded = PgLedgerStore::new(pool.clone()).record(entry).await?;
    let balance = PgLedgerStore::new(pool).balance(designer).await?;

    tracing::info!(
        designer = %designer,
        transaction = %recorded.id.reference(),
        amount = %recorded.amount,
        balance = %balance.current,
        "Earning recorded"
    );
    Ok(())
}

/// Rewrite cached balances from the ledger, for one designer or all of them.
///
/// # Errors
///
/// Returns an error if the designer does not exist or the database fails.
pub async fn reconcile(designer: Option<ProfileId>) -> Result<(), CommandError> {
    let pool = connect().await?;
    let ledger = PgLedgerStore::new(pool.clone());

    let designers = match designer {
        Some(id) => vec![id],
        None => PgProfileStore::new(pool)
            .list_by_role(Role::Designer)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect(),
    };

    let mut drifted = 0_usize;
    for id in &designers {
        let outcome = ledger.reconcile(*id).await?;
        if outcome.drifted() {
            drifted += 1;
            tracing::warn!(
                designer = %id,
                cached = %outcome.cached,
                ledger = %outcome.ledger,
                "Cached wallet balance drifted, rewritten from ledger"
            );
        } else {
            tracing::debug!(designer = %id, balance = %outcome.ledger, "Balance consistent");
        }
    }

    tracing::info!(checked = designers.len(), drifted, "Reconciliation complete");
    Ok(())
}
