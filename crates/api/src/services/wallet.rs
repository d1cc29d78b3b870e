//! Designer wallet: balances, withdrawals and earnings stats.
//!
//! Balances always come from the ledger. The cached `wallet_balance` on the
//! profile is only read by the reconcile job.

use rust_decimal::Decimal;
use serde::Serialize;

use atelier_core::design::DesignTally;
use atelier_core::ledger::{Balance, LedgerEntry};
use atelier_core::{Money, Subject};

use crate::db::Stores;
use crate::error::{Result, add_breadcrumb};

/// Dashboard figures for one designer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignerStats {
    pub total_designs: usize,
    pub approved_designs: usize,
    pub pending_designs: usize,
    pub rejected_designs: usize,
    pub total_sales: i64,
    pub total_revenue: Money,
    /// Commission on `total_revenue`.
    pub total_earnings: Money,
    /// Sum of completed ledger entries.
    pub wallet_balance: Decimal,
    /// Wallet balance less pending withdrawals.
    pub available_balance: Decimal,
}

impl DesignerStats {
    /// Combine a design tally with ledger balances.
    #[must_use]
    pub fn new(tally: &DesignTally, balance: Balance) -> Self {
        Self {
            total_designs: tally.total,
            approved_designs: tally.approved,
            pending_designs: tally.pending,
            rejected_designs: tally.rejected,
            total_sales: tally.sales,
            total_revenue: tally.revenue,
            total_earnings: tally.earnings(),
            wallet_balance: balance.current,
            available_balance: balance.available,
        }
    }
}

/// Wallet operations for the calling designer.
pub struct WalletService<'a> {
    stores: &'a Stores,
}

impl<'a> WalletService<'a> {
    /// Create a new wallet service.
    #[must_use]
    pub const fn new(stores: &'a Stores) -> Self {
        Self { stores }
    }

    /// Stats over `subject`'s own designs and ledger.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if a query fails.
    pub async fn stats(&self, subject: &Subject) -> Result<DesignerStats> {
        let designs = self.stores.designs.list_by_designer(subject.id).await?;
        let balance = self.stores.ledger.balance(subject.id).await?;
        Ok(DesignerStats::new(&DesignTally::of(&designs), balance))
    }

    /// `subject`'s ledger entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn transactions(&self, subject: &Subject) -> Result<Vec<LedgerEntry>> {
        Ok(self.stores.ledger.list_by_user(subject.id).await?)
    }

    /// Request a withdrawal. Recorded as a pending negative entry.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidRequest` for a non-positive or sub-cent amount, or
    /// `AppError::InsufficientBalance` when it exceeds the balance.
    pub async fn withdraw(&self, subject: &Subject, amount: Decimal) -> Result<LedgerEntry> {
        let entry = self
            .stores
            .ledger
            .withdraw(subject.id, amount)
            .await
            .inspect_err(|e| {
                tracing::warn!(user_id = %subject.id, %amount, error = %e, "Withdrawal refused");
            })?;

        add_breadcrumb(
            "wallet",
            "Withdrawal requested",
            Some(&[("transaction_id", entry.id.reference().as_str())]),
        );
        tracing::info!(
            user_id = %subject.id,
            transaction_id = %entry.id.reference(),
            %amount,
            "Withdrawal requested"
        );
        Ok(entry)
    }
}
