//! Designer wallet ledger rules.
//!
//! The ledger is append-only. A designer's **current balance** is the signed
//! sum of their `completed` entries. Withdrawals are written as `pending`
//! entries with a negative amount and do not move the current balance until
//! they complete, but they do reserve funds: the **available balance** is the
//! current balance plus every pending withdrawal (which are negative). A
//! withdrawal must fit within both.
//!
//! ```text
//! completed earnings  100.00
//! pending withdrawal  -30.00
//! ──────────────────────────
//! current             100.00
//! available            70.00
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::{Money, ProfileId, TransactionId, TransactionKind, TransactionStatus};

/// Share of design revenue credited to the designer (5%).
pub const COMMISSION_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

/// Description written on withdrawal entries.
pub const WITHDRAWAL_DESCRIPTION: &str = "Withdrawal to bank account";

/// Commission owed on `revenue`, rounded to cents.
#[must_use]
pub fn commission(revenue: Money) -> Money {
    // Revenue and rate are both non-negative, so the product is too.
    Money::new((revenue.amount() * COMMISSION_RATE).round_dp(2)).unwrap_or(Money::ZERO)
}

/// Positive and whole cents, the only amounts a ledger entry may carry.
fn ensure_postable(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveAmount);
    }
    if amount.normalize().scale() > 2 {
        return Err(LedgerError::SubCentAmount(amount));
    }
    Ok(())
}

/// Ledger rule violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Withdrawals and earnings must be strictly positive.
    #[error("amount must be greater than zero")]
    NonPositiveAmount,

    /// Amounts are stored to the cent.
    #[error("amount {0} has more than two decimal places")]
    SubCentAmount(Decimal),

    /// The withdrawal exceeds what the designer can draw.
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        /// Amount asked for.
        requested: Decimal,
        /// The tighter of current and available balance at the time of the check.
        available: Decimal,
    },
}

/// A recorded ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: TransactionId,
    pub user_id: ProfileId,
    pub kind: TransactionKind,
    /// Signed amount: positive credits, negative debits.
    pub amount: Decimal,
    pub description: Option<String>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

/// An entry about to be appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLedgerEntry {
    pub user_id: ProfileId,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub description: Option<String>,
    pub status: TransactionStatus,
}

impl NewLedgerEntry {
    /// A completed earning credited to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NonPositiveAmount` for a zero amount, or
    /// `LedgerError::SubCentAmount` for fractions of a cent.
    pub fn earning(
        user_id: ProfileId,
        amount: Money,
        description: Option<String>,
    ) -> Result<Self, LedgerError> {
        ensure_postable(amount.amount())?;
        Ok(Self {
            user_id,
            kind: TransactionKind::Earning,
            amount: amount.amount(),
            description,
            status: TransactionStatus::Completed,
        })
    }

    /// A pending withdrawal debiting `amount` from `user_id`.
    ///
    /// Balance sufficiency is checked separately with [`Balance::check_withdrawal`],
    /// under whatever lock the store holds.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NonPositiveAmount` unless `amount > 0`, or
    /// `LedgerError::SubCentAmount` for fractions of a cent.
    pub fn withdrawal(user_id: ProfileId, amount: Decimal) -> Result<Self, LedgerError> {
        ensure_postable(amount)?;
        Ok(Self {
            user_id,
            kind: TransactionKind::Withdrawal,
            amount: -amount,
            description: Some(WITHDRAWAL_DESCRIPTION.to_owned()),
            status: TransactionStatus::Pending,
        })
    }

    /// Materialize the entry once the store has assigned an id.
    #[must_use]
    pub fn into_entry(self, id: TransactionId, created_at: DateTime<Utc>) -> LedgerEntry {
        LedgerEntry {
            id,
            user_id: self.user_id,
            kind: self.kind,
            amount: self.amount,
            description: self.description,
            status: self.status,
            created_at,
        }
    }
}

/// A designer's derived balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Balance {
    /// Sum of completed entries.
    pub current: Decimal,
    /// Current balance less pending withdrawals.
    pub available: Decimal,
}

impl Balance {
    /// Build from the two aggregate sums a store can compute in one query.
    #[must_use]
    pub fn from_sums(completed: Decimal, pending_withdrawals: Decimal) -> Self {
        Self {
            current: completed,
            available: completed + pending_withdrawals,
        }
    }

    /// Derive balances from a user's entries.
    #[must_use]
    pub fn of<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> Self {
        let (completed, pending) = entries.into_iter().fold(
            (Decimal::ZERO, Decimal::ZERO),
            |(completed, pending), entry| match (entry.status, entry.kind) {
                (TransactionStatus::Completed, _) => (completed + entry.amount, pending),
                (TransactionStatus::Pending, TransactionKind::Withdrawal) => {
                    (completed, pending + entry.amount)
                }
                _ => (completed, pending),
            },
        );
        Self::from_sums(completed, pending)
    }

    /// The most that can be withdrawn right now.
    #[must_use]
    pub fn withdrawable(&self) -> Decimal {
        self.current.min(self.available).max(Decimal::ZERO)
    }

    /// Check that a withdrawal of `amount` fits.
    ///
    /// # Errors
    ///
    /// Returns `NonPositiveAmount` unless `amount > 0`, `SubCentAmount` for
    /// fractions of a cent, or `InsufficientBalance` when it exceeds the
    /// current or available balance.
    pub fn check_withdrawal(&self, amount: Decimal) -> Result<(), LedgerError> {
        ensure_postable(amount)?;
        if amount > self.current || amount > self.available {
            return Err(LedgerError::InsufficientBalance {
                requested: amount,
                available: self.current.min(self.available),
            });
        }
        Ok(())
    }
}

/// Earnings summary shown on the designer wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EarningsSummary {
    /// Sum of completed earning entries.
    pub total_earned: Decimal,
    /// Sum of completed withdrawals, as a positive number.
    pub total_withdrawn: Decimal,
    /// Sum of pending withdrawals, as a positive number.
    pub pending_withdrawals: Decimal,
}

impl EarningsSummary {
    /// Summarize a user's entries.
    #[must_use]
    pub fn of<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> Self {
        entries.into_iter().fold(Self::default(), |mut summary, entry| {
            match (entry.kind, entry.status) {
                (TransactionKind::Earning, TransactionStatus::Completed) => {
                    summary.total_earned += entry.amount;
                }
                (TransactionKind::Withdrawal, TransactionStatus::Completed) => {
                    summary.total_withdrawn -= entry.amount;
                }
                (TransactionKind::Withdrawal, TransactionStatus::Pending) => {
                    summary.pending_withdrawals -= entry.amount;
                }
                _ => {}
            }
            summary
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn dec(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    fn entry(kind: TransactionKind, amount: Decimal, status: TransactionStatus) -> LedgerEntry {
        LedgerEntry {
            id: TransactionId::new(1),
            user_id: ProfileId::new(Uuid::nil()),
            kind,
            amount,
            description: None,
            status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_commission_is_five_percent() {
        assert_eq!(COMMISSION_RATE, dec(5));
        let revenue = Money::from_cents(12_345).unwrap();
        assert_eq!(commission(revenue), Money::from_cents(617).unwrap());
        assert_eq!(commission(Money::ZERO), Money::ZERO);
    }

    #[test]
    fn test_withdrawal_entry_is_negative_and_pending() {
        let user = ProfileId::new(Uuid::new_v4());
        let entry = NewLedgerEntry::withdrawal(user, dec(5000)).unwrap();
        assert_eq!(entry.amount, dec(-5000));
        assert_eq!(entry.status, TransactionStatus::Pending);
        assert_eq!(entry.kind, TransactionKind::Withdrawal);
        assert_eq!(entry.description.as_deref(), Some(WITHDRAWAL_DESCRIPTION));
    }

    #[test]
    fn test_withdrawal_rejects_non_positive() {
        let user = ProfileId::new(Uuid::new_v4());
        assert_eq!(
            NewLedgerEntry::withdrawal(user, Decimal::ZERO),
            Err(LedgerError::NonPositiveAmount)
        );
        assert_eq!(
            NewLedgerEntry::withdrawal(user, dec(-100)),
            Err(LedgerError::NonPositiveAmount)
        );
    }

    #[test]
    fn test_sub_cent_amounts_are_refused() {
        let user = ProfileId::new(Uuid::new_v4());
        let tenth_of_a_cent = Decimal::new(1, 3);
        assert_eq!(
            NewLedgerEntry::withdrawal(user, tenth_of_a_cent),
            Err(LedgerError::SubCentAmount(tenth_of_a_cent))
        );
        assert_eq!(
            Balance::from_sums(dec(100), Decimal::ZERO).check_withdrawal(tenth_of_a_cent),
            Err(LedgerError::SubCentAmount(tenth_of_a_cent))
        );
        let earning = Money::new(Decimal::new(12_345, 3)).unwrap();
        assert!(matches!(
            NewLedgerEntry::earning(user, earning, None),
            Err(LedgerError::SubCentAmount(_))
        ));
        // Trailing zeros past the cent are fine.
        assert!(NewLedgerEntry::withdrawal(user, Decimal::new(1_500, 3)).is_ok());
    }

    #[test]
    fn test_earning_rejects_zero() {
        let user = ProfileId::new(Uuid::new_v4());
        assert!(NewLedgerEntry::earning(user, Money::ZERO, None).is_err());
        let earning = NewLedgerEntry::earning(user, Money::from_cents(100).unwrap(), None).unwrap();
        assert_eq!(earning.status, TransactionStatus::Completed);
    }

    #[test]
    fn test_balance_counts_completed_and_reserves_pending() {
        let entries = [
            entry(TransactionKind::Earning, dec(10_000), TransactionStatus::Completed),
            entry(TransactionKind::Withdrawal, dec(-3000), TransactionStatus::Pending),
            entry(TransactionKind::Earning, dec(999), TransactionStatus::Failed),
        ];
        let balance = Balance::of(&entries);
        assert_eq!(balance.current, dec(10_000));
        assert_eq!(balance.available, dec(7000));
        assert_eq!(balance.withdrawable(), dec(7000));
    }

    #[test]
    fn test_check_withdrawal_uses_tighter_balance() {
        let balance = Balance::from_sums(dec(10_000), dec(-3000));
        assert!(matches!(
            balance.check_withdrawal(dec(15_000)),
            Err(LedgerError::InsufficientBalance { .. })
        ));
        assert!(balance.check_withdrawal(dec(8000)).is_err());
        assert!(balance.check_withdrawal(dec(5000)).is_ok());
        assert!(balance.check_withdrawal(dec(7000)).is_ok());
    }

    #[test]
    fn test_empty_ledger_allows_nothing() {
        let balance = Balance::of(&[]);
        assert_eq!(balance, Balance::default());
        assert!(balance.check_withdrawal(dec(1)).is_err());
    }

    #[test]
    fn test_earnings_summary() {
        let entries = [
            entry(TransactionKind::Earning, dec(10_000), TransactionStatus::Completed),
            entry(TransactionKind::Withdrawal, dec(-2000), TransactionStatus::Completed),
            entry(TransactionKind::Withdrawal, dec(-1000), TransactionStatus::Pending),
        ];
        let summary = EarningsSummary::of(&entries);
        assert_eq!(summary.total_earned, dec(10_000));
        assert_eq!(summary.total_withdrawn, dec(2000));
        assert_eq!(summary.pending_withdrawals, dec(1000));
    }
}
