//! Non-negative monetary amounts using decimal arithmetic.
//!
//! Prices, order totals and design revenue can never be negative, so they are
//! carried as [`Money`]. Ledger entries are signed and use a bare `Decimal`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Error returned when constructing [`Money`] from a negative value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("amount must not be negative (got {0})")]
pub struct NegativeAmount(pub Decimal);

/// A non-negative amount in the store currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(transparent))]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create an amount, rejecting negatives.
    ///
    /// # Errors
    ///
    /// Returns `NegativeAmount` if `amount` is below zero.
    pub fn new(amount: Decimal) -> Result<Self, NegativeAmount> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(NegativeAmount(amount));
        }
        Ok(Self(amount))
    }

    /// Create an amount from minor units (cents).
    ///
    /// # Errors
    ///
    /// Returns `NegativeAmount` if `cents` is below zero.
    pub fn from_cents(cents: i64) -> Result<Self, NegativeAmount> {
        Self::new(Decimal::new(cents, 2))
    }

    /// The underlying decimal value.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether this amount is exactly zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Sum of two amounts; saturates instead of overflowing.
    #[must_use]
    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Round to cents using banker's rounding.
    #[must_use]
    pub fn round_cents(self) -> Self {
        Self(self.0.round_dp(2))
    }
}

impl TryFrom<Decimal> for Money {
    type Error = NegativeAmount;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_amount_rejected() {
        assert!(Money::new(Decimal::new(-1, 2)).is_err());
        assert!(Money::new(Decimal::ZERO).is_ok());
        assert!(Money::from_cents(1999).is_ok());
    }

    #[test]
    fn test_money_serializes_as_string() {
        let money = Money::from_cents(2000).unwrap();
        let json = serde_json::to_string(&money).unwrap();
        assert_eq!(json, "\"20.00\"");
    }

    #[test]
    fn test_money_deserialize_rejects_negative() {
        assert!(serde_json::from_str::<Money>("\"-5.00\"").is_err());
        let parsed: Money = serde_json::from_str("\"12.50\"").unwrap();
        assert_eq!(parsed, Money::from_cents(1250).unwrap());
    }

    #[test]
    fn test_sum_and_display() {
        let total: Money = [1000, 250, 5]
            .into_iter()
            .map(|c| Money::from_cents(c).unwrap())
            .sum();
        assert_eq!(total.to_string(), "12.55");
    }
}
