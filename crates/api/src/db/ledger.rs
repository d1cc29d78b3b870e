//! Wallet ledger repository.
//!
//! The `transactions` table is append-only: this module issues `INSERT` and
//! `SELECT` only, and a trigger rejects anything else. Every write also
//! rewrites the cached `profiles.wallet_balance` from the ledger sum inside
//! the same database transaction.
//!
//! Withdrawals lock the designer's profile row (`SELECT ... FOR UPDATE`)
//! before reading the balance, so two concurrent withdrawals for one designer
//! are serialised and the second sees the first's pending entry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use thiserror::Error;
use uuid::Uuid;

use atelier_core::ledger::{Balance, LedgerEntry, LedgerError, NewLedgerEntry};
use atelier_core::{ProfileId, TransactionId, TransactionKind, TransactionStatus};

use super::RepositoryError;

/// Why a withdrawal was not recorded.
#[derive(Debug, Error)]
pub enum WithdrawalError {
    /// The request broke a ledger rule (amount, cover).
    #[error(transparent)]
    Rejected(#[from] LedgerError),

    /// Storage failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Outcome of rewriting a cached balance from the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    /// Cached value before the rewrite.
    pub cached: Decimal,
    /// Ledger-derived current balance, now also the cached value.
    pub ledger: Decimal,
}

impl Reconciliation {
    /// Whether the cache had drifted from the ledger.
    #[must_use]
    pub fn drifted(&self) -> bool {
        self.cached != self.ledger
    }
}

/// Append-only ledger storage.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Append a completed entry (an earning) and refresh the cached balance.
    async fn record(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, RepositoryError>;

    /// Atomically check cover and append a pending withdrawal of `amount`.
    async fn withdraw(
        &self,
        user: ProfileId,
        amount: Decimal,
    ) -> Result<LedgerEntry, WithdrawalError>;

    /// `user`'s entries, newest first.
    async fn list_by_user(&self, user: ProfileId) -> Result<Vec<LedgerEntry>, RepositoryError>;

    /// Ledger-derived balances for `user`.
    async fn balance(&self, user: ProfileId) -> Result<Balance, RepositoryError>;

    /// Rewrite `user`'s cached balance from the ledger.
    async fn reconcile(&self, user: ProfileId) -> Result<Reconciliation, RepositoryError>;
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: i32,
    user_id: Uuid,
    kind: TransactionKind,
    amount: Decimal,
    description: Option<String>,
    status: TransactionStatus,
    created_at: DateTime<Utc>,
}

impl From<TransactionRow> for LedgerEntry {
    fn from(row: TransactionRow) -> Self {
        Self {
            id: TransactionId::new(row.id),
            user_id: ProfileId::new(row.user_id),
            kind: row.kind,
            amount: row.amount,
            description: row.description,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

const TRANSACTION_COLUMNS: &str = "id, user_id, kind, amount, description, status, created_at";

// =============================================================================
// Statements shared by the transactional paths
// =============================================================================

/// Lock the profile row; `NotFound` if there is no such profile.
async fn lock_profile(
    conn: &mut PgConnection,
    user: ProfileId,
) -> Result<Decimal, RepositoryError> {
    sqlx::query_scalar::<_, Decimal>(
        "SELECT wallet_balance FROM profiles WHERE id = $1 FOR UPDATE",
    )
    .bind(user)
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::NotFound)
}

async fn sum_balance(conn: &mut PgConnection, user: ProfileId) -> Result<Balance, RepositoryError> {
    let (completed, pending_withdrawals) = sqlx::query_as::<_, (Decimal, Decimal)>(
        r"
        SELECT COALESCE(SUM(amount) FILTER (WHERE status = 'completed'), 0),
               COALESCE(SUM(amount) FILTER (WHERE status = 'pending' AND kind = 'withdrawal'), 0)
        FROM transactions
        WHERE user_id = $1
        ",
    )
    .bind(user)
    .fetch_one(conn)
    .await?;

    Ok(Balance::from_sums(completed, pending_withdrawals))
}

async fn insert_entry(
    conn: &mut PgConnection,
    entry: &NewLedgerEntry,
) -> Result<LedgerEntry, RepositoryError> {
    let row = sqlx::query_as::<_, TransactionRow>(&format!(
        "INSERT INTO transactions (user_id, kind, amount, description, status) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {TRANSACTION_COLUMNS}"
    ))
    .bind(entry.user_id)
    .bind(entry.kind)
    .bind(entry.amount)
    .bind(entry.description.as_deref())
    .bind(entry.status)
    .fetch_one(conn)
    .await?;

    Ok(row.into())
}

async fn write_cached_balance(
    conn: &mut PgConnection,
    user: ProfileId,
    balance: Decimal,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE profiles SET wallet_balance = $2 WHERE id = $1")
        .bind(user)
        .bind(balance)
        .execute(conn)
        .await?;
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// `PostgreSQL` ledger store.
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    /// Create a new ledger store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn record(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        lock_profile(&mut tx, entry.user_id).await?;
        let recorded = insert_entry(&mut tx, &entry).await?;
        let balance = sum_balance(&mut tx, entry.user_id).await?;
        write_cached_balance(&mut tx, entry.user_id, balance.current).await?;

        tx.commit().await?;
        Ok(recorded)
    }

    async fn withdraw(
        &self,
        user: ProfileId,
        amount: Decimal,
    ) -> Result<LedgerEntry, WithdrawalError> {
        let entry = NewLedgerEntry::withdrawal(user, amount)?;
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        lock_profile(&mut tx, user).await?;
        let balance = sum_balance(&mut tx, user).await?;
        // Dropping `tx` on the early return rolls back and releases the lock.
        balance.check_withdrawal(amount)?;

        let recorded = insert_entry(&mut tx, &entry).await?;
        write_cached_balance(&mut tx, user, balance.current).await?;

        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(recorded)
    }

    async fn list_by_user(&self, user: ProfileId) -> Result<Vec<LedgerEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn balance(&self, user: ProfileId) -> Result<Balance, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        sum_balance(&mut conn, user).await
    }

    async fn reconcile(&self, user: ProfileId) -> Result<Reconciliation, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let cached = lock_profile(&mut tx, user).await?;
        let balance = sum_balance(&mut tx, user).await?;
        write_cached_balance(&mut tx, user, balance.current).await?;

        tx.commit().await?;
        Ok(Reconciliation {
            cached,
            ledger: balance.current,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_reconciliation_drift() {
        let clean = Reconciliation {
            cached: Decimal::new(10_000, 2),
            ledger: Decimal::new(10_000, 2),
        };
        assert!(!clean.drifted());

        let drifted = Reconciliation {
            cached: Decimal::ZERO,
            ledger: Decimal::new(10_000, 2),
        };
        assert!(drifted.drifted());
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL database (ATELIER_DATABASE_URL)"]
    async fn test_concurrent_withdrawals_serialise() {
        use crate::db::{PgProfileStore, ProfileStore};
        use crate::models::NewProfile;
        use atelier_core::{Email, Money, Role};

        let url = std::env::var("ATELIER_DATABASE_URL").unwrap();
        let pool = PgPool::connect(&url).await.unwrap();
        let profiles = PgProfileStore::new(pool.clone());
        let ledger = PgLedgerStore::new(pool);

        let id = ProfileId::new(Uuid::new_v4());
        profiles
            .insert(NewProfile {
                id,
                name: "Designer".into(),
                email: Email::parse(&format!("{id}@example.com")).unwrap(),
                role: Role::Designer,
            })
            .await
            .unwrap();
        ledger
            .record(NewLedgerEntry::earning(id, Money::from_cents(10_000).unwrap(), None).unwrap())
            .await
            .unwrap();

        let amount = Decimal::new(6000, 2);
        let (a, b) = tokio::join!(ledger.withdraw(id, amount), ledger.withdraw(id, amount));
        assert_eq!(usize::from(a.is_ok()) + usize::from(b.is_ok()), 1);
    }
}
