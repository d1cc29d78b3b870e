//! Persistence for the marketplace.
//!
//! # Database: `atelier`
//!
//! ## Tables
//!
//! - `profiles` - Local half of each user, keyed by the auth identity id
//! - `designs` - Designer submissions and their review state
//! - `orders` - Placed orders with a JSONB line-item snapshot
//! - `transactions` - Append-only designer wallet ledger
//! - `products` - Catalog
//! - `cart_items` - Per-user cart rows, unique per product
//!
//! Each aggregate is reached through a store trait so handlers can run against
//! `PostgreSQL` in production and [`memory::MemoryStore`] in tests.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p atelier-cli -- migrate
//! ```

pub mod cart;
pub mod designs;
pub mod ledger;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod orders;
pub mod products;
pub mod profiles;

use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use cart::{CartStore, PgCartStore};
pub use designs::{DesignStore, PgDesignStore};
pub use ledger::{LedgerStore, PgLedgerStore, Reconciliation, WithdrawalError};
pub use orders::{OrderStore, PgOrderStore};
pub use products::{PgProductStore, ProductStore};
pub use profiles::{PgProfileStore, ProfileStore};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation or lost update.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique violation to `Conflict`, anything else to `Database`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// The full set of stores the handlers need.
#[derive(Clone)]
pub struct Stores {
    pub profiles: Arc<dyn ProfileStore>,
    pub designs: Arc<dyn DesignStore>,
    pub orders: Arc<dyn OrderStore>,
    pub ledger: Arc<dyn LedgerStore>,
    pub products: Arc<dyn ProductStore>,
    pub cart: Arc<dyn CartStore>,
    pool: Option<PgPool>,
}

impl Stores {
    /// `PostgreSQL`-backed stores sharing one pool.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            profiles: Arc::new(PgProfileStore::new(pool.clone())),
            designs: Arc::new(PgDesignStore::new(pool.clone())),
            orders: Arc::new(PgOrderStore::new(pool.clone())),
            ledger: Arc::new(PgLedgerStore::new(pool.clone())),
            products: Arc::new(PgProductStore::new(pool.clone())),
            cart: Arc::new(PgCartStore::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Stores backed by one shared [`memory::MemoryStore`].
    #[cfg(any(test, feature = "test-support"))]
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_memory(&Arc::new(memory::MemoryStore::default()))
    }

    /// Stores backed by an existing [`memory::MemoryStore`], so tests can
    /// seed and inspect it directly.
    #[cfg(any(test, feature = "test-support"))]
    #[must_use]
    pub fn from_memory(store: &Arc<memory::MemoryStore>) -> Self {
        Self {
            profiles: store.clone(),
            designs: store.clone(),
            orders: store.clone(),
            ledger: store.clone(),
            products: store.clone(),
            cart: store.clone(),
            pool: None,
        }
    }

    /// Replace the profile store.
    #[must_use]
    pub fn with_profiles(mut self, profiles: Arc<dyn ProfileStore>) -> Self {
        self.profiles = profiles;
        self
    }

    /// The underlying pool, when running against `PostgreSQL`.
    #[must_use]
    pub const fn pool(&self) -> Option<&PgPool> {
        self.pool.as_ref()
    }

    /// Readiness probe.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the database is unreachable.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").fetch_one(pool).await?;
        }
        Ok(())
    }
}
