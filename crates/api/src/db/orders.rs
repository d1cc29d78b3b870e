//! Order repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use atelier_core::order::{NewOrder, Order, OrderItem};
use atelier_core::{Email, Money, OrderId, OrderStatus, ProfileId};

use super::RepositoryError;

/// Storage for orders.
///
/// Listings are ordered newest first. Items are written once at insert and
/// never updated.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert a `pending` order for `user`.
    async fn insert(&self, user: ProfileId, order: NewOrder) -> Result<Order, RepositoryError>;

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError>;

    async fn list_by_user(&self, user: ProfileId) -> Result<Vec<Order>, RepositoryError>;

    /// Move `id` from `from` to `to`, only if it is still in `from`.
    ///
    /// Returns `RepositoryError::Conflict` if another writer changed the
    /// status first, `RepositoryError::NotFound` if the order is gone.
    async fn update_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<(), RepositoryError>;
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: Uuid,
    items: Json<Vec<OrderItem>>,
    total: Decimal,
    shipping_address: String,
    customer_name: String,
    customer_email: String,
    status: OrderStatus,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let id = OrderId::new(row.id);
        let total = Money::new(row.total)
            .map_err(|e| RepositoryError::DataCorruption(format!("order {id} total: {e}")))?;
        let customer_email = Email::parse(&row.customer_email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id,
            user_id: ProfileId::new(row.user_id),
            items: row.items.0,
            total,
            shipping_address: row.shipping_address,
            customer_name: row.customer_name,
            customer_email,
            status: row.status,
            created_at: row.created_at,
        })
    }
}

const ORDER_COLUMNS: &str = "id, user_id, items, total, shipping_address, customer_name, \
                             customer_email, status, created_at";

// =============================================================================
// Repository
// =============================================================================

/// `PostgreSQL` order store.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Create a new order store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, user: ProfileId, order: NewOrder) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "INSERT INTO orders (user_id, items, total, shipping_address, customer_name, customer_email) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {ORDER_COLUMNS}"
        ))
        .bind(user)
        .bind(Json(&order.items))
        .bind(order.total)
        .bind(&order.shipping_address)
        .bind(&order.customer_name)
        .bind(order.customer_email.as_str())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_by_user(&self, user: ProfileId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let current = sqlx::query_scalar::<_, OrderStatus>(
            "UPDATE orders SET status = $3 WHERE id = $1 AND status = $2 RETURNING status",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;

        if current.is_some() {
            return Ok(());
        }

        let exists = sqlx::query_scalar::<_, i32>("SELECT id FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match exists {
            Some(_) => Err(RepositoryError::Conflict(format!(
                "order {id} changed status concurrently"
            ))),
            None => Err(RepositoryError::NotFound),
        }
    }
}
