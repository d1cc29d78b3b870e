//! Cart repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use atelier_core::{CartItemId, Money, ProductId, ProfileId};

use super::RepositoryError;
use crate::models::{CartItem, CartLine};

/// Storage for per-user carts.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// `user`'s cart joined with product details, oldest first.
    async fn list(&self, user: ProfileId) -> Result<Vec<CartLine>, RepositoryError>;

    /// Add `quantity` of `product`, incrementing an existing row.
    async fn add(
        &self,
        user: ProfileId,
        product: ProductId,
        quantity: u32,
    ) -> Result<CartItem, RepositoryError>;

    /// Remove `item` if it belongs to `user`. Returns whether a row was removed.
    async fn remove(&self, user: ProfileId, item: CartItemId) -> Result<bool, RepositoryError>;
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    id: i32,
    user_id: Uuid,
    product_id: i32,
    quantity: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!("cart item {} quantity", row.id))
        })?;

        Ok(Self {
            id: CartItemId::new(row.id),
            user_id: ProfileId::new(row.user_id),
            product_id: ProductId::new(row.product_id),
            quantity,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    #[sqlx(flatten)]
    item: CartItemRow,
    title: String,
    price: Decimal,
    image_url: Option<String>,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        let price = Money::new(row.price)
            .map_err(|e| RepositoryError::DataCorruption(format!("product price: {e}")))?;

        Ok(Self {
            item: row.item.try_into()?,
            title: row.title,
            price,
            image_url: row.image_url,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// `PostgreSQL` cart store.
#[derive(Clone)]
pub struct PgCartStore {
    pool: PgPool,
}

impl PgCartStore {
    /// Create a new cart store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartStore for PgCartStore {
    async fn list(&self, user: ProfileId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT c.id, c.user_id, c.product_id, c.quantity, c.created_at,
                   p.title, p.price, p.image_url
            FROM cart_items c
            JOIN products p ON p.id = c.product_id
            WHERE c.user_id = $1
            ORDER BY c.created_at, c.id
            ",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn add(
        &self,
        user: ProfileId,
        product: ProductId,
        quantity: u32,
    ) -> Result<CartItem, RepositoryError> {
        let quantity = i32::try_from(quantity)
            .map_err(|_| RepositoryError::Conflict("quantity too large".to_owned()))?;

        let row = sqlx::query_as::<_, CartItemRow>(
            r"
            INSERT INTO cart_items (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            RETURNING id, user_id, product_id, quantity, created_at
            ",
        )
        .bind(user)
        .bind(product)
        .bind(quantity)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn remove(&self, user: ProfileId, item: CartItemId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(item)
            .bind(user)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
