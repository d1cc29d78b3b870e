//! Catalog repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use atelier_core::{Money, ProductId, ProfileId};

use super::RepositoryError;
use crate::models::{NewProduct, Product};

/// Storage for catalog products.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Active products, optionally filtered by category, newest first.
    async fn list_active(&self, category: Option<&str>) -> Result<Vec<Product>, RepositoryError>;

    /// Any product, active or not.
    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    async fn insert(&self, product: NewProduct) -> Result<Product, RepositoryError>;

    /// Overwrite the editable fields of an existing product.
    async fn update(&self, product: &Product) -> Result<(), RepositoryError>;

    /// Soft delete. Returns whether a row was changed.
    async fn deactivate(&self, id: ProductId) -> Result<bool, RepositoryError>;

    async fn count_active(&self) -> Result<i64, RepositoryError>;
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    title: String,
    description: Option<String>,
    price: Decimal,
    category: String,
    image_url: Option<String>,
    storage_path: Option<String>,
    owner: Uuid,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = Money::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("product {} price: {e}", row.id))
        })?;

        Ok(Self {
            id: ProductId::new(row.id),
            title: row.title,
            description: row.description,
            price,
            category: row.category,
            image_url: row.image_url,
            storage_path: row.storage_path,
            owner: ProfileId::new(row.owner),
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

const PRODUCT_COLUMNS: &str = "id, title, description, price, category, image_url, \
                               storage_path, owner, is_active, created_at";

// =============================================================================
// Repository
// =============================================================================

/// `PostgreSQL` product store.
#[derive(Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    /// Create a new product store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn list_active(&self, category: Option<&str>) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active AND ($1::text IS NULL OR category = $1) \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn insert(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "INSERT INTO products (title, description, price, category, image_url, storage_path, owner) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&product.title)
        .bind(product.description.as_deref())
        .bind(product.price)
        .bind(&product.category)
        .bind(product.image_url.as_deref())
        .bind(product.storage_path.as_deref())
        .bind(product.owner)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn update(&self, product: &Product) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE products
            SET title = $2, description = $3, price = $4, category = $5, image_url = $6
            WHERE id = $1
            ",
        )
        .bind(product.id)
        .bind(&product.title)
        .bind(product.description.as_deref())
        .bind(product.price)
        .bind(&product.category)
        .bind(product.image_url.as_deref())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn deactivate(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("UPDATE products SET is_active = FALSE WHERE id = $1 AND is_active")
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_active(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE is_active")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
