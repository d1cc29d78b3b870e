//! Design repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use atelier_core::design::{Design, NewDesign, Review};
use atelier_core::{DesignId, DesignStatus, Money, ProfileId};

use super::RepositoryError;

/// Storage for designs.
///
/// Listings are ordered newest first.
#[async_trait]
pub trait DesignStore: Send + Sync {
    /// Insert a fresh `pending` submission owned by `designer`.
    async fn insert(&self, designer: ProfileId, design: NewDesign)
    -> Result<Design, RepositoryError>;

    async fn get(&self, id: DesignId) -> Result<Option<Design>, RepositoryError>;

    async fn list_all(&self) -> Result<Vec<Design>, RepositoryError>;

    async fn list_by_designer(&self, designer: ProfileId) -> Result<Vec<Design>, RepositoryError>;

    /// Persist the review state of `design`.
    ///
    /// Returns `RepositoryError::NotFound` if the design was deleted meanwhile.
    async fn save_review(&self, design: &Design) -> Result<(), RepositoryError>;

    /// Hard delete. Returns whether a row was removed.
    async fn delete(&self, id: DesignId) -> Result<bool, RepositoryError>;
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct DesignRow {
    id: i32,
    name: String,
    designer_id: Uuid,
    image: String,
    category: String,
    status: DesignStatus,
    rejection_reason: Option<String>,
    uploaded_at: DateTime<Utc>,
    sales: i32,
    revenue: Decimal,
}

impl TryFrom<DesignRow> for Design {
    type Error = RepositoryError;

    fn try_from(row: DesignRow) -> Result<Self, Self::Error> {
        let id = DesignId::new(row.id);
        let review = Review::from_parts(id, row.status, row.rejection_reason)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        let revenue = Money::new(row.revenue).map_err(|e| {
            RepositoryError::DataCorruption(format!("design {id} revenue: {e}"))
        })?;

        Ok(Self {
            id,
            name: row.name,
            designer_id: ProfileId::new(row.designer_id),
            image: row.image,
            category: row.category,
            review,
            uploaded_at: row.uploaded_at,
            sales: row.sales,
            revenue,
        })
    }
}

const DESIGN_COLUMNS: &str = "id, name, designer_id, image, category, status, \
                              rejection_reason, uploaded_at, sales, revenue";

// =============================================================================
// Repository
// =============================================================================

/// `PostgreSQL` design store.
#[derive(Clone)]
pub struct PgDesignStore {
    pool: PgPool,
}

impl PgDesignStore {
    /// Create a new design store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DesignStore for PgDesignStore {
    async fn insert(
        &self,
        designer: ProfileId,
        design: NewDesign,
    ) -> Result<Design, RepositoryError> {
        let row = sqlx::query_as::<_, DesignRow>(&format!(
            "INSERT INTO designs (name, designer_id, image, category) \
             VALUES ($1, $2, $3, $4) RETURNING {DESIGN_COLUMNS}"
        ))
        .bind(&design.name)
        .bind(designer)
        .bind(&design.image)
        .bind(&design.category)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn get(&self, id: DesignId) -> Result<Option<Design>, RepositoryError> {
        let row = sqlx::query_as::<_, DesignRow>(&format!(
            "SELECT {DESIGN_COLUMNS} FROM designs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Design>, RepositoryError> {
        let rows = sqlx::query_as::<_, DesignRow>(&format!(
            "SELECT {DESIGN_COLUMNS} FROM designs ORDER BY uploaded_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_by_designer(&self, designer: ProfileId) -> Result<Vec<Design>, RepositoryError> {
        let rows = sqlx::query_as::<_, DesignRow>(&format!(
            "SELECT {DESIGN_COLUMNS} FROM designs WHERE designer_id = $1 \
             ORDER BY uploaded_at DESC, id DESC"
        ))
        .bind(designer)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn save_review(&self, design: &Design) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE designs SET status = $2, rejection_reason = $3 WHERE id = $1",
        )
        .bind(design.id)
        .bind(design.status())
        .bind(design.review.rejection_reason())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: DesignId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM designs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn row(status: DesignStatus, reason: Option<&str>) -> DesignRow {
        DesignRow {
            id: 4,
            name: "Waves".into(),
            designer_id: Uuid::new_v4(),
            image: "img.png".into(),
            category: "designer".into(),
            status,
            rejection_reason: reason.map(Into::into),
            uploaded_at: Utc::now(),
            sales: 0,
            revenue: Decimal::ZERO,
        }
    }

    #[test]
    fn test_row_converts_rejected_with_reason() {
        let design = Design::try_from(row(DesignStatus::Rejected, Some("blurry"))).unwrap();
        assert_eq!(design.review.rejection_reason(), Some("blurry"));
        assert_eq!(design.id.reference(), "DES-004");
    }

    #[test]
    fn test_row_with_stray_reason_is_corruption() {
        let err = Design::try_from(row(DesignStatus::Approved, Some("old"))).unwrap_err();
        assert!(matches!(err, RepositoryError::DataCorruption(_)));
    }
}
