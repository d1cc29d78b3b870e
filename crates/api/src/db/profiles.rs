//! Profile repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use atelier_core::{Email, ProfileId, Role};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{NewProfile, Profile};

/// Storage for local profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Look up a profile by identity id.
    async fn get(&self, id: ProfileId) -> Result<Option<Profile>, RepositoryError>;

    /// Insert the profile half of a registration.
    ///
    /// Returns `RepositoryError::Conflict` if a profile with this id exists.
    async fn insert(&self, profile: NewProfile) -> Result<Profile, RepositoryError>;

    /// All profiles with `role`, oldest first.
    async fn list_by_role(&self, role: Role) -> Result<Vec<Profile>, RepositoryError>;

    /// Number of profiles with `role`.
    async fn count_by_role(&self, role: Role) -> Result<i64, RepositoryError>;
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    name: String,
    email: String,
    role: Role,
    avatar: Option<String>,
    wallet_balance: Decimal,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = RepositoryError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: ProfileId::new(row.id),
            name: row.name,
            email,
            role: row.role,
            avatar: row.avatar,
            wallet_balance: row.wallet_balance,
            created_at: row.created_at,
        })
    }
}

const PROFILE_COLUMNS: &str = "id, name, email, role, avatar, wallet_balance, created_at";

// =============================================================================
// Repository
// =============================================================================

/// `PostgreSQL` profile store.
#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    /// Create a new profile store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn get(&self, id: ProfileId) -> Result<Option<Profile>, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn insert(&self, profile: NewProfile) -> Result<Profile, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "INSERT INTO profiles (id, name, email, role) VALUES ($1, $2, $3, $4) \
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(profile.id)
        .bind(&profile.name)
        .bind(profile.email.as_str())
        .bind(profile.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "profile already exists"))?;

        row.try_into()
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<Profile>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE role = $1 ORDER BY created_at, id"
        ))
        .bind(role)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn count_by_role(&self, role: Role) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM profiles WHERE role = $1")
            .bind(role)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
