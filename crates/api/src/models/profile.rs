//! Local user profiles.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use atelier_core::{Email, ProfileId, Role, Subject};

/// The local half of a user, linked to its auth identity by `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Same value as the identity provider's user id.
    pub id: ProfileId,
    pub name: String,
    pub email: Email,
    pub role: Role,
    pub avatar: Option<String>,
    /// Cached ledger balance. The ledger sum is authoritative.
    pub wallet_balance: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// The subject this profile acts as.
    #[must_use]
    pub const fn subject(&self) -> Subject {
        Subject::new(self.id, self.role)
    }
}

/// Fields for the second step of registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
    pub id: ProfileId,
    pub name: String,
    pub email: Email,
    pub role: Role,
}
