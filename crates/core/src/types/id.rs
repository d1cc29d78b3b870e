//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types. Profiles are keyed by
//! the UUID the identity provider issues, so [`ProfileId`] wraps a `Uuid`
//! instead.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to define a type-safe serial ID wrapper.
///
/// Creates a newtype wrapper around `i32` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_i32()`, `reference()`
/// - `From<i32>` and `Into<i32>` implementations
/// - `sqlx` `Type`, `Encode`, and `Decode` implementations (with `postgres` feature)
///
/// The second argument is the prefix used by `reference()`, which renders the
/// human-facing identifier shown to customers and designers (`ORD-007`).
///
/// # Example
///
/// ```rust
/// # use atelier_core::define_id;
/// define_id!(InvoiceId, "INV");
///
/// let id = InvoiceId::new(7);
/// assert_eq!(id.reference(), "INV-007");
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Prefix used when rendering the display reference.
            pub const PREFIX: &'static str = $prefix;

            /// Create a new ID from an i32 value.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// Get the underlying i32 value.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }

            /// Display reference, zero-padded to three digits.
            #[must_use]
            pub fn reference(&self) -> String {
                format!("{}-{:03}", Self::PREFIX, self.0)
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let id = <i32 as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self(id))
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <i32 as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

define_id!(DesignId, "DES");
define_id!(OrderId, "ORD");
define_id!(TransactionId, "TXN");
define_id!(ProductId, "PRD");
define_id!(CartItemId, "CRT");

/// Identifier shared by an auth identity and its local profile.
///
/// The identity provider mints it; the profile row reuses it verbatim so the
/// two records stay linked (`AuthIdentity.id == Profile.id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(transparent))]
#[serde(transparent)]
pub struct ProfileId(Uuid);

impl ProfileId {
    /// Wrap a provider-issued UUID.
    #[must_use]
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Get the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl core::fmt::Display for ProfileId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ProfileId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::str::FromStr for ProfileId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_is_zero_padded() {
        assert_eq!(DesignId::new(1).reference(), "DES-001");
        assert_eq!(OrderId::new(42).reference(), "ORD-042");
        assert_eq!(TransactionId::new(1234).reference(), "TXN-1234");
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&OrderId::new(9)).unwrap();
        assert_eq!(json, "9");

        let id = Uuid::new_v4();
        let json = serde_json::to_string(&ProfileId::new(id)).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }

    #[test]
    fn test_profile_id_from_str() {
        let id = Uuid::new_v4();
        let parsed: ProfileId = id.to_string().parse().unwrap();
        assert_eq!(parsed.as_uuid(), id);
        assert!("not-a-uuid".parse::<ProfileId>().is_err());
    }
}
