//! Subject roles.

use serde::{Deserialize, Serialize};

use super::status::ParseStatusError;

/// Role carried by every authenticated subject.
///
/// Roles are flat: `admin` is not a superset of `designer` for capability
/// checks, every operation lists the roles it admits explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Buys products and places orders.
    Customer,
    /// Submits designs, lists products and earns commission.
    Designer,
    /// Reviews designs and manages orders.
    Admin,
}

impl Role {
    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Designer => "designer",
            Self::Admin => "admin",
        }
    }

    /// Whether self-service registration may pick this role.
    #[must_use]
    pub const fn is_self_assignable(&self) -> bool {
        !matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "designer" => Ok(Self::Designer),
            "admin" => Ok(Self::Admin),
            _ => Err(ParseStatusError {
                kind: "role",
                value: s.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_display_and_parse() {
        for role in [Role::Customer, Role::Designer, Role::Admin] {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_admin_is_not_self_assignable() {
        assert!(Role::Customer.is_self_assignable());
        assert!(Role::Designer.is_self_assignable());
        assert!(!Role::Admin.is_self_assignable());
    }
}
