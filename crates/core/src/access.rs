//! Role-gated access checks.
//!
//! Every protected operation declares a [`Capabilities`] set: the explicit
//! list of roles allowed to invoke it. The transport layer resolves the
//! caller into a [`Subject`] once per request and passes it here. Nothing in
//! this module caches a decision; each call re-evaluates against the subject
//! it is handed.
//!
//! Ownership-scoped operations run a second check, [`ensure_owner_or_admin`],
//! after the role check. Admins bypass ownership, never the role check.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ProfileId, Role};

/// An authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Stable identifier shared with the identity provider.
    pub id: ProfileId,
    /// Role looked up from the caller's profile for this request.
    pub role: Role,
}

impl Subject {
    /// Create a subject.
    #[must_use]
    pub const fn new(id: ProfileId, role: Role) -> Self {
        Self { id, role }
    }

    /// Whether this subject is an admin.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// Whether this subject may see or act on a resource owned by `owner`.
    #[must_use]
    pub fn can_access(&self, owner: ProfileId) -> bool {
        self.is_admin() || self.id == owner
    }
}

/// Errors produced by the access checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// The subject's role is not in the operation's capability set.
    #[error("role {role} may not {operation}")]
    RoleDenied {
        /// The caller's role.
        role: Role,
        /// Operation label, for the error message.
        operation: &'static str,
    },

    /// The subject neither owns the resource nor is an admin.
    #[error("not the owner of this {resource}")]
    NotOwner {
        /// Resource label, for the error message.
        resource: &'static str,
    },
}

/// The enumerated roles permitted to invoke an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    roles: &'static [Role],
}

impl Capabilities {
    /// Any authenticated subject.
    pub const ANY: Self = Self::of(&[Role::Customer, Role::Designer, Role::Admin]);
    /// Designers and admins.
    pub const DESIGNER: Self = Self::of(&[Role::Designer, Role::Admin]);
    /// Admins only.
    pub const ADMIN: Self = Self::of(&[Role::Admin]);

    /// Build a capability set from an explicit role list.
    #[must_use]
    pub const fn of(roles: &'static [Role]) -> Self {
        Self { roles }
    }

    /// Roles in this set.
    #[must_use]
    pub const fn roles(&self) -> &'static [Role] {
        self.roles
    }

    /// Whether `role` is admitted.
    #[must_use]
    pub fn admits(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// Pass the subject through if its role is in `required`.
///
/// # Errors
///
/// Returns `AccessError::RoleDenied` when the role is not admitted.
pub fn authorize(
    subject: Subject,
    required: Capabilities,
    operation: &'static str,
) -> Result<Subject, AccessError> {
    if required.admits(subject.role) {
        Ok(subject)
    } else {
        Err(AccessError::RoleDenied {
            role: subject.role,
            operation,
        })
    }
}

/// Require that `subject` owns the resource or is an admin.
///
/// # Errors
///
/// Returns `AccessError::NotOwner` otherwise.
pub fn ensure_owner_or_admin(
    subject: &Subject,
    owner: ProfileId,
    resource: &'static str,
) -> Result<(), AccessError> {
    if subject.can_access(owner) {
        Ok(())
    } else {
        Err(AccessError::NotOwner { resource })
    }
}
