//! Design lifecycle service.
//!
//! Role checks happen in the extractors; this service applies the ownership
//! rule and the review transitions.

use atelier_core::access::ensure_owner_or_admin;
use atelier_core::design::{Design, NewDesign};
use atelier_core::{DesignId, Subject};

use crate::db::Stores;
use crate::error::{AppError, Result, add_breadcrumb};

/// Design lifecycle operations.
pub struct DesignService<'a> {
    stores: &'a Stores,
}

impl<'a> DesignService<'a> {
    /// Create a new design service.
    #[must_use]
    pub const fn new(stores: &'a Stores) -> Self {
        Self { stores }
    }

    async fn load(&self, id: DesignId) -> Result<Design> {
        self.stores
            .designs
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Design not found".to_string()))
    }

    /// Submit a design owned by `subject`. Starts `pending`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the insert fails.
    pub async fn submit(&self, subject: &Subject, submission: NewDesign) -> Result<Design> {
        let design = self.stores.designs.insert(subject.id, submission).await?;

        tracing::info!(
            design_id = %design.id.reference(),
            actor = %subject.id,
            "Design submitted"
        );
        Ok(design)
    }

    /// Approve a design. Re-approving re-affirms `approved`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the design does not exist, or
    /// `AppError::InvalidRequest` if it was already rejected.
    pub async fn approve(&self, subject: &Subject, id: DesignId) -> Result<Design> {
        let mut design = self.load(id).await?;
        design.approve()?;
        self.stores.designs.save_review(&design).await?;

        add_breadcrumb(
            "designs",
            "Design approved",
            Some(&[("design_id", id.reference().as_str())]),
        );
        tracing::info!(design_id = %id.reference(), actor = %subject.id, "Design approved");
        Ok(design)
    }

    /// Reject a design, replacing any earlier reason.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the design does not exist, or
    /// `AppError::InvalidRequest` if it was already approved.
    pub async fn reject(&self, subject: &Subject, id: DesignId, reason: &str) -> Result<Design> {
        let mut design = self.load(id).await?;
        design.reject(reason.trim())?;
        self.stores.designs.save_review(&design).await?;

        add_breadcrumb(
            "designs",
            "Design rejected",
            Some(&[("design_id", id.reference().as_str())]),
        );
        tracing::info!(design_id = %id.reference(), actor = %subject.id, "Design rejected");
        Ok(design)
    }

    /// Hard-delete a design in any status. Owner or admin only.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the design does not exist, or
    /// `AppError::Forbidden` if `subject` neither owns it nor is an admin.
    pub async fn delete(&self, subject: &Subject, id: DesignId) -> Result<()> {
        let design = self.load(id).await?;
        ensure_owner_or_admin(subject, design.designer_id, "design")?;

        if !self.stores.designs.delete(id).await? {
            return Err(AppError::NotFound("Design not found".to_string()));
        }

        tracing::info!(design_id = %id.reference(), actor = %subject.id, "Design deleted");
        Ok(())
    }

    /// All designs for an admin, own designs for anyone else. Newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list(&self, subject: &Subject) -> Result<Vec<Design>> {
        let designs = if subject.is_admin() {
            self.stores.designs.list_all().await?
        } else {
            self.stores.designs.list_by_designer(subject.id).await?
        };
        Ok(designs)
    }

    /// `subject`'s own designs, newest first, regardless of role.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list_own(&self, subject: &Subject) -> Result<Vec<Design>> {
        Ok(self.stores.designs.list_by_designer(subject.id).await?)
    }
}
