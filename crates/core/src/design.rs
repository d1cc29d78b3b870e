//! Design review lifecycle.
//!
//! ```text
//! pending ──approve──▶ approved
//!    │
//!    └────reject─────▶ rejected
//! ```
//!
//! A design starts `pending`. Approval and rejection are admin transitions;
//! neither terminal state has a way back and there is no resubmission.
//! Re-approving an approved design is a no-op and re-rejecting a rejected one
//! replaces the reason. Moving between `approved` and `rejected` is refused.
//! Deletion is a hard delete and not a state transition.
//!
//! The rejection reason lives inside [`Review::Rejected`], so a reason can
//! only exist while the design is rejected.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::ledger::commission;
use crate::types::{DesignId, DesignStatus, Money, ProfileId};

/// Category assigned when a submission does not name one.
pub const DEFAULT_CATEGORY: &str = "designer";

/// Validation failures for a design submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DesignError {
    /// Name missing or blank.
    #[error("design name is required")]
    MissingName,
    /// Image reference missing or blank.
    #[error("design image is required")]
    MissingImage,
    /// A stored row carried a reason without being rejected, or vice versa.
    #[error("design {0} has an inconsistent rejection reason")]
    InconsistentReview(DesignId),
    /// Review transition out of a terminal state.
    #[error("cannot move a design from {from} to {to}")]
    IllegalTransition { from: DesignStatus, to: DesignStatus },
}

/// Review state with the rejection reason attached to the only state that
/// may carry one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Review {
    #[default]
    Pending,
    Approved,
    Rejected {
        /// Admin-supplied explanation; may be empty.
        reason: String,
    },
}

impl Review {
    /// Rebuild a review from its stored columns.
    ///
    /// # Errors
    ///
    /// Returns `DesignError::InconsistentReview` when a reason is present on a
    /// non-rejected design or missing on a rejected one.
    pub fn from_parts(
        id: DesignId,
        status: DesignStatus,
        reason: Option<String>,
    ) -> Result<Self, DesignError> {
        match (status, reason) {
            (DesignStatus::Pending, None) => Ok(Self::Pending),
            (DesignStatus::Approved, None) => Ok(Self::Approved),
            (DesignStatus::Rejected, Some(reason)) => Ok(Self::Rejected { reason }),
            _ => Err(DesignError::InconsistentReview(id)),
        }
    }

    /// Flat status.
    #[must_use]
    pub const fn status(&self) -> DesignStatus {
        match self {
            Self::Pending => DesignStatus::Pending,
            Self::Approved => DesignStatus::Approved,
            Self::Rejected { .. } => DesignStatus::Rejected,
        }
    }

    /// Reason, present iff rejected.
    #[must_use]
    pub fn rejection_reason(&self) -> Option<&str> {
        match self {
            Self::Rejected { reason } => Some(reason),
            Self::Pending | Self::Approved => None,
        }
    }
}

/// A validated design submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDesign {
    /// Display name.
    pub name: String,
    /// Blob-store URL or path of the artwork.
    pub image: String,
    /// Catalog category (`classic`, `designer`, ...).
    pub category: String,
}

impl NewDesign {
    /// Validate a submission, defaulting the category.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or image is blank.
    pub fn new(
        name: &str,
        image: &str,
        category: Option<&str>,
    ) -> Result<Self, DesignError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DesignError::MissingName);
        }
        let image = image.trim();
        if image.is_empty() {
            return Err(DesignError::MissingImage);
        }
        let category = category
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CATEGORY);

        Ok(Self {
            name: name.to_owned(),
            image: image.to_owned(),
            category: category.to_owned(),
        })
    }
}

/// A designer's submitted artwork.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Design {
    pub id: DesignId,
    pub name: String,
    /// Owning designer; set at submission and never reassigned.
    pub designer_id: ProfileId,
    pub image: String,
    pub category: String,
    pub review: Review,
    pub uploaded_at: DateTime<Utc>,
    /// Units sold, maintained by the sales process.
    pub sales: i32,
    /// Gross revenue, maintained by the sales process.
    pub revenue: Money,
}

impl Design {
    /// Materialize a freshly submitted design.
    #[must_use]
    pub fn submitted(
        id: DesignId,
        designer_id: ProfileId,
        submission: NewDesign,
        uploaded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: submission.name,
            designer_id,
            image: submission.image,
            category: submission.category,
            review: Review::Pending,
            uploaded_at,
            sales: 0,
            revenue: Money::ZERO,
        }
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> DesignStatus {
        self.review.status()
    }

    fn ensure_reviewable(&self, to: DesignStatus) -> Result<(), DesignError> {
        let from = self.status();
        if from == DesignStatus::Pending || from == to {
            Ok(())
        } else {
            Err(DesignError::IllegalTransition { from, to })
        }
    }

    /// Approve a pending design. Approving an approved design is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `DesignError::IllegalTransition` if the design is rejected.
    pub fn approve(&mut self) -> Result<(), DesignError> {
        self.ensure_reviewable(DesignStatus::Approved)?;
        self.review = Review::Approved;
        Ok(())
    }

    /// Reject a pending design with `reason`. Rejecting a rejected design
    /// overwrites the reason.
    ///
    /// # Errors
    ///
    /// Returns `DesignError::IllegalTransition` if the design is approved.
    pub fn reject(&mut self, reason: impl Into<String>) -> Result<(), DesignError> {
        self.ensure_reviewable(DesignStatus::Rejected)?;
        self.review = Review::Rejected {
            reason: reason.into(),
        };
        Ok(())
    }
}

/// Per-designer design counts and sales figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DesignTally {
    pub total: usize,
    pub approved: usize,
    pub pending: usize,
    pub rejected: usize,
    pub sales: i64,
    pub revenue: Money,
}

impl DesignTally {
    /// Tally a set of designs.
    #[must_use]
    pub fn of<'a>(designs: impl IntoIterator<Item = &'a Design>) -> Self {
        designs.into_iter().fold(Self::default(), |mut tally, design| {
            tally.total += 1;
            match design.status() {
                DesignStatus::Pending => tally.pending += 1,
                DesignStatus::Approved => tally.approved += 1,
                DesignStatus::Rejected => tally.rejected += 1,
            }
            tally.sales += i64::from(design.sales);
            tally.revenue = tally.revenue.saturating_add(design.revenue);
            tally
        })
    }

    /// Commission earned on the tallied revenue.
    #[must_use]
    pub fn earnings(&self) -> Money {
        commission(self.revenue)
    }
}
