//! Catalog products.

use chrono::{DateTime, Utc};
use thiserror::Error;

use atelier_core::{Money, ProductId, ProfileId};

/// Category used when a product is created without one.
pub const DEFAULT_CATEGORY: &str = "tops";

/// Product validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductError {
    #[error("title is required")]
    MissingTitle,
    #[error("price is required")]
    MissingPrice,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub description: Option<String>,
    pub price: Money,
    pub category: String,
    pub image_url: Option<String>,
    /// Blob-store path when the image was uploaded through the API.
    pub storage_path: Option<String>,
    /// Creator; the only non-admin allowed to edit or delete it.
    pub owner: ProfileId,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A validated product to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub title: String,
    pub description: Option<String>,
    pub price: Money,
    pub category: String,
    pub image_url: Option<String>,
    pub storage_path: Option<String>,
    pub owner: ProfileId,
}

impl NewProduct {
    /// Validate creation input.
    ///
    /// # Errors
    ///
    /// Returns an error if the title is blank or the price is missing.
    pub fn new(
        owner: ProfileId,
        title: Option<&str>,
        price: Option<Money>,
        category: Option<&str>,
    ) -> Result<Self, ProductError> {
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ProductError::MissingTitle)?;
        let price = price.ok_or(ProductError::MissingPrice)?;
        let category = category
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CATEGORY);

        Ok(Self {
            title: title.to_owned(),
            description: None,
            price,
            category: category.to_owned(),
            image_url: None,
            storage_path: None,
            owner,
        })
    }
}

/// Partial update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

impl ProductPatch {
    /// Apply to a product in place.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::MissingTitle` if the patch blanks the title.
    pub fn apply(self, product: &mut Product) -> Result<(), ProductError> {
        if let Some(title) = self.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(ProductError::MissingTitle);
            }
            title.clone_into(&mut product.title);
        }
        if let Some(description) = self.description {
            product.description = Some(description);
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(category) = self.category {
            product.category = category;
        }
        if let Some(image_url) = self.image_url {
            product.image_url = Some(image_url);
        }
        Ok(())
    }
}
