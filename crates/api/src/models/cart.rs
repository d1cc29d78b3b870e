//! Cart contents.

use chrono::{DateTime, Utc};

use atelier_core::{CartItemId, Money, ProductId, ProfileId};

/// One row of a user's cart. Unique per `(user_id, product_id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: ProfileId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
}

/// A cart row joined with the product it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub item: CartItem,
    pub title: String,
    pub price: Money,
    pub image_url: Option<String>,
}
