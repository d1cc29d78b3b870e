//! JSON shapes returned by the handlers.
//!
//! Keys are camelCase. Designs, orders and ledger entries carry both the
//! numeric `id` and the display `reference`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use atelier_core::design::Design;
use atelier_core::ledger::LedgerEntry;
use atelier_core::order::{Order, OrderItem};
use atelier_core::{
    CartItemId, DesignId, DesignStatus, Email, Money, OrderId, OrderStatus, ProductId, ProfileId,
    Role, TransactionId, TransactionKind, TransactionStatus,
};

use crate::models::{CartItem, CartLine, Product, Profile};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: ProfileId,
    pub name: String,
    pub email: Email,
    pub role: Role,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Profile> for ProfileView {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id,
            name: profile.name.clone(),
            email: profile.email.clone(),
            role: profile.role,
            avatar: profile.avatar.clone(),
            created_at: profile.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignView {
    pub id: DesignId,
    pub reference: String,
    pub name: String,
    pub designer_id: ProfileId,
    pub image: String,
    pub category: String,
    pub status: DesignStatus,
    /// Present only while the design is rejected.
    pub rejection_reason: Option<String>,
    pub upload_date: DateTime<Utc>,
    pub sales: i32,
    pub revenue: Money,
}

impl From<&Design> for DesignView {
    fn from(design: &Design) -> Self {
        Self {
            id: design.id,
            reference: design.id.reference(),
            name: design.name.clone(),
            designer_id: design.designer_id,
            image: design.image.clone(),
            category: design.category.clone(),
            status: design.status(),
            rejection_reason: design.review.rejection_reason().map(str::to_owned),
            upload_date: design.uploaded_at,
            sales: design.sales,
            revenue: design.revenue,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: OrderId,
    pub reference: String,
    pub user_id: ProfileId,
    pub items: Vec<OrderItem>,
    pub total: Money,
    pub shipping_address: String,
    pub customer_name: String,
    pub customer_email: Email,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            reference: order.id.reference(),
            user_id: order.user_id,
            items: order.items.clone(),
            total: order.total,
            shipping_address: order.shipping_address.clone(),
            customer_name: order.customer_name.clone(),
            customer_email: order.customer_email.clone(),
            status: order.status,
            created_at: order.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub id: TransactionId,
    pub reference: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Signed: withdrawals are negative.
    pub amount: Decimal,
    pub description: Option<String>,
    pub status: TransactionStatus,
    pub date: DateTime<Utc>,
}

impl From<&LedgerEntry> for TransactionView {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            id: entry.id,
            reference: entry.id.reference(),
            kind: entry.kind,
            amount: entry.amount,
            description: entry.description.clone(),
            status: entry.status,
            date: entry.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: ProductId,
    pub title: String,
    pub description: Option<String>,
    pub price: Money,
    pub category: String,
    pub image_url: Option<String>,
    pub storage_path: Option<String>,
    pub owner: ProfileId,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            title: product.title.clone(),
            description: product.description.clone(),
            price: product.price,
            category: product.category.clone(),
            image_url: product.image_url.clone(),
            storage_path: product.storage_path.clone(),
            owner: product.owner,
            is_active: product.is_active,
            created_at: product.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
}

impl From<&CartItem> for CartItemView {
    fn from(item: &CartItem) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            quantity: item.quantity,
            created_at: item.created_at,
        }
    }
}

/// Product details embedded in a cart line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartProductView {
    pub title: String,
    pub price: Money,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub product: CartProductView,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        Self {
            id: line.item.id,
            product_id: line.item.product_id,
            quantity: line.item.quantity,
            product: CartProductView {
                title: line.title.clone(),
                price: line.price,
                image_url: line.image_url.clone(),
            },
        }
    }
}

/// Map a slice into views.
pub fn many<'a, T: 'a, V: From<&'a T>>(items: &'a [T]) -> Vec<V> {
    items.iter().map(V::from).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use atelier_core::design::NewDesign;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_design_view_shape() {
        let mut design = Design::submitted(
            DesignId::new(7),
            ProfileId::new(Uuid::nil()),
            NewDesign::new("Waves", "designs/waves.png", None).unwrap(),
            DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        );
        design.reject("blurry").unwrap();

        let value = serde_json::to_value(DesignView::from(&design)).unwrap();
        assert_eq!(value["id"], json!(7));
        assert_eq!(value["reference"], json!("DES-007"));
        assert_eq!(value["status"], json!("rejected"));
        assert_eq!(value["rejectionReason"], json!("blurry"));
        assert_eq!(value["category"], json!("designer"));
        assert_eq!(value["revenue"], json!("0"));
        assert_eq!(value["uploadDate"], json!("2026-03-01T10:00:00Z"));
    }

    #[test]
    fn test_transaction_view_uses_type_key() {
        let entry = LedgerEntry {
            id: TransactionId::new(12),
            user_id: ProfileId::new(Uuid::nil()),
            kind: TransactionKind::Withdrawal,
            amount: Decimal::new(-5000, 2),
            description: None,
            status: TransactionStatus::Pending,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(TransactionView::from(&entry)).unwrap();
        assert_eq!(value["type"], json!("withdrawal"));
        assert_eq!(value["reference"], json!("TXN-012"));
        assert_eq!(value["amount"], json!("-50.00"));
        assert_eq!(value["status"], json!("pending"));
    }
}
