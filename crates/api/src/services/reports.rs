//! Admin reporting over orders, designs, profiles and the ledger.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use atelier_core::design::{Design, DesignTally};
use atelier_core::{DesignStatus, Email, Money, OrderStatus, ProfileId, Role};

use crate::db::Stores;
use crate::error::Result;

/// Marketplace-wide totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_orders: usize,
    pub pending_orders: usize,
    /// Sum of order totals across every status.
    pub total_revenue: Money,
    pub total_designs: usize,
    pub pending_designs: usize,
    pub approved_designs: usize,
    pub total_designers: i64,
    pub total_customers: i64,
    /// Active catalog products.
    pub total_products: i64,
}

/// One row of the admin designer roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignerSummary {
    pub id: ProfileId,
    pub name: String,
    pub email: Email,
    pub avatar: Option<String>,
    pub total_designs: usize,
    pub total_sales: i64,
    pub total_earnings: Money,
    /// Ledger-derived current balance.
    pub wallet_balance: Decimal,
    pub join_date: DateTime<Utc>,
}

/// Read-only admin reports.
pub struct ReportService<'a> {
    stores: &'a Stores,
}

impl<'a> ReportService<'a> {
    #[must_use]
    pub const fn new(stores: &'a Stores) -> Self {
        Self { stores }
    }

    /// Marketplace-wide totals.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if a query fails.
    pub async fn stats(&self) -> Result<AdminStats> {
        let orders = self.stores.orders.list_all().await?;
        let designs = self.stores.designs.list_all().await?;

        let count = |status: DesignStatus| designs.iter().filter(|d| d.status() == status).count();

        Ok(AdminStats {
            total_orders: orders.len(),
            pending_orders: orders
                .iter()
                .filter(|o| o.status == OrderStatus::Pending)
                .count(),
            total_revenue: orders.iter().map(|o| o.total).sum(),
            total_designs: designs.len(),
            pending_designs: count(DesignStatus::Pending),
            approved_designs: count(DesignStatus::Approved),
            total_designers: self.stores.profiles.count_by_role(Role::Designer).await?,
            total_customers: self.stores.profiles.count_by_role(Role::Customer).await?,
            total_products: self.stores.products.count_active().await?,
        })
    }

    /// Every designer with derived earnings, oldest account first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if a query fails.
    pub async fn designers(&self) -> Result<Vec<DesignerSummary>> {
        let profiles = self.stores.profiles.list_by_role(Role::Designer).await?;

        let mut by_designer: HashMap<ProfileId, Vec<Design>> = HashMap::new();
        for design in self.stores.designs.list_all().await? {
            by_designer.entry(design.designer_id).or_default().push(design);
        }

        let mut roster = Vec::with_capacity(profiles.len());
        for profile in profiles {
            let tally = by_designer
                .get(&profile.id)
                .map(|designs| DesignTally::of(designs))
                .unwrap_or_default();
            let balance = self.stores.ledger.balance(profile.id).await?;

            roster.push(DesignerSummary {
                id: profile.id,
                name: profile.name,
                email: profile.email,
                avatar: profile.avatar,
                total_designs: tally.total,
                total_sales: tally.sales,
                total_earnings: tally.earnings(),
                wallet_balance: balance.current,
                join_date: profile.created_at,
            });
        }
        Ok(roster)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use atelier_core::design::NewDesign;
    use atelier_core::ledger::NewLedgerEntry;
    use atelier_core::order::{NewOrder, OrderItem};
    use atelier_core::ProductId;
    use uuid::Uuid;

    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::models::{NewProduct, NewProfile};

    async fn profile(stores: &Stores, role: Role) -> ProfileId {
        let id = ProfileId::new(Uuid::new_v4());
        stores
            .profiles
            .insert(NewProfile {
                id,
                name: role.to_string(),
                email: Email::parse(&format!("{id}@example.com")).unwrap(),
                role,
            })
            .await
            .unwrap();
        id
    }

    fn order(cents: i64) -> NewOrder {
        let item = OrderItem {
            product_id: ProductId::new(1),
            quantity: 1,
            price: Money::from_cents(cents).unwrap(),
            attributes: serde_json::Map::new(),
        };
        NewOrder::new(
            vec![item],
            Money::from_cents(cents).unwrap(),
            "1 Loom Street",
            "C",
            Email::parse("c@example.com").unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_stats_totals() {
        let stores = Stores::in_memory();
        let designer = profile(&stores, Role::Designer).await;
        let customer = profile(&stores, Role::Customer).await;

        stores.orders.insert(customer, order(2000)).await.unwrap();
        let shipped = stores.orders.insert(customer, order(550)).await.unwrap();
        stores
            .orders
            .update_status(shipped.id, OrderStatus::Pending, OrderStatus::Shipped)
            .await
            .unwrap();
        stores
            .designs
            .insert(designer, NewDesign::new("A", "a.png", None).unwrap())
            .await
            .unwrap();
        let product = NewProduct::new(designer, Some("Tee"), Some(Money::ZERO), None).unwrap();
        stores.products.insert(product).await.unwrap();

        let stats = ReportService::new(&stores).stats().await.unwrap();
        assert_eq!(stats.total_orders, 2);
        assert_eq!(stats.pending_orders, 1);
        assert_eq!(stats.total_revenue.to_string(), "25.50");
        assert_eq!(stats.total_designs, 1);
        assert_eq!(stats.pending_designs, 1);
        assert_eq!(stats.approved_designs, 0);
        assert_eq!(stats.total_designers, 1);
        assert_eq!(stats.total_customers, 1);
        assert_eq!(stats.total_products, 1);
    }

    #[tokio::test]
    async fn test_designer_roster_uses_ledger_balance() {
        let memory = Arc::new(MemoryStore::default());
        let stores = Stores::from_memory(&memory);
        let designer = profile(&stores, Role::Designer).await;
        profile(&stores, Role::Customer).await;

        let design = stores
            .designs
            .insert(designer, NewDesign::new("A", "a.png", None).unwrap())
            .await
            .unwrap();
        memory
            .set_design_sales(design.id, 3, Money::from_cents(10_000).unwrap())
            .await;
        let earning =
            NewLedgerEntry::earning(designer, Money::from_cents(4200).unwrap(), None).unwrap();
        stores.ledger.record(earning).await.unwrap();
        memory.set_cached_balance(designer, Decimal::new(999, 0)).await;

        let roster = ReportService::new(&stores).designers().await.unwrap();
        assert_eq!(roster.len(), 1);
        let row = &roster[0];
        assert_eq!(row.id, designer);
        assert_eq!(row.total_designs, 1);
        assert_eq!(row.total_sales, 3);
        assert_eq!(row.total_earnings.to_string(), "5.00");
        assert_eq!(row.wallet_balance, Decimal::new(4200, 2));
    }
}
