//! Order lifecycle service.

use atelier_core::access::ensure_owner_or_admin;
use atelier_core::order::{NewOrder, Order, TransitionPolicy};
use atelier_core::{OrderId, OrderStatus, Subject};

use crate::db::{RepositoryError, Stores};
use crate::error::{AppError, Result, add_breadcrumb};

/// Order lifecycle operations.
pub struct OrderService<'a> {
    stores: &'a Stores,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(stores: &'a Stores) -> Self {
        Self { stores }
    }

    async fn load(&self, id: OrderId) -> Result<Order> {
        self.stores
            .orders
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
    }

    /// Place an order for `subject`. The items and total are stored as given.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the insert fails.
    pub async fn create(&self, subject: &Subject, order: NewOrder) -> Result<Order> {
        let order = self.stores.orders.insert(subject.id, order).await?;

        add_breadcrumb(
            "orders",
            "Order placed",
            Some(&[("order_id", order.id.reference().as_str())]),
        );
        tracing::info!(
            order_id = %order.id.reference(),
            user_id = %subject.id,
            items = order.items.len(),
            total = %order.total,
            "Order placed"
        );
        Ok(order)
    }

    /// Fetch one order. Owner or admin only.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the order does not exist, or
    /// `AppError::Forbidden` if `subject` neither placed it nor is an admin.
    pub async fn get(&self, subject: &Subject, id: OrderId) -> Result<Order> {
        let order = self.load(id).await?;
        ensure_owner_or_admin(subject, order.user_id, "order")?;
        Ok(order)
    }

    /// All orders for an admin, own orders for anyone else. Newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list(&self, subject: &Subject) -> Result<Vec<Order>> {
        let orders = if subject.is_admin() {
            self.stores.orders.list_all().await?
        } else {
            self.stores.orders.list_by_user(subject.id).await?
        };
        Ok(orders)
    }

    /// Move an order to `to` under `policy`.
    ///
    /// The write only lands if the status is still the one that was checked;
    /// a concurrent update in between is reported as a conflict.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the order does not exist, or
    /// `AppError::InvalidRequest` if the transition is refused or lost a race.
    pub async fn update_status(
        &self,
        subject: &Subject,
        id: OrderId,
        to: OrderStatus,
        policy: TransitionPolicy,
    ) -> Result<Order> {
        let mut order = self.load(id).await?;
        let from = order.status;
        order.transition(to, policy)?;

        match self.stores.orders.update_status(id, from, to).await {
            Ok(()) => {}
            Err(RepositoryError::Conflict(_)) => {
                tracing::warn!(
                    order_id = %id.reference(),
                    %from,
                    %to,
                    "Order status changed concurrently"
                );
                return Err(AppError::InvalidRequest(format!(
                    "order {} is no longer {from}",
                    id.reference()
                )));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(
            order_id = %id.reference(),
            actor = %subject.id,
            %from,
            %to,
            "Order status updated"
        );
        Ok(order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use atelier_core::order::OrderItem;
    use atelier_core::{Email, Money, ProductId, ProfileId, Role};
    use uuid::Uuid;

    use super::*;

    fn subject(role: Role) -> Subject {
        Subject::new(ProfileId::new(Uuid::new_v4()), role)
    }

    fn checkout() -> NewOrder {
        let item = OrderItem {
            product_id: ProductId::new(1),
            quantity: 2,
            price: Money::from_cents(1000).unwrap(),
            attributes: serde_json::Map::new(),
        };
        NewOrder::new(
            vec![item],
            Money::from_cents(2000).unwrap(),
            "1 Loom Street",
            "Ada",
            Email::parse("ada@example.com").unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_get_is_owner_or_admin() {
        let stores = Stores::in_memory();
        let service = OrderService::new(&stores);
        let owner = subject(Role::Customer);
        let order = service.create(&owner, checkout()).await.unwrap();

        let fetched = service.get(&owner, order.id).await.unwrap();
        assert_eq!(fetched.status, OrderStatus::Pending);
        assert_eq!(fetched.total.to_string(), "20.00");

        let err = service.get(&subject(Role::Customer), order.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(service.get(&subject(Role::Admin), order.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_scoping() {
        let stores = Stores::in_memory();
        let service = OrderService::new(&stores);
        let alice = subject(Role::Customer);
        let bob = subject(Role::Customer);
        let first = service.create(&alice, checkout()).await.unwrap();
        let second = service.create(&bob, checkout()).await.unwrap();

        let own = service.list(&alice).await.unwrap();
        assert_eq!(own.iter().map(|o| o.id).collect::<Vec<_>>(), vec![first.id]);

        let all = service.list(&subject(Role::Admin)).await.unwrap();
        assert_eq!(all.first().map(|o| o.id), Some(second.id));
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_strict_policy_freezes_terminal_states() {
        let stores = Stores::in_memory();
        let service = OrderService::new(&stores);
        let admin = subject(Role::Admin);
        let order = service.create(&subject(Role::Customer), checkout()).await.unwrap();

        service
            .update_status(&admin, order.id, OrderStatus::Cancelled, TransitionPolicy::Strict)
            .await
            .unwrap();
        let err = service
            .update_status(&admin, order.id, OrderStatus::Pending, TransitionPolicy::Strict)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));

        let reopened = service
            .update_status(&admin, order.id, OrderStatus::Pending, TransitionPolicy::Permissive)
            .await
            .unwrap();
        assert_eq!(reopened.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_update_missing_order() {
        let stores = Stores::in_memory();
        let err = OrderService::new(&stores)
            .update_status(
                &subject(Role::Admin),
                OrderId::new(404),
                OrderStatus::Shipped,
                TransitionPolicy::Strict,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
