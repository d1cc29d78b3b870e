//! Order lifecycle.
//!
//! ```text
//! pending ─▶ processing ─▶ shipped ─▶ delivered
//!    │            │            │
//!    └────────────┴────────────┴──▶ cancelled
//! ```
//!
//! Items, total and customer contact are captured when the order is placed
//! and never recomputed from the catalog afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Email, Money, OrderId, OrderStatus, ProductId, ProfileId};

/// Order validation and transition failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// No line items.
    #[error("order must contain items")]
    EmptyItems,
    /// A line item with quantity zero.
    #[error("item {index} must have a quantity of at least 1")]
    ZeroQuantity {
        /// Zero-based position of the offending item.
        index: usize,
    },
    /// The policy forbids moving from `from` to `to`.
    #[error("cannot move order from {from} to {to}")]
    IllegalTransition {
        /// Current status.
        from: OrderStatus,
        /// Requested status.
        to: OrderStatus,
    },
}

/// One purchased line, frozen at checkout.
///
/// Unknown fields sent by the client (size, colour, thumbnail, ...) are kept
/// in `attributes` so the snapshot is stored as submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(alias = "product", alias = "product_id")]
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Money,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// A validated checkout request.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub items: Vec<OrderItem>,
    pub total: Money,
    pub shipping_address: String,
    pub customer_name: String,
    pub customer_email: Email,
}

impl NewOrder {
    /// Validate a checkout request.
    ///
    /// The total and shipping address are taken as submitted; the total is not
    /// re-derived from item prices and an empty address is accepted.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty item list or a zero quantity.
    pub fn new(
        items: Vec<OrderItem>,
        total: Money,
        shipping_address: &str,
        customer_name: &str,
        customer_email: Email,
    ) -> Result<Self, OrderError> {
        if items.is_empty() {
            return Err(OrderError::EmptyItems);
        }
        if let Some(index) = items.iter().position(|item| item.quantity == 0) {
            return Err(OrderError::ZeroQuantity { index });
        }

        Ok(Self {
            items,
            total,
            shipping_address: shipping_address.to_owned(),
            customer_name: customer_name.trim().to_owned(),
            customer_email,
        })
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: OrderId,
    /// Customer who placed the order.
    pub user_id: ProfileId,
    pub items: Vec<OrderItem>,
    pub total: Money,
    pub shipping_address: String,
    pub customer_name: String,
    pub customer_email: Email,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Materialize a freshly placed order.
    #[must_use]
    pub fn placed(
        id: OrderId,
        user_id: ProfileId,
        order: NewOrder,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            items: order.items,
            total: order.total,
            shipping_address: order.shipping_address,
            customer_name: order.customer_name,
            customer_email: order.customer_email,
            status: OrderStatus::Pending,
            created_at,
        }
    }

    /// Move to `to` if `policy` allows it.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::IllegalTransition` when the policy refuses.
    pub fn transition(
        &mut self,
        to: OrderStatus,
        policy: TransitionPolicy,
    ) -> Result<(), OrderError> {
        policy.check(self.status, to)?;
        self.status = to;
        Ok(())
    }
}

/// How strictly status updates follow the lifecycle graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Forward one step, cancel from any non-terminal state, or re-affirm the
    /// current state. Terminal states are frozen.
    #[default]
    Strict,
    /// Any of the five statuses may overwrite any other.
    Permissive,
}

impl TransitionPolicy {
    /// Whether moving `from → to` is allowed.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::IllegalTransition` when it is not.
    pub fn check(self, from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
        let allowed = match self {
            Self::Permissive => true,
            Self::Strict => {
                from == to
                    || from.next() == Some(to)
                    || (to == OrderStatus::Cancelled && !from.is_terminal())
            }
        };

        if allowed {
            Ok(())
        } else {
            Err(OrderError::IllegalTransition { from, to })
        }
    }
}

impl std::str::FromStr for TransitionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(Self::Strict),
            "permissive" => Ok(Self::Permissive),
            _ => Err(format!("expected strict or permissive, got {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn item(quantity: u32) -> OrderItem {
        OrderItem {
            product_id: ProductId::new(1),
            quantity,
            price: Money::from_cents(1000).unwrap(),
            attributes: serde_json::Map::new(),
        }
    }

    fn order() -> Order {
        let new = NewOrder::new(
            vec![item(2)],
            Money::from_cents(2000).unwrap(),
            "1 Loom Lane",
            "Ada",
            Email::parse("ada@example.com").unwrap(),
        )
        .unwrap();
        Order::placed(OrderId::new(1), ProfileId::new(Uuid::new_v4()), new, Utc::now())
    }

    #[test]
    fn test_empty_items_rejected() {
        let err = NewOrder::new(
            Vec::new(),
            Money::ZERO,
            "addr",
            "Ada",
            Email::parse("ada@example.com").unwrap(),
        )
        .unwrap_err();
        assert_eq!(err, OrderError::EmptyItems);
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let err = NewOrder::new(
            vec![item(1), item(0)],
            Money::ZERO,
            "addr",
            "Ada",
            Email::parse("ada@example.com").unwrap(),
        )
        .unwrap_err();
        assert_eq!(err, OrderError::ZeroQuantity { index: 1 });
    }

    #[test]
    fn test_blank_shipping_address_is_kept() {
        let new = NewOrder::new(
            vec![item(1)],
            Money::from_cents(1000).unwrap(),
            "",
            "Ada",
            Email::parse("ada@example.com").unwrap(),
        )
        .unwrap();
        assert_eq!(new.shipping_address, "");
    }

    #[test]
    fn test_placed_order_is_pending() {
        let order = order();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total, Money::from_cents(2000).unwrap());
    }

    #[test]
    fn test_item_keeps_extra_fields_and_aliases() {
        let json = r#"{"product": 7, "quantity": 2, "price": 10.0, "size": "M"}"#;
        let item: OrderItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.product_id, ProductId::new(7));
        assert_eq!(item.attributes.get("size").unwrap(), "M");

        let back = serde_json::to_value(&item).unwrap();
        assert_eq!(back["productId"], 7);
        assert_eq!(back["size"], "M");
    }

    #[test]
    fn test_strict_walks_forward() {
        let mut order = order();
        for to in [
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            order.transition(to, TransitionPolicy::Strict).unwrap();
        }
        assert_eq!(order.status, OrderStatus::Delivered);
    }

    #[test]
    fn test_strict_rejects_skips_and_reversals() {
        let policy = TransitionPolicy::Strict;
        assert!(policy.check(OrderStatus::Pending, OrderStatus::Shipped).is_err());
        assert!(policy.check(OrderStatus::Shipped, OrderStatus::Pending).is_err());
        assert!(policy.check(OrderStatus::Delivered, OrderStatus::Pending).is_err());
        assert!(policy.check(OrderStatus::Cancelled, OrderStatus::Processing).is_err());
    }

    #[test]
    fn test_strict_cancel_from_non_terminal_only() {
        let policy = TransitionPolicy::Strict;
        for from in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Shipped,
        ] {
            assert!(policy.check(from, OrderStatus::Cancelled).is_ok());
        }
        assert!(policy.check(OrderStatus::Delivered, OrderStatus::Cancelled).is_err());
    }

    #[test]
    fn test_strict_reaffirm_is_noop() {
        let mut order = order();
        order
            .transition(OrderStatus::Pending, TransitionPolicy::Strict)
            .unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[test]
    fn test_permissive_allows_any_overwrite() {
        let mut order = order();
        order
            .transition(OrderStatus::Delivered, TransitionPolicy::Permissive)
            .unwrap();
        order
            .transition(OrderStatus::Pending, TransitionPolicy::Permissive)
            .unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(
            "permissive".parse::<TransitionPolicy>().unwrap(),
            TransitionPolicy::Permissive
        );
        assert!("loose".parse::<TransitionPolicy>().is_err());
    }
}
