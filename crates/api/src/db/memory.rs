//! In-memory stores for tests.
//!
//! One [`MemoryStore`] implements every store trait over a single state
//! behind one async mutex, so each operation (including the withdrawal
//! read-then-write) runs as if in its own serialisable transaction.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use atelier_core::design::{Design, NewDesign};
use atelier_core::ledger::{Balance, LedgerEntry, NewLedgerEntry};
use atelier_core::order::{NewOrder, Order};
use atelier_core::{
    CartItemId, DesignId, OrderId, OrderStatus, ProductId, ProfileId, Role, TransactionId,
};

use super::{
    CartStore, DesignStore, LedgerStore, OrderStore, ProductStore, ProfileStore, Reconciliation,
    RepositoryError, WithdrawalError,
};
use crate::models::{CartItem, CartLine, NewProduct, NewProfile, Profile, Product};

#[derive(Debug, Default)]
struct State {
    profiles: HashMap<ProfileId, Profile>,
    designs: BTreeMap<DesignId, Design>,
    orders: BTreeMap<OrderId, Order>,
    transactions: Vec<LedgerEntry>,
    products: BTreeMap<ProductId, Product>,
    cart: BTreeMap<CartItemId, CartItem>,
    last_id: i32,
}

impl State {
    /// Serial ids shared across tables, like a single sequence.
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn entries_of(&self, user: ProfileId) -> impl Iterator<Item = &LedgerEntry> {
        self.transactions.iter().filter(move |t| t.user_id == user)
    }

    fn refresh_cached_balance(&mut self, user: ProfileId) -> Balance {
        let balance = Balance::of(self.entries_of(user));
        if let Some(profile) = self.profiles.get_mut(&user) {
            profile.wallet_balance = balance.current;
        }
        balance
    }

    fn append(&mut self, entry: NewLedgerEntry) -> LedgerEntry {
        let id = TransactionId::new(self.next_id());
        let recorded = entry.into_entry(id, Utc::now());
        self.transactions.push(recorded.clone());
        recorded
    }
}

/// Shared in-memory backing for every store trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Overwrite a profile's cached balance, to simulate drift.
    pub async fn set_cached_balance(&self, user: ProfileId, balance: Decimal) {
        if let Some(profile) = self.state.lock().await.profiles.get_mut(&user) {
            profile.wallet_balance = balance;
        }
    }

    /// Set a design's sales figures, standing in for the sales process.
    pub async fn set_design_sales(&self, id: DesignId, sales: i32, revenue: atelier_core::Money) {
        if let Some(design) = self.state.lock().await.designs.get_mut(&id) {
            design.sales = sales;
            design.revenue = revenue;
        }
    }

    /// Change a product's price, to check order snapshots.
    pub async fn set_product_price(&self, id: ProductId, price: atelier_core::Money) {
        if let Some(product) = self.state.lock().await.products.get_mut(&id) {
            product.price = price;
        }
    }
}

fn newest_first<T, K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    items.sort_by_key(|item| std::cmp::Reverse(key(item)));
    items
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get(&self, id: ProfileId) -> Result<Option<Profile>, RepositoryError> {
        Ok(self.state.lock().await.profiles.get(&id).cloned())
    }

    async fn insert(&self, profile: NewProfile) -> Result<Profile, RepositoryError> {
        let mut state = self.state.lock().await;
        if state.profiles.contains_key(&profile.id) {
            return Err(RepositoryError::Conflict("profile already exists".to_owned()));
        }
        let created = Profile {
            id: profile.id,
            name: profile.name,
            email: profile.email,
            role: profile.role,
            avatar: None,
            wallet_balance: Decimal::ZERO,
            created_at: Utc::now(),
        };
        state.profiles.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<Profile>, RepositoryError> {
        let state = self.state.lock().await;
        let mut profiles: Vec<Profile> = state
            .profiles
            .values()
            .filter(|p| p.role == role)
            .cloned()
            .collect();
        profiles.sort_by_key(|p| (p.created_at, p.id));
        Ok(profiles)
    }

    async fn count_by_role(&self, role: Role) -> Result<i64, RepositoryError> {
        let state = self.state.lock().await;
        let count = state.profiles.values().filter(|p| p.role == role).count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }
}

#[async_trait]
impl DesignStore for MemoryStore {
    async fn insert(
        &self,
        designer: ProfileId,
        design: NewDesign,
    ) -> Result<Design, RepositoryError> {
        let mut state = self.state.lock().await;
        let id = DesignId::new(state.next_id());
        let created = Design::submitted(id, designer, design, Utc::now());
        state.designs.insert(id, created.clone());
        Ok(created)
    }

    async fn get(&self, id: DesignId) -> Result<Option<Design>, RepositoryError> {
        Ok(self.state.lock().await.designs.get(&id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Design>, RepositoryError> {
        let state = self.state.lock().await;
        let designs = state.designs.values().cloned().collect();
        Ok(newest_first(designs, |d| (d.uploaded_at, d.id)))
    }

    async fn list_by_designer(&self, designer: ProfileId) -> Result<Vec<Design>, RepositoryError> {
        let state = self.state.lock().await;
        let designs = state
            .designs
            .values()
            .filter(|d| d.designer_id == designer)
            .cloned()
            .collect();
        Ok(newest_first(designs, |d| (d.uploaded_at, d.id)))
    }

    async fn save_review(&self, design: &Design) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        let stored = state
            .designs
            .get_mut(&design.id)
            .ok_or(RepositoryError::NotFound)?;
        stored.review = design.review.clone();
        Ok(())
    }

    async fn delete(&self, id: DesignId) -> Result<bool, RepositoryError> {
        Ok(self.state.lock().await.designs.remove(&id).is_some())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert(&self, user: ProfileId, order: NewOrder) -> Result<Order, RepositoryError> {
        let mut state = self.state.lock().await;
        let id = OrderId::new(state.next_id());
        let created = Order::placed(id, user, order, Utc::now());
        state.orders.insert(id, created.clone());
        Ok(created)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.state.lock().await.orders.get(&id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let state = self.state.lock().await;
        let orders = state.orders.values().cloned().collect();
        Ok(newest_first(orders, |o| (o.created_at, o.id)))
    }

    async fn list_by_user(&self, user: ProfileId) -> Result<Vec<Order>, RepositoryError> {
        let state = self.state.lock().await;
        let orders = state
            .orders
            .values()
            .filter(|o| o.user_id == user)
            .cloned()
            .collect();
        Ok(newest_first(orders, |o| (o.created_at, o.id)))
    }

    async fn update_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        let order = state.orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if order.status != from {
            return Err(RepositoryError::Conflict(format!(
                "order {id} changed status concurrently"
            )));
        }
        order.status = to;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn record(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, RepositoryError> {
        let mut state = self.state.lock().await;
        if !state.profiles.contains_key(&entry.user_id) {
            return Err(RepositoryError::NotFound);
        }
        let user = entry.user_id;
        let recorded = state.append(entry);
        state.refresh_cached_balance(user);
        Ok(recorded)
    }

    async fn withdraw(
        &self,
        user: ProfileId,
        amount: Decimal,
    ) -> Result<LedgerEntry, WithdrawalError> {
        let entry = NewLedgerEntry::withdrawal(user, amount)?;
        let mut state = self.state.lock().await;
        if !state.profiles.contains_key(&user) {
            return Err(RepositoryError::NotFound.into());
        }
        Balance::of(state.entries_of(user)).check_withdrawal(amount)?;

        let recorded = state.append(entry);
        state.refresh_cached_balance(user);
        Ok(recorded)
    }

    async fn list_by_user(&self, user: ProfileId) -> Result<Vec<LedgerEntry>, RepositoryError> {
        let state = self.state.lock().await;
        let entries = state.entries_of(user).cloned().collect();
        Ok(newest_first(entries, |e| (e.created_at, e.id)))
    }

    async fn balance(&self, user: ProfileId) -> Result<Balance, RepositoryError> {
        Ok(Balance::of(self.state.lock().await.entries_of(user)))
    }

    async fn reconcile(&self, user: ProfileId) -> Result<Reconciliation, RepositoryError> {
        let mut state = self.state.lock().await;
        let cached = state
            .profiles
            .get(&user)
            .map(|p| p.wallet_balance)
            .ok_or(RepositoryError::NotFound)?;
        let balance = state.refresh_cached_balance(user);
        Ok(Reconciliation {
            cached,
            ledger: balance.current,
        })
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn list_active(&self, category: Option<&str>) -> Result<Vec<Product>, RepositoryError> {
        let state = self.state.lock().await;
        let products = state
            .products
            .values()
            .filter(|p| p.is_active && category.is_none_or(|c| p.category == c))
            .cloned()
            .collect();
        Ok(newest_first(products, |p| (p.created_at, p.id)))
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.state.lock().await.products.get(&id).cloned())
    }

    async fn insert(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let mut state = self.state.lock().await;
        let id = ProductId::new(state.next_id());
        let created = Product {
            id,
            title: product.title,
            description: product.description,
            price: product.price,
            category: product.category,
            image_url: product.image_url,
            storage_path: product.storage_path,
            owner: product.owner,
            is_active: true,
            created_at: Utc::now(),
        };
        state.products.insert(id, created.clone());
        Ok(created)
    }

    async fn update(&self, product: &Product) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        let stored = state
            .products
            .get_mut(&product.id)
            .ok_or(RepositoryError::NotFound)?;
        stored.title.clone_from(&product.title);
        stored.description.clone_from(&product.description);
        stored.price = product.price;
        stored.category.clone_from(&product.category);
        stored.image_url.clone_from(&product.image_url);
        Ok(())
    }

    async fn deactivate(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock().await;
        Ok(match state.products.get_mut(&id) {
            Some(product) if product.is_active => {
                product.is_active = false;
                true
            }
            _ => false,
        })
    }

    async fn count_active(&self) -> Result<i64, RepositoryError> {
        let state = self.state.lock().await;
        let count = state.products.values().filter(|p| p.is_active).count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn list(&self, user: ProfileId) -> Result<Vec<CartLine>, RepositoryError> {
        let state = self.state.lock().await;
        state
            .cart
            .values()
            .filter(|item| item.user_id == user)
            .map(|item| {
                let product = state
                    .products
                    .get(&item.product_id)
                    .ok_or_else(|| RepositoryError::DataCorruption("dangling cart item".into()))?;
                Ok(CartLine {
                    item: item.clone(),
                    title: product.title.clone(),
                    price: product.price,
                    image_url: product.image_url.clone(),
                })
            })
            .collect()
    }

    async fn add(
        &self,
        user: ProfileId,
        product: ProductId,
        quantity: u32,
    ) -> Result<CartItem, RepositoryError> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state
            .cart
            .values_mut()
            .find(|item| item.user_id == user && item.product_id == product)
        {
            existing.quantity = existing.quantity.saturating_add(quantity);
            return Ok(existing.clone());
        }

        let id = CartItemId::new(state.next_id());
        let item = CartItem {
            id,
            user_id: user,
            product_id: product,
            quantity,
            created_at: Utc::now(),
        };
        state.cart.insert(id, item.clone());
        Ok(item)
    }

    async fn remove(&self, user: ProfileId, item: CartItemId) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock().await;
        match state.cart.get(&item) {
            Some(existing) if existing.user_id == user => {
                state.cart.remove(&item);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use atelier_core::ledger::LedgerError;
    use atelier_core::{Email, Money, TransactionStatus};
    use uuid::Uuid;

    use super::*;

    async fn designer(store: &MemoryStore) -> ProfileId {
        let id = ProfileId::new(Uuid::new_v4());
        ProfileStore::insert(
            store,
            NewProfile {
                id,
                name: "Designer".into(),
                email: Email::parse("designer@example.com").unwrap(),
                role: Role::Designer,
            },
        )
        .await
        .unwrap();
        id
    }

    #[tokio::test]
    async fn test_withdrawal_keeps_current_and_reserves_available() {
        let store = MemoryStore::default();
        let id = designer(&store).await;
        store
            .record(NewLedgerEntry::earning(id, Money::from_cents(10_000).unwrap(), None).unwrap())
            .await
            .unwrap();
        store.withdraw(id, Decimal::new(3000, 2)).await.unwrap();

        let balance = LedgerStore::balance(&store, id).await.unwrap();
        assert_eq!(balance.current, Decimal::new(10_000, 2));
        assert_eq!(balance.available, Decimal::new(7000, 2));

        let err = store.withdraw(id, Decimal::new(15_000, 2)).await.unwrap_err();
        assert!(matches!(
            err,
            WithdrawalError::Rejected(LedgerError::InsufficientBalance { .. })
        ));

        let entry = store.withdraw(id, Decimal::new(5000, 2)).await.unwrap();
        assert_eq!(entry.amount, Decimal::new(-5000, 2));
        assert_eq!(entry.status, TransactionStatus::Pending);
    }

    #[tokio::test]
    async fn test_concurrent_withdrawals_yield_one_success() {
        let store = Arc::new(MemoryStore::default());
        let id = designer(&store).await;
        store
            .record(NewLedgerEntry::earning(id, Money::from_cents(10_000).unwrap(), None).unwrap())
            .await
            .unwrap();

        let amount = Decimal::new(6000, 2);
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.withdraw(id, amount).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn test_reconcile_repairs_drift() {
        let store = MemoryStore::default();
        let id = designer(&store).await;
        store
            .record(NewLedgerEntry::earning(id, Money::from_cents(2500).unwrap(), None).unwrap())
            .await
            .unwrap();
        store.set_cached_balance(id, Decimal::ZERO).await;

        let result = store.reconcile(id).await.unwrap();
        assert!(result.drifted());
        assert_eq!(result.ledger, Decimal::new(2500, 2));
        let profile = ProfileStore::get(&store, id).await.unwrap().unwrap();
        assert_eq!(profile.wallet_balance, Decimal::new(2500, 2));
    }

    #[tokio::test]
    async fn test_cart_add_increments_and_remove_is_scoped() {
        let store = MemoryStore::default();
        let owner = designer(&store).await;
        let product = ProductStore::insert(
            &store,
            NewProduct::new(owner, Some("Tee"), Some(Money::ZERO), None).unwrap(),
        )
        .await
        .unwrap();

        let first = store.add(owner, product.id, 1).await.unwrap();
        let second = store.add(owner, product.id, 2).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.quantity, 3);

        let stranger = ProfileId::new(Uuid::new_v4());
        assert!(!store.remove(stranger, first.id).await.unwrap());
        assert!(store.remove(owner, first.id).await.unwrap());
        assert!(store.list(owner).await.unwrap().is_empty());
    }
}
