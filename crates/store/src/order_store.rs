//! Order repository.

use std::collections::HashMap;
use std::sync::RwLock;

use demoshop_core::{DomainError, DomainResult, OrderId};
use demoshop_orders::Order;

use crate::{read_lock, write_lock};

/// Order store contract consumed by the orchestration layer.
///
/// Iteration order of `get_all` is unspecified; callers must not rely on it.
pub trait OrderRepository: Send + Sync {
    fn get_all(&self) -> DomainResult<Vec<Order>>;

    fn get_by_id(&self, id: OrderId) -> DomainResult<Order>;

    /// Idempotent insert: always upserts, regardless of prior existence.
    fn create(&self, order: Order) -> DomainResult<()>;

    /// Replace an existing order. Fails `OrderNotFound` if absent.
    fn update(&self, order: Order) -> DomainResult<()>;

    fn delete(&self, id: OrderId) -> DomainResult<()>;
}

/// In-memory order store. One lock covers all operations.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderRepository for InMemoryOrderStore {
    fn get_all(&self) -> DomainResult<Vec<Order>> {
        let orders = read_lock(&self.orders)?;
        Ok(orders.values().cloned().collect())
    }

    fn get_by_id(&self, id: OrderId) -> DomainResult<Order> {
        let orders = read_lock(&self.orders)?;
        orders.get(&id).cloned().ok_or(DomainError::OrderNotFound)
    }

    fn create(&self, order: Order) -> DomainResult<()> {
        let mut orders = write_lock(&self.orders)?;
        orders.insert(order.id, order);
        Ok(())
    }

    fn update(&self, order: Order) -> DomainResult<()> {
        let mut orders = write_lock(&self.orders)?;
        if !orders.contains_key(&order.id) {
            return Err(DomainError::OrderNotFound);
        }
        orders.insert(order.id, order);
        Ok(())
    }

    fn delete(&self, id: OrderId) -> DomainResult<()> {
        let mut orders = write_lock(&self.orders)?;
        if orders.remove(&id).is_none() {
            return Err(DomainError::OrderNotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use demoshop_cart::Cart;
    use demoshop_catalog::{Product, StockPolicy};
    use demoshop_core::CartId;

    fn pending_order() -> Order {
        let mut cart = Cart::new(CartId::new());
        let p = Product::new("Speaker", "test", 12_000, "/images/speaker.svg", 15);
        cart.add_item(&p, 1, StockPolicy::Enforced).unwrap();
        Order::from_cart(&cart).unwrap()
    }

    #[test]
    fn create_then_get_round_trips() {
        let store = InMemoryOrderStore::new();
        let order = pending_order();
        store.create(order.clone()).unwrap();

        let fetched = store.get_by_id(order.id).unwrap();
        assert_eq!(fetched, order);
    }

    #[test]
    fn get_missing_fails() {
        let store = InMemoryOrderStore::new();
        assert_eq!(
            store.get_by_id(OrderId::new()).unwrap_err(),
            DomainError::OrderNotFound
        );
    }

    #[test]
    fn update_replaces_existing_only() {
        let store = InMemoryOrderStore::new();
        let mut order = pending_order();

        assert_eq!(
            store.update(order.clone()).unwrap_err(),
            DomainError::OrderNotFound
        );

        store.create(order.clone()).unwrap();
        order.complete().unwrap();
        store.update(order.clone()).unwrap();

        assert!(store.get_by_id(order.id).unwrap().is_completed());
    }

    #[test]
    fn get_all_returns_snapshot() {
        let store = InMemoryOrderStore::new();
        store.create(pending_order()).unwrap();
        store.create(pending_order()).unwrap();

        let all = store.get_all().unwrap();
        assert_eq!(all.len(), 2);

        store.create(pending_order()).unwrap();
        // Previously taken snapshot is unaffected.
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn delete_missing_fails() {
        let store = InMemoryOrderStore::new();
        assert_eq!(
            store.delete(OrderId::new()).unwrap_err(),
            DomainError::OrderNotFound
        );
    }
}
