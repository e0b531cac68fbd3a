//! Cart repository.

use std::collections::HashMap;
use std::sync::RwLock;

use demoshop_cart::Cart;
use demoshop_core::{CartId, DomainError, DomainResult};

use crate::{read_lock, write_lock};

/// Cart store contract consumed by the orchestration layer.
pub trait CartRepository: Send + Sync {
    fn get_by_id(&self, id: CartId) -> DomainResult<Cart>;

    /// Return the cart for `id`, creating and storing an empty one if absent.
    /// One critical section; concurrent callers for the same id observe
    /// exactly one created cart.
    fn get_or_create(&self, id: CartId) -> DomainResult<Cart>;

    /// Upsert the cart under its own id.
    fn save(&self, cart: Cart) -> DomainResult<()>;

    fn delete(&self, id: CartId) -> DomainResult<()>;

    /// Empty the stored cart in place. Fails `CartNotFound` if absent.
    fn clear(&self, id: CartId) -> DomainResult<()>;
}

/// In-memory cart store. One lock covers all operations.
#[derive(Debug, Default)]
pub struct InMemoryCartStore {
    carts: RwLock<HashMap<CartId, Cart>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CartRepository for InMemoryCartStore {
    fn get_by_id(&self, id: CartId) -> DomainResult<Cart> {
        let carts = read_lock(&self.carts)?;
        carts.get(&id).cloned().ok_or(DomainError::CartNotFound)
    }

    fn get_or_create(&self, id: CartId) -> DomainResult<Cart> {
        let mut carts = write_lock(&self.carts)?;
        Ok(carts.entry(id).or_insert_with(|| Cart::new(id)).clone())
    }

    fn save(&self, cart: Cart) -> DomainResult<()> {
        let mut carts = write_lock(&self.carts)?;
        carts.insert(cart.id, cart);
        Ok(())
    }

    fn delete(&self, id: CartId) -> DomainResult<()> {
        let mut carts = write_lock(&self.carts)?;
        if carts.remove(&id).is_none() {
            return Err(DomainError::CartNotFound);
        }
        Ok(())
    }

    fn clear(&self, id: CartId) -> DomainResult<()> {
        let mut carts = write_lock(&self.carts)?;
        let cart = carts.get_mut(&id).ok_or(DomainError::CartNotFound)?;
        cart.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    use demoshop_catalog::{Product, StockPolicy};

    #[test]
    fn get_by_id_missing_fails() {
        let store = InMemoryCartStore::new();
        assert_eq!(
            store.get_by_id(CartId::new()).unwrap_err(),
            DomainError::CartNotFound
        );
    }

    #[test]
    fn get_or_create_returns_existing() {
        let store = InMemoryCartStore::new();
        let id = CartId::new();

        let created = store.get_or_create(id).unwrap();
        let fetched = store.get_or_create(id).unwrap();

        assert_eq!(created.id, fetched.id);
        assert_eq!(created.created_at, fetched.created_at);
    }

    #[test]
    fn concurrent_get_or_create_creates_once() {
        let store = Arc::new(InMemoryCartStore::new());
        let id = CartId::new();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.get_or_create(id).unwrap())
            })
            .collect();

        let carts: Vec<Cart> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        // Every caller saw the same single cart.
        let first = &carts[0];
        assert!(carts.iter().all(|c| c.id == first.id));
        assert!(carts.iter().all(|c| c.created_at == first.created_at));

        let stored = read_lock(&store.carts).unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[test]
    fn save_upserts_and_clear_empties_in_place() {
        let store = InMemoryCartStore::new();
        let id = CartId::new();
        let mut cart = Cart::new(id);
        let p = Product::new("Keyboard", "test", 8_500, "/images/keyboard.svg", 20);
        cart.add_item(&p, 2, StockPolicy::Enforced).unwrap();

        store.save(cart).unwrap();
        assert_eq!(store.get_by_id(id).unwrap().item_count(), 2);

        store.clear(id).unwrap();
        let cleared = store.get_by_id(id).unwrap();
        assert!(cleared.is_empty());
        assert_eq!(cleared.total_amount, 0);
    }

    #[test]
    fn clear_and_delete_missing_fail() {
        let store = InMemoryCartStore::new();
        assert_eq!(
            store.clear(CartId::new()).unwrap_err(),
            DomainError::CartNotFound
        );
        assert_eq!(
            store.delete(CartId::new()).unwrap_err(),
            DomainError::CartNotFound
        );
    }
}
