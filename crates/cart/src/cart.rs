use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use demoshop_catalog::{Product, StockPolicy};
use demoshop_core::{CartId, CartItemId, DomainError, DomainResult, ProductId};

/// One line in a cart.
///
/// Holds a value snapshot of the product, refreshed whenever the same product
/// is added again. The snapshot's price is what the cart total is computed
/// from; the order captures its own price copy at placement time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub product: Product,
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartItem {
    fn new(product: Product, quantity: u32) -> Self {
        let now = Utc::now();
        Self {
            id: CartItemId::new(),
            product_id: product.id,
            product,
            quantity,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Shopping cart aggregate. Owns its items exclusively.
///
/// Invariant: after every successful mutation,
/// `total_amount == Σ(item.product.price × item.quantity)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    /// Insertion-ordered; at most one item per product id.
    pub items: Vec<CartItem>,
    pub total_amount: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Create an empty cart with a caller-supplied identity.
    pub fn new(id: CartId) -> Self {
        let now = Utc::now();
        Self {
            id,
            items: Vec::new(),
            total_amount: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Add `quantity` of `product`, merging into an existing line for the
    /// same product id (and refreshing that line's product snapshot).
    pub fn add_item(
        &mut self,
        product: &Product,
        quantity: u32,
        policy: StockPolicy,
    ) -> DomainResult<()> {
        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product.id) {
            let total_quantity = item.quantity.saturating_add(quantity);
            if !product.is_available(total_quantity, policy) {
                return Err(DomainError::insufficient_stock(total_quantity, product.stock));
            }
            item.quantity = total_quantity;
            item.product = product.clone();
            item.updated_at = Utc::now();
        } else {
            if !product.is_available(quantity, policy) {
                return Err(DomainError::insufficient_stock(quantity, product.stock));
            }
            self.items.push(CartItem::new(product.clone(), quantity));
        }
        self.recompute_total();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Set a line's quantity. Zero removes the line.
    pub fn update_item_quantity(
        &mut self,
        item_id: CartItemId,
        quantity: u32,
        policy: StockPolicy,
    ) -> DomainResult<()> {
        if quantity == 0 {
            return self.remove_item(item_id);
        }
        let item = self
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or(DomainError::ItemNotFound)?;
        if !item.product.is_available(quantity, policy) {
            return Err(DomainError::insufficient_stock(quantity, item.product.stock));
        }
        item.quantity = quantity;
        item.updated_at = Utc::now();
        self.recompute_total();
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn remove_item(&mut self, item_id: CartItemId) -> DomainResult<()> {
        let idx = self
            .items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or(DomainError::ItemNotFound)?;
        self.items.remove(idx);
        self.recompute_total();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Empty the cart. Always succeeds.
    pub fn clear(&mut self) {
        self.items.clear();
        self.total_amount = 0;
        self.updated_at = Utc::now();
    }

    /// Sum of all line quantities.
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn recompute_total(&mut self) {
        self.total_amount = self
            .items
            .iter()
            .map(|i| i.product.price * u64::from(i.quantity))
            .sum();
    }
}
