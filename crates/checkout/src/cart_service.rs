//! Cart mutation on top of the cart and product stores.

use std::sync::Arc;

use demoshop_cart::Cart;
use demoshop_core::{CartId, CartItemId, DomainError, DomainResult, ProductId};
use demoshop_store::{CartRepository, ProductRepository};

/// Cart operations. Every mutation loads a snapshot, applies the entity
/// method, and saves the result back.
pub struct CartService {
    carts: Arc<dyn CartRepository>,
    products: Arc<dyn ProductRepository>,
}

impl CartService {
    pub fn new(carts: Arc<dyn CartRepository>, products: Arc<dyn ProductRepository>) -> Self {
        Self { carts, products }
    }

    /// Fetch the cart with this id, creating an empty one if absent.
    pub fn get_or_create_cart(&self, cart_id: CartId) -> DomainResult<Cart> {
        self.carts.get_or_create(cart_id)
    }

    /// Add `quantity` of a product to the cart, creating the cart if needed.
    pub fn add_to_cart(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> DomainResult<Cart> {
        if quantity == 0 {
            return Err(DomainError::invalid_input("quantity must be positive"));
        }

        let product = self.products.get_by_id(product_id)?;
        let mut cart = self.carts.get_or_create(cart_id)?;
        cart.add_item(&product, quantity, self.products.stock_policy())?;
        self.carts.save(cart.clone())?;
        Ok(cart)
    }

    /// Set an item's quantity; zero removes the item.
    pub fn update_cart_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: u32,
    ) -> DomainResult<Cart> {
        let mut cart = self.carts.get_by_id(cart_id)?;
        cart.update_item_quantity(item_id, quantity, self.products.stock_policy())?;
        self.carts.save(cart.clone())?;
        Ok(cart)
    }

    pub fn remove_from_cart(&self, cart_id: CartId, item_id: CartItemId) -> DomainResult<Cart> {
        let mut cart = self.carts.get_by_id(cart_id)?;
        cart.remove_item(item_id)?;
        self.carts.save(cart.clone())?;
        Ok(cart)
    }

    /// Empty the cart, keeping its identity.
    pub fn clear_cart(&self, cart_id: CartId) -> DomainResult<Cart> {
        self.carts.clear(cart_id)?;
        self.carts.get_by_id(cart_id)
    }
}
