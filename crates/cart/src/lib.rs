//! `demoshop-cart` — shopping cart aggregate.

pub mod cart;

pub use cart::{Cart, CartItem};
