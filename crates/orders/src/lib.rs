//! `demoshop-orders` — order aggregate and status state machine.

pub mod order;

pub use order::{Order, OrderItem, OrderStatus};
