//! `demoshop-checkout` — orchestration services and asynchronous settlement.
//!
//! Composes the entity stores into the operations the (external) HTTP layer
//! calls: cart mutation, order placement, catalog management. Order placement
//! hands the order to a settlement worker that resolves its terminal outcome
//! after a simulated payment delay.

pub mod cart_service;
pub mod config;
pub mod order_service;
pub mod product_service;
pub mod settlement;

pub use cart_service::CartService;
pub use config::{CheckoutConfig, SettlementConfig};
pub use order_service::OrderService;
pub use product_service::ProductService;
pub use settlement::{
    SettlementOutcome, SettlementQueue, SettlementResolution, SettlementStats, SettlementTask,
    SettlementWorker, SettlementWorkerHandle,
};
