//! Order placement and retrieval.

use std::sync::Arc;

use tracing::{info, warn};

use demoshop_core::{CartId, DomainResult, OrderId};
use demoshop_orders::Order;
use demoshop_store::{CartRepository, OrderRepository};

use crate::config::SettlementConfig;
use crate::settlement::{SettlementQueue, SettlementTask};

/// Turns carts into orders and schedules their settlement.
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    carts: Arc<dyn CartRepository>,
    settlement: Arc<SettlementQueue>,
    config: SettlementConfig,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        carts: Arc<dyn CartRepository>,
        settlement: Arc<SettlementQueue>,
        config: SettlementConfig,
    ) -> Self {
        Self {
            orders,
            carts,
            settlement,
            config,
        }
    }

    /// Place an order from the given cart.
    ///
    /// The returned order is `Pending`; its terminal status is decided later
    /// by the settlement worker. Clearing the cart and scheduling settlement
    /// are best-effort: once the order is persisted, placement has succeeded.
    pub fn place_order(&self, cart_id: CartId) -> DomainResult<Order> {
        let cart = self.carts.get_by_id(cart_id)?;
        let order = Order::from_cart(&cart)?;
        self.orders.create(order.clone())?;

        if let Err(err) = self.carts.clear(cart_id) {
            warn!(cart_id = %cart_id, error = %err, "failed to clear cart after placing order");
        }

        let task = SettlementTask::new(order.id, self.config.draw_delay());
        if let Err(err) = self.settlement.enqueue(task) {
            warn!(order_id = %order.id, error = %err, "failed to schedule settlement; order stays pending");
        }

        info!(
            order_id = %order.id,
            cart_id = %cart_id,
            total_amount = order.total_amount,
            items = order.item_count(),
            "order placed"
        );
        Ok(order)
    }

    pub fn get_order(&self, id: OrderId) -> DomainResult<Order> {
        self.orders.get_by_id(id)
    }

    pub fn list_orders(&self) -> DomainResult<Vec<Order>> {
        self.orders.get_all()
    }
}
