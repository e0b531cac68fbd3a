//! Demo driver: seeds the catalog, runs one shopper through the checkout
//! flow, and waits for the settlement worker to resolve the order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use tracing::info;

use demoshop_checkout::{
    CartService, CheckoutConfig, OrderService, ProductService, SettlementQueue, SettlementWorker,
};
use demoshop_core::CartId;
use demoshop_store::{InMemoryCartStore, InMemoryOrderStore, InMemoryProductStore};

fn main() -> Result<()> {
    demoshop_observability::init();

    let config = CheckoutConfig::from_env();
    info!(policy = ?config.stock_policy, "starting demoshop");

    let products = Arc::new(InMemoryProductStore::new(config.stock_policy));
    let carts = Arc::new(InMemoryCartStore::new());
    let orders = Arc::new(InMemoryOrderStore::new());
    let queue = SettlementQueue::arc();

    let product_service = ProductService::new(products.clone());
    let cart_service = CartService::new(carts.clone(), products.clone());
    let order_service = OrderService::new(
        orders.clone(),
        carts.clone(),
        queue.clone(),
        config.settlement.clone(),
    );

    products
        .seed_demo_catalog()
        .context("failed to seed catalog")?;

    let worker = SettlementWorker::new(
        queue,
        orders.clone(),
        products.clone(),
        config.settlement.clone(),
    );
    let handle = worker.spawn();

    // One shopper: two headphones and a speaker, then checkout.
    let catalog = product_service.list_products()?;
    let headphones = catalog
        .iter()
        .find(|p| p.name == "Wireless Headphones")
        .context("missing seeded product")?;
    let speaker = catalog
        .iter()
        .find(|p| p.name == "Portable Speaker")
        .context("missing seeded product")?;

    let cart_id = CartId::new();
    cart_service.add_to_cart(cart_id, headphones.id, 2)?;
    let cart = cart_service.add_to_cart(cart_id, speaker.id, 1)?;
    info!(
        cart_id = %cart.id,
        items = cart.item_count(),
        total_amount = cart.total_amount,
        "cart ready"
    );

    let order = order_service.place_order(cart_id)?;
    info!(order_id = %order.id, status = %order.status, "order placed, awaiting settlement");

    // Poll until the worker resolves the order.
    let deadline = Instant::now()
        + config.settlement.delay_max
        + Duration::from_secs(5);
    let settled = loop {
        let current = order_service.get_order(order.id)?;
        if current.status.is_terminal() {
            break current;
        }
        if Instant::now() > deadline {
            handle.shutdown();
            bail!("order {} did not settle in time", order.id);
        }
        std::thread::sleep(Duration::from_millis(200));
    };

    info!(
        order_id = %settled.id,
        status = %settled.status,
        stats = ?handle.stats(),
        "order settled"
    );

    handle.shutdown();
    Ok(())
}
