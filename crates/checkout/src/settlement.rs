//! Asynchronous order settlement.
//!
//! Placing an order enqueues a `SettlementTask`; a background worker claims
//! tasks once their simulated payment latency has elapsed and resolves each
//! order to `Completed` or `Failed`, restoring stock on failure. The worker's
//! lifetime belongs to process composition, not to any request: callers of
//! `place_order` get a `Pending` order back and observe the outcome only by
//! polling.

use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex, RwLock};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, error, info, warn};

use demoshop_core::{DomainError, DomainResult, OrderId};
use demoshop_store::{OrderRepository, ProductRepository};

use crate::config::SettlementConfig;

/// The payment outcome drawn for an order.
///
/// Pinned to the task the first time it is drawn, so a retried task
/// re-attempts persistence with the same outcome instead of redrawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementResolution {
    Complete,
    Fail,
}

/// A scheduled settlement for one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementTask {
    pub order_id: OrderId,
    /// Persistence attempts already spent on this task.
    pub attempt: u32,
    /// Earliest time the task may run (simulated payment latency / backoff).
    pub not_before: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Outcome drawn on the first run; `None` until then.
    pub resolution: Option<SettlementResolution>,
    /// Whether the compensating stock restoration already ran. Guards the
    /// retry path against restoring the same order twice.
    pub compensated: bool,
}

impl SettlementTask {
    pub fn new(order_id: OrderId, delay: Duration) -> Self {
        let now = Utc::now();
        Self {
            order_id,
            attempt: 0,
            not_before: now + to_chrono(delay),
            created_at: now,
            resolution: None,
            compensated: false,
        }
    }

    pub fn is_ready(&self) -> bool {
        Utc::now() >= self.not_before
    }

    fn rescheduled(mut self, backoff: Duration) -> Self {
        self.attempt += 1;
        self.not_before = Utc::now() + to_chrono(backoff);
        self
    }
}

fn to_chrono(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::zero())
}

/// In-memory settlement queue. At most one task per order.
#[derive(Debug, Default)]
pub struct SettlementQueue {
    tasks: RwLock<HashMap<OrderId, SettlementTask>>,
}

impl SettlementQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn enqueue(&self, task: SettlementTask) -> DomainResult<()> {
        let mut tasks = self
            .tasks
            .write()
            .map_err(|_| DomainError::storage("settlement queue lock poisoned"))?;
        tasks.insert(task.order_id, task);
        Ok(())
    }

    /// Remove and return the oldest ready task, if any.
    pub fn claim_ready(&self) -> DomainResult<Option<SettlementTask>> {
        let mut tasks = self
            .tasks
            .write()
            .map_err(|_| DomainError::storage("settlement queue lock poisoned"))?;

        let next = tasks
            .values()
            .filter(|t| t.is_ready())
            .min_by_key(|t| t.created_at)
            .map(|t| t.order_id);

        Ok(next.and_then(|id| tasks.remove(&id)))
    }

    pub fn len(&self) -> DomainResult<usize> {
        let tasks = self
            .tasks
            .read()
            .map_err(|_| DomainError::storage("settlement queue lock poisoned"))?;
        Ok(tasks.len())
    }

    pub fn is_empty(&self) -> DomainResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// How one settlement task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// Payment succeeded; order is `Completed`.
    Completed,
    /// Payment failed; order is `Failed` and stock was restored.
    Failed,
    /// The order was gone or already terminal; nothing to do.
    Skipped,
}

/// Worker runtime counters. Failures that never reach a caller are still
/// visible here (and in the logs).
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SettlementStats {
    pub settled_completed: u64,
    pub settled_failed: u64,
    pub skipped: u64,
    pub retried: u64,
    pub abandoned: u64,
}

/// Handle to control a running settlement worker.
#[derive(Debug)]
pub struct SettlementWorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
    stats: Arc<Mutex<SettlementStats>>,
}

impl SettlementWorkerHandle {
    /// Request graceful shutdown and wait for the worker to exit.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }

    /// Get current worker statistics.
    pub fn stats(&self) -> SettlementStats {
        self.stats.lock().unwrap().clone()
    }
}

/// Background settlement worker.
///
/// Polls the queue for ready tasks and settles each order: draws the payment
/// outcome, applies the status transition, compensates inventory on failure,
/// and persists the result with a bounded retry.
pub struct SettlementWorker {
    queue: Arc<SettlementQueue>,
    orders: Arc<dyn OrderRepository>,
    products: Arc<dyn ProductRepository>,
    config: SettlementConfig,
}

impl SettlementWorker {
    pub fn new(
        queue: Arc<SettlementQueue>,
        orders: Arc<dyn OrderRepository>,
        products: Arc<dyn ProductRepository>,
        config: SettlementConfig,
    ) -> Self {
        Self {
            queue,
            orders,
            products,
            config,
        }
    }

    /// Spawn the worker in a background thread.
    pub fn spawn(self) -> SettlementWorkerHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let stats = Arc::new(Mutex::new(SettlementStats::default()));
        let stats_clone = stats.clone();

        let join = thread::Builder::new()
            .name("settlement-worker".to_string())
            .spawn(move || {
                worker_loop(self, shutdown_rx, stats_clone);
            })
            .expect("failed to spawn settlement worker thread");

        SettlementWorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
            stats,
        }
    }

    /// Settle a single claimed task (also usable synchronously in tests).
    ///
    /// The drawn resolution and the compensation marker are recorded on the
    /// task as side effects, so a retry of the same task is idempotent: it
    /// re-attempts only the order update, never the draw or the restoration.
    ///
    /// Returns `Err` only when persisting the settled order failed; the
    /// caller decides whether to retry the task.
    pub fn settle_one(&self, task: &mut SettlementTask) -> DomainResult<SettlementOutcome> {
        let mut order = match self.orders.get_by_id(task.order_id) {
            Ok(order) => order,
            Err(DomainError::OrderNotFound) => {
                warn!(order_id = %task.order_id, "settlement skipped: order no longer exists");
                return Ok(SettlementOutcome::Skipped);
            }
            Err(err) => return Err(err),
        };

        if order.status.is_terminal() {
            debug!(order_id = %order.id, status = %order.status, "settlement skipped: order already terminal");
            return Ok(SettlementOutcome::Skipped);
        }

        let resolution = match task.resolution {
            Some(resolution) => resolution,
            None => {
                let drawn = if rand::thread_rng().gen_bool(self.config.success_rate) {
                    SettlementResolution::Complete
                } else {
                    SettlementResolution::Fail
                };
                task.resolution = Some(drawn);
                drawn
            }
        };

        let outcome = match resolution {
            SettlementResolution::Complete => {
                order.complete()?;
                SettlementOutcome::Completed
            }
            SettlementResolution::Fail => {
                order.fail()?;
                if !task.compensated {
                    self.restore_stock(&order);
                    task.compensated = true;
                }
                SettlementOutcome::Failed
            }
        };

        self.orders.update(order.clone())?;
        info!(order_id = %order.id, status = %order.status, "order settled");
        Ok(outcome)
    }

    /// Compensating action: return every ordered quantity to stock.
    ///
    /// Best-effort per item; a product that cannot be restored is logged and
    /// the remaining items are still processed.
    fn restore_stock(&self, order: &demoshop_orders::Order) {
        for item in &order.items {
            if let Err(err) = self.products.increase_stock(item.product_id, item.quantity) {
                error!(
                    order_id = %order.id,
                    product_id = %item.product_id,
                    quantity = item.quantity,
                    error = %err,
                    "failed to restore stock for failed order"
                );
            }
        }
    }
}

fn worker_loop(
    worker: SettlementWorker,
    shutdown_rx: mpsc::Receiver<()>,
    stats: Arc<Mutex<SettlementStats>>,
) {
    info!("settlement worker started");

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match worker.queue.claim_ready() {
            Ok(Some(mut task)) => match worker.settle_one(&mut task) {
                Ok(outcome) => {
                    let mut s = stats.lock().unwrap();
                    match outcome {
                        SettlementOutcome::Completed => s.settled_completed += 1,
                        SettlementOutcome::Failed => s.settled_failed += 1,
                        SettlementOutcome::Skipped => s.skipped += 1,
                    }
                }
                Err(err) => {
                    // Persistence failed after the outcome was drawn. Retry
                    // with backoff up to the attempt cap; the placing caller
                    // is never told either way.
                    let order_id = task.order_id;
                    let attempts = task.attempt + 1;
                    if attempts < worker.config.max_update_attempts {
                        warn!(
                            order_id = %order_id,
                            attempt = attempts,
                            error = %err,
                            "settlement persistence failed, retrying"
                        );
                        let retry = task.rescheduled(worker.config.retry_backoff);
                        if worker.queue.enqueue(retry).is_ok() {
                            stats.lock().unwrap().retried += 1;
                            continue;
                        }
                    }
                    error!(
                        order_id = %order_id,
                        attempts,
                        error = %err,
                        "settlement abandoned; order may stay pending"
                    );
                    stats.lock().unwrap().abandoned += 1;
                }
            },
            Ok(None) => thread::sleep(worker.config.poll_interval),
            Err(err) => {
                error!(error = %err, "failed to claim settlement task");
                thread::sleep(worker.config.poll_interval);
            }
        }
    }

    info!("settlement worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicU32, Ordering};

    use demoshop_cart::Cart;
    use demoshop_catalog::{Product, StockPolicy};
    use demoshop_core::CartId;
    use demoshop_orders::{Order, OrderStatus};
    use demoshop_store::{InMemoryOrderStore, InMemoryProductStore};

    /// Order store that fails a configured number of `update` calls before
    /// behaving normally.
    struct FlakyOrderStore {
        inner: InMemoryOrderStore,
        update_failures_left: AtomicU32,
    }

    impl FlakyOrderStore {
        fn failing_updates(count: u32) -> Self {
            Self {
                inner: InMemoryOrderStore::new(),
                update_failures_left: AtomicU32::new(count),
            }
        }
    }

    impl OrderRepository for FlakyOrderStore {
        fn get_all(&self) -> DomainResult<Vec<Order>> {
            self.inner.get_all()
        }

        fn get_by_id(&self, id: OrderId) -> DomainResult<Order> {
            self.inner.get_by_id(id)
        }

        fn create(&self, order: Order) -> DomainResult<()> {
            self.inner.create(order)
        }

        fn update(&self, order: Order) -> DomainResult<()> {
            let left = self.update_failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.update_failures_left.store(left - 1, Ordering::SeqCst);
                return Err(DomainError::storage("transient update failure"));
            }
            self.inner.update(order)
        }

        fn delete(&self, id: OrderId) -> DomainResult<()> {
            self.inner.delete(id)
        }
    }

    fn immediate_config(success_rate: f64) -> SettlementConfig {
        SettlementConfig {
            delay_min: Duration::ZERO,
            delay_max: Duration::ZERO,
            success_rate,
            poll_interval: Duration::from_millis(5),
            retry_backoff: Duration::ZERO,
            ..Default::default()
        }
    }

    fn worker_fixture(
        success_rate: f64,
    ) -> (
        SettlementWorker,
        Arc<SettlementQueue>,
        Arc<InMemoryOrderStore>,
        Arc<InMemoryProductStore>,
    ) {
        let queue = SettlementQueue::arc();
        let orders = Arc::new(InMemoryOrderStore::new());
        let products = Arc::new(InMemoryProductStore::new(StockPolicy::Permissive));
        let worker = SettlementWorker::new(
            queue.clone(),
            orders.clone(),
            products.clone(),
            immediate_config(success_rate),
        );
        (worker, queue, orders, products)
    }

    fn place_test_order(
        orders: &dyn OrderRepository,
        products: &InMemoryProductStore,
        quantity: u32,
    ) -> (Order, Product) {
        let product = Product::new("Speaker", "test", 12_000, "/images/speaker.svg", 10);
        products.create(product.clone()).unwrap();

        let mut cart = Cart::new(CartId::new());
        cart.add_item(&product, quantity, StockPolicy::Permissive)
            .unwrap();
        let order = Order::from_cart(&cart).unwrap();
        orders.create(order.clone()).unwrap();
        (order, product)
    }

    #[test]
    fn queue_claims_only_ready_tasks_fifo() {
        let queue = SettlementQueue::new();
        let later = SettlementTask::new(OrderId::new(), Duration::from_secs(3600));
        let now_a = SettlementTask::new(OrderId::new(), Duration::ZERO);
        let now_b = SettlementTask::new(OrderId::new(), Duration::ZERO);

        queue.enqueue(later.clone()).unwrap();
        queue.enqueue(now_a.clone()).unwrap();
        queue.enqueue(now_b.clone()).unwrap();
        assert_eq!(queue.len().unwrap(), 3);

        let first = queue.claim_ready().unwrap().unwrap();
        assert_eq!(first.order_id, now_a.order_id);
        let second = queue.claim_ready().unwrap().unwrap();
        assert_eq!(second.order_id, now_b.order_id);

        // The delayed task is not ready yet.
        assert!(queue.claim_ready().unwrap().is_none());
        assert_eq!(queue.len().unwrap(), 1);
    }

    #[test]
    fn successful_settlement_completes_order() {
        let (worker, _, orders, products) = worker_fixture(1.0);
        let (order, _) = place_test_order(orders.as_ref(), &products, 2);

        let mut task = SettlementTask::new(order.id, Duration::ZERO);
        let outcome = worker.settle_one(&mut task).unwrap();

        assert_eq!(outcome, SettlementOutcome::Completed);
        assert_eq!(task.resolution, Some(SettlementResolution::Complete));
        assert_eq!(orders.get_by_id(order.id).unwrap().status, OrderStatus::Completed);
    }

    #[test]
    fn failed_settlement_restores_stock() {
        let (worker, _, orders, products) = worker_fixture(0.0);
        let (order, product) = place_test_order(orders.as_ref(), &products, 3);

        let mut task = SettlementTask::new(order.id, Duration::ZERO);
        let outcome = worker.settle_one(&mut task).unwrap();

        assert_eq!(outcome, SettlementOutcome::Failed);
        assert!(task.compensated);
        assert_eq!(orders.get_by_id(order.id).unwrap().status, OrderStatus::Failed);
        // 10 seeded + 3 restored.
        assert_eq!(products.get_by_id(product.id).unwrap().stock, 13);
    }

    #[test]
    fn retried_task_does_not_restore_stock_twice() {
        let queue = SettlementQueue::arc();
        let orders = Arc::new(FlakyOrderStore::failing_updates(1));
        let products = Arc::new(InMemoryProductStore::new(StockPolicy::Permissive));
        let worker = SettlementWorker::new(
            queue,
            orders.clone(),
            products.clone(),
            immediate_config(0.0),
        );
        let (order, product) = place_test_order(orders.as_ref(), &products, 3);

        // First run: draws Fail, restores stock, then the update fails.
        let mut task = SettlementTask::new(order.id, Duration::ZERO);
        let err = worker.settle_one(&mut task).unwrap_err();
        assert_eq!(err, DomainError::storage("transient update failure"));
        assert_eq!(task.resolution, Some(SettlementResolution::Fail));
        assert!(task.compensated);
        assert_eq!(products.get_by_id(product.id).unwrap().stock, 13);
        assert!(orders.get_by_id(order.id).unwrap().is_pending());

        // Retry re-attempts persistence only: stock stays at one restoration.
        let outcome = worker.settle_one(&mut task).unwrap();
        assert_eq!(outcome, SettlementOutcome::Failed);
        assert_eq!(products.get_by_id(product.id).unwrap().stock, 13);
        assert_eq!(orders.get_by_id(order.id).unwrap().status, OrderStatus::Failed);
    }

    #[test]
    fn retried_task_keeps_its_drawn_resolution() {
        let queue = SettlementQueue::arc();
        let orders = Arc::new(FlakyOrderStore::failing_updates(1));
        let products = Arc::new(InMemoryProductStore::new(StockPolicy::Permissive));
        let failing = SettlementWorker::new(
            queue.clone(),
            orders.clone(),
            products.clone(),
            immediate_config(0.0),
        );
        let (order, _) = place_test_order(orders.as_ref(), &products, 1);

        let mut task = SettlementTask::new(order.id, Duration::ZERO);
        failing.settle_one(&mut task).unwrap_err();
        assert_eq!(task.resolution, Some(SettlementResolution::Fail));

        // Even a worker that would always draw success must honor the pinned
        // resolution on retry.
        let always_succeeds = SettlementWorker::new(
            queue,
            orders.clone(),
            products,
            immediate_config(1.0),
        );
        let outcome = always_succeeds.settle_one(&mut task).unwrap();
        assert_eq!(outcome, SettlementOutcome::Failed);
        assert_eq!(orders.get_by_id(order.id).unwrap().status, OrderStatus::Failed);
    }

    #[test]
    fn worker_retries_transient_update_failure_once() {
        let queue = SettlementQueue::arc();
        let orders = Arc::new(FlakyOrderStore::failing_updates(1));
        let products = Arc::new(InMemoryProductStore::new(StockPolicy::Permissive));
        let worker = SettlementWorker::new(
            queue.clone(),
            orders.clone(),
            products.clone(),
            immediate_config(0.0),
        );
        let (order, product) = place_test_order(orders.as_ref(), &products, 3);
        queue
            .enqueue(SettlementTask::new(order.id, Duration::ZERO))
            .unwrap();

        let handle = worker.spawn();

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        loop {
            if orders.get_by_id(order.id).unwrap().status.is_terminal() {
                break;
            }
            assert!(std::time::Instant::now() < deadline, "order never settled");
            thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(orders.get_by_id(order.id).unwrap().status, OrderStatus::Failed);
        // Exactly one restoration across both attempts.
        assert_eq!(products.get_by_id(product.id).unwrap().stock, 13);

        let stats = handle.stats();
        assert_eq!(stats.retried, 1);
        assert_eq!(stats.settled_failed, 1);
        assert_eq!(stats.abandoned, 0);
        handle.shutdown();
    }

    #[test]
    fn terminal_order_is_skipped() {
        let (worker, _, orders, products) = worker_fixture(1.0);
        let (mut order, _) = place_test_order(orders.as_ref(), &products, 1);
        order.cancel().unwrap();
        orders.update(order.clone()).unwrap();

        let mut task = SettlementTask::new(order.id, Duration::ZERO);
        let outcome = worker.settle_one(&mut task).unwrap();

        assert_eq!(outcome, SettlementOutcome::Skipped);
        assert_eq!(orders.get_by_id(order.id).unwrap().status, OrderStatus::Canceled);
    }

    #[test]
    fn missing_order_is_skipped() {
        let (worker, _, _, _) = worker_fixture(1.0);
        let mut task = SettlementTask::new(OrderId::new(), Duration::ZERO);
        assert_eq!(worker.settle_one(&mut task).unwrap(), SettlementOutcome::Skipped);
    }

    #[test]
    fn spawned_worker_settles_and_shuts_down() {
        let (worker, queue, orders, products) = worker_fixture(1.0);
        let (order, _) = place_test_order(orders.as_ref(), &products, 1);
        queue
            .enqueue(SettlementTask::new(order.id, Duration::ZERO))
            .unwrap();

        let handle = worker.spawn();

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        loop {
            if orders.get_by_id(order.id).unwrap().status.is_terminal() {
                break;
            }
            assert!(std::time::Instant::now() < deadline, "order never settled");
            thread::sleep(Duration::from_millis(5));
        }

        let stats = handle.stats();
        assert_eq!(stats.settled_completed, 1);
        handle.shutdown();
    }
}
