//! Product repository.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::info;

use demoshop_catalog::{Product, StockPolicy};
use demoshop_core::{DomainError, DomainResult, ProductId};

use crate::{read_lock, write_lock};

/// Product store contract consumed by the orchestration layer.
///
/// Iteration order of `get_all` is unspecified; callers must not rely on it.
pub trait ProductRepository: Send + Sync {
    /// Snapshot of every product currently in the store.
    fn get_all(&self) -> DomainResult<Vec<Product>>;

    fn get_by_id(&self, id: ProductId) -> DomainResult<Product>;

    /// Idempotent insert: always upserts, regardless of prior existence.
    fn create(&self, product: Product) -> DomainResult<()>;

    /// Replace an existing product. Fails `ProductNotFound` if absent.
    fn update(&self, product: Product) -> DomainResult<()>;

    fn delete(&self, id: ProductId) -> DomainResult<()>;

    /// Stock mutators wrap the entity's own invariant-checked mutator inside
    /// the store lock and return the updated snapshot.
    fn update_stock(&self, id: ProductId, new_stock: u32) -> DomainResult<Product>;
    fn decrease_stock(&self, id: ProductId, quantity: u32) -> DomainResult<Product>;
    fn increase_stock(&self, id: ProductId, quantity: u32) -> DomainResult<Product>;

    /// The stock enforcement policy this store applies to decrements.
    fn stock_policy(&self) -> StockPolicy;
}

/// In-memory product store. One lock covers all operations.
#[derive(Debug)]
pub struct InMemoryProductStore {
    products: RwLock<HashMap<ProductId, Product>>,
    policy: StockPolicy,
}

impl InMemoryProductStore {
    pub fn new(policy: StockPolicy) -> Self {
        Self {
            products: RwLock::new(HashMap::new()),
            policy,
        }
    }

    /// Seed the six-product demo catalog. One product is deliberately out of
    /// stock so the UI has something to show for it.
    pub fn seed_demo_catalog(&self) -> DomainResult<Vec<Product>> {
        let seeded = vec![
            Product::new(
                "Wireless Headphones",
                "Noise-cancelling over-ear wireless headphones",
                25_000,
                "/images/headphones.svg",
                10,
            ),
            Product::new(
                "Smartwatch",
                "Latest smartwatch with fitness tracking",
                35_000,
                "/images/smartwatch.svg",
                5,
            ),
            Product::new(
                "Portable Speaker",
                "Waterproof high-fidelity Bluetooth speaker",
                12_000,
                "/images/speaker.svg",
                15,
            ),
            Product::new(
                "Wireless Keyboard",
                "Ergonomic wireless keyboard",
                8_500,
                "/images/keyboard.svg",
                20,
            ),
            Product::new(
                "4K Webcam",
                "High-resolution webcam for remote work",
                15_000,
                "/images/webcam.svg",
                8,
            ),
            Product::new(
                "USB-C Hub",
                "Seven-port multifunction USB-C hub",
                6_500,
                "/images/usb-hub.svg",
                0,
            ),
        ];

        let mut products = write_lock(&self.products)?;
        for product in &seeded {
            products.insert(product.id, product.clone());
        }
        info!(count = seeded.len(), "seeded demo catalog");
        Ok(seeded)
    }

    fn with_product<F>(&self, id: ProductId, f: F) -> DomainResult<Product>
    where
        F: FnOnce(&mut Product) -> DomainResult<()>,
    {
        let mut products = write_lock(&self.products)?;
        let product = products.get_mut(&id).ok_or(DomainError::ProductNotFound)?;
        f(product)?;
        Ok(product.clone())
    }
}

impl Default for InMemoryProductStore {
    fn default() -> Self {
        Self::new(StockPolicy::default())
    }
}

impl ProductRepository for InMemoryProductStore {
    fn get_all(&self) -> DomainResult<Vec<Product>> {
        let products = read_lock(&self.products)?;
        Ok(products.values().cloned().collect())
    }

    fn get_by_id(&self, id: ProductId) -> DomainResult<Product> {
        let products = read_lock(&self.products)?;
        products
            .get(&id)
            .cloned()
            .ok_or(DomainError::ProductNotFound)
    }

    fn create(&self, product: Product) -> DomainResult<()> {
        let mut products = write_lock(&self.products)?;
        products.insert(product.id, product);
        Ok(())
    }

    fn update(&self, product: Product) -> DomainResult<()> {
        let mut products = write_lock(&self.products)?;
        if !products.contains_key(&product.id) {
            return Err(DomainError::ProductNotFound);
        }
        products.insert(product.id, product);
        Ok(())
    }

    fn delete(&self, id: ProductId) -> DomainResult<()> {
        let mut products = write_lock(&self.products)?;
        if products.remove(&id).is_none() {
            return Err(DomainError::ProductNotFound);
        }
        Ok(())
    }

    fn update_stock(&self, id: ProductId, new_stock: u32) -> DomainResult<Product> {
        self.with_product(id, |p| {
            p.update_stock(new_stock);
            Ok(())
        })
    }

    fn decrease_stock(&self, id: ProductId, quantity: u32) -> DomainResult<Product> {
        let policy = self.policy;
        self.with_product(id, |p| p.decrease_stock(quantity, policy))
    }

    fn increase_stock(&self, id: ProductId, quantity: u32) -> DomainResult<Product> {
        self.with_product(id, |p| {
            p.increase_stock(quantity);
            Ok(())
        })
    }

    fn stock_policy(&self) -> StockPolicy {
        self.policy
    }
}
