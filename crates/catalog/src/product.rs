use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use demoshop_core::{DomainError, DomainResult, ProductId};

/// Stock decrement enforcement policy.
///
/// Demo deployments run `Permissive` so shoppers can keep ordering past the
/// seeded stock; `Enforced` gives the strict behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockPolicy {
    /// Decrements below zero are rejected with `InsufficientStock`.
    Enforced,
    /// Availability checks always pass; decrements saturate at zero.
    Permissive,
}

impl StockPolicy {
    pub fn is_enforced(self) -> bool {
        matches!(self, StockPolicy::Enforced)
    }
}

impl Default for StockPolicy {
    fn default() -> Self {
        StockPolicy::Permissive
    }
}

/// Catalog product.
///
/// Exchanged by value through the stores; field mutation outside the stock
/// mutators below happens only behind a store lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    /// Price in smallest currency unit (e.g., cents). Never floating point.
    pub price: u64,
    pub image_url: String,
    pub stock: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        price: u64,
        image_url: impl Into<String>,
        stock: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ProductId::new(),
            name: name.into(),
            description: description.into(),
            price,
            image_url: image_url.into(),
            stock,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Whether `quantity` units can be taken under the given policy.
    pub fn is_available(&self, quantity: u32, policy: StockPolicy) -> bool {
        if policy.is_enforced() {
            self.stock >= quantity
        } else {
            true
        }
    }

    /// Replace the stock count outright (admin operation).
    pub fn update_stock(&mut self, new_stock: u32) {
        self.stock = new_stock;
        self.updated_at = Utc::now();
    }

    /// Take `quantity` units out of stock.
    ///
    /// Under `Permissive` the count saturates at zero instead of failing.
    pub fn decrease_stock(&mut self, quantity: u32, policy: StockPolicy) -> DomainResult<()> {
        if policy.is_enforced() && self.stock < quantity {
            return Err(DomainError::insufficient_stock(quantity, self.stock));
        }
        self.stock = self.stock.saturating_sub(quantity);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Return `quantity` units to stock (compensation path).
    pub fn increase_stock(&mut self, quantity: u32) {
        self.stock = self.stock.saturating_add(quantity);
        self.updated_at = Utc::now();
    }
}
