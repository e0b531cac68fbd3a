use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use demoshop_cart::Cart;
use demoshop_core::{DomainError, DomainResult, OrderId, OrderItemId, ProductId};

/// Order status lifecycle.
///
/// `Pending` is the only non-terminal state. `complete` and `fail` leave
/// `Pending` only; `cancel` is additionally legal from `Failed` and is
/// idempotent from `Canceled`. Nothing ever leaves `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
    Failed,
    Canceled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Failed => "failed",
            OrderStatus::Canceled => "canceled",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line in an order.
///
/// `unit_price` is captured at order creation and never changes afterwards,
/// unlike the cart line's product snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub quantity: u32,
    /// Unit price in smallest currency unit, frozen at order creation.
    pub unit_price: u64,
    pub created_at: DateTime<Utc>,
}

/// Order aggregate. Owns its items exclusively; independent of the cart it
/// was created from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub items: Vec<OrderItem>,
    /// Copied verbatim from the source cart, never recomputed.
    pub total_amount: u64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Snapshot a cart into a new `Pending` order.
    ///
    /// Fails with `EmptyCart` if the cart has no items. The source cart is
    /// not modified here; clearing it is the orchestration layer's business.
    pub fn from_cart(cart: &Cart) -> DomainResult<Self> {
        if cart.is_empty() {
            return Err(DomainError::EmptyCart);
        }

        let now = Utc::now();
        let items = cart
            .items
            .iter()
            .map(|cart_item| OrderItem {
                id: OrderItemId::new(),
                product_id: cart_item.product_id,
                quantity: cart_item.quantity,
                unit_price: cart_item.product.price,
                created_at: now,
            })
            .collect();

        Ok(Self {
            id: OrderId::new(),
            items,
            total_amount: cart.total_amount,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    /// Settle the order successfully. Legal only from `Pending`.
    pub fn complete(&mut self) -> DomainResult<()> {
        if self.status != OrderStatus::Pending {
            return Err(DomainError::invalid_transition(self.status.as_str(), "complete"));
        }
        self.status = OrderStatus::Completed;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Settle the order as failed. Legal only from `Pending`.
    pub fn fail(&mut self) -> DomainResult<()> {
        if self.status != OrderStatus::Pending {
            return Err(DomainError::invalid_transition(self.status.as_str(), "fail"));
        }
        self.status = OrderStatus::Failed;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Cancel the order. Legal from `Pending` and `Failed`, idempotent from
    /// `Canceled`, never legal from `Completed`.
    pub fn cancel(&mut self) -> DomainResult<()> {
        if self.status == OrderStatus::Completed {
            return Err(DomainError::invalid_transition(self.status.as_str(), "cancel"));
        }
        self.status = OrderStatus::Canceled;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Sum of all line quantities.
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    pub fn is_completed(&self) -> bool {
        self.status == OrderStatus::Completed
    }

    pub fn is_failed(&self) -> bool {
        self.status == OrderStatus::Failed
    }

    pub fn is_canceled(&self) -> bool {
        self.status == OrderStatus::Canceled
    }
}
