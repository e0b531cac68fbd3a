//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Callers distinguish failures by variant (kind), never by message text.
/// Not-found is split per entity so the orchestration layer can report
/// "product not found" and "cart not found" as different outcomes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The requested product does not exist.
    #[error("product not found")]
    ProductNotFound,

    /// The requested cart does not exist.
    #[error("cart not found")]
    CartNotFound,

    /// The requested order does not exist.
    #[error("order not found")]
    OrderNotFound,

    /// The requested line item does not exist in the cart.
    #[error("item not found in cart")]
    ItemNotFound,

    /// A stock decrement would go below zero (only when enforcement is on).
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u32, available: u32 },

    /// An order cannot be created from a cart with no items.
    #[error("cart is empty")]
    EmptyCart,

    /// An order status transition that the state machine forbids.
    #[error("invalid order status transition: cannot {action} a {status} order")]
    InvalidStatusTransition {
        status: &'static str,
        action: &'static str,
    },

    /// A value failed validation (e.g. zero quantity, malformed id).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The backing store itself failed (e.g. poisoned lock). Distinct from
    /// not-found so callers can tell "missing" from "unavailable".
    #[error("storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn insufficient_stock(requested: u32, available: u32) -> Self {
        Self::InsufficientStock {
            requested,
            available,
        }
    }

    pub fn invalid_transition(status: &'static str, action: &'static str) -> Self {
        Self::InvalidStatusTransition { status, action }
    }

    /// True for the per-entity not-found variants.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ProductNotFound | Self::CartNotFound | Self::OrderNotFound | Self::ItemNotFound
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_variants_are_distinguishable() {
        assert!(DomainError::ProductNotFound.is_not_found());
        assert!(DomainError::CartNotFound.is_not_found());
        assert_ne!(DomainError::ProductNotFound, DomainError::CartNotFound);
        assert!(!DomainError::EmptyCart.is_not_found());
        assert!(!DomainError::storage("lock poisoned").is_not_found());
    }

    #[test]
    fn transition_error_carries_kind_not_just_text() {
        let err = DomainError::invalid_transition("completed", "fail");
        match err {
            DomainError::InvalidStatusTransition { status, action } => {
                assert_eq!(status, "completed");
                assert_eq!(action, "fail");
            }
            _ => panic!("expected InvalidStatusTransition"),
        }
    }
}
