//! `demoshop-store` — repository traits and in-memory implementations.
//!
//! One store per entity type, each guarded by its own reader/writer lock.
//! There are no cross-store transactions. Stores hand out value snapshots;
//! all mutation goes through store methods.

pub mod cart_store;
pub mod order_store;
pub mod product_store;

pub use cart_store::{CartRepository, InMemoryCartStore};
pub use order_store::{InMemoryOrderStore, OrderRepository};
pub use product_store::{InMemoryProductStore, ProductRepository};

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use demoshop_core::{DomainError, DomainResult};

pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> DomainResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| DomainError::storage("store lock poisoned"))
}

pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> DomainResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| DomainError::storage("store lock poisoned"))
}
