use std::sync::Arc;

use async_trait::async_trait;

use orderflow_core::OrderId;
use orderflow_inventory::InventoryRecord;
use orderflow_orders::{NewOrder, Order};

/// Storage-level failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Backend unreachable, pool closed, lock poisoned.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// `save` targeted an order that was never inserted.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write rejected by a uniqueness/integrity constraint.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored row could not be mapped back into the domain model.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Order persistence.
///
/// Each call is atomic for the single order it touches: the order row and its
/// lines are written together or not at all.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a new order and assign its identity.
    async fn insert(&self, order: NewOrder) -> Result<Order, StoreError>;

    /// Overwrite the mutable state of an existing order.
    async fn save(&self, order: &Order) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// All orders, ascending by id.
    async fn list_all(&self) -> Result<Vec<Order>, StoreError>;
}

/// Inventory persistence, keyed by product code.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn find_by_product_code(&self, code: &str) -> Result<Option<InventoryRecord>, StoreError>;

    async fn upsert(&self, record: InventoryRecord) -> Result<(), StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    /// All records, ascending by product code.
    async fn list_all(&self) -> Result<Vec<InventoryRecord>, StoreError>;
}

#[async_trait]
impl<S> OrderStore for Arc<S>
where
    S: OrderStore + ?Sized,
{
    async fn insert(&self, order: NewOrder) -> Result<Order, StoreError> {
        (**self).insert(order).await
    }

    async fn save(&self, order: &Order) -> Result<(), StoreError> {
        (**self).save(order).await
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        (**self).find_by_id(id).await
    }

    async fn list_all(&self) -> Result<Vec<Order>, StoreError> {
        (**self).list_all().await
    }
}

#[async_trait]
impl<S> InventoryStore for Arc<S>
where
    S: InventoryStore + ?Sized,
{
    async fn find_by_product_code(&self, code: &str) -> Result<Option<InventoryRecord>, StoreError> {
        (**self).find_by_product_code(code).await
    }

    async fn upsert(&self, record: InventoryRecord) -> Result<(), StoreError> {
        (**self).upsert(record).await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        (**self).count().await
    }

    async fn list_all(&self) -> Result<Vec<InventoryRecord>, StoreError> {
        (**self).list_all().await
    }
}
