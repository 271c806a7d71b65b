use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use orderflow_core::{Entity, OrderId};
use orderflow_inventory::InventoryRecord;
use orderflow_orders::{NewOrder, Order};

use super::r#trait::{InventoryStore, OrderStore, StoreError};

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

/// In-memory order store.
///
/// Intended for tests/dev. Ids are assigned from a counter starting at 1;
/// every call takes the lock once, so a partially written order is never
/// visible.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    inner: RwLock<OrderTable>,
}

#[derive(Debug, Default)]
struct OrderTable {
    last_id: i64,
    rows: BTreeMap<OrderId, Order>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut table = self.inner.write().map_err(|_| poisoned())?;

        let next = table
            .last_id
            .checked_add(1)
            .ok_or_else(|| StoreError::Conflict("order id space exhausted".to_string()))?;
        let id = OrderId::new(next).map_err(|e| StoreError::Corrupt(e.to_string()))?;

        let order = order.with_id(id);
        table.last_id = next;
        table.rows.insert(id, order.clone());
        Ok(order)
    }

    async fn save(&self, order: &Order) -> Result<(), StoreError> {
        let mut table = self.inner.write().map_err(|_| poisoned())?;
        match table.rows.get_mut(order.id()) {
            Some(existing) => {
                *existing = order.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("order {}", order.id()))),
        }
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let table = self.inner.read().map_err(|_| poisoned())?;
        Ok(table.rows.get(&id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Order>, StoreError> {
        let table = self.inner.read().map_err(|_| poisoned())?;
        Ok(table.rows.values().cloned().collect())
    }
}

/// In-memory inventory store.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    rows: RwLock<BTreeMap<String, InventoryRecord>>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `records`.
    pub fn with_records(records: impl IntoIterator<Item = InventoryRecord>) -> Self {
        let rows = records
            .into_iter()
            .map(|r| (r.id().clone(), r))
            .collect();
        Self {
            rows: RwLock::new(rows),
        }
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn find_by_product_code(&self, code: &str) -> Result<Option<InventoryRecord>, StoreError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.get(code).cloned())
    }

    async fn upsert(&self, record: InventoryRecord) -> Result<(), StoreError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        rows.insert(record.id().clone(), record);
        Ok(())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.len() as u64)
    }

    async fn list_all(&self) -> Result<Vec<InventoryRecord>, StoreError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.values().cloned().collect())
    }
}
