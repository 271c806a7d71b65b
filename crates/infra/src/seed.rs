//! Startup seeding of sample inventory.

use tracing::info;

use orderflow_inventory::sample_catalogue;

use crate::store::{InventoryStore, StoreError};

/// Load the sample catalogue into an empty inventory store.
///
/// Returns the number of records written; 0 when the store already held data.
pub async fn seed_inventory(store: &dyn InventoryStore) -> Result<usize, StoreError> {
    let existing = store.count().await?;
    if existing > 0 {
        info!(existing, "inventory already present; skipping seed");
        return Ok(0);
    }

    let catalogue = sample_catalogue();
    let n = catalogue.len();
    for record in catalogue {
        info!(product_code = %record.product_code, quantity = record.available_quantity, "seeding inventory");
        store.upsert(record).await?;
    }

    info!(records = n, "sample inventory seeded");
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderflow_core::Money;
    use orderflow_inventory::InventoryRecord;
    use rust_decimal_macros::dec;

    use crate::store::InMemoryInventoryStore;

    #[tokio::test]
    async fn seeds_empty_store() {
        let store = InMemoryInventoryStore::new();
        assert_eq!(seed_inventory(&store).await.unwrap(), 4);
        assert_eq!(store.count().await.unwrap(), 4);

        let laptop_stand = store.find_by_product_code("PROD-001").await.unwrap().unwrap();
        assert_eq!(laptop_stand.available_quantity, 50);
        assert_eq!(laptop_stand.price, Money::new(dec!(50.00)));
    }

    #[tokio::test]
    async fn leaves_populated_store_alone() {
        let store = InMemoryInventoryStore::with_records([InventoryRecord::new(
            "X-1",
            "Custom",
            1,
            Money::new(dec!(1)),
        )]);

        assert_eq!(seed_inventory(&store).await.unwrap(), 0);
        assert_eq!(store.count().await.unwrap(), 1);
        assert!(store.find_by_product_code("SKU-001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn seeding_twice_is_harmless() {
        let store = InMemoryInventoryStore::new();
        seed_inventory(&store).await.unwrap();
        assert_eq!(seed_inventory(&store).await.unwrap(), 0);
        assert_eq!(store.count().await.unwrap(), 4);
    }
}
