//! Sample catalogue loaded into an empty inventory store at startup.

use rust_decimal::Decimal;

use orderflow_core::Money;

use crate::record::InventoryRecord;

/// The four sample products a fresh deployment starts with.
pub fn sample_catalogue() -> Vec<InventoryRecord> {
    vec![
        InventoryRecord::new(
            "SKU-001",
            "Premium Wireless Headphones",
            100,
            Money::new(Decimal::new(4999, 2)),
        ),
        InventoryRecord::new(
            "SKU-002",
            "USB-C Charging Cable",
            250,
            Money::new(Decimal::new(1950, 2)),
        ),
        InventoryRecord::new("PROD-001", "Laptop Stand", 50, Money::new(Decimal::new(5000, 2))),
        InventoryRecord::new("PROD-002", "Keyboard", 75, Money::new(Decimal::new(3000, 2))),
    ]
}
