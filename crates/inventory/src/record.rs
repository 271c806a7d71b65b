use serde::{Deserialize, Serialize};

use orderflow_core::{Entity, Money};

/// Stock on hand for one product.
///
/// Keyed by `product_code`; a code identifies at most one record. The
/// fulfillment pipeline only ever reads these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    pub product_code: String,
    pub product_name: String,
    pub available_quantity: i64,
    pub price: Money,
}

impl InventoryRecord {
    pub fn new(
        product_code: impl Into<String>,
        product_name: impl Into<String>,
        available_quantity: i64,
        price: Money,
    ) -> Self {
        Self {
            product_code: product_code.into(),
            product_name: product_name.into(),
            available_quantity,
            price,
        }
    }

    /// True when `requested` units can be served from current stock.
    pub fn can_fulfil(&self, requested: i64) -> bool {
        self.available_quantity >= requested
    }
}

impl Entity for InventoryRecord {
    type Id = String;

    fn id(&self) -> &Self::Id {
        &self.product_code
    }
}

/// Outcome of checking one line against inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    UnknownProduct,
    Insufficient { requested: i64, available: i64 },
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }
}

/// Check a requested quantity against an (optional) inventory record.
///
/// A missing record is a normal outcome and counts as unavailable.
pub fn check_availability(record: Option<&InventoryRecord>, requested: i64) -> Availability {
    match record {
        None => Availability::UnknownProduct,
        Some(r) if r.can_fulfil(requested) => Availability::Available,
        Some(r) => Availability::Insufficient {
            requested,
            available: r.available_quantity,
        },
    }
}
