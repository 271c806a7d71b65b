//! Inventory domain module.
//!
//! This crate contains the inventory record model and the stock availability
//! rule, implemented purely as deterministic domain logic (no IO, no storage).

pub mod catalogue;
pub mod record;

pub use catalogue::sample_catalogue;
pub use record::{Availability, InventoryRecord, check_availability};
