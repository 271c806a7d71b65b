//! Orders domain module.
//!
//! This crate contains the order record, its status state machine and the
//! fulfillment pricing rules (discount, reconciliation), implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod order;
pub mod policy;
pub mod status;

pub use order::{Fulfillment, NewOrder, Order, OrderItem};
pub use policy::{DiscountPolicy, Reconciliation, reconcile};
pub use status::OrderStatus;
