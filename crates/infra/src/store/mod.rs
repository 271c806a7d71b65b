//! Order and inventory persistence boundary.
//!
//! The fulfillment pipeline only sees the traits in `r#trait`; concrete
//! adapters live next to them (in-memory for tests/dev, Postgres for
//! persistent deployments).

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::{InMemoryInventoryStore, InMemoryOrderStore};
pub use postgres::{PostgresInventoryStore, PostgresOrderStore, ensure_schema};
pub use r#trait::{InventoryStore, OrderStore, StoreError};
