//! Infrastructure layer: stores, queue transports, order services, config.

pub mod config;
pub mod fulfillment;
pub mod intake;
pub mod queue;
pub mod seed;
pub mod store;
pub mod workers;

mod integration_tests;

pub use fulfillment::{FulfillmentEngine, FulfillmentError, Outcome};
pub use intake::{CreateOrder, IntakeError, OrderIntake, OrderReceipt};
