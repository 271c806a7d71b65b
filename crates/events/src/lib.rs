//! Message transport abstractions (mechanics only).
//!
//! Intake publishes order identifiers; the fulfillment worker consumes them.
//! This crate holds the queue contract both sides agree on, the consumer
//! contract the worker drives, and an in-memory transport for tests/dev.

pub mod consumer;
pub mod in_memory_queue;
pub mod queue;

pub use consumer::{Disposition, MessageConsumer};
pub use in_memory_queue::InMemoryQueue;
pub use queue::{Delivery, MessageQueue, QueueError, Subscription};
