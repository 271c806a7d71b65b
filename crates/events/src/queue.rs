//! Work-queue abstraction (publish / competing-consumer subscribe).
//!
//! The queue carries opaque string payloads from a producer to a pool of
//! consumers. Unlike a broadcast bus, every message is handed to exactly one
//! subscription; several subscriptions on the same queue compete for messages.
//!
//! ## Delivery Guarantees
//!
//! The contract makes minimal assumptions so it fits several transports:
//!
//! - **In-memory**: at-most-once (messages die with the process)
//! - **Redis Streams**: at-least-once (messages stay pending until acknowledged)
//!
//! Consumers must therefore be idempotent: processing the same payload twice
//! must be safe.
//!
//! ## Usage Pattern
//!
//! ```ignore
//! let mut sub = queue.subscribe("worker-1").await?;
//! while let Some(delivery) = sub.next().await? {
//!     if consumer.consume(delivery.payload()).await.should_ack() {
//!         sub.ack(&delivery).await?;
//!     }
//! }
//! // `None` means the queue was closed and drained.
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Queue operation error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
    /// The queue no longer accepts or delivers messages.
    #[error("queue closed")]
    Closed,

    /// Broker/network failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// A message could not be decoded from the broker's wire format.
    #[error("malformed message: {0}")]
    Malformed(String),
}

/// A message handed to one subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Transport-specific receipt used to acknowledge the message, if any.
    receipt: Option<String>,
    payload: String,
}

impl Delivery {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            receipt: None,
            payload: payload.into(),
        }
    }

    pub fn with_receipt(receipt: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            receipt: Some(receipt.into()),
            payload: payload.into(),
        }
    }

    pub fn receipt(&self) -> Option<&str> {
        self.receipt.as_deref()
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }
}

/// One consumer's view of a queue.
#[async_trait]
pub trait Subscription: Send {
    /// Wait for the next message. `Ok(None)` means the queue is closed and drained.
    async fn next(&mut self) -> Result<Option<Delivery>, QueueError>;

    /// Acknowledge a delivery once it has been handled.
    ///
    /// Transports without acknowledgement treat this as a no-op.
    async fn ack(&mut self, delivery: &Delivery) -> Result<(), QueueError>;
}

/// Transport-agnostic work queue.
///
/// `publish()` can fail (queue closed, network error); failures are surfaced
/// to the caller, which decides what to do. Implementations must be safe to
/// share across threads and tasks.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    async fn publish(&self, payload: String) -> Result<(), QueueError>;

    /// Join the queue's consumer pool under `consumer_name`.
    async fn subscribe(&self, consumer_name: &str) -> Result<Box<dyn Subscription>, QueueError>;
}

#[async_trait]
impl<Q> MessageQueue for Arc<Q>
where
    Q: MessageQueue + ?Sized,
{
    async fn publish(&self, payload: String) -> Result<(), QueueError> {
        (**self).publish(payload).await
    }

    async fn subscribe(&self, consumer_name: &str) -> Result<Box<dyn Subscription>, QueueError> {
        (**self).subscribe(consumer_name).await
    }
}
