//! In-memory work queue for tests/dev.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{Mutex as AsyncMutex, mpsc};

use crate::queue::{Delivery, MessageQueue, QueueError, Subscription};

/// In-memory work queue.
///
/// - No IO, unbounded
/// - Competing consumers: each message reaches exactly one subscription
/// - At-most-once: nothing survives a restart, `ack` is a no-op
#[derive(Debug)]
pub struct InMemoryQueue {
    sender: Mutex<Option<mpsc::UnboundedSender<String>>>,
    receiver: Arc<AsyncMutex<mpsc::UnboundedReceiver<String>>>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop accepting messages. Already queued messages are still delivered;
    /// once drained, every subscription sees the end of the stream.
    pub fn close(&self) {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            sender: Mutex::new(Some(tx)),
            receiver: Arc::new(AsyncMutex::new(rx)),
        }
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn publish(&self, payload: String) -> Result<(), QueueError> {
        let sender = self.sender.lock().map_err(|_| QueueError::Closed)?;
        let tx = sender.as_ref().ok_or(QueueError::Closed)?;
        tx.send(payload).map_err(|_| QueueError::Closed)
    }

    async fn subscribe(&self, _consumer_name: &str) -> Result<Box<dyn Subscription>, QueueError> {
        Ok(Box::new(InMemorySubscription {
            receiver: self.receiver.clone(),
        }))
    }
}

struct InMemorySubscription {
    receiver: Arc<AsyncMutex<mpsc::UnboundedReceiver<String>>>,
}

#[async_trait]
impl Subscription for InMemorySubscription {
    async fn next(&mut self) -> Result<Option<Delivery>, QueueError> {
        let mut rx = self.receiver.lock().await;
        Ok(rx.recv().await.map(Delivery::new))
    }

    async fn ack(&mut self, _delivery: &Delivery) -> Result<(), QueueError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_then_receive_in_order() {
        let queue = InMemoryQueue::new();
        queue.publish("1".to_string()).await.unwrap();
        queue.publish("2".to_string()).await.unwrap();

        let mut sub = queue.subscribe("c").await.unwrap();
        assert_eq!(sub.next().await.unwrap().unwrap().payload(), "1");
        assert_eq!(sub.next().await.unwrap().unwrap().payload(), "2");
    }

    #[tokio::test]
    async fn competing_subscriptions_share_messages() {
        let queue = InMemoryQueue::new();
        let mut a = queue.subscribe("a").await.unwrap();
        let mut b = queue.subscribe("b").await.unwrap();

        queue.publish("x".to_string()).await.unwrap();
        queue.publish("y".to_string()).await.unwrap();
        queue.close();

        let mut seen = Vec::new();
        if let Some(d) = a.next().await.unwrap() {
            seen.push(d.payload().to_string());
        }
        if let Some(d) = b.next().await.unwrap() {
            seen.push(d.payload().to_string());
        }
        seen.sort();
        assert_eq!(seen, vec!["x", "y"]);

        assert!(a.next().await.unwrap().is_none());
        assert!(b.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn publish_after_close_fails() {
        let queue = InMemoryQueue::new();
        queue.close();
        assert_eq!(
            queue.publish("1".to_string()).await.unwrap_err(),
            QueueError::Closed
        );
    }

    #[tokio::test]
    async fn queued_messages_survive_close() {
        let queue = InMemoryQueue::new();
        queue.publish("late".to_string()).await.unwrap();
        queue.close();

        let mut sub = queue.subscribe("c").await.unwrap();
        let d = sub.next().await.unwrap().unwrap();
        assert_eq!(d.payload(), "late");
        sub.ack(&d).await.unwrap();
        assert!(sub.next().await.unwrap().is_none());
    }
}
