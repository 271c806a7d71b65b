use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use orderflow_events::{MessageConsumer, MessageQueue, QueueError, Subscription};

/// Worker pool configuration.
#[derive(Debug, Clone)]
pub struct FulfillmentWorkerConfig {
    /// Name for logging; task `i` subscribes as `{name}-{i}`.
    pub name: String,
    /// Number of tasks competing on the queue.
    pub concurrency: usize,
    /// Pause after a transport error before reading again.
    pub error_backoff: Duration,
}

impl Default for FulfillmentWorkerConfig {
    fn default() -> Self {
        Self {
            name: "fulfillment".to_string(),
            concurrency: 4,
            error_backoff: Duration::from_millis(500),
        }
    }
}

impl FulfillmentWorkerConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

/// Handle to control and join a running worker pool.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    delivered: Arc<AtomicU64>,
}

impl WorkerHandle {
    /// Messages handed to the consumer so far, across all tasks.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Request graceful shutdown and wait for every task to stop.
    ///
    /// A message already handed to the consumer is finished first.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        self.join().await;
    }

    /// Wait for the tasks to stop on their own (queue closed and drained).
    pub async fn join(self) {
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

/// Drives a `MessageConsumer` from a `MessageQueue`.
///
/// - `concurrency` tokio tasks, one subscription each, competing for messages
/// - a delivery is acknowledged once `consume` returns `Disposition::Done`;
///   on `Retry` it stays unacknowledged for the transport to redeliver
/// - stops on shutdown or when the queue is closed and drained
#[derive(Debug)]
pub struct FulfillmentWorker;

impl FulfillmentWorker {
    pub async fn spawn(
        config: FulfillmentWorkerConfig,
        queue: Arc<dyn MessageQueue>,
        consumer: Arc<dyn MessageConsumer>,
    ) -> Result<WorkerHandle, QueueError> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let delivered = Arc::new(AtomicU64::new(0));

        let mut tasks = Vec::with_capacity(config.concurrency);
        for i in 0..config.concurrency.max(1) {
            let task_name = format!("{}-{}", config.name, i);
            let sub = queue.subscribe(&task_name).await?;

            tasks.push(tokio::spawn(worker_loop(
                task_name,
                sub,
                consumer.clone(),
                shutdown_rx.clone(),
                delivered.clone(),
                config.error_backoff,
            )));
        }

        info!(worker = %config.name, concurrency = tasks.len(), "fulfillment worker started");

        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            tasks,
            delivered,
        })
    }
}

async fn worker_loop(
    name: String,
    mut sub: Box<dyn Subscription>,
    consumer: Arc<dyn MessageConsumer>,
    mut shutdown: watch::Receiver<bool>,
    delivered: Arc<AtomicU64>,
    error_backoff: Duration,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }

        let next = tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            next = sub.next() => next,
        };

        match next {
            Ok(Some(delivery)) => {
                debug!(worker = %name, payload = %delivery.payload(), "delivery received");
                let disposition = consumer.consume(delivery.payload()).await;
                delivered.fetch_add(1, Ordering::Relaxed);

                if disposition.should_ack() {
                    if let Err(err) = sub.ack(&delivery).await {
                        warn!(worker = %name, error = %err, "failed to acknowledge delivery");
                    }
                } else {
                    warn!(
                        worker = %name,
                        payload = %delivery.payload(),
                        receipt = ?delivery.receipt(),
                        "delivery left unacknowledged for redelivery"
                    );
                    tokio::time::sleep(error_backoff).await;
                }
            }
            Ok(None) => break,
            Err(err) => {
                warn!(worker = %name, error = %err, "queue read failed");
                tokio::time::sleep(error_backoff).await;
            }
        }
    }

    debug!(worker = %name, "fulfillment task stopped");
}
