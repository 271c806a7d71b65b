//! Redis Streams-backed work queue (durable, at-least-once delivery).
//!
//! - **Stream Key**: `orderflow:orders` by default, one entry per order with a
//!   single `order_id` field
//! - **Consumer Group**: one per processing role (`orders.fulfillment`); every
//!   entry goes to exactly one consumer in the group
//! - **Consumers**: named per worker task (`fulfillment-0`, `fulfillment-1`, ...)
//! - **Acknowledgement**: `XACK` once the consumer is done with an entry
//! - **Redelivery**: entries left unacknowledged for `claim_idle`, under any
//!   consumer name of the group (including names no longer running), are
//!   claimed with `XCLAIM` by whichever reader scans the pending list next
//! - **Dead-letter handling**: an entry delivered more than `max_deliveries`
//!   times is copied to `{stream_key}:dlq` and acknowledged

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamClaimReply, StreamId, StreamPendingCountReply, StreamReadReply};
use tracing::{debug, error, instrument, warn};

use orderflow_events::{Delivery, MessageQueue, QueueError, Subscription};

use super::{DEFAULT_CONSUMER_GROUP, DEFAULT_STREAM_KEY, RedeliveryPolicy};

/// Suffix of the dead-letter stream key.
const DLQ_SUFFIX: &str = ":dlq";

/// Stream entry field carrying the payload.
const PAYLOAD_FIELD: &str = "order_id";

const READ_BATCH: usize = 10;
const BLOCK_MS: u64 = 1_000;

#[derive(Debug, thiserror::Error)]
pub enum RedisStreamsError {
    #[error("Redis connection error: {0}")]
    Connection(String),

    #[error("Redis command error: {0}")]
    Command(String),

    #[error("Consumer group error: {0}")]
    ConsumerGroup(String),
}

impl From<RedisStreamsError> for QueueError {
    fn from(err: RedisStreamsError) -> Self {
        QueueError::Transport(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct RedisStreamsQueue {
    client: redis::Client,
    stream_key: String,
    group_name: String,
    redelivery: RedeliveryPolicy,
}

impl RedisStreamsQueue {
    /// Create a queue handle. No connection is opened until first use.
    ///
    /// * `redis_url` - e.g. `redis://localhost:6379`
    /// * `stream_key` - defaults to [`DEFAULT_STREAM_KEY`]
    /// * `group_name` - defaults to [`DEFAULT_CONSUMER_GROUP`]
    pub fn new(
        redis_url: impl AsRef<str>,
        stream_key: Option<String>,
        group_name: Option<String>,
    ) -> Result<Self, RedisStreamsError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| RedisStreamsError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            stream_key: stream_key.unwrap_or_else(|| DEFAULT_STREAM_KEY.to_string()),
            group_name: group_name.unwrap_or_else(|| DEFAULT_CONSUMER_GROUP.to_string()),
            redelivery: RedeliveryPolicy::default(),
        })
    }

    pub fn with_redelivery(mut self, redelivery: RedeliveryPolicy) -> Self {
        self.redelivery = redelivery;
        self
    }

    pub fn stream_key(&self) -> &str {
        &self.stream_key
    }

    pub fn dead_letter_key(&self) -> String {
        format!("{}{}", self.stream_key, DLQ_SUFFIX)
    }

    async fn connect(&self) -> Result<MultiplexedConnection, RedisStreamsError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| RedisStreamsError::Connection(e.to_string()))
    }

    /// Ensure the consumer group exists (idempotent).
    ///
    /// `MKSTREAM` creates the stream when missing; starting at `0` means a
    /// freshly created group also sees entries published before it existed.
    pub async fn ensure_consumer_group(&self) -> Result<(), RedisStreamsError> {
        let mut conn = self.connect().await?;
        let created: redis::RedisResult<String> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.stream_key)
            .arg(&self.group_name)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match created {
            Ok(_) => Ok(()),
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(RedisStreamsError::ConsumerGroup(e.to_string())),
        }
    }

    #[instrument(skip(self), fields(stream_key = %self.stream_key), err)]
    async fn add(&self, payload: &str) -> Result<String, RedisStreamsError> {
        let mut conn = self.connect().await?;
        redis::cmd("XADD")
            .arg(&self.stream_key)
            .arg("*")
            .arg(PAYLOAD_FIELD)
            .arg(payload)
            .query_async(&mut conn)
            .await
            .map_err(|e| RedisStreamsError::Command(format!("XADD failed: {e}")))
    }
}

#[async_trait]
impl MessageQueue for RedisStreamsQueue {
    async fn publish(&self, payload: String) -> Result<(), QueueError> {
        let entry_id = self.add(&payload).await?;
        debug!(entry_id = %entry_id, payload = %payload, "queued");
        Ok(())
    }

    async fn subscribe(&self, consumer_name: &str) -> Result<Box<dyn Subscription>, QueueError> {
        self.ensure_consumer_group().await?;
        let conn = self.connect().await?;

        Ok(Box::new(RedisStreamsSubscription {
            conn,
            stream_key: self.stream_key.clone(),
            group_name: self.group_name.clone(),
            dead_letter_key: self.dead_letter_key(),
            consumer_name: consumer_name.to_string(),
            redelivery: self.redelivery,
            buffer: VecDeque::new(),
            last_scan: None,
        }))
    }
}

/// One named consumer inside the queue's consumer group.
pub struct RedisStreamsSubscription {
    conn: MultiplexedConnection,
    stream_key: String,
    group_name: String,
    dead_letter_key: String,
    consumer_name: String,
    redelivery: RedeliveryPolicy,
    buffer: VecDeque<Delivery>,
    last_scan: Option<Instant>,
}

impl RedisStreamsSubscription {
    /// Read the next batch into the buffer.
    ///
    /// Idle pending entries are reclaimed first when a scan is due; otherwise
    /// only new entries (`>`) are requested, with a bounded block so the
    /// caller can observe shutdown.
    async fn fill(&mut self) -> Result<(), RedisStreamsError> {
        let now = Instant::now();
        if self.redelivery.reclaim_due(self.last_scan, now) {
            self.last_scan = Some(now);
            self.reclaim().await?;
            if !self.buffer.is_empty() {
                return Ok(());
            }
        }

        let reply: Option<StreamReadReply> = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.group_name)
            .arg(&self.consumer_name)
            .arg("COUNT")
            .arg(READ_BATCH)
            .arg("BLOCK")
            .arg(BLOCK_MS)
            .arg("STREAMS")
            .arg(&self.stream_key)
            .arg(">")
            .query_async(&mut self.conn)
            .await
            .map_err(|e| RedisStreamsError::Command(format!("XREADGROUP failed: {e}")))?;

        let entries = reply
            .map(|r| r.keys.into_iter().flat_map(|k| k.ids).collect::<Vec<_>>())
            .unwrap_or_default();

        for entry in entries {
            self.enqueue(entry).await?;
        }
        Ok(())
    }

    /// Claim pending entries of the whole group that have been idle for
    /// `claim_idle`, dead-lettering those that used up their deliveries.
    async fn reclaim(&mut self) -> Result<(), RedisStreamsError> {
        let idle_ms = self.redelivery.claim_idle.as_millis() as u64;

        let pending: StreamPendingCountReply = redis::cmd("XPENDING")
            .arg(&self.stream_key)
            .arg(&self.group_name)
            .arg("IDLE")
            .arg(idle_ms)
            .arg("-")
            .arg("+")
            .arg(READ_BATCH)
            .query_async(&mut self.conn)
            .await
            .map_err(|e| RedisStreamsError::Command(format!("XPENDING failed: {e}")))?;

        if pending.ids.is_empty() {
            return Ok(());
        }

        let previous: HashMap<String, (String, u64)> = pending
            .ids
            .into_iter()
            .map(|p| (p.id, (p.consumer, p.times_delivered as u64)))
            .collect();
        let ids: Vec<&String> = previous.keys().collect();

        // XCLAIM re-checks idleness, so an entry acknowledged or claimed by
        // another reader in the meantime is not returned.
        let claimed: StreamClaimReply = redis::cmd("XCLAIM")
            .arg(&self.stream_key)
            .arg(&self.group_name)
            .arg(&self.consumer_name)
            .arg(idle_ms)
            .arg(&ids)
            .query_async(&mut self.conn)
            .await
            .map_err(|e| RedisStreamsError::Command(format!("XCLAIM failed: {e}")))?;

        for entry in claimed.ids {
            let (owner, times) = previous
                .get(&entry.id)
                .cloned()
                .unwrap_or_else(|| (String::new(), 0));
            let deliveries = times + 1;

            if self.redelivery.exhausted(deliveries) {
                self.dead_letter(&entry, &owner, times).await?;
                continue;
            }

            debug!(
                entry_id = %entry.id,
                previous_consumer = %owner,
                consumer = %self.consumer_name,
                deliveries,
                "reclaimed idle stream entry"
            );
            self.enqueue(entry).await?;
        }
        Ok(())
    }

    async fn enqueue(&mut self, entry: StreamId) -> Result<(), RedisStreamsError> {
        match entry.get::<String>(PAYLOAD_FIELD) {
            Some(payload) => {
                self.buffer.push_back(Delivery::with_receipt(entry.id, payload));
                Ok(())
            }
            None => {
                warn!(
                    entry_id = %entry.id,
                    consumer = %self.consumer_name,
                    "stream entry without payload field; acknowledging and skipping"
                );
                self.acknowledge(&entry.id).await
            }
        }
    }

    /// Copy the entry to the dead-letter stream, then acknowledge it.
    async fn dead_letter(
        &mut self,
        entry: &StreamId,
        last_consumer: &str,
        deliveries: u64,
    ) -> Result<(), RedisStreamsError> {
        let payload = entry.get::<String>(PAYLOAD_FIELD).unwrap_or_default();

        let _: String = redis::cmd("XADD")
            .arg(&self.dead_letter_key)
            .arg("*")
            .arg(PAYLOAD_FIELD)
            .arg(&payload)
            .arg("source_id")
            .arg(&entry.id)
            .arg("deliveries")
            .arg(deliveries)
            .arg("last_consumer")
            .arg(last_consumer)
            .query_async(&mut self.conn)
            .await
            .map_err(|e| RedisStreamsError::Command(format!("DLQ XADD failed: {e}")))?;

        error!(
            entry_id = %entry.id,
            order_id = %payload,
            deliveries,
            dead_letter_key = %self.dead_letter_key,
            "stream entry exceeded delivery limit; moved to dead-letter stream"
        );

        self.acknowledge(&entry.id).await
    }

    async fn acknowledge(&mut self, entry_id: &str) -> Result<(), RedisStreamsError> {
        let _: u64 = redis::cmd("XACK")
            .arg(&self.stream_key)
            .arg(&self.group_name)
            .arg(entry_id)
            .query_async(&mut self.conn)
            .await
            .map_err(|e| RedisStreamsError::Command(format!("XACK failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl Subscription for RedisStreamsSubscription {
    async fn next(&mut self) -> Result<Option<Delivery>, QueueError> {
        loop {
            if let Some(delivery) = self.buffer.pop_front() {
                return Ok(Some(delivery));
            }
            self.fill().await?;
        }
    }

    async fn ack(&mut self, delivery: &Delivery) -> Result<(), QueueError> {
        match delivery.receipt() {
            Some(entry_id) => Ok(self.acknowledge(entry_id).await?),
            None => Ok(()),
        }
    }
}
