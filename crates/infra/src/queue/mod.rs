//! Broker-backed queue transports.
//!
//! The in-memory transport lives in `orderflow-events`; this module holds the
//! adapters that need network clients, plus the settings they share with
//! process configuration.

use std::time::{Duration, Instant};

#[cfg(feature = "redis")]
pub mod redis_streams;

#[cfg(feature = "redis")]
pub use redis_streams::{RedisStreamsError, RedisStreamsQueue};

pub const DEFAULT_STREAM_KEY: &str = "orderflow:orders";
pub const DEFAULT_CONSUMER_GROUP: &str = "orders.fulfillment";

/// Pending entries idle this long are claimed by another reader.
pub const DEFAULT_CLAIM_IDLE: Duration = Duration::from_secs(60);

/// Deliveries after which a pending entry is dead-lettered.
pub const DEFAULT_MAX_DELIVERIES: u64 = 5;

/// When unacknowledged entries are handed out again, and when they are given up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedeliveryPolicy {
    pub claim_idle: Duration,
    pub max_deliveries: u64,
}

impl Default for RedeliveryPolicy {
    fn default() -> Self {
        Self {
            claim_idle: DEFAULT_CLAIM_IDLE,
            max_deliveries: DEFAULT_MAX_DELIVERIES,
        }
    }
}

impl RedeliveryPolicy {
    /// Pending entries are scanned at most every half idle period.
    pub fn reclaim_due(&self, last_scan: Option<Instant>, now: Instant) -> bool {
        match last_scan {
            None => true,
            Some(at) => now.saturating_duration_since(at) >= self.claim_idle / 2,
        }
    }

    /// `deliveries` counts the delivery being considered; once it exceeds the
    /// cap the entry goes to the dead-letter stream instead of a consumer.
    pub fn exhausted(&self, deliveries: u64) -> bool {
        deliveries > self.max_deliveries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_scan_is_immediate() {
        let policy = RedeliveryPolicy::default();
        assert!(policy.reclaim_due(None, Instant::now()));
    }

    #[test]
    fn scans_are_spaced_by_half_the_idle_period() {
        let policy = RedeliveryPolicy {
            claim_idle: Duration::from_secs(10),
            max_deliveries: 3,
        };
        let start = Instant::now();

        assert!(!policy.reclaim_due(Some(start), start + Duration::from_secs(4)));
        assert!(policy.reclaim_due(Some(start), start + Duration::from_secs(5)));
    }

    #[test]
    fn delivery_cap_is_inclusive() {
        let policy = RedeliveryPolicy {
            claim_idle: DEFAULT_CLAIM_IDLE,
            max_deliveries: 3,
        };

        assert!(!policy.exhausted(1));
        assert!(!policy.exhausted(3));
        assert!(policy.exhausted(4));
    }
}
