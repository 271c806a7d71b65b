//! Business counters.
//!
//! Services record through the `MetricsSink` trait so tests can assert on
//! counts (`InMemoryMetrics`) while the binary forwards to the global
//! `metrics` recorder and renders it for Prometheus (`RecorderMetrics`).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use metrics::describe_counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

/// Counter names emitted by the order pipeline.
pub mod counters {
    /// An order was persisted and handed to the queue.
    pub const ORDERS_RECEIVED: &str = "orders.received";
    /// An order reached PROCESSED.
    pub const ORDERS_PROCESSED: &str = "orders.processed";
    /// An order reached FAILED.
    pub const ORDERS_FAILED: &str = "orders.failed";

    pub const ALL: [&str; 3] = [ORDERS_RECEIVED, ORDERS_PROCESSED, ORDERS_FAILED];
}

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to install metrics recorder: {0}")]
    Install(String),
}

/// Monotonic counter sink.
pub trait MetricsSink: Send + Sync {
    fn increment(&self, name: &'static str);
}

impl<S> MetricsSink for Arc<S>
where
    S: MetricsSink + ?Sized,
{
    fn increment(&self, name: &'static str) {
        (**self).increment(name)
    }
}

/// Counts kept in process memory; readable back for assertions.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    counts: RwLock<HashMap<&'static str, u64>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of `name` (0 if never incremented).
    pub fn count(&self, name: &str) -> u64 {
        match self.counts.read() {
            Ok(counts) => counts.get(name).copied().unwrap_or(0),
            Err(poisoned) => poisoned.into_inner().get(name).copied().unwrap_or(0),
        }
    }
}

impl MetricsSink for InMemoryMetrics {
    fn increment(&self, name: &'static str) {
        let mut counts = match self.counts.write() {
            Ok(c) => c,
            Err(poisoned) => poisoned.into_inner(),
        };
        *counts.entry(name).or_insert(0) += 1;
    }
}

/// Forwards to whatever global `metrics` recorder is installed.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecorderMetrics;

impl MetricsSink for RecorderMetrics {
    fn increment(&self, name: &'static str) {
        metrics::counter!(name).increment(1);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn increment(&self, _name: &'static str) {}
}

/// Install the Prometheus recorder process-wide and describe the order counters.
///
/// Fails if a global recorder is already installed.
pub fn install_prometheus() -> Result<PrometheusHandle, MetricsError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    describe_counter!(counters::ORDERS_RECEIVED, "Orders accepted and queued");
    describe_counter!(counters::ORDERS_PROCESSED, "Orders fulfilled");
    describe_counter!(counters::ORDERS_FAILED, "Orders that could not be fulfilled");

    ::tracing::info!(counters = ?counters::ALL, "prometheus recorder installed");
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_counts_per_name() {
        let m = InMemoryMetrics::new();
        m.increment(counters::ORDERS_RECEIVED);
        m.increment(counters::ORDERS_RECEIVED);
        m.increment(counters::ORDERS_FAILED);

        assert_eq!(m.count(counters::ORDERS_RECEIVED), 2);
        assert_eq!(m.count(counters::ORDERS_FAILED), 1);
        assert_eq!(m.count(counters::ORDERS_PROCESSED), 0);
    }

    #[test]
    fn arc_forwards_to_inner_sink() {
        let m = Arc::new(InMemoryMetrics::new());
        let sink: Arc<dyn MetricsSink> = m.clone();
        sink.increment(counters::ORDERS_PROCESSED);
        assert_eq!(m.count(counters::ORDERS_PROCESSED), 1);
    }

    #[test]
    fn recorder_without_installed_recorder_is_harmless() {
        RecorderMetrics.increment(counters::ORDERS_RECEIVED);
        NoopMetrics.increment(counters::ORDERS_RECEIVED);
    }
}
