//! Tracing, logging, metrics (shared setup).

/// Initialize process-wide logging.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Tracing configuration (filters, layers).
pub mod tracing;

/// Business counters and exporters.
pub mod metrics;

pub use metrics::{InMemoryMetrics, MetricsError, MetricsSink, NoopMetrics, RecorderMetrics};
