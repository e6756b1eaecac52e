//! Tracing setup and invalidation counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins over `default_filter` when set. Calling this twice is
/// harmless: the second install is ignored.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Counters across invalidation runs
#[derive(Debug, Default)]
pub struct InvalidationMetrics {
    markers_written: AtomicU64,
    markers_skipped_retention: AtomicU64,
    store_failures: AtomicU64,
    runs_cancelled: AtomicU64,
}

impl InvalidationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn marker_written(&self) {
        self.markers_written.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "markers_written", "Metric incremented");
    }

    pub fn marker_skipped_retention(&self) {
        self.markers_skipped_retention.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "markers_skipped_retention", "Metric incremented");
    }

    pub fn store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "store_failures", "Metric incremented");
    }

    pub fn run_cancelled(&self) {
        self.runs_cancelled.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "runs_cancelled", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            markers_written: self.markers_written.load(Ordering::Relaxed),
            markers_skipped_retention: self.markers_skipped_retention.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
            runs_cancelled: self.runs_cancelled.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub markers_written: u64,
    pub markers_skipped_retention: u64,
    pub store_failures: u64,
    pub runs_cancelled: u64,
}
