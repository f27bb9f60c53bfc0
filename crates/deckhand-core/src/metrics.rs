//! Process-wide counters for document round trips, extraction and dispatch.
//!
//! Call sites bump counters without logging anything at `info`. The binary
//! calls [`Metrics::flush`] once on exit to report the totals.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

pub static METRICS: Metrics = Metrics::new();

#[derive(Debug, Default)]
pub struct Metrics {
    syncs_issued: AtomicU64,
    shapes_extracted: AtomicU64,
    shapes_skipped: AtomicU64,
    units_executed: AtomicU64,
    units_failed: AtomicU64,
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub syncs_issued: u64,
    pub shapes_extracted: u64,
    pub shapes_skipped: u64,
    pub units_executed: u64,
    pub units_failed: u64,
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            syncs_issued: AtomicU64::new(0),
            shapes_extracted: AtomicU64::new(0),
            shapes_skipped: AtomicU64::new(0),
            units_executed: AtomicU64::new(0),
            units_failed: AtomicU64::new(0),
        }
    }

    /// One document round trip was issued.
    pub fn inc_syncs(&self) {
        self.syncs_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_shapes_extracted(&self, n: u64) {
        self.shapes_extracted.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_shapes_skipped(&self) {
        self.shapes_skipped.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "shapes_skipped", "counter incremented");
    }

    pub fn record_unit(&self, succeeded: bool) {
        self.units_executed.fetch_add(1, Ordering::Relaxed);
        if !succeeded {
            self.units_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            syncs_issued: self.syncs_issued.load(Ordering::Relaxed),
            shapes_extracted: self.shapes_extracted.load(Ordering::Relaxed),
            shapes_skipped: self.shapes_skipped.load(Ordering::Relaxed),
            units_executed: self.units_executed.load(Ordering::Relaxed),
            units_failed: self.units_failed.load(Ordering::Relaxed),
        }
    }

    /// Emit the current totals as a single `info!` event.
    pub fn flush(&self) {
        let totals = self.snapshot();
        tracing::info!(
            event = "metrics.flush",
            syncs_issued = totals.syncs_issued,
            shapes_extracted = totals.shapes_extracted,
            shapes_skipped = totals.shapes_skipped,
            units_executed = totals.units_executed,
            units_failed = totals.units_failed,
        );
    }
}
