//! Per-run metrics collection.

use hdrhistogram::Histogram;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::warn;

/// Counters and histograms shared by the workers of one run.
///
/// - Atomic counter for records produced (producers never contend on a lock)
/// - parking_lot::Mutex around the residence histogram, held only while recording
/// - The histogram auto-resizes, so long waits are recorded at full value
pub struct RunMetrics {
    /// Records inserted into the buffer by producers.
    produced: AtomicU64,
    /// Time each record spent in the buffer (microseconds).
    residence: Mutex<Histogram<u64>>,
}

impl RunMetrics {
    /// Create empty metrics.
    pub fn new() -> Self {
        Self {
            produced: AtomicU64::new(0),
            residence: Mutex::new(Histogram::new(3).expect("histogram creation should succeed")),
        }
    }

    /// Count one produced record.
    #[inline]
    pub fn record_produced(&self) {
        self.produced.fetch_add(1, Ordering::Relaxed);
    }

    /// Records produced so far.
    pub fn produced(&self) -> u64 {
        self.produced.load(Ordering::Relaxed)
    }

    /// Record how long a record waited in the buffer.
    pub fn record_residence(&self, waited: Duration) {
        let micros = waited.as_micros().min(u64::MAX as u128) as u64;
        if let Err(e) = self.residence.lock().record(micros) {
            warn!(micros, error = %e, "Failed to record residence time");
        }
    }

    /// Summarize the residence histogram.
    pub fn residence(&self) -> ResidenceLatency {
        let hist = self.residence.lock();
        if hist.is_empty() {
            return ResidenceLatency::default();
        }
        ResidenceLatency {
            samples: hist.len(),
            mean: Duration::from_micros(hist.mean() as u64),
            p50: Duration::from_micros(hist.value_at_quantile(0.50)),
            p99: Duration::from_micros(hist.value_at_quantile(0.99)),
            max: Duration::from_micros(hist.max()),
        }
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of buffer residence times for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResidenceLatency {
    /// Number of records measured.
    pub samples: u64,
    pub mean: Duration,
    pub p50: Duration,
    pub p99: Duration,
    pub max: Duration,
}
