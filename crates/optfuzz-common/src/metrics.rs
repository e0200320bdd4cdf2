//! Iteration latency metrics for campaign summaries.

use std::time::Duration;

/// Running statistics over campaign iteration latencies.
#[derive(Debug, Clone)]
pub struct IterationMetrics {
    /// Iterations recorded.
    count: u64,
    /// Minimum observed latency in nanoseconds.
    min_ns: u64,
    /// Maximum observed latency in nanoseconds.
    max_ns: u64,
    /// Sum of all latencies for mean calculation.
    sum_ns: u128,
}

impl Default for IterationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl IterationMetrics {
    /// Create an empty metrics collector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            count: 0,
            min_ns: u64::MAX,
            max_ns: 0,
            sum_ns: 0,
        }
    }

    /// Record the latency of one completed iteration.
    pub fn record(&mut self, duration: Duration) {
        let ns = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);

        self.count += 1;
        self.min_ns = self.min_ns.min(ns);
        self.max_ns = self.max_ns.max(ns);
        self.sum_ns += u128::from(ns);
    }

    /// Number of iterations recorded.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Fastest iteration.
    #[must_use]
    pub fn min(&self) -> Option<Duration> {
        (self.count > 0).then(|| Duration::from_nanos(self.min_ns))
    }

    /// Slowest iteration.
    #[must_use]
    pub fn max(&self) -> Option<Duration> {
        (self.count > 0).then(|| Duration::from_nanos(self.max_ns))
    }

    /// Mean iteration latency.
    #[must_use]
    pub fn mean(&self) -> Option<Duration> {
        if self.count == 0 {
            return None;
        }
        let mean = self.sum_ns / u128::from(self.count);
        Some(Duration::from_nanos(u64::try_from(mean).unwrap_or(u64::MAX)))
    }

    /// Iterations per second over `elapsed` wall time.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn throughput(&self, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        if secs > 0.0 {
            self.count as f64 / secs
        } else {
            0.0
        }
    }
}
