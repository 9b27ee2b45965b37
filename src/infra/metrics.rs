//! Lock-free metrics collection and periodic reporting
//!
//! Tick counters and latency histograms are atomics so the tick driver and
//! the reporter never contend. Per-gate dispatch counts are only touched on
//! dispatch, so they live behind a small mutex.
//!
//! NOTE: All atomics use Relaxed ordering intentionally, these are
//! statistical counters only.

use crate::domain::types::GateId;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Tick latency bucket boundaries (microseconds)
/// Buckets: ≤10, ≤20, ≤40, ≤80, ≤160, ≤320, ≤640, ≤1280, >1280
const BUCKET_BOUNDS: [u64; 8] = [10, 20, 40, 80, 160, 320, 640, 1280];
pub const METRICS_NUM_BUCKETS: usize = 9;

#[inline]
fn bucket_index(latency_us: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < latency_us)
}

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

/// Upper bound of the bucket containing the percentile
fn percentile_from_buckets(buckets: &[u64; METRICS_NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }
    let target = ((total as f64 * percentile).ceil() as u64).max(1);
    let mut cumulative = 0u64;

    // Last bucket reports twice the previous bound
    const BUCKET_UPPER_BOUNDS: [u64; METRICS_NUM_BUCKETS] =
        [10, 20, 40, 80, 160, 320, 640, 1280, 2560];

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[METRICS_NUM_BUCKETS - 1]
}

/// Lock-free metrics collector
pub struct Metrics {
    /// Total ticks ever executed (monotonic)
    ticks_total: AtomicU64,
    /// Ticks since last report (reset on report)
    ticks_since_report: AtomicU64,
    /// Sum of tick latencies (reset on report)
    tick_latency_sum_us: AtomicU64,
    /// Max tick latency (reset on report)
    tick_latency_max_us: AtomicU64,
    /// Tick latency histogram (reset on report)
    tick_latency_buckets: [AtomicU64; METRICS_NUM_BUCKETS],
    dispatches_total: AtomicU64,
    redirects_total: AtomicU64,
    direction_changes_total: AtomicU64,
    /// Dispatches per target gate (monotonic)
    dispatches_by_gate: Mutex<FxHashMap<GateId, u64>>,
    last_report_time: Mutex<Instant>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            ticks_total: AtomicU64::new(0),
            ticks_since_report: AtomicU64::new(0),
            tick_latency_sum_us: AtomicU64::new(0),
            tick_latency_max_us: AtomicU64::new(0),
            tick_latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            dispatches_total: AtomicU64::new(0),
            redirects_total: AtomicU64::new(0),
            direction_changes_total: AtomicU64::new(0),
            dispatches_by_gate: Mutex::new(FxHashMap::default()),
            last_report_time: Mutex::new(Instant::now()),
        }
    }

    /// Record a completed tick with its pipeline latency
    #[inline]
    pub fn record_tick(&self, latency_us: u64) {
        self.ticks_total.fetch_add(1, Ordering::Relaxed);
        self.ticks_since_report.fetch_add(1, Ordering::Relaxed);
        self.tick_latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        update_atomic_max(&self.tick_latency_max_us, latency_us);
        self.tick_latency_buckets[bucket_index(latency_us)].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatch(&self, gate: &GateId) {
        self.dispatches_total.fetch_add(1, Ordering::Relaxed);
        *self.dispatches_by_gate.lock().entry(gate.clone()).or_insert(0) += 1;
    }

    pub fn record_redirect(&self, to: &GateId) {
        self.redirects_total.fetch_add(1, Ordering::Relaxed);
        *self.dispatches_by_gate.lock().entry(to.clone()).or_insert(0) += 1;
    }

    #[inline]
    pub fn record_direction_change(&self) {
        self.direction_changes_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ticks_total(&self) -> u64 {
        self.ticks_total.load(Ordering::Relaxed)
    }

    pub fn dispatches_total(&self) -> u64 {
        self.dispatches_total.load(Ordering::Relaxed)
    }

    pub fn redirects_total(&self) -> u64 {
        self.redirects_total.load(Ordering::Relaxed)
    }

    pub fn direction_changes_total(&self) -> u64 {
        self.direction_changes_total.load(Ordering::Relaxed)
    }

    pub fn dispatches_for(&self, gate: &GateId) -> u64 {
        self.dispatches_by_gate.lock().get(gate).copied().unwrap_or(0)
    }

    /// Calculate and return metrics summary, then reset periodic counters
    pub fn report(&self) -> MetricsSummary {
        let ticks_count = self.ticks_since_report.swap(0, Ordering::Relaxed);
        let latency_sum = self.tick_latency_sum_us.swap(0, Ordering::Relaxed);
        let latency_max = self.tick_latency_max_us.swap(0, Ordering::Relaxed);
        let mut lat_buckets = [0u64; METRICS_NUM_BUCKETS];
        for (i, bucket) in self.tick_latency_buckets.iter().enumerate() {
            lat_buckets[i] = bucket.swap(0, Ordering::Relaxed);
        }

        let elapsed = {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        let ticks_per_sec = if elapsed.as_secs_f64() > 0.0 {
            ticks_count as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        let mut dispatches_by_gate: Vec<(String, u64)> = self
            .dispatches_by_gate
            .lock()
            .iter()
            .map(|(gate, count)| (gate.to_string(), *count))
            .collect();
        dispatches_by_gate.sort();

        MetricsSummary {
            ticks_total: self.ticks_total.load(Ordering::Relaxed),
            ticks_per_sec,
            avg_tick_latency_us: if ticks_count > 0 { latency_sum / ticks_count } else { 0 },
            max_tick_latency_us: latency_max,
            tick_p99_us: percentile_from_buckets(&lat_buckets, 0.99),
            lat_buckets,
            dispatches_total: self.dispatches_total.load(Ordering::Relaxed),
            redirects_total: self.redirects_total.load(Ordering::Relaxed),
            direction_changes_total: self.direction_changes_total.load(Ordering::Relaxed),
            dispatches_by_gate,
        }
    }
}

/// Point-in-time summary produced by `Metrics::report`
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub ticks_total: u64,
    pub ticks_per_sec: f64,
    pub avg_tick_latency_us: u64,
    pub max_tick_latency_us: u64,
    pub tick_p99_us: u64,
    pub lat_buckets: [u64; METRICS_NUM_BUCKETS],
    pub dispatches_total: u64,
    pub redirects_total: u64,
    pub direction_changes_total: u64,
    pub dispatches_by_gate: Vec<(String, u64)>,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            ticks_total = %self.ticks_total,
            ticks_per_sec = format!("{:.1}", self.ticks_per_sec),
            avg_tick_us = %self.avg_tick_latency_us,
            max_tick_us = %self.max_tick_latency_us,
            p99_tick_us = %self.tick_p99_us,
            dispatches = %self.dispatches_total,
            redirects = %self.redirects_total,
            direction_changes = %self.direction_changes_total,
            by_gate = ?self.dispatches_by_gate,
            "metrics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_index() {
        assert_eq!(bucket_index(0), 0);
        assert_eq!(bucket_index(10), 0);
        assert_eq!(bucket_index(11), 1);
        assert_eq!(bucket_index(1280), 7);
        assert_eq!(bucket_index(5000), 8);
    }

    #[test]
    fn test_record_tick_and_report() {
        let metrics = Metrics::new();
        metrics.record_tick(5);
        metrics.record_tick(15);
        metrics.record_tick(100);

        let summary = metrics.report();
        assert_eq!(summary.ticks_total, 3);
        assert_eq!(summary.avg_tick_latency_us, 40);
        assert_eq!(summary.max_tick_latency_us, 100);
        assert_eq!(summary.lat_buckets.iter().sum::<u64>(), 3);
        assert_eq!(summary.tick_p99_us, 160);

        // Periodic counters reset, monotonic ones do not
        let summary = metrics.report();
        assert_eq!(summary.ticks_total, 3);
        assert_eq!(summary.max_tick_latency_us, 0);
        assert_eq!(summary.lat_buckets.iter().sum::<u64>(), 0);
    }

    #[test]
    fn test_dispatch_counts_by_gate() {
        let metrics = Metrics::new();
        let east = GateId::new("east");
        let west = GateId::new("west");
        metrics.record_dispatch(&east);
        metrics.record_dispatch(&east);
        metrics.record_redirect(&west);

        assert_eq!(metrics.dispatches_total(), 2);
        assert_eq!(metrics.redirects_total(), 1);
        assert_eq!(metrics.dispatches_for(&east), 2);
        assert_eq!(metrics.dispatches_for(&west), 1);
        assert_eq!(
            metrics.report().dispatches_by_gate,
            vec![("east".to_string(), 2), ("west".to_string(), 1)]
        );
    }

    #[test]
    fn test_percentile_empty() {
        assert_eq!(percentile_from_buckets(&[0; METRICS_NUM_BUCKETS], 0.99), 0);
    }
}
