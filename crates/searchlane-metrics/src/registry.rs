// Copyright 2025 Searchlane Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::snapshot::{CallTypeMetrics, HostMetrics, MetricsSnapshot};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock as StdRwLock};
use std::time::{Instant, SystemTime};

/// One bin per power of two microseconds; bin 63 catches everything above.
const NUM_HISTOGRAM_BINS: usize = 64;

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Base-2 logarithmic latency histogram.
///
/// Recording is a single relaxed `fetch_add` per counter. Percentiles are
/// estimated as the upper bound of the bin holding the target rank, so they
/// overestimate by at most a factor of two.
#[derive(Debug)]
struct LatencyHistogram {
    bins: [AtomicU64; NUM_HISTOGRAM_BINS],
    total_latency: AtomicU64,
    sample_count: AtomicU64,
}

impl LatencyHistogram {
    fn new() -> Self {
        Self {
            bins: std::array::from_fn(|_| AtomicU64::new(0)),
            total_latency: AtomicU64::new(0),
            sample_count: AtomicU64::new(0),
        }
    }

    fn record(&self, latency_us: u64) {
        self.bins[Self::latency_to_bin(latency_us)].fetch_add(1, Ordering::Relaxed);
        self.total_latency.fetch_add(latency_us, Ordering::Relaxed);
        self.sample_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Bin `b` holds latencies in `[2^(b-1), 2^b)`; bin 0 holds zero.
    fn latency_to_bin(latency_us: u64) -> usize {
        let bits = (u64::BITS - latency_us.leading_zeros()) as usize;
        bits.min(NUM_HISTOGRAM_BINS - 1)
    }

    fn bin_upper_bound(bin: usize) -> u64 {
        if bin == 0 {
            0
        } else {
            (1u64 << bin) - 1
        }
    }

    fn estimate_percentile(&self, percentile: u64) -> u64 {
        let total = self.sample_count.load(Ordering::Relaxed);
        if total == 0 {
            return 0;
        }

        let target = ((total * percentile) / 100).max(1);
        let mut cumulative = 0;
        for (bin, count) in self.bins.iter().enumerate() {
            cumulative += count.load(Ordering::Relaxed);
            if cumulative >= target {
                return Self::bin_upper_bound(bin);
            }
        }
        Self::bin_upper_bound(NUM_HISTOGRAM_BINS - 1)
    }

    /// Returns `(avg, p50, p95, p99)` in microseconds.
    fn calculate_percentiles(&self) -> (u64, u64, u64, u64) {
        let total = self.sample_count.load(Ordering::Relaxed);
        if total == 0 {
            return (0, 0, 0, 0);
        }

        let avg = self.total_latency.load(Ordering::Relaxed) / total;
        (
            avg,
            self.estimate_percentile(50),
            self.estimate_percentile(95),
            self.estimate_percentile(99),
        )
    }
}

#[derive(Debug)]
struct CallStats {
    call_count: AtomicU64,
    success_count: AtomicU64,
    failure_count: AtomicU64,
    latencies: LatencyHistogram,
}

impl CallStats {
    fn new() -> Self {
        Self {
            call_count: AtomicU64::new(0),
            success_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
            latencies: LatencyHistogram::new(),
        }
    }

    fn snapshot(&self) -> CallTypeMetrics {
        let (avg_latency_us, p50_latency_us, p95_latency_us, p99_latency_us) =
            self.latencies.calculate_percentiles();

        CallTypeMetrics {
            call_count: self.call_count.load(Ordering::Relaxed),
            success_count: self.success_count.load(Ordering::Relaxed),
            failure_count: self.failure_count.load(Ordering::Relaxed),
            avg_latency_us,
            p50_latency_us,
            p95_latency_us,
            p99_latency_us,
        }
    }
}

#[derive(Debug)]
struct HostStats {
    attempt_count: AtomicU64,
    failure_count: AtomicU64,
    last_attempt_ms: AtomicU64,
}

impl HostStats {
    fn new() -> Self {
        Self {
            attempt_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
            last_attempt_ms: AtomicU64::new(0),
        }
    }
}

/// Thread-safe metrics storage for one client.
///
/// Counters are lock-free atomics. The per-host and per-call-type maps sit
/// behind `RwLock`s that are only write-locked the first time a key is seen;
/// the set of hosts and call types is fixed at client construction, so in
/// steady state every recording takes a read lock and a few relaxed adds.
///
/// Snapshots are eventually consistent: counters read during a concurrent
/// update may be off by one relative to each other.
///
/// # Example
///
/// ```rust
/// use searchlane_metrics::ClientMetrics;
/// use std::time::Instant;
///
/// let metrics = ClientMetrics::new();
/// let start = Instant::now();
/// metrics.record_attempt("https://app-1.searchlane.net", false);
/// metrics.record_attempt("https://app-2.searchlane.net", true);
/// metrics.record_call("search", start, true);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.total_calls, 1);
/// assert_eq!(snapshot.total_attempts, 2);
/// ```
#[derive(Debug)]
pub struct ClientMetrics {
    total_calls: AtomicU64,
    successful_calls: AtomicU64,
    failed_calls: AtomicU64,
    total_attempts: AtomicU64,
    call_types: StdRwLock<HashMap<String, Arc<CallStats>>>,
    hosts: StdRwLock<HashMap<String, Arc<HostStats>>>,
    start_time: Instant,
}

impl ClientMetrics {
    pub fn new() -> Self {
        Self {
            total_calls: AtomicU64::new(0),
            successful_calls: AtomicU64::new(0),
            failed_calls: AtomicU64::new(0),
            total_attempts: AtomicU64::new(0),
            call_types: StdRwLock::new(HashMap::new()),
            hosts: StdRwLock::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Records one physical attempt against `host`.
    pub fn record_attempt(&self, host: &str, success: bool) {
        self.total_attempts.fetch_add(1, Ordering::Relaxed);

        let stats = get_or_insert(&self.hosts, host, HostStats::new);
        stats.attempt_count.fetch_add(1, Ordering::Relaxed);
        if !success {
            stats.failure_count.fetch_add(1, Ordering::Relaxed);
        }
        stats.last_attempt_ms.store(now_ms(), Ordering::Relaxed);
    }

    /// Records one logical call of `call_type` that began at `start_time`.
    pub fn record_call(&self, call_type: &str, start_time: Instant, success: bool) {
        let latency_us = start_time.elapsed().as_micros() as u64;

        self.total_calls.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_calls.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_calls.fetch_add(1, Ordering::Relaxed);
        }

        let stats = get_or_insert(&self.call_types, call_type, CallStats::new);
        stats.call_count.fetch_add(1, Ordering::Relaxed);
        if success {
            stats.success_count.fetch_add(1, Ordering::Relaxed);
        } else {
            stats.failure_count.fetch_add(1, Ordering::Relaxed);
        }
        stats.latencies.record(latency_us);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let call_types = self
            .call_types
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(name, stats)| (name.clone(), stats.snapshot()))
            .collect();

        let hosts = self
            .hosts
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(host, stats)| {
                let metrics = HostMetrics {
                    host: host.clone(),
                    attempt_count: stats.attempt_count.load(Ordering::Relaxed),
                    failure_count: stats.failure_count.load(Ordering::Relaxed),
                    last_attempt_ms: stats.last_attempt_ms.load(Ordering::Relaxed),
                };
                (host.clone(), metrics)
            })
            .collect();

        MetricsSnapshot {
            total_calls: self.total_calls.load(Ordering::Relaxed),
            successful_calls: self.successful_calls.load(Ordering::Relaxed),
            failed_calls: self.failed_calls.load(Ordering::Relaxed),
            total_attempts: self.total_attempts.load(Ordering::Relaxed),
            uptime_ms: self.start_time.elapsed().as_millis() as u64,
            call_types,
            hosts,
        }
    }
}

impl Default for ClientMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn get_or_insert<T>(
    map: &StdRwLock<HashMap<String, Arc<T>>>,
    key: &str,
    make: impl FnOnce() -> T,
) -> Arc<T> {
    if let Some(existing) = map
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .get(key)
    {
        return existing.clone();
    }

    map.write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .entry(key.to_string())
        .or_insert_with(|| Arc::new(make()))
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_latency_to_bin() {
        assert_eq!(LatencyHistogram::latency_to_bin(0), 0);
        assert_eq!(LatencyHistogram::latency_to_bin(1), 1);
        assert_eq!(LatencyHistogram::latency_to_bin(2), 2);
        assert_eq!(LatencyHistogram::latency_to_bin(3), 2);
        assert_eq!(LatencyHistogram::latency_to_bin(1024), 11);
        assert_eq!(LatencyHistogram::latency_to_bin(u64::MAX), NUM_HISTOGRAM_BINS - 1);
    }

    #[test]
    fn test_empty_histogram() {
        let histogram = LatencyHistogram::new();
        assert_eq!(histogram.calculate_percentiles(), (0, 0, 0, 0));
    }

    #[test]
    fn test_percentiles_bound_samples() {
        let histogram = LatencyHistogram::new();
        for _ in 0..90 {
            histogram.record(100);
        }
        for _ in 0..10 {
            histogram.record(10_000);
        }

        let (avg, p50, p95, p99) = histogram.calculate_percentiles();
        assert_eq!(avg, (90 * 100 + 10 * 10_000) / 100);
        // 100us lives in [64, 128)
        assert_eq!(p50, 127);
        // 10ms lives in [8192, 16384)
        assert_eq!(p95, 16_383);
        assert_eq!(p99, 16_383);
    }

    #[test]
    fn test_record_attempts_per_host() {
        let metrics = ClientMetrics::new();
        metrics.record_attempt("a", false);
        metrics.record_attempt("a", true);
        metrics.record_attempt("b", true);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_attempts, 3);
        let a = &snapshot.hosts["a"];
        assert_eq!(a.attempt_count, 2);
        assert_eq!(a.failure_count, 1);
        assert!(a.last_attempt_ms > 0);
        assert_eq!(snapshot.hosts["b"].failure_count, 0);
    }

    #[test]
    fn test_record_calls_per_type() {
        let metrics = ClientMetrics::new();
        let start = Instant::now();
        metrics.record_call("search", start, true);
        metrics.record_call("search", start, false);
        metrics.record_call("write", start, true);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_calls, 3);
        assert_eq!(snapshot.successful_calls, 2);
        assert_eq!(snapshot.failed_calls, 1);
        assert_eq!(snapshot.call_types["search"].call_count, 2);
        assert_eq!(snapshot.call_types["search"].failure_count, 1);
        assert_eq!(snapshot.call_types["write"].success_count, 1);
    }

    #[test]
    fn test_concurrent_recording() {
        let metrics = Arc::new(ClientMetrics::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let metrics = metrics.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        metrics.record_attempt(&format!("host-{}", i % 3), true);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_attempts, 8000);
        let per_host: u64 = snapshot.hosts.values().map(|h| h.attempt_count).sum();
        assert_eq!(per_host, 8000);
        assert_eq!(snapshot.hosts.len(), 3);
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = ClientMetrics::new();
        metrics.record_call("read", Instant::now(), true);
        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["call_types"]["read"]["call_count"], 1);
    }
}
