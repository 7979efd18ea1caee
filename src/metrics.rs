//! Fetch client metrics collection and reporting
//!
//! Tracks latency percentiles, success rate and cache hits for the
//! upstream requests issued by a [`FetchClient`](crate::client::FetchClient).

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::RwLock;

/// Maximum number of samples to keep for metrics calculation
const MAX_SAMPLES: usize = 100;

/// Snapshot of the metrics for one fetch client
#[derive(Debug, Clone, PartialEq)]
pub struct FetchMetrics {
    /// Name of the transport the client uses
    pub transport_name: String,
    /// 50th percentile latency of successful requests in milliseconds
    pub latency_p50_ms: f64,
    /// 99th percentile latency of successful requests in milliseconds
    pub latency_p99_ms: f64,
    /// Success rate of network requests (0.0 to 1.0)
    pub success_rate: f64,
    /// Network requests issued, retries included
    pub total_requests: u64,
    /// Network requests that did not produce a payload
    pub failed_requests: u64,
    /// Calls answered from the response cache
    pub cache_hits: u64,
}

impl FetchMetrics {
    /// Creates metrics with no data
    pub fn empty(transport_name: &str) -> Self {
        Self {
            transport_name: transport_name.to_string(),
            latency_p50_ms: 0.0,
            latency_p99_ms: 0.0,
            success_rate: 1.0,
            total_requests: 0,
            failed_requests: 0,
            cache_hits: 0,
        }
    }
}

#[derive(Debug, Clone)]
struct LatencySample {
    duration_ms: f64,
    success: bool,
}

#[derive(Debug, Default)]
struct Counters {
    samples: VecDeque<LatencySample>,
    total_requests: u64,
    failed_requests: u64,
    cache_hits: u64,
}

/// Collects and computes metrics for a fetch client
#[derive(Debug)]
pub struct MetricsCollector {
    transport_name: String,
    counters: RwLock<Counters>,
}

impl MetricsCollector {
    /// Creates a new metrics collector
    pub fn new(transport_name: &str) -> Self {
        Self {
            transport_name: transport_name.to_string(),
            counters: RwLock::new(Counters {
                samples: VecDeque::with_capacity(MAX_SAMPLES),
                ..Counters::default()
            }),
        }
    }

    /// Records a network request with its duration and outcome
    pub async fn record_request(&self, duration: Duration, success: bool) {
        let mut counters = self.counters.write().await;
        counters.total_requests += 1;
        if !success {
            counters.failed_requests += 1;
        }

        if counters.samples.len() >= MAX_SAMPLES {
            counters.samples.pop_front();
        }
        counters.samples.push_back(LatencySample {
            duration_ms: duration.as_secs_f64() * 1000.0,
            success,
        });
    }

    /// Records a call served from the cache
    pub async fn record_cache_hit(&self) {
        self.counters.write().await.cache_hits += 1;
    }

    /// Computes current metrics from collected samples
    pub async fn get_metrics(&self) -> FetchMetrics {
        let counters = self.counters.read().await;

        let mut metrics = FetchMetrics::empty(&self.transport_name);
        metrics.cache_hits = counters.cache_hits;
        if counters.samples.is_empty() {
            return metrics;
        }

        let mut latencies: Vec<f64> = counters
            .samples
            .iter()
            .filter(|s| s.success)
            .map(|s| s.duration_ms)
            .collect();
        latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        metrics.latency_p50_ms = percentile(&latencies, 50.0);
        metrics.latency_p99_ms = percentile(&latencies, 99.0);
        metrics.total_requests = counters.total_requests;
        metrics.failed_requests = counters.failed_requests;
        if counters.total_requests > 0 {
            metrics.success_rate = (counters.total_requests - counters.failed_requests) as f64
                / counters.total_requests as f64;
        }
        metrics
    }
}

/// Calculate percentile from sorted values
fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    let idx = (p / 100.0 * (sorted_values.len() - 1) as f64).round() as usize;
    sorted_values[idx.min(sorted_values.len() - 1)]
}
