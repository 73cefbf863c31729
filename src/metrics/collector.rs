//! # Collector de Métricas
//! src/metrics/collector.rs
//!
//! Recolecta y agrega métricas del servidor en tiempo real.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::pool::PoolStats;

/// Latencias guardadas para calcular percentiles
const MAX_LATENCIES: usize = 10_000;

/// Paths distintos que se cuentan por separado; el resto va a `OTHER_PATH`
const MAX_TRACKED_PATHS: usize = 64;
const OTHER_PATH: &str = "(other)";

/// Collector de métricas thread-safe
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsData>>,
    start_time: Instant,
    started_at: DateTime<Utc>,
}

/// Datos internos de métricas
#[derive(Default)]
struct MetricsData {
    total_requests: u64,

    /// Requests por código de estado
    status_codes: BTreeMap<u16, u64>,

    /// Ventana de latencias (microsegundos), las más viejas salen primero
    latencies: VecDeque<u64>,

    requests_per_path: HashMap<String, u64>,

    /// Conexiones rechazadas por cola llena
    rejected: u64,

    /// Threads atendiendo una conexión en este momento
    active_threads: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsData {
                latencies: VecDeque::with_capacity(MAX_LATENCIES),
                ..MetricsData::default()
            })),
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MetricsData> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registra un request atendido
    pub fn record_request(&self, path: &str, status_code: u16, latency: Duration) {
        let mut data = self.lock();

        data.total_requests += 1;
        *data.status_codes.entry(status_code).or_insert(0) += 1;

        if data.latencies.len() >= MAX_LATENCIES {
            data.latencies.pop_front();
        }
        data.latencies
            .push_back(u64::try_from(latency.as_micros()).unwrap_or(u64::MAX));

        let tracked = data.requests_per_path.contains_key(path)
            || data.requests_per_path.len() < MAX_TRACKED_PATHS;
        let key = if tracked { path } else { OTHER_PATH };
        *data.requests_per_path.entry(key.to_string()).or_insert(0) += 1;
    }

    /// Conexión rechazada con 503 antes de llegar al pool
    pub fn record_rejected(&self) {
        self.lock().rejected += 1;
    }

    pub fn increment_active_threads(&self) {
        self.lock().active_threads += 1;
    }

    pub fn decrement_active_threads(&self) {
        let mut data = self.lock();
        data.active_threads = data.active_threads.saturating_sub(1);
    }

    pub fn active_threads(&self) -> u64 {
        self.lock().active_threads
    }

    /// Métricas actuales para `/metrics`
    ///
    /// `pool` y `artifacts` los aporta quien llama; el collector no conoce
    /// al pool ni al store.
    pub fn to_json(&self, pool: Option<PoolStats>, artifacts: Option<usize>) -> Value {
        let data = self.lock();
        let snapshot = self.snapshot_of(&data);

        let mut paths: Vec<_> = data.requests_per_path.iter().collect();
        paths.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        let top_paths: Vec<Value> = paths
            .iter()
            .take(10)
            .map(|(path, count)| json!({"path": path, "count": count}))
            .collect();

        let status_codes: BTreeMap<String, u64> = data
            .status_codes
            .iter()
            .map(|(code, count)| (code.to_string(), *count))
            .collect();

        json!({
            "server": {
                "uptime_seconds": snapshot.uptime_secs,
                "start_time": self.started_at,
            },
            "requests": {
                "total": snapshot.total_requests,
                "active_threads": snapshot.active_threads,
                "rejected": snapshot.rejected,
                "status_codes": status_codes,
                "top_paths": top_paths,
            },
            "latency_us": snapshot.latency,
            "pool": pool,
            "store": {
                "artifacts": artifacts,
            },
        })
    }

    /// Contadores y percentiles del momento
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.snapshot_of(&self.lock())
    }

    fn snapshot_of(&self, data: &MetricsData) -> MetricsSnapshot {
        let latencies: Vec<u64> = data.latencies.iter().copied().collect();

        MetricsSnapshot {
            total_requests: data.total_requests,
            rejected: data.rejected,
            active_threads: data.active_threads,
            uptime_secs: self.start_time.elapsed().as_secs(),
            latency: LatencySummary::from_samples(&latencies),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Percentiles de latencia (microsegundos)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LatencySummary {
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub avg: u64,
    pub stddev: f64,
    pub samples: usize,
}

impl LatencySummary {
    fn from_samples(latencies: &[u64]) -> Self {
        if latencies.is_empty() {
            return Self::default();
        }

        let mut sorted = latencies.to_vec();
        sorted.sort_unstable();

        let len = sorted.len();
        let avg = sorted.iter().sum::<u64>() / len as u64;

        let variance = sorted
            .iter()
            .map(|&x| {
                let diff = x as f64 - avg as f64;
                diff * diff
            })
            .sum::<f64>()
            / len as f64;

        Self {
            p50: sorted[len * 50 / 100],
            p95: sorted[len * 95 / 100],
            p99: sorted[len * 99 / 100],
            avg,
            stddev: variance.sqrt(),
            samples: len,
        }
    }
}

/// Snapshot de métricas (para uso externo)
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub rejected: u64,
    pub active_threads: u64,
    pub uptime_secs: u64,
    pub latency: LatencySummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector() {
        let collector = MetricsCollector::new();

        collector.record_request("/jobs", 200, Duration::from_millis(10));
        collector.record_request("/jobs", 200, Duration::from_millis(20));
        collector.record_request("/nope", 404, Duration::from_millis(5));

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.total_requests, 3);
        assert_eq!(snapshot.latency.samples, 3);
    }

    #[test]
    fn test_percentiles() {
        let collector = MetricsCollector::new();

        for i in 1..=100 {
            collector.record_request("/test", 200, Duration::from_micros(i));
        }

        let latency = collector.snapshot().latency;
        assert!(latency.p50 > 0);
        assert!(latency.p95 > latency.p50);
        assert!(latency.p99 > latency.p95);
    }

    #[test]
    fn test_active_threads_tracking() {
        let collector = MetricsCollector::new();

        collector.increment_active_threads();
        collector.increment_active_threads();
        assert_eq!(collector.active_threads(), 2);

        collector.decrement_active_threads();
        collector.decrement_active_threads();
        collector.decrement_active_threads();
        assert_eq!(collector.active_threads(), 0);
    }

    #[test]
    fn test_json_format() {
        let collector = MetricsCollector::new();
        collector.record_request("/jobs", 200, Duration::from_millis(50));
        collector.record_request("/health", 200, Duration::from_millis(1));
        collector.record_rejected();

        let json = collector.to_json(None, Some(3));

        assert_eq!(json["requests"]["total"], 2);
        assert_eq!(json["requests"]["rejected"], 1);
        assert_eq!(json["requests"]["status_codes"]["200"], 2);
        assert_eq!(json["latency_us"]["samples"], 2);
        assert_eq!(json["store"]["artifacts"], 3);
        assert!(json["pool"].is_null());
    }

    #[test]
    fn test_json_matches_snapshot() {
        let collector = MetricsCollector::new();
        for ms in [5, 10, 20] {
            collector.record_request("/jobs", 200, Duration::from_millis(ms));
        }

        let snapshot = collector.snapshot();
        let json = collector.to_json(None, None);

        assert_eq!(json["requests"]["total"], snapshot.total_requests);
        assert_eq!(json["latency_us"]["p50"], snapshot.latency.p50);
        assert_eq!(json["latency_us"]["samples"], snapshot.latency.samples);
    }

    #[test]
    fn test_latency_window_management() {
        let collector = MetricsCollector::new();

        for i in 0..15_000 {
            collector.record_request("/test", 200, Duration::from_micros(i));
        }

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.total_requests, 15_000);
        assert_eq!(snapshot.latency.samples, MAX_LATENCIES);
    }

    #[test]
    fn test_path_cardinality_is_bounded() {
        let collector = MetricsCollector::new();

        for i in 0..(MAX_TRACKED_PATHS + 10) {
            collector.record_request(&format!("/random/{}", i), 404, Duration::from_micros(1));
        }

        let data = collector.lock();
        assert_eq!(data.requests_per_path.len(), MAX_TRACKED_PATHS + 1);
        assert_eq!(data.requests_per_path[OTHER_PATH], 10);
    }
}
