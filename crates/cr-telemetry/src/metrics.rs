//! Prometheus-style counters/gauges/histograms backing `GET /metrics`.
//!
//! Grounded in `at-telemetry::metrics::{Histogram, Labels, MetricsCollector}`,
//! trimmed to the counter/gauge/histogram surface `cr-proxy` actually needs
//! (no pre-registered histogram set — `cr-proxy` registers its own).

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::RwLock;

use ahash::AHashMap;

#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<f64>,
    counts: Vec<AtomicU64>,
    sum_bits: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    pub fn new(buckets: Vec<f64>) -> Self {
        let counts = buckets.iter().map(|_| AtomicU64::new(0)).collect();
        Self {
            buckets,
            counts,
            sum_bits: AtomicU64::new(0.0_f64.to_bits()),
            count: AtomicU64::new(0),
        }
    }

    pub fn observe(&self, value: f64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        loop {
            let current = self.sum_bits.load(Ordering::Relaxed);
            let updated = (f64::from_bits(current) + value).to_bits();
            if self
                .sum_bits
                .compare_exchange_weak(current, updated, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                break;
            }
        }
        for (i, boundary) in self.buckets.iter().enumerate() {
            if value <= *boundary {
                self.counts[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn sum(&self) -> f64 {
        f64::from_bits(self.sum_bits.load(Ordering::Relaxed))
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// Sorted key=value pairs distinguishing counter/gauge families.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Labels(Vec<(String, String)>);

impl Labels {
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        let mut v: Vec<(String, String)> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        v.sort();
        Self(v)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    fn prometheus_str(&self) -> String {
        if self.0.is_empty() {
            return String::new();
        }
        let inner: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}=\"{v}\"")).collect();
        format!("{{{}}}", inner.join(","))
    }
}

#[derive(Debug, Default)]
pub struct MetricsCollector {
    counters: RwLock<AHashMap<(String, Labels), AtomicU64>>,
    gauges: RwLock<AHashMap<String, AtomicI64>>,
    histograms: RwLock<AHashMap<String, Histogram>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_counter(&self, name: &str, labels: &[(&str, &str)]) {
        self.increment_counter_by(name, labels, 1);
    }

    pub fn increment_counter_by(&self, name: &str, labels: &[(&str, &str)], amount: u64) {
        let key = (name.to_string(), Labels::new(labels));
        {
            let map = self.counters.read().unwrap();
            if let Some(c) = map.get(&key) {
                c.fetch_add(amount, Ordering::Relaxed);
                return;
            }
        }
        let mut map = self.counters.write().unwrap();
        map.entry(key).or_insert_with(|| AtomicU64::new(0)).fetch_add(amount, Ordering::Relaxed);
    }

    pub fn get_counter(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        let key = (name.to_string(), Labels::new(labels));
        self.counters.read().unwrap().get(&key).map(|c| c.load(Ordering::Relaxed)).unwrap_or(0)
    }

    pub fn set_gauge(&self, name: &str, value: i64) {
        {
            let map = self.gauges.read().unwrap();
            if let Some(g) = map.get(name) {
                g.store(value, Ordering::Relaxed);
                return;
            }
        }
        let mut map = self.gauges.write().unwrap();
        map.entry(name.to_string()).or_insert_with(|| AtomicI64::new(0)).store(value, Ordering::Relaxed);
    }

    pub fn get_gauge(&self, name: &str) -> i64 {
        self.gauges.read().unwrap().get(name).map(|g| g.load(Ordering::Relaxed)).unwrap_or(0)
    }

    pub fn record_histogram(&self, name: &str, buckets: &[f64], value: f64) {
        {
            let map = self.histograms.read().unwrap();
            if let Some(h) = map.get(name) {
                h.observe(value);
                return;
            }
        }
        let mut map = self.histograms.write().unwrap();
        map.entry(name.to_string())
            .or_insert_with(|| Histogram::new(buckets.to_vec()))
            .observe(value);
    }

    /// Render every registered metric in Prometheus text exposition format.
    pub fn export_prometheus(&self) -> String {
        let mut out = String::new();

        for ((name, labels), value) in self.counters.read().unwrap().iter() {
            out.push_str(&format!("# TYPE {name} counter\n"));
            out.push_str(&format!("{name}{} {}\n", labels.prometheus_str(), value.load(Ordering::Relaxed)));
        }

        for (name, value) in self.gauges.read().unwrap().iter() {
            out.push_str(&format!("# TYPE {name} gauge\n{name} {}\n", value.load(Ordering::Relaxed)));
        }

        for (name, histogram) in self.histograms.read().unwrap().iter() {
            out.push_str(&format!("# TYPE {name} histogram\n"));
            out.push_str(&format!("{name}_sum {}\n", histogram.sum()));
            out.push_str(&format!("{name}_count {}\n", histogram.count()));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_accumulates_across_increments() {
        let metrics = MetricsCollector::new();
        metrics.increment_counter("requests_total", &[("tier", "SIMPLE")]);
        metrics.increment_counter("requests_total", &[("tier", "SIMPLE")]);
        assert_eq!(metrics.get_counter("requests_total", &[("tier", "SIMPLE")]), 2);
    }

    #[test]
    fn distinct_label_sets_are_independent_counters() {
        let metrics = MetricsCollector::new();
        metrics.increment_counter("requests_total", &[("tier", "SIMPLE")]);
        metrics.increment_counter("requests_total", &[("tier", "COMPLEX")]);
        assert_eq!(metrics.get_counter("requests_total", &[("tier", "SIMPLE")]), 1);
        assert_eq!(metrics.get_counter("requests_total", &[("tier", "COMPLEX")]), 1);
    }

    #[test]
    fn gauge_stores_latest_value() {
        let metrics = MetricsCollector::new();
        metrics.set_gauge("active_requests", 3);
        metrics.set_gauge("active_requests", 5);
        assert_eq!(metrics.get_gauge("active_requests"), 5);
    }

    #[test]
    fn histogram_tracks_sum_and_count() {
        let metrics = MetricsCollector::new();
        let buckets = vec![0.1, 0.5, 1.0, 5.0];
        metrics.record_histogram("latency_seconds", &buckets, 0.2);
        metrics.record_histogram("latency_seconds", &buckets, 0.8);
        let export = metrics.export_prometheus();
        assert!(export.contains("latency_seconds_count 2"));
    }
}
