//! Axum middleware recording request counters/latency into a
//! `MetricsCollector`, grounded in `at-telemetry::middleware::metrics_middleware`
//! (adapted to take the collector as captured state rather than a process
//! global, since `cr-proxy` already owns one `Arc<MetricsCollector>` per
//! `ApiState`).

use std::time::Instant;

use crate::metrics::MetricsCollector;

const DURATION_BUCKETS: [f64; 8] = [0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

/// Record one completed request's metrics. Called from `cr-proxy`'s
/// `axum::middleware::from_fn` closure, which owns the `Next` handle this
/// crate shouldn't need to know about.
pub async fn record_request(metrics: &MetricsCollector, method: &str, path: &str, status: u16, start: Instant) {
    let duration = start.elapsed().as_secs_f64();
    metrics.increment_counter_by(
        "api_requests_total",
        &[("method", method), ("path", path), ("status", &status.to_string())],
        1,
    );
    metrics.record_histogram("api_request_duration_seconds", &DURATION_BUCKETS, duration);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn record_request_updates_counter_and_histogram() {
        let metrics = MetricsCollector::new();
        record_request(&metrics, "POST", "/v1/chat/completions", 200, Instant::now()).await;
        assert_eq!(
            metrics.get_counter("api_requests_total", &[("method", "POST"), ("path", "/v1/chat/completions"), ("status", "200")]),
            1
        );
        let export = metrics.export_prometheus();
        assert!(export.contains("api_request_duration_seconds_count 1"));
    }
}
