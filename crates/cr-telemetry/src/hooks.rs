//! Telemetry hooks — the callback surface the proxy pipeline fires
//! into, decoupled from whatever sink the host wires in.
//!
//! Grounded in `at-telemetry::logging`'s role as the default sink; object
//! safety (`Arc<dyn TelemetryHooks>`) mirrors how `at-bridge::http_api::ApiState`
//! holds its `EventBus` as a trait object.

use cr_api_types::{RoutingDecision, Tier};

/// A proxy-pipeline failure, described independently of `cr-proxy`'s
/// `ApiError` type so this crate doesn't need to depend on it.
#[derive(Debug, Clone)]
pub struct TelemetryError {
    pub kind: String,
    pub message: String,
}

impl TelemetryError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Fired once a request completes, carrying the final accounting the
/// routing-time `RoutingDecision.cost_estimate` could only guess at.
/// `input_tokens`/`output_tokens`/`actual_cost_usd` are `None` when the
/// upstream response didn't expose a parseable usage block (e.g. a
/// streaming response, where the body is never buffered).
#[derive(Debug, Clone)]
pub struct UsageRecord {
    pub model: String,
    pub tier: Tier,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub actual_cost_usd: Option<f64>,
}

/// Routing, error, usage, and readiness callbacks. Object-safe so the
/// proxy can hold it behind `Arc<dyn TelemetryHooks>` and swap
/// implementations (e.g. a test double that records calls) without touching
/// the pipeline.
pub trait TelemetryHooks: Send + Sync {
    fn on_routed(&self, decision: &RoutingDecision);
    fn on_error(&self, error: &TelemetryError);
    fn on_usage(&self, usage: &UsageRecord);
    fn on_ready(&self, port: u16);
}

/// Default sink: logs via `tracing`.
#[derive(Debug, Default, Clone)]
pub struct TracingHooks;

impl TelemetryHooks for TracingHooks {
    fn on_routed(&self, decision: &RoutingDecision) {
        tracing::info!(
            model = %decision.model,
            tier = %decision.tier,
            method = ?decision.method,
            confidence = decision.confidence,
            savings = decision.savings,
            "routed"
        );
    }

    fn on_error(&self, error: &TelemetryError) {
        tracing::error!(kind = %error.kind, message = %error.message, "request failed");
    }

    fn on_usage(&self, usage: &UsageRecord) {
        tracing::info!(
            model = %usage.model,
            tier = %usage.tier,
            input_tokens = ?usage.input_tokens,
            output_tokens = ?usage.output_tokens,
            actual_cost_usd = ?usage.actual_cost_usd,
            "usage"
        );
    }

    fn on_ready(&self, port: u16) {
        tracing::info!(port, "clawrouter proxy ready");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingHooks {
        pub routed: Mutex<Vec<String>>,
        pub errors: Mutex<Vec<String>>,
        pub usage: Mutex<Vec<UsageRecord>>,
        pub ready_port: Mutex<Option<u16>>,
    }

    impl TelemetryHooks for RecordingHooks {
        fn on_routed(&self, decision: &RoutingDecision) {
            self.routed.lock().unwrap().push(decision.model.clone());
        }

        fn on_error(&self, error: &TelemetryError) {
            self.errors.lock().unwrap().push(error.kind.clone());
        }

        fn on_usage(&self, usage: &UsageRecord) {
            self.usage.lock().unwrap().push(usage.clone());
        }

        fn on_ready(&self, port: u16) {
            *self.ready_port.lock().unwrap() = Some(port);
        }
    }

    #[test]
    fn recording_hooks_capture_every_callback() {
        let hooks = RecordingHooks::default();
        hooks.on_ready(18800);
        hooks.on_error(&TelemetryError::new("internal_error", "boom"));
        hooks.on_usage(&UsageRecord {
            model: "gemini-2.5-flash".into(),
            tier: Tier::Simple,
            input_tokens: Some(10),
            output_tokens: Some(20),
            actual_cost_usd: Some(0.001),
        });
        assert_eq!(*hooks.ready_port.lock().unwrap(), Some(18800));
        assert_eq!(hooks.errors.lock().unwrap().len(), 1);
        assert_eq!(hooks.usage.lock().unwrap().len(), 1);
    }
}
