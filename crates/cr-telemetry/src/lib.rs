//! Observability: logging init, a Prometheus-style metrics collector, and
//! the `TelemetryHooks` callback surface.
//!
//! Mirrors `at-telemetry`'s scope, trimmed of the OpenTelemetry trace/span
//! correlation layer `at-telemetry` carries for a multi-service agent
//! daemon — this proxy is a single process with no downstream span fan-out.

pub mod hooks;
pub mod logging;
pub mod metrics;
pub mod middleware;

pub use hooks::{TelemetryError, TelemetryHooks, TracingHooks, UsageRecord};
pub use logging::{init_logging, init_logging_json};
pub use metrics::MetricsCollector;
pub use middleware::record_request;
