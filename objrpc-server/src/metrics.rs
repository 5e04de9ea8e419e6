//! Server metrics definitions
//!
//! OpenTelemetry instruments for the web service. They record into the
//! global meter provider, which `objrpc_core::init_observability` points at
//! an OTLP collector when metrics are enabled; otherwise recording is a no-op.
//!
//! # Metrics Collected
//!
//! - **requests_total**: JSON-RPC calls handled, by method and status (counter)
//! - **request_duration**: call latency in seconds, by method and status (histogram)
//! - **errors_total**: error responses, by JSON-RPC error code (counter)
//! - **unresolved_paths_total**: requests whose path named no object (counter)
//!
//! ```rust
//! use objrpc_server::ServerMetrics;
//!
//! let metrics = ServerMetrics::new("webservice");
//! metrics.record_request("close_spider", "success", 0.004);
//! metrics.record_error(-32601);
//! ```

use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
    KeyValue,
};

/// Instruments recorded by the dispatcher and the HTTP listener
///
/// All metric names share the `objrpc.server.*` prefix.
pub struct ServerMetrics {
    /// Total number of calls dispatched
    pub requests_total: Counter<u64>,
    /// Call duration in seconds
    pub request_duration: Histogram<f64>,
    /// Total number of error responses
    pub errors_total: Counter<u64>,
    /// Total number of paths that failed to resolve
    pub unresolved_paths_total: Counter<u64>,
}

impl ServerMetrics {
    /// Create instruments on the global meter named `service_name`
    pub fn new(service_name: impl Into<String>) -> Self {
        let meter = global::meter_with_scope(
            opentelemetry::InstrumentationScope::builder(service_name.into()).build(),
        );
        Self::new_with_meter(&meter)
    }

    /// Create instruments on a specific meter
    pub fn new_with_meter(meter: &Meter) -> Self {
        Self {
            requests_total: meter
                .u64_counter("objrpc.server.requests.total")
                .with_description("Total number of JSON-RPC calls dispatched")
                .build(),
            request_duration: meter
                .f64_histogram("objrpc.server.request.duration")
                .with_description("JSON-RPC call duration in seconds")
                .build(),
            errors_total: meter
                .u64_counter("objrpc.server.errors.total")
                .with_description("Total number of JSON-RPC error responses")
                .build(),
            unresolved_paths_total: meter
                .u64_counter("objrpc.server.unresolved_paths.total")
                .with_description("Total number of request paths that named no object")
                .build(),
        }
    }

    /// Record a dispatched call
    pub fn record_request(&self, method: &str, status: &str, duration_secs: f64) {
        let attributes = &[
            KeyValue::new("method", method.to_string()),
            KeyValue::new("status", status.to_string()),
        ];
        self.requests_total.add(1, attributes);
        self.request_duration.record(duration_secs, attributes);
    }

    /// Record an error response
    pub fn record_error(&self, code: i64) {
        self.errors_total.add(1, &[KeyValue::new("code", code)]);
    }

    /// Record a path that failed to resolve
    pub fn record_unresolved(&self) {
        self.unresolved_paths_total.add(1, &[]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = ServerMetrics::new("test-server");

        metrics.record_request("status", "success", 0.1);
        metrics.record_request("stop", "error", 0.01);
        metrics.record_error(-32603);
        metrics.record_unresolved();
    }

    #[test]
    fn test_metrics_with_custom_meter() {
        let meter = global::meter("objrpc-test");
        let metrics = ServerMetrics::new_with_meter(&meter);

        metrics.record_error(-32700);
        metrics.record_error(-32601);
    }
}
