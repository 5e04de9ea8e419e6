//! JSON-RPC dispatch onto a resolved object
//!
//! Given the object a request path resolved to and the raw request body,
//! the [`Dispatcher`] always produces a well-formed response envelope:
//!
//! 1. decode and validate the envelope (PARSE_ERROR / INVALID_REQUEST, id null)
//! 2. look up the method on the target (METHOD_NOT_FOUND, id echoed)
//! 3. run params through the value decoder (INVALID_PARAMS)
//! 4. invoke, catching errors and panics (INTERNAL_ERROR with a trace)
//! 5. encode the output (INTERNAL_ERROR if it isn't encodable)
//!
//! Nothing the method does can escape as a transport failure.

use crate::metrics::ServerMetrics;
use crate::object::Exposed;
use crate::panic_guard::{panic_to_string, take_panic_trace};
use futures::FutureExt;
use objrpc_core::{
    capture_trace, Codec, Error, ErrorCode, Id, JsonRpcErrorData, JsonRpcResponse, Output, Params,
};
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Metric label for calls naming a method the target doesn't have
pub const UNKNOWN_METHOD_LABEL: &str = "<unknown>";
use std::time::Instant;

/// Stateless request handler shared by every connection
#[derive(Clone)]
pub struct Dispatcher {
    codec: Codec,
    expose_traces: bool,
    metrics: Option<Arc<ServerMetrics>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Codec::default())
    }
}

impl Dispatcher {
    /// Dispatcher using `codec`, exposing traces
    pub fn new(codec: Codec) -> Self {
        Self {
            codec,
            expose_traces: true,
            metrics: None,
        }
    }

    /// Include stack traces in error `data` (default) or only log them
    pub fn with_expose_traces(mut self, expose: bool) -> Self {
        self.expose_traces = expose;
        self
    }

    /// Record calls into `metrics`
    pub fn with_metrics(mut self, metrics: Arc<ServerMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// The codec used for decoding and encoding
    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Introspection document for a GET on `target`
    pub fn describe(&self, target: &Arc<dyn Exposed>) -> Value {
        target.describe()
    }

    /// Handle one request body against a resolved target
    #[tracing::instrument(skip_all, fields(method = tracing::field::Empty, id = tracing::field::Empty))]
    pub async fn handle(&self, target: &Arc<dyn Exposed>, raw: &[u8]) -> JsonRpcResponse {
        let started = Instant::now();

        let request = match self.codec.decode_request(raw) {
            Ok(request) => request,
            Err(failure) => {
                tracing::debug!(%failure, "rejected request body");
                let error = failure.into_error_data(self.expose_traces);
                return self.finish("-", started, JsonRpcResponse::error(error, Id::Null));
            }
        };

        let span = tracing::Span::current();
        span.record("method", request.method.as_str());
        span.record("id", tracing::field::display(&request.id));

        let id = request.id;
        let method_name = request.method;

        let Some(method) = target.method(&method_name) else {
            let error = JsonRpcErrorData::method_not_found(&method_name);
            return self.finish(UNKNOWN_METHOD_LABEL, started, JsonRpcResponse::error(error, id));
        };

        let params = match self.codec.decode_params(request.params.unwrap_or_default()) {
            Ok(params) => params,
            Err(e) => {
                let error = self.method_error(e);
                return self.finish(&method_name, started, JsonRpcResponse::error(error, id));
            }
        };

        let response = match invoke(method, params).await {
            Ok(Ok(output)) => self.encode(output, id),
            Ok(Err(e)) => JsonRpcResponse::error(self.method_error(e), id),
            Err(payload) => {
                let message = panic_to_string(payload.as_ref());
                let trace = take_panic_trace().unwrap_or_else(capture_trace);
                tracing::error!(method = %method_name, %message, "method panicked");
                JsonRpcResponse::error(self.internal_error(message, trace), id)
            }
        };

        self.finish(&method_name, started, response)
    }

    fn encode(&self, output: Output, id: Id) -> JsonRpcResponse {
        match self.codec.encode_output(output) {
            Ok(value) => JsonRpcResponse::success(value, id),
            Err(e) => {
                tracing::warn!(error = %e, "method result is not encodable");
                JsonRpcResponse::error(self.internal_error(e.to_string(), capture_trace()), id)
            }
        }
    }

    fn method_error(&self, err: Error) -> JsonRpcErrorData {
        match err {
            Error::InvalidParams(message) => JsonRpcErrorData::invalid_params(message),
            Error::Raised { message, trace } => self.internal_error(message, trace.to_string()),
            other => {
                let message = other.to_string();
                self.internal_error(message, capture_trace())
            }
        }
    }

    fn internal_error(&self, message: String, trace: String) -> JsonRpcErrorData {
        tracing::debug!(%message, %trace, "internal error");
        let error = JsonRpcErrorData::internal_error(message);
        if self.expose_traces {
            error.with_detail(trace)
        } else {
            error
        }
    }

    fn finish(&self, method: &str, started: Instant, response: JsonRpcResponse) -> JsonRpcResponse {
        if let Some(metrics) = &self.metrics {
            let status = match &response.error {
                Some(error) => {
                    metrics.record_error(error.code);
                    "error"
                }
                None => "success",
            };
            metrics.record_request(
                metric_label(method, &response),
                status,
                started.elapsed().as_secs_f64(),
            );
        }
        response
    }
}

// Caller-chosen names must not become metric labels unless the target
// actually exposes them.
fn metric_label<'a>(method: &'a str, response: &JsonRpcResponse) -> &'a str {
    match &response.error {
        Some(error) if error.code == ErrorCode::MethodNotFound.code() => UNKNOWN_METHOD_LABEL,
        _ => method,
    }
}

// The method is called inside the async block so that a panic while
// building the future is caught along with one while polling it.
async fn invoke(
    method: Arc<dyn crate::method::Method>,
    params: Params,
) -> Result<objrpc_core::Result<Output>, Box<dyn std::any::Any + Send>> {
    AssertUnwindSafe(async move { method.invoke(params).await })
        .catch_unwind()
        .await
}
