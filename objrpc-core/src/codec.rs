//! Codec for JSON-RPC envelope encoding and decoding
//!
//! This module turns raw request bodies into validated [`JsonRpcRequest`]s and
//! turns method outputs and response envelopes back into bytes.
//!
//! # Why a Codec Module?
//!
//! serde alone would accept or reject a body wholesale. The web service needs
//! more than that:
//! - **Classification**: unparseable bodies are PARSE_ERROR (-32700) while
//!   well-formed but malformed envelopes are INVALID_REQUEST (-32600)
//! - **Version policy**: absent `jsonrpc` is tolerated unless strict
//! - **Extended values**: outputs that are not plain JSON go through a
//!   pluggable [`ValueEncoder`]; incoming params through a [`ValueDecoder`]
//! - **Total encoding**: a response always becomes bytes, whatever it holds
//!
//! # Examples
//!
//! ```rust
//! use objrpc_core::codec::Codec;
//!
//! let codec = Codec::default();
//! let req = codec.decode_request(br#"{"method":"ping","id":7}"#).unwrap();
//! assert_eq!(req.method, "ping");
//!
//! let failure = codec.decode_request(b"{not json").unwrap_err();
//! assert!(failure.is_parse());
//! ```

use crate::error::{capture_trace, Error, ErrorCode, JsonRpcErrorData, Result};
use crate::types::{HostValue, Id, JsonRpcRequest, JsonRpcResponse, Output, Params};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

/// How strictly the `jsonrpc` member is checked
///
/// A present member must always equal `"2.0"`. The policy only decides
/// whether an absent member is acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionPolicy {
    /// Accept requests without a `jsonrpc` member
    #[default]
    Lenient,
    /// Require `"jsonrpc": "2.0"`
    Strict,
}

/// Why a request body could not be decoded
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeFailure {
    /// The body is not well-formed JSON
    Parse {
        /// Message from the JSON parser
        message: String,
        /// Stack trace captured where decoding failed
        trace: String,
    },
    /// Well-formed JSON that is not a valid request envelope
    Invalid {
        /// What was wrong with the envelope
        message: String,
    },
}

impl DecodeFailure {
    fn invalid(message: impl Into<String>) -> Self {
        DecodeFailure::Invalid {
            message: message.into(),
        }
    }

    /// True for [`DecodeFailure::Parse`]
    pub fn is_parse(&self) -> bool {
        matches!(self, DecodeFailure::Parse { .. })
    }

    /// Error kind this failure is reported as
    pub fn kind(&self) -> ErrorCode {
        match self {
            DecodeFailure::Parse { .. } => ErrorCode::ParseError,
            DecodeFailure::Invalid { .. } => ErrorCode::InvalidRequest,
        }
    }

    /// Build the wire error object
    ///
    /// Parse failures carry the parser message and, when `expose_traces` is
    /// set, the captured trace in `data`. Invalid envelopes use the
    /// validation message as the error message.
    pub fn into_error_data(self, expose_traces: bool) -> JsonRpcErrorData {
        match self {
            DecodeFailure::Parse { message, trace } => {
                let data = if expose_traces {
                    format!("{}\n{}", message, trace)
                } else {
                    message
                };
                JsonRpcErrorData::parse_error().with_detail(data)
            }
            DecodeFailure::Invalid { message } => JsonRpcErrorData::invalid_request(message),
        }
    }
}

impl fmt::Display for DecodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeFailure::Parse { message, .. } => write!(f, "parse error: {}", message),
            DecodeFailure::Invalid { message } => write!(f, "invalid request: {}", message),
        }
    }
}

/// Converts host values into JSON
///
/// Implement this to teach the service about timestamps, handles and other
/// values methods return that are not plain JSON.
pub trait ValueEncoder: Send + Sync {
    /// Encode one host value, or fail with `Error::Serialization`
    fn encode_host(&self, value: &HostValue) -> Result<Value>;
}

/// Encoder that accepts plain JSON only
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonOnly;

impl ValueEncoder for JsonOnly {
    fn encode_host(&self, value: &HostValue) -> Result<Value> {
        Err(Error::Serialization(format!(
            "value of type {} is not JSON serializable",
            value.type_name()
        )))
    }
}

impl<F> ValueEncoder for F
where
    F: Fn(&HostValue) -> Result<Value> + Send + Sync,
{
    fn encode_host(&self, value: &HostValue) -> Result<Value> {
        self(value)
    }
}

/// Rewrites incoming params before a method sees them
pub trait ValueDecoder: Send + Sync {
    /// Decode params; a failure is reported as INVALID_PARAMS
    fn decode_params(&self, params: Params) -> Result<Params>;
}

/// Decoder that hands params through unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl ValueDecoder for Passthrough {
    fn decode_params(&self, params: Params) -> Result<Params> {
        Ok(params)
    }
}

/// Envelope codec with pluggable value encoder and decoder
#[derive(Clone)]
pub struct Codec {
    encoder: Arc<dyn ValueEncoder>,
    decoder: Arc<dyn ValueDecoder>,
    version_policy: VersionPolicy,
}

impl Default for Codec {
    fn default() -> Self {
        Self {
            encoder: Arc::new(JsonOnly),
            decoder: Arc::new(Passthrough),
            version_policy: VersionPolicy::default(),
        }
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("version_policy", &self.version_policy)
            .finish_non_exhaustive()
    }
}

impl Codec {
    /// Codec with the JSON-only encoder and passthrough decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the host value encoder
    pub fn with_encoder(mut self, encoder: impl ValueEncoder + 'static) -> Self {
        self.encoder = Arc::new(encoder);
        self
    }

    /// Replace the params decoder
    pub fn with_decoder(mut self, decoder: impl ValueDecoder + 'static) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    /// Set the `jsonrpc` member policy
    pub fn with_version_policy(mut self, policy: VersionPolicy) -> Self {
        self.version_policy = policy;
        self
    }

    /// Current `jsonrpc` member policy
    pub fn version_policy(&self) -> VersionPolicy {
        self.version_policy
    }

    /// Decode and validate a request body
    ///
    /// # Validation
    ///
    /// - Not JSON → `Parse`
    /// - A JSON array → `Invalid` (batches are not supported)
    /// - Not an object, missing or non-string `method` → `Invalid`
    /// - `params` neither array, object nor null → `Invalid`
    /// - `jsonrpc` present and not `"2.0"` → `Invalid`
    /// - `jsonrpc` absent under [`VersionPolicy::Strict`] → `Invalid`
    ///
    /// A missing `id` decodes as [`Id::Null`].
    pub fn decode_request(&self, raw: &[u8]) -> std::result::Result<JsonRpcRequest, DecodeFailure> {
        let value: Value = serde_json::from_slice(raw).map_err(|e| DecodeFailure::Parse {
            message: e.to_string(),
            trace: capture_trace(),
        })?;

        let mut object = match value {
            Value::Object(object) => object,
            Value::Array(_) => return Err(DecodeFailure::invalid("Batch requests are not supported")),
            _ => return Err(DecodeFailure::invalid("Request must be a JSON object")),
        };

        let jsonrpc = match object.remove("jsonrpc") {
            Some(Value::String(v)) if v == crate::types::JSONRPC_VERSION => v,
            Some(other) => {
                return Err(DecodeFailure::invalid(format!(
                    "Unsupported jsonrpc version: {}",
                    other
                )))
            }
            None if self.version_policy == VersionPolicy::Strict => {
                return Err(DecodeFailure::invalid("Missing jsonrpc member"))
            }
            None => crate::types::JSONRPC_VERSION.to_string(),
        };

        let method = match object.remove("method") {
            Some(Value::String(method)) => method,
            Some(_) => return Err(DecodeFailure::invalid("Method name must be a string")),
            None => return Err(DecodeFailure::invalid("Missing method name")),
        };

        let params = match object.remove("params") {
            None | Some(Value::Null) => None,
            Some(value) => match Params::from_value(value) {
                Some(params) => Some(params),
                None => {
                    return Err(DecodeFailure::invalid(
                        "Params must be an array or an object",
                    ))
                }
            },
        };

        let id = object.remove("id").map(Id::from).unwrap_or_default();

        Ok(JsonRpcRequest {
            jsonrpc,
            method,
            params,
            id,
        })
    }

    /// Run params through the value decoder
    ///
    /// Any decoder failure becomes `Error::InvalidParams`.
    pub fn decode_params(&self, params: Params) -> Result<Params> {
        self.decoder
            .decode_params(params)
            .map_err(|e| match e {
                Error::InvalidParams(msg) => Error::InvalidParams(msg),
                other => Error::InvalidParams(other.to_string()),
            })
    }

    /// Encode a method's output as a JSON value
    pub fn encode_output(&self, output: Output) -> Result<Value> {
        match output {
            Output::Json(value) => Ok(value),
            Output::Host(host) => self.encoder.encode_host(&host),
        }
    }

    /// Serialize a response envelope to bytes
    ///
    /// This cannot fail: if the envelope itself will not serialize, an
    /// INTERNAL_ERROR envelope with the same id is written instead.
    pub fn encode_response(&self, response: &JsonRpcResponse) -> Vec<u8> {
        match serde_json::to_vec(response) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize response envelope");
                let fallback = json!({
                    "jsonrpc": crate::types::JSONRPC_VERSION,
                    "id": serde_json::to_value(&response.id).unwrap_or(Value::Null),
                    "error": {
                        "code": ErrorCode::InternalError.code(),
                        "message": e.to_string(),
                    }
                });
                fallback.to_string().into_bytes()
            }
        }
    }
}

/// Encode any serializable message to a JSON string
///
/// # Errors
///
/// Returns `Error::Serialization` if the message cannot be serialized.
///
/// ```rust
/// use objrpc_core::{codec, JsonRpcRequest, Id};
///
/// let request = JsonRpcRequest::new("test", None, Id::from(1i64));
/// let json = codec::encode(&request).unwrap();
/// assert!(json.contains("\"method\":\"test\""));
/// ```
pub fn encode<T: Serialize>(msg: &T) -> Result<String> {
    serde_json::to_string(msg).map_err(|e| Error::Serialization(e.to_string()))
}

/// Encode a request envelope
pub fn encode_request(request: &JsonRpcRequest) -> Result<String> {
    encode(request)
}

/// Decode a JSON value into a specific type
pub fn decode_as<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::Serialization(e.to_string()))
}

/// Decode a response envelope received by a client
///
/// Bodies that are not JSON, or not shaped like a response, are
/// `Error::Protocol`.
pub fn decode_response(data: &[u8]) -> Result<JsonRpcResponse> {
    let value: Value =
        serde_json::from_slice(data).map_err(|e| Error::Protocol(format!("invalid JSON: {}", e)))?;
    if !value.is_object() {
        return Err(Error::Protocol(format!("expected a response object, got {}", value)));
    }
    JsonRpcResponse::deserialize(value).map_err(|e| Error::Protocol(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid_message(failure: DecodeFailure) -> String {
        match failure {
            DecodeFailure::Invalid { message } => message,
            other => panic!("expected Invalid, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_minimal_request() {
        let req = Codec::default()
            .decode_request(br#"{"method":"test"}"#)
            .unwrap();

        assert_eq!(req.method, "test");
        assert_eq!(req.jsonrpc, "2.0");
        assert!(req.params.is_none());
        assert!(req.id.is_null());
    }

    #[test]
    fn test_decode_full_request() {
        let req = Codec::default()
            .decode_request(br#"{"jsonrpc":"2.0","method":"get","params":{"k":1},"id":"a"}"#)
            .unwrap();

        assert_eq!(req.id, Id::from("a"));
        assert_eq!(req.params.unwrap().get("k"), Some(&json!(1)));
    }

    #[test]
    fn test_decode_not_json() {
        let failure = Codec::default().decode_request(b"not valid json").unwrap_err();

        assert!(failure.is_parse());
        assert_eq!(failure.kind(), ErrorCode::ParseError);
        match failure {
            DecodeFailure::Parse { trace, .. } => assert!(!trace.is_empty()),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_decode_rejects_batch() {
        let failure = Codec::default()
            .decode_request(br#"[{"method":"a"},{"method":"b"}]"#)
            .unwrap_err();

        assert_eq!(failure.kind(), ErrorCode::InvalidRequest);
        assert!(invalid_message(failure).contains("Batch"));
    }

    #[test]
    fn test_decode_rejects_non_object() {
        for body in [&b"42"[..], b"\"text\"", b"null"] {
            let failure = Codec::default().decode_request(body).unwrap_err();
            assert_eq!(failure.kind(), ErrorCode::InvalidRequest);
        }
    }

    #[test]
    fn test_decode_method_checks() {
        let codec = Codec::default();

        let missing = codec.decode_request(br#"{"id":1}"#).unwrap_err();
        assert_eq!(invalid_message(missing), "Missing method name");

        let numeric = codec.decode_request(br#"{"method":5,"id":1}"#).unwrap_err();
        assert_eq!(numeric.kind(), ErrorCode::InvalidRequest);
    }

    #[test]
    fn test_decode_params_shape() {
        let codec = Codec::default();

        let scalar = codec
            .decode_request(br#"{"method":"m","params":"x"}"#)
            .unwrap_err();
        assert_eq!(scalar.kind(), ErrorCode::InvalidRequest);

        let null = codec
            .decode_request(br#"{"method":"m","params":null}"#)
            .unwrap();
        assert!(null.params.is_none());
    }

    #[test]
    fn test_version_policy() {
        let lenient = Codec::default();
        let strict = Codec::default().with_version_policy(VersionPolicy::Strict);

        assert!(lenient.decode_request(br#"{"method":"m"}"#).is_ok());
        assert!(strict.decode_request(br#"{"method":"m"}"#).is_err());
        assert!(strict
            .decode_request(br#"{"jsonrpc":"2.0","method":"m"}"#)
            .is_ok());

        let wrong = lenient
            .decode_request(br#"{"jsonrpc":"1.0","method":"m"}"#)
            .unwrap_err();
        assert!(invalid_message(wrong).contains("1.0"));
    }

    #[test]
    fn test_version_policy_from_settings_text() {
        let policy: VersionPolicy = serde_json::from_value(json!("strict")).unwrap();
        assert_eq!(policy, VersionPolicy::Strict);
    }

    #[test]
    fn test_parse_failure_error_data() {
        let failure = DecodeFailure::Parse {
            message: "expected value".into(),
            trace: "stack backtrace:\n   0: here".into(),
        };

        let exposed = failure.clone().into_error_data(true);
        assert_eq!(exposed.code, -32700);
        assert!(exposed.data.unwrap().as_str().unwrap().contains("stack backtrace"));

        let hidden = failure.into_error_data(false);
        assert_eq!(hidden.data, Some(json!("expected value")));
    }

    #[test]
    fn test_json_only_rejects_host_values() {
        let codec = Codec::default();

        assert_eq!(codec.encode_output(json!([1]).into()).unwrap(), json!([1]));

        let err = codec
            .encode_output(Output::host(std::time::Instant::now()))
            .unwrap_err();
        assert!(matches!(err, Error::Serialization(ref m) if m.contains("Instant")));
    }

    #[test]
    fn test_custom_encoder() {
        let codec = Codec::default().with_encoder(|value: &HostValue| {
            value
                .downcast_ref::<std::time::Duration>()
                .map(|d| json!(d.as_secs_f64()))
                .ok_or_else(|| Error::Serialization("unsupported".into()))
        });

        let encoded = codec
            .encode_output(Output::host(std::time::Duration::from_millis(1500)))
            .unwrap();
        assert_eq!(encoded, json!(1.5));
    }

    struct RejectNamed;

    impl ValueDecoder for RejectNamed {
        fn decode_params(&self, params: Params) -> Result<Params> {
            match params {
                Params::Named(_) => Err(Error::Serialization("named not allowed".into())),
                positional => Ok(positional),
            }
        }
    }

    #[test]
    fn test_decoder_failures_are_invalid_params() {
        let codec = Codec::default().with_decoder(RejectNamed);

        assert!(codec.decode_params(Params::default()).is_ok());
        let err = codec
            .decode_params(Params::from_value(json!({"a": 1})).unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParams(_)));
    }

    #[test]
    fn test_encode_response_ends_without_newline() {
        let resp = JsonRpcResponse::success(json!("ok"), Id::from(1i64));
        let bytes = Codec::default().encode_response(&resp);
        let value: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["result"], "ok");
        assert_ne!(bytes.last(), Some(&b'\n'));
    }

    #[test]
    fn test_decode_response() {
        let resp = decode_response(br#"{"jsonrpc":"2.0","id":"x","result":null}"#).unwrap();
        assert!(resp.is_success());

        assert!(matches!(decode_response(b"<html>"), Err(Error::Protocol(_))));
        assert!(matches!(decode_response(b"[]"), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_decode_response_without_version() {
        let resp = decode_response(br#"{"result": {"one": 1}}"#).unwrap();
        assert_eq!(resp.jsonrpc, "2.0");
        assert_eq!(resp.result, Some(json!({"one": 1})));
        assert!(resp.id.is_null());

        let resp =
            decode_response(br#"{"error": {"code": 123, "message": "hello", "data": "some data"}}"#)
                .unwrap();
        let error = resp.error.unwrap();
        assert_eq!(error.code, 123);
        assert_eq!(error.data, Some(json!("some data")));

        let empty = decode_response(b"{}").unwrap();
        assert!(empty.result.is_none());
        assert!(empty.error.is_none());
    }
}
