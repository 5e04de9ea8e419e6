//! JSON-RPC 2.0 envelope types
//!
//! This module implements the request and response envelopes exchanged
//! between the web service and its callers, plus the value types that
//! flow through a call:
//!
//! - **Id**: opaque caller-supplied request identifier, echoed unchanged
//! - **Params**: positional (array) or named (object) arguments, never both
//! - **JsonRpcRequest** / **JsonRpcResponse**: the wire envelopes
//! - **Output** / **HostValue**: what an invoked method hands back before
//!   it is encoded onto the wire
//!
//! # Wire Format
//!
//! ```json
//! {"jsonrpc": "2.0", "method": "get_stats", "params": ["spider"], "id": 1}
//! {"jsonrpc": "2.0", "id": 1, "result": {"item_scraped_count": 42}}
//! {"jsonrpc": "2.0", "id": 1, "error": {"code": -32601, "message": "Method not found: x"}}
//! ```

use crate::error::JsonRpcErrorData;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;

/// The protocol version string carried in every envelope
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC 2.0 request ID
///
/// The id is opaque: whatever the caller sent is echoed back exactly,
/// including floats and structured values. A request without an id is
/// answered with `Id::Null`.
///
/// # Implementation Notes
///
/// `#[serde(untagged)]` serializes the inner value directly. `Other` is
/// tried last and catches everything the specific variants don't.
///
/// # Examples
///
/// ```rust
/// use objrpc_core::Id;
///
/// let id1: Id = "req-123".into();
/// let id2: Id = 42i64.into();
///
/// assert_eq!(id1.to_string(), "\"req-123\"");
/// assert_eq!(id2.to_string(), "42");
/// assert_eq!(Id::default(), Id::Null);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Id {
    /// String identifier - useful for UUIDs or correlation tokens
    String(String),
    /// Numeric identifier, kept as the exact JSON number
    Number(serde_json::Number),
    /// Absent or null identifier
    #[default]
    Null,
    /// Any other JSON value a caller chose to use as an id
    Other(Value),
}

impl Id {
    /// Returns true for `Id::Null`
    pub fn is_null(&self) -> bool {
        matches!(self, Id::Null)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::String(s) => write!(f, "\"{}\"", s),
            Id::Number(n) => write!(f, "{}", n),
            Id::Null => write!(f, "null"),
            Id::Other(v) => write!(f, "{}", v),
        }
    }
}

impl From<Value> for Id {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Id::String(s),
            Value::Number(n) => Id::Number(n),
            Value::Null => Id::Null,
            other => Id::Other(other),
        }
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::String(s)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::String(s.to_string())
    }
}

impl From<i64> for Id {
    fn from(n: i64) -> Self {
        Id::Number(n.into())
    }
}

impl From<u64> for Id {
    fn from(n: u64) -> Self {
        Id::Number(n.into())
    }
}

/// Arguments of a call: positional or named, never both
///
/// An absent `params` member is represented as `Params::default()`, an
/// empty positional list, so a method always receives exactly one shape.
///
/// # Examples
///
/// ```rust
/// use objrpc_core::Params;
/// use serde_json::json;
///
/// let positional = Params::from_value(json!([456, 123])).unwrap();
/// assert_eq!(positional.positional(), &[json!(456), json!(123)]);
///
/// let named = Params::from_value(json!({"data": 789})).unwrap();
/// assert_eq!(named.get("data"), Some(&json!(789)));
///
/// assert!(Params::from_value(json!("scalar")).is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Params {
    /// Array params, bound to positional arguments in order
    Positional(Vec<Value>),
    /// Object params, bound to named arguments
    Named(Map<String, Value>),
}

impl Default for Params {
    fn default() -> Self {
        Params::Positional(Vec::new())
    }
}

impl Params {
    /// Interpret a JSON value as params; only arrays and objects qualify
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Array(items) => Some(Params::Positional(items)),
            Value::Object(map) => Some(Params::Named(map)),
            _ => None,
        }
    }

    /// Convert back into a JSON array or object
    pub fn into_value(self) -> Value {
        match self {
            Params::Positional(items) => Value::Array(items),
            Params::Named(map) => Value::Object(map),
        }
    }

    /// Positional arguments; empty for named params
    pub fn positional(&self) -> &[Value] {
        match self {
            Params::Positional(items) => items,
            Params::Named(_) => &[],
        }
    }

    /// Named arguments, if these params are named
    pub fn named(&self) -> Option<&Map<String, Value>> {
        match self {
            Params::Named(map) => Some(map),
            Params::Positional(_) => None,
        }
    }

    /// Positional argument at `index`
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.positional().get(index)
    }

    /// Named argument `name`
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.named().and_then(|map| map.get(name))
    }

    /// Number of arguments in either shape
    pub fn len(&self) -> usize {
        match self {
            Params::Positional(items) => items.len(),
            Params::Named(map) => map.len(),
        }
    }

    /// True when no arguments were supplied
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<Value>> for Params {
    fn from(items: Vec<Value>) -> Self {
        Params::Positional(items)
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Params::Named(map)
    }
}

/// JSON-RPC 2.0 request envelope
///
/// # Examples
///
/// ```rust
/// use objrpc_core::{JsonRpcRequest, Params, Id};
/// use serde_json::json;
///
/// let req = JsonRpcRequest::new("test", Params::from_value(json!(["one", 2])), Id::from("abc"));
/// assert_eq!(req.jsonrpc, "2.0");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version - always "2.0" for requests built here
    pub jsonrpc: String,
    /// Name of the method to invoke on the resolved target
    pub method: String,
    /// Optional arguments, omitted from JSON when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Params>,
    /// Identifier echoed back in the response
    #[serde(default)]
    pub id: Id,
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC 2.0 request
    pub fn new(method: impl Into<String>, params: Option<Params>, id: Id) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// JSON-RPC 2.0 response envelope
///
/// Exactly one of `result` and `error` is present. Use the `success` and
/// `error` constructors to keep that invariant.
///
/// `result` may legitimately be JSON `null`; it is kept as `Some(Value::Null)`
/// so that a null result is distinguishable from a missing one.
///
/// # Examples
///
/// ```rust
/// use objrpc_core::{JsonRpcResponse, JsonRpcErrorData, Id};
/// use serde_json::json;
///
/// let ok = JsonRpcResponse::success(json!({"value": 42}), Id::from(1i64));
/// assert!(ok.is_success());
///
/// let err = JsonRpcResponse::error(JsonRpcErrorData::parse_error(), Id::Null);
/// assert!(err.is_error());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version - always "2.0"; peers that omit it are read as "2.0"
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    /// Echoed request id, or null when the request could not be decoded
    #[serde(default)]
    pub id: Id,
    /// Result of the invocation (present only on success)
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_present"
    )]
    pub result: Option<Value>,
    /// Error information (present only on failure)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcErrorData>,
}

impl JsonRpcResponse {
    /// Create a successful response
    pub fn success(result: Value, id: Id) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(error: JsonRpcErrorData, id: Id) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Returns true if `result` is present
    pub fn is_success(&self) -> bool {
        self.result.is_some()
    }

    /// Returns true if `error` is present
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

// A present member always deserializes to Some, even when it is `null`;
// `#[serde(default)]` covers the absent case.
fn default_version() -> String {
    JSONRPC_VERSION.to_string()
}

fn deserialize_present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// A host value that is not plain JSON
///
/// Methods return these for values only the host knows how to encode
/// (timestamps, engine handles, ...). The codec's value encoder turns them
/// into JSON, or the call fails with an internal error.
///
/// ```rust
/// use objrpc_core::HostValue;
///
/// let value = HostValue::new(std::time::Duration::from_secs(3));
/// assert!(value.type_name().contains("Duration"));
/// assert_eq!(value.downcast_ref::<std::time::Duration>().map(|d| d.as_secs()), Some(3));
/// ```
pub struct HostValue {
    type_name: &'static str,
    value: Box<dyn Any + Send + Sync>,
}

impl HostValue {
    /// Wrap any host value
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            value: Box::new(value),
        }
    }

    /// Rust type name of the wrapped value
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Borrow the wrapped value as `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostValue")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// What an invoked method returns, before wire encoding
#[derive(Debug)]
pub enum Output {
    /// Already JSON
    Json(Value),
    /// Needs the codec's value encoder
    Host(HostValue),
}

impl Output {
    /// Wrap a host value for the value encoder
    pub fn host<T: Any + Send + Sync>(value: T) -> Self {
        Output::Host(HostValue::new(value))
    }
}

impl From<Value> for Output {
    fn from(value: Value) -> Self {
        Output::Json(value)
    }
}

impl From<HostValue> for Output {
    fn from(value: HostValue) -> Self {
        Output::Host(value)
    }
}
