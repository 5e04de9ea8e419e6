//! Error types for objrpc
//!
//! This module provides error handling for both sides of the wire. It defines
//! three related types:
//!
//! - **ErrorCode**: The fixed JSON-RPC 2.0 error taxonomy used on the wire
//! - **JsonRpcErrorData**: The wire-format error object carried in a response
//! - **Error**: Application-level errors for internal use (uses thiserror)
//!
//! # Error Taxonomy
//!
//! Only the five standard codes are ever produced by the dispatcher:
//! - `-32700`: Parse error (the body is not well-formed JSON)
//! - `-32600`: Invalid request (missing `method`, bad `params` shape, ...)
//! - `-32601`: Method not found on the resolved target
//! - `-32602`: Invalid params (value decoder or typed binding rejected them)
//! - `-32603`: Internal error (the invoked method failed or panicked)
//!
//! Remote peers may send any code; the client carries it verbatim.
//!
//! # Examples
//!
//! ```rust
//! use objrpc_core::{Error, ErrorCode, JsonRpcErrorData};
//!
//! let json_error = JsonRpcErrorData::method_not_found("shutdown");
//! assert_eq!(json_error.code, ErrorCode::MethodNotFound.code());
//!
//! let error = Error::Remote(json_error);
//! assert!(error.to_string().contains("-32601"));
//! ```

use serde::{Deserialize, Serialize};
use std::backtrace::Backtrace;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result type for objrpc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Application-level error type for objrpc operations
///
/// Server code returns these from invoked methods and codec hooks; the
/// dispatcher maps them onto the wire taxonomy. Client code returns them
/// from remote calls.
///
/// # Mapping onto the wire
///
/// When a method returns one of these, only `InvalidParams` keeps its own
/// code:
///
/// - `InvalidParams` → -32602
/// - everything else, `InvalidRequest` and `MethodNotFound` included → -32603
///
/// -32600 and -32601 are produced by the dispatcher itself, for bad
/// envelopes and unknown method names.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Error object received from a remote peer, carried verbatim
    #[error("JSON-RPC error: {0}")]
    Remote(#[from] JsonRpcErrorData),

    /// Serialization or deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// HTTP transport error (connection refused, bad status, ...)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Input/output error
    #[error("IO error: {0}")]
    Io(String),

    /// Invalid JSON-RPC request format
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Method not found on the target object
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Invalid method parameters
    ///
    /// Reserved for decoder-level failures: the value decoder hook rejected
    /// the params, or typed argument binding could not deserialize them.
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// Internal error without a captured trace
    #[error("Internal error: {0}")]
    Internal(String),

    /// Failure raised by host code, with the stack trace captured where it
    /// was constructed
    ///
    /// Use [`Error::raised`] to build one. The dispatcher reports `message`
    /// as the error message and `trace` as the error data.
    #[error("{message}")]
    Raised {
        /// Short description of the failure
        message: String,
        /// Rendered stack trace from the construction site
        trace: Arc<str>,
    },

    /// Positional and named arguments were both supplied to a call
    #[error("Invalid argument shape: {0}")]
    ArgumentShape(String),

    /// The peer answered with something that is not a valid response envelope
    #[error("Protocol violation: {0}")]
    Protocol(String),

    /// Invalid service configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Build an [`Error::Raised`] capturing the current stack trace
    ///
    /// ```rust
    /// use objrpc_core::Error;
    ///
    /// let err = Error::raised("spider not running");
    /// assert_eq!(err.to_string(), "spider not running");
    /// assert!(err.trace().is_some());
    /// ```
    pub fn raised(message: impl Into<String>) -> Self {
        Error::Raised {
            message: message.into(),
            trace: capture_trace().into(),
        }
    }

    /// The stack trace captured with this error, if any
    pub fn trace(&self) -> Option<&str> {
        match self {
            Error::Raised { trace, .. } => Some(trace),
            _ => None,
        }
    }

    /// The remote error object, if this error came from the wire
    pub fn remote(&self) -> Option<&JsonRpcErrorData> {
        match self {
            Error::Remote(data) => Some(data),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

/// Render the current stack trace as text
///
/// Always captures, regardless of `RUST_BACKTRACE`. The output is meant for
/// humans reading `error.data`; callers must not parse it.
pub fn capture_trace() -> String {
    format!("stack backtrace:\n{}", Backtrace::force_capture())
}

/// The fixed JSON-RPC 2.0 error taxonomy
///
/// The numeric values are part of the wire contract and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// -32700: the request body is not well-formed
    ParseError,
    /// -32600: well-formed, but not a valid request object
    InvalidRequest,
    /// -32601: the target has no such method
    MethodNotFound,
    /// -32602: arguments could not be decoded or bound
    InvalidParams,
    /// -32603: the invoked method failed
    InternalError,
}

impl ErrorCode {
    /// All kinds, in code order
    pub const ALL: [ErrorCode; 5] = [
        ErrorCode::ParseError,
        ErrorCode::InvalidRequest,
        ErrorCode::MethodNotFound,
        ErrorCode::InvalidParams,
        ErrorCode::InternalError,
    ];

    /// Numeric wire code
    pub const fn code(self) -> i64 {
        match self {
            ErrorCode::ParseError => -32700,
            ErrorCode::InvalidRequest => -32600,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::InternalError => -32603,
        }
    }

    /// Short default message for this kind
    pub const fn default_message(self) -> &'static str {
        match self {
            ErrorCode::ParseError => "Parse error",
            ErrorCode::InvalidRequest => "Invalid Request",
            ErrorCode::MethodNotFound => "Method not found",
            ErrorCode::InvalidParams => "Invalid params",
            ErrorCode::InternalError => "Internal error",
        }
    }

    /// Look up the kind for a numeric code
    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.default_message(), self.code())
    }
}

/// JSON-RPC 2.0 error object as carried in the `error` member of a response
///
/// # Wire Format
///
/// ```json
/// {"code": -32603, "message": "spider not running", "data": "stack backtrace: ..."}
/// ```
///
/// `data` is omitted when absent. For internal errors it carries the stack
/// trace text, which is a debugging aid and not meant to be parsed.
///
/// # Examples
///
/// ```rust
/// use objrpc_core::JsonRpcErrorData;
/// use serde_json::json;
///
/// let error = JsonRpcErrorData::with_data(123, "hello", json!("some data"));
/// assert_eq!(error.to_string(), "[123] hello");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorData {
    /// Numeric error code
    pub code: i64,

    /// Short human-readable description
    pub message: String,

    /// Optional additional information
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcErrorData {
    /// Create a new error with code and message
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create a new error with additional data
    pub fn with_data(code: i64, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Create an error of a taxonomy kind with a custom message
    pub fn from_kind(kind: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(kind.code(), message)
    }

    /// Attach (or replace) the `data` member
    pub fn with_detail(mut self, data: impl Into<serde_json::Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Create a parse error (-32700)
    pub fn parse_error() -> Self {
        Self::from_kind(ErrorCode::ParseError, ErrorCode::ParseError.default_message())
    }

    /// Create an invalid request error (-32600)
    ///
    /// # Arguments
    ///
    /// * `msg` - Specific reason why the request is invalid
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::from_kind(ErrorCode::InvalidRequest, msg)
    }

    /// Create a method not found error (-32601)
    ///
    /// The message names the missing method:
    ///
    /// ```rust
    /// use objrpc_core::JsonRpcErrorData;
    ///
    /// let error = JsonRpcErrorData::method_not_found("close_spider");
    /// assert_eq!(error.message, "Method not found: close_spider");
    /// ```
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::from_kind(
            ErrorCode::MethodNotFound,
            format!("Method not found: {}", method.into()),
        )
    }

    /// Create an invalid params error (-32602)
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::from_kind(ErrorCode::InvalidParams, msg)
    }

    /// Create an internal error (-32603)
    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::from_kind(ErrorCode::InternalError, msg)
    }

    /// The taxonomy kind of this error, if the code is a standard one
    pub fn kind(&self) -> Option<ErrorCode> {
        ErrorCode::from_code(self.code)
    }
}

impl fmt::Display for JsonRpcErrorData {
    /// Formats as "[code] message", e.g. "[-32601] Method not found: stop"
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for JsonRpcErrorData {}
