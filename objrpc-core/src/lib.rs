//! Core JSON-RPC 2.0 types, error taxonomy and codec for objrpc
//!
//! This crate holds everything both ends of the wire agree on:
//!
//! - **Error handling**: the fixed error taxonomy ([`ErrorCode`]), the wire
//!   error object ([`JsonRpcErrorData`]) and the library [`Error`]
//! - **Types**: request and response envelopes, ids, params and method outputs
//! - **Codec**: request validation, response encoding and the pluggable value
//!   encoder/decoder hooks
//! - **Observability**: `tracing` subscriber and OpenTelemetry setup
//!
//! The crate knows nothing about HTTP or object graphs. `objrpc-server`
//! resolves and dispatches, `objrpc-client` performs remote calls.
//!
//! # Example
//!
//! ```rust
//! use objrpc_core::{codec::Codec, JsonRpcErrorData, JsonRpcResponse};
//!
//! let codec = Codec::default();
//! let request = codec
//!     .decode_request(br#"{"jsonrpc":"2.0","method":"status","id":1}"#)
//!     .unwrap();
//!
//! let response = JsonRpcResponse::error(JsonRpcErrorData::method_not_found(&request.method), request.id);
//! let bytes = codec.encode_response(&response);
//! assert!(String::from_utf8(bytes).unwrap().contains("-32601"));
//! ```

pub mod codec;
pub mod error;
pub mod observability;
pub mod types;

pub use codec::{Codec, DecodeFailure, JsonOnly, Passthrough, ValueDecoder, ValueEncoder, VersionPolicy};
pub use error::{capture_trace, Error, ErrorCode, JsonRpcErrorData, Result};
pub use observability::{init_observability, shutdown_observability, ObservabilityConfig};
pub use types::{HostValue, Id, JsonRpcRequest, JsonRpcResponse, Output, Params, JSONRPC_VERSION};
