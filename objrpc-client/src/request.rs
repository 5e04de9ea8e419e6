//! Building requests and interpreting responses
//!
//! Everything here is local: nothing touches the network. The HTTP round
//! trip lives in [`crate::RpcClient`].
//!
//! # Argument Shapes
//!
//! JSON-RPC carries either positional or named params, never both:
//!
//! | positional | named | `params` on the wire |
//! |---|---|---|
//! | empty | empty | omitted |
//! | non-empty | empty | array |
//! | empty | non-empty | object |
//! | non-empty | non-empty | `Error::ArgumentShape`, nothing is sent |

use objrpc_core::{Error, Id, JsonRpcRequest, JsonRpcResponse, Params, Result};
use serde_json::{Map, Value};

/// Fresh request id: a random UUID v4 string
pub fn next_id() -> Id {
    Id::String(uuid::Uuid::new_v4().to_string())
}

/// Build a request envelope for `method`
///
/// # Errors
///
/// `Error::ArgumentShape` when both argument shapes are non-empty.
pub fn build_request(
    method: &str,
    positional: Vec<Value>,
    named: Map<String, Value>,
) -> Result<JsonRpcRequest> {
    let params = match (positional.is_empty(), named.is_empty()) {
        (true, true) => None,
        (false, true) => Some(Params::Positional(positional)),
        (true, false) => Some(Params::Named(named)),
        (false, false) => {
            return Err(Error::ArgumentShape(format!(
                "{} takes positional or named arguments, not both",
                method
            )))
        }
    };
    Ok(JsonRpcRequest::new(method, params, next_id()))
}

/// Extract the result of a response envelope
///
/// An `error` member wins over a `result` member. A response with neither
/// is a protocol violation, not a remote error.
pub fn into_result(response: JsonRpcResponse) -> Result<Value> {
    if let Some(error) = response.error {
        return Err(Error::Remote(error));
    }
    response
        .result
        .ok_or_else(|| Error::Protocol("response has neither result nor error".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use objrpc_core::JsonRpcErrorData;
    use serde_json::json;

    fn named(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {}", other),
        }
    }

    #[test]
    fn test_ids_are_unique_uuids() {
        let a = next_id();
        let b = next_id();
        assert_ne!(a, b);

        let Id::String(text) = a else {
            panic!("expected string id");
        };
        assert!(uuid::Uuid::parse_str(&text).is_ok());
    }

    #[test]
    fn test_no_arguments_omits_params() {
        let request = build_request("status", vec![], Map::new()).unwrap();

        assert_eq!(request.jsonrpc, "2.0");
        assert_eq!(request.method, "status");
        assert!(request.params.is_none());
        let wire = serde_json::to_value(&request).unwrap();
        assert!(wire.get("params").is_none());
    }

    #[test]
    fn test_argument_shapes() {
        let request = build_request("call", vec![json!(456), json!(123)], Map::new()).unwrap();
        assert_eq!(request.params, Some(Params::Positional(vec![json!(456), json!(123)])));

        let request = build_request("call", vec![], named(json!({"data": 789}))).unwrap();
        assert_eq!(request.params.unwrap().get("data"), Some(&json!(789)));

        let err = build_request("call", vec![json!(1)], named(json!({"data": 2}))).unwrap_err();
        assert!(matches!(err, Error::ArgumentShape(_)));
    }

    #[test]
    fn test_error_wins_over_result() {
        let mut response =
            JsonRpcResponse::error(JsonRpcErrorData::new(123, "hello"), Id::from("x"));
        response.result = Some(json!(1));

        let err = into_result(response).unwrap_err();
        assert_eq!(err.remote().map(|e| e.code), Some(123));
    }

    #[test]
    fn test_missing_result_and_error() {
        let response = JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: Id::Null,
            result: None,
            error: None,
        };

        assert!(matches!(into_result(response), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_null_result_is_a_result() {
        let response = JsonRpcResponse::success(Value::Null, Id::from(1i64));
        assert_eq!(into_result(response).unwrap(), Value::Null);
    }
}
