//! Invocable methods on exposed objects
//!
//! A [`Method`] is one callable entry of an exposed object. The dispatcher
//! hands it the decoded [`Params`] and awaits its [`Output`].
//!
//! # Creating Methods
//!
//! 1. **from_fn**: wrap an async closure that works with raw [`Params`]
//! 2. **from_typed_fn**: wrap an async closure with typed arguments and result
//! 3. **#[method] macro**: annotate an async fn (via objrpc-macros)
//!
//! # Argument Binding
//!
//! Typed methods bind params the way JSON-RPC callers expect:
//!
//! - `[]` or absent params → `null` (fits `()` and `Option<T>`)
//! - `[a, b, ...]` → a JSON array (fits tuples, `Vec<T>` and structs in field order)
//! - `{"k": v, ...}` → a JSON object (fits structs and maps)
//!
//! A binding failure is `Error::InvalidParams`, reported as -32602.
//!
//! # Examples
//!
//! ```rust
//! use objrpc_server::{from_fn, from_typed_fn};
//! use serde::Deserialize;
//!
//! let status = from_fn(|_params| async { Ok(serde_json::json!("running")) });
//!
//! #[derive(Deserialize)]
//! struct CloseArgs { spider: String }
//!
//! let close = from_typed_fn(|args: CloseArgs| async move {
//!     Ok(format!("closing {}", args.spider))
//! });
//! ```

use objrpc_core::{Error, Output, Params, Result};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by [`Method::invoke`]
pub type MethodFuture = Pin<Box<dyn Future<Output = Result<Output>> + Send>>;

/// A callable entry on an exposed object
///
/// Implementations must be `Send + Sync`: one method may be invoked by
/// many requests at once.
pub trait Method: Send + Sync {
    /// Invoke with already-decoded params
    ///
    /// Returning `Err` produces an error response. A panic inside the
    /// returned future is caught by the dispatcher.
    fn invoke(&self, params: Params) -> MethodFuture;
}

/// Adapts an async closure into a [`Method`]
pub struct AsyncMethod<F> {
    func: F,
}

impl<F> AsyncMethod<F> {
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F, Fut, T> Method for AsyncMethod<F>
where
    F: Fn(Params) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: Into<Output> + 'static,
{
    fn invoke(&self, params: Params) -> MethodFuture {
        let fut = (self.func)(params);
        Box::pin(async move { fut.await.map(Into::into) })
    }
}

/// Create a method from an async closure over raw params
///
/// The closure may return anything convertible into [`Output`]: a
/// `serde_json::Value`, an [`Output`] or a [`objrpc_core::HostValue`].
///
/// ```rust
/// use objrpc_server::from_fn;
///
/// let echo = from_fn(|params| async move { Ok(params.into_value()) });
/// ```
pub fn from_fn<F, Fut, T>(func: F) -> Box<dyn Method>
where
    F: Fn(Params) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: Into<Output> + 'static,
{
    Box::new(AsyncMethod::new(func))
}

/// Create a method from an async closure with typed arguments
///
/// # Error Handling
///
/// - params that don't bind to `P`: `Error::InvalidParams`
/// - a result that won't serialize: `Error::Serialization` (reported as an
///   internal error)
/// - errors from the closure pass through unchanged
///
/// ```rust
/// use objrpc_server::from_typed_fn;
///
/// let add = from_typed_fn(|(a, b): (i64, i64)| async move { Ok(a + b) });
/// ```
pub fn from_typed_fn<P, R, F, Fut>(func: F) -> Box<dyn Method>
where
    P: serde::de::DeserializeOwned + Send + 'static,
    R: serde::Serialize + Send + 'static,
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    let func = Arc::new(func);

    from_fn(move |params: Params| {
        let func = Arc::clone(&func);
        async move {
            let args: P = bind_params(params)?;
            let result = func(args).await?;
            serde_json::to_value(result).map_err(|e| Error::Serialization(e.to_string()))
        }
    })
}

/// Bind params to a typed argument value
pub fn bind_params<P: serde::de::DeserializeOwned>(params: Params) -> Result<P> {
    let value = match params {
        Params::Positional(items) if items.is_empty() => Value::Null,
        other => other.into_value(),
    };
    serde_json::from_value(value).map_err(|e| Error::InvalidParams(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Deserialize)]
    struct AddParams {
        a: i32,
        b: i32,
    }

    #[derive(Serialize, Deserialize)]
    struct AddResult {
        sum: i32,
    }

    fn json_of(output: Output) -> Value {
        match output {
            Output::Json(v) => v,
            Output::Host(h) => panic!("unexpected host value {:?}", h),
        }
    }

    #[tokio::test]
    async fn test_typed_method_named() {
        let method = from_typed_fn(|params: AddParams| async move {
            Ok(AddResult {
                sum: params.a + params.b,
            })
        });

        let params = Params::from_value(json!({"a": 5, "b": 3})).unwrap();
        let result = json_of(method.invoke(params).await.unwrap());

        let sum: AddResult = serde_json::from_value(result).unwrap();
        assert_eq!(sum.sum, 8);
    }

    #[tokio::test]
    async fn test_typed_method_positional() {
        let method = from_typed_fn(|(a, b): (i64, i64)| async move { Ok(a - b) });

        let result = method
            .invoke(Params::from_value(json!([456, 123])).unwrap())
            .await
            .unwrap();
        assert_eq!(json_of(result), json!(333));
    }

    #[tokio::test]
    async fn test_typed_method_without_params() {
        let method = from_typed_fn(|(): ()| async { Ok("idle") });

        let result = method.invoke(Params::default()).await.unwrap();
        assert_eq!(json_of(result), json!("idle"));
    }

    #[tokio::test]
    async fn test_typed_method_bad_params() {
        let method = from_typed_fn(|params: AddParams| async move { Ok(params.a) });

        let err = method
            .invoke(Params::from_value(json!({"a": "five"})).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParams(_)));
    }

    #[tokio::test]
    async fn test_raw_method_sees_both_shapes() {
        let method = from_fn(|params: Params| async move {
            Ok(json!([params.positional(), params.named().cloned().unwrap_or_default()]))
        });

        let result = method
            .invoke(Params::from_value(json!({"data": 789})).unwrap())
            .await
            .unwrap();
        assert_eq!(json_of(result), json!([[], {"data": 789}]));
    }

    #[tokio::test]
    async fn test_host_output() {
        let method = from_fn(|_| async { Ok(Output::host(std::time::Duration::from_secs(1))) });

        match method.invoke(Params::default()).await.unwrap() {
            Output::Host(h) => assert!(h.type_name().contains("Duration")),
            Output::Json(v) => panic!("expected host value, got {}", v),
        }
    }
}
