//! JSON-RPC client over HTTP
//!
//! Each call is one `POST` of a request envelope to the URL of the target
//! object, answered by one response envelope.
//!
//! # Cloning
//!
//! `RpcClient` wraps a `reqwest::Client`, which pools connections and is
//! cheap to clone. Clones share the pool.
//!
//! # Failures
//!
//! - both argument shapes supplied: `Error::ArgumentShape`, before any I/O
//! - connection failure or non-2xx status: `Error::Http`
//! - body that is not a response envelope, or has neither result nor
//!   error: `Error::Protocol`
//! - error member in the response: `Error::Remote`, carried verbatim
//!
//! There are no retries.

use crate::request::{build_request, into_result};
use objrpc_core::{codec, Error, Result};
use serde_json::{Map, Value};

/// JSON-RPC client for objrpc web services
#[derive(Clone, Debug, Default)]
pub struct RpcClient {
    http: reqwest::Client,
}

impl RpcClient {
    /// Client with default HTTP settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Client over a preconfigured `reqwest::Client`
    pub fn with_http_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Call `method` on the object at `endpoint`
    ///
    /// ```rust,no_run
    /// use objrpc_client::RpcClient;
    /// use serde_json::{json, Map};
    ///
    /// # async fn example() -> objrpc_core::Result<()> {
    /// let client = RpcClient::new();
    /// let status = client
    ///     .call("http://localhost:6080/crawler/engine", "status", vec![], Map::new())
    ///     .await?;
    /// println!("{}", status);
    /// # Ok(())
    /// # }
    /// ```
    #[tracing::instrument(skip(self, positional, named), fields(id = tracing::field::Empty))]
    pub async fn call(
        &self,
        endpoint: &str,
        method: &str,
        positional: Vec<Value>,
        named: Map<String, Value>,
    ) -> Result<Value> {
        let request = build_request(method, positional, named)?;
        tracing::Span::current().record("id", tracing::field::display(&request.id));

        let body = codec::encode_request(&request)?;
        let response = self
            .http
            .post(endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        if !status.is_success() {
            let text = String::from_utf8_lossy(&bytes);
            tracing::debug!(%status, "call rejected");
            return Err(Error::Http(format!("{}: {}", status, text.trim())));
        }

        let result = into_result(codec::decode_response(&bytes)?);
        if let Err(Error::Remote(ref error)) = result {
            tracing::debug!(code = error.code, message = %error.message, "remote error");
        }
        result
    }

    /// Call with positional arguments only
    pub async fn call_positional(
        &self,
        endpoint: &str,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value> {
        self.call(endpoint, method, args, Map::new()).await
    }

    /// Call with named arguments only
    pub async fn call_named(
        &self,
        endpoint: &str,
        method: &str,
        args: Map<String, Value>,
    ) -> Result<Value> {
        self.call(endpoint, method, Vec::new(), args).await
    }

    /// Call and deserialize the result into `R`
    pub async fn call_typed<R>(
        &self,
        endpoint: &str,
        method: &str,
        positional: Vec<Value>,
        named: Map<String, Value>,
    ) -> Result<R>
    where
        R: serde::de::DeserializeOwned,
    {
        let value = self.call(endpoint, method, positional, named).await?;
        codec::decode_as(value)
    }
}

/// One-shot call with a fresh default client
pub async fn call(
    endpoint: &str,
    method: &str,
    positional: Vec<Value>,
    named: Map<String, Value>,
) -> Result<Value> {
    RpcClient::new()
        .call(endpoint, method, positional, named)
        .await
}
