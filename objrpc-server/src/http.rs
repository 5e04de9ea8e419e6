//! HTTP front end of the web service
//!
//! Maps HTTP requests onto the resource tree:
//!
//! - `GET /` → `{"resources": [...]}`
//! - `GET /a/b` → description of the resolved node (unless introspection is root-only)
//! - `POST /a/b` → JSON-RPC call dispatched on the resolved node, always HTTP 200
//! - unresolvable path → 404 `No such child resource.`
//! - other methods, POST to the root → 405
//! - body over the limit → 413
//!
//! JSON bodies end with a newline and carry permissive CORS headers.

use crate::access_log::{AccessEntry, AccessLog};
use crate::dispatcher::Dispatcher;
use crate::metrics::ServerMetrics;
use crate::resolver::Path;
use crate::resource::ResourceTree;
use crate::settings::Introspection;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::header::{self, HeaderValue};
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

/// Body text of every 404
pub const NOT_FOUND_BODY: &str = "No such child resource.";

/// Everything a connection task needs to answer requests
pub struct HttpState {
    pub tree: ResourceTree,
    pub dispatcher: Dispatcher,
    pub access_log: AccessLog,
    pub introspection: Introspection,
    pub max_body_size: usize,
    pub metrics: Option<Arc<ServerMetrics>>,
}

/// Answer one HTTP request and record it in the access log
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<HttpState>,
    peer: Option<SocketAddr>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let method = req.method().to_string();
    let uri = req.uri().to_string();
    let version = format!("{:?}", req.version());
    let referrer = header_text(&req, header::REFERER);
    let user_agent = header_text(&req, header::USER_AGENT);

    let response = route(req, &state).await;

    state.access_log.record(&AccessEntry {
        peer,
        method: &method,
        uri: &uri,
        version: &version,
        status: response.status().as_u16(),
        length: response.body().size_hint().exact().unwrap_or(0) as usize,
        referrer: referrer.as_deref(),
        user_agent: user_agent.as_deref(),
    });

    Ok(response)
}

async fn route<B>(req: Request<B>, state: &HttpState) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let is_get = match *req.method() {
        Method::GET => true,
        Method::POST => false,
        _ => return method_not_allowed(),
    };

    let path = Path::parse(req.uri().path());
    let target = match state.tree.resolve(&path) {
        Ok(target) => target,
        Err(e) => {
            tracing::debug!(path = %path, error = %e, "unresolved path");
            if let Some(metrics) = &state.metrics {
                metrics.record_unresolved();
            }
            return text_response(StatusCode::NOT_FOUND, NOT_FOUND_BODY);
        }
    };

    if is_get {
        if !path.is_root() && state.introspection == Introspection::RootOnly {
            return method_not_allowed();
        }
        let body = serde_json::to_vec(&state.dispatcher.describe(&target)).unwrap_or_default();
        return json_response(body);
    }

    if !target.accepts_rpc() {
        return method_not_allowed();
    }

    let body = match read_body(req, state.max_body_size).await {
        Ok(body) => body,
        Err(response) => return response,
    };

    let response = state.dispatcher.handle(&target, &body).await;
    json_response(state.dispatcher.codec().encode_response(&response))
}

async fn read_body<B>(req: Request<B>, limit: usize) -> Result<Bytes, Response<Full<Bytes>>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let declared = req
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(text_response(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large"));
    }

    match Limited::new(req.into_body(), limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(text_response(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large"))
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to read request body");
            Err(text_response(StatusCode::BAD_REQUEST, "Failed to read request body"))
        }
    }
}

fn header_text<B>(req: &Request<B>, name: header::HeaderName) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// JSON response with trailing newline and CORS headers
pub fn json_response(mut body: Vec<u8>) -> Response<Full<Bytes>> {
    body.push(b'\n');
    let mut response = Response::new(Full::new(Bytes::from(body)));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    apply_cors_headers(headers);
    response
}

/// Permissive CORS headers for browser consoles
pub fn apply_cors_headers(headers: &mut hyper::HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PATCH, PUT, DELETE"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("X-Requested-With"),
    );
}

fn text_response(status: StatusCode, text: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(text.as_bytes())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    response
}

fn method_not_allowed() -> Response<Full<Bytes>> {
    let mut response = text_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
    response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static("GET, POST"));
    response
}
