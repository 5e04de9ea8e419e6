//! Common test utilities for objrpc-client integration tests
//!
//! A mock HTTP server that records request bodies and answers with canned
//! responses, so client behavior can be tested without objrpc-server.

#![allow(dead_code)]

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Canned answer of the mock server
pub struct MockReply {
    pub status: StatusCode,
    pub body: String,
}

impl MockReply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.into(),
        }
    }

    pub fn status(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Mock HTTP server for client testing
pub struct MockHttpServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    body_rx: mpsc::Receiver<String>,
}

impl MockHttpServer {
    /// Start a server that answers every request with `reply`'s output
    ///
    /// The handler receives the raw request body.
    pub async fn with_handler<F, Fut>(handler: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = MockReply> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (body_tx, body_rx) = mpsc::channel::<String>(100);
        let handler = Arc::new(handler);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    accepted = listener.accept() => {
                        let Ok((stream, _)) = accepted else { continue };
                        let handler = Arc::clone(&handler);
                        let body_tx = body_tx.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                                let handler = Arc::clone(&handler);
                                let body_tx = body_tx.clone();
                                async move {
                                    let bytes = req.into_body().collect().await.unwrap().to_bytes();
                                    let text = String::from_utf8_lossy(&bytes).to_string();
                                    let _ = body_tx.send(text.clone()).await;

                                    let reply = handler(text).await;
                                    let mut response = Response::new(Full::new(Bytes::from(reply.body)));
                                    *response.status_mut() = reply.status;
                                    Ok::<_, Infallible>(response)
                                }
                            });
                            let _ = http1::Builder::new()
                                .serve_connection(TokioIo::new(stream), service)
                                .await;
                        });
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            body_rx,
        }
    }

    /// Start a server that always answers 200 with `body`
    pub async fn replying(body: impl Into<String>) -> Self {
        let body = body.into();
        Self::with_handler(move |_| {
            let body = body.clone();
            async move { MockReply::ok(body) }
        })
        .await
    }

    /// URL of `path` on this server
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Next request body the server received
    pub async fn next_body(&mut self) -> Option<String> {
        tokio::time::timeout(tokio::time::Duration::from_secs(5), self.body_rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Whether no request body has arrived yet
    pub fn is_untouched(&mut self) -> bool {
        self.body_rx.try_recv().is_err()
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

/// A success envelope
pub fn mock_response(id: &serde_json::Value, result: serde_json::Value) -> String {
    serde_json::json!({
        "jsonrpc": "2.0",
        "result": result,
        "id": id
    })
    .to_string()
}

/// An error envelope
pub fn mock_error_response(
    id: &serde_json::Value,
    code: i64,
    message: &str,
    data: serde_json::Value,
) -> String {
    serde_json::json!({
        "jsonrpc": "2.0",
        "error": {
            "code": code,
            "message": message,
            "data": data
        },
        "id": id
    })
    .to_string()
}

/// Echo the `id` of a request body back in a success envelope
pub fn echo_id(body: &str, result: serde_json::Value) -> String {
    let request: serde_json::Value = serde_json::from_str(body).unwrap();
    mock_response(&request["id"], result)
}
