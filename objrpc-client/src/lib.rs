//! JSON-RPC 2.0 client for objrpc web services over HTTP
//!
//! Calls a method on a remote object addressed by URL path, with either
//! positional or named arguments, and returns the result or a typed error.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use objrpc_client::RpcClient;
//! use serde_json::{json, Map};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RpcClient::new();
//!     let endpoint = "http://localhost:6080/crawler/engine";
//!
//!     let status = client.call_positional(endpoint, "status", vec![]).await?;
//!     println!("engine: {}", status);
//!
//!     let mut args = Map::new();
//!     args.insert("spider".into(), json!("example"));
//!     client.call_named(endpoint, "close_spider", args).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Errors
//!
//! A remote failure comes back as `Error::Remote` with the server's code,
//! message and data untouched:
//!
//! ```rust,no_run
//! # async fn example() {
//! use objrpc_core::Error;
//! use serde_json::Map;
//!
//! match objrpc_client::call("http://localhost:6080/crawler", "nope", vec![], Map::new()).await {
//!     Err(Error::Remote(e)) => eprintln!("{} {}", e.code, e.message),
//!     Err(other) => eprintln!("call failed: {}", other),
//!     Ok(value) => println!("{}", value),
//! }
//! # }
//! ```

mod client;
mod client_builder;
mod request;

pub use client::{call, RpcClient};
pub use client_builder::ClientBuilder;
pub use request::{build_request, into_result, next_id};

pub use objrpc_core::{Error, Result};
