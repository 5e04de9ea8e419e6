//! objrpc - JSON-RPC over HTTP into a live object graph
//!
//! This is the convenience crate that re-exports all objrpc sub-crates.
//!
//! # Architecture
//!
//! - **objrpc-core**: envelopes, codec, error taxonomy, observability
//! - **objrpc-server**: path resolver, dispatcher, resource tree and the
//!   HTTP web service
//! - **objrpc-client**: HTTP client for calling exposed methods
//! - **objrpc-macros**: the `#[method]` attribute
//!
//! # Quick Start - Server
//!
//! ```rust,no_run
//! use objrpc::server::{from_fn, ObjectNode, ResourceRegistry, Settings};
//! use objrpc::WebService;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut registry = ResourceRegistry::new();
//!     registry.register("crawler", || {
//!         ObjectNode::builder()
//!             .method("status", from_fn(|_| async { Ok(serde_json::json!("running")) }))
//!             .build()
//!     });
//!
//!     let settings = Settings::default().with_base_resource("crawler", 1);
//!     if let Some(service) = WebService::from_settings(settings, &registry)? {
//!         let addr = service.start_listening().await?;
//!         println!("listening on {}", addr);
//!         tokio::signal::ctrl_c().await?;
//!         service.stop_listening().await;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Quick Start - Client
//!
//! ```rust,no_run
//! use objrpc::RpcClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RpcClient::new();
//!     let status = client
//!         .call_positional("http://127.0.0.1:6023/crawler", "status", vec![])
//!         .await?;
//!     println!("status: {}", status);
//!     Ok(())
//! }
//! ```

pub use objrpc_client as client;
pub use objrpc_core as core;
pub use objrpc_macros as macros;
pub use objrpc_server as server;

pub use objrpc_client::RpcClient;
pub use objrpc_macros::method;
pub use objrpc_server::WebService;
