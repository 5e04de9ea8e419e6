//! JSON-RPC over HTTP into a live object graph
//!
//! This crate exposes in-process objects for remote inspection and control.
//! A request path names an object by walking its children from a fixed
//! root; the JSON-RPC body names a method on that object.
//!
//! # Core Pieces
//!
//! - **Exposed objects**: the [`Exposed`] capability and the table-backed
//!   [`ObjectNode`]
//! - **Methods**: [`Method`], built with [`from_fn`], [`from_typed_fn`] or the
//!   `#[method]` attribute from objrpc-macros
//! - **Resolution**: [`Path`] and [`resolve`], one child lookup per segment
//! - **Dispatch**: [`Dispatcher`], which turns any outcome of a call into a
//!   response envelope
//! - **Service**: [`Settings`], [`ResourceTree`] and [`WebService`], which
//!   listen between engine start and stop
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use objrpc_server::{from_fn, from_typed_fn, EngineSignal, ObjectNode, ResourceTree, Settings, WebService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = ObjectNode::builder()
//!         .method("status", from_fn(|_| async { Ok(serde_json::json!("running")) }))
//!         .method("pause", from_typed_fn(|(): ()| async { Ok(true) }))
//!         .build();
//!     let crawler = ObjectNode::builder().child("engine", engine).build();
//!
//!     let service = WebService::builder(Settings::default())
//!         .tree(ResourceTree::builder().mount("crawler", crawler).build())
//!         .build()?
//!         .expect("enabled by default");
//!
//!     let addr = service.start_listening().await?;
//!     println!("POST http://{}/crawler/engine", addr);
//!     # service.stop_listening().await;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Accept loop**: one task per listening service, stopped through a
//!   `watch` channel
//! - **Connection tasks**: one per TCP connection, driven by hyper's HTTP/1
//!   connection builder
//! - **Dispatch**: stateless; every request resolves from the root again and
//!   invokes the method to completion

mod access_log;
mod dispatcher;
mod http;
mod method;
mod metrics;
mod object;
mod panic_guard;
mod resolver;
mod resource;
mod service;
mod settings;

pub use access_log::{AccessEntry, AccessLog};
pub use dispatcher::Dispatcher;
pub use http::{apply_cors_headers, handle_request, json_response, HttpState, NOT_FOUND_BODY};
pub use method::{bind_params, from_fn, from_typed_fn, AsyncMethod, Method, MethodFuture};
pub use metrics::ServerMetrics;
pub use object::{ChildLookup, Exposed, ObjectNode, ObjectNodeBuilder};
pub use panic_guard::{install_panic_hook, panic_to_string, take_panic_trace};
pub use resolver::{resolve, Path, ResolveError};
pub use resource::{ResourceFactory, ResourceRegistry, ResourceTree, ResourceTreeBuilder, RootNode};
pub use service::{EngineSignal, WebService, WebServiceBuilder};
pub use settings::{build_component_list, Introspection, ResourceOrders, Settings, DEFAULT_MAX_BODY_SIZE};

pub use objrpc_core::{Error, Result};
