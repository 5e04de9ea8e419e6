//! Exposed objects and their registration tables
//!
//! Remote callers only ever see a host object through the [`Exposed`]
//! capability: named children to walk into, named methods to invoke, and a
//! description for introspection.
//!
//! [`ObjectNode`] is the ready-made implementation. It keeps a table of
//! methods and a table of children, each behind a lock, so the host can
//! register or remove entries while the service is running and the next
//! request sees the change. Children that can't be enumerated up front (a
//! spider per name, a slot per index) are served by an optional dynamic
//! lookup.
//!
//! # Examples
//!
//! ```rust
//! use objrpc_server::{from_fn, Exposed, ObjectNode};
//! use std::sync::Arc;
//!
//! let engine = ObjectNode::builder()
//!     .method("status", from_fn(|_| async { Ok(serde_json::json!("running")) }))
//!     .build();
//!
//! let crawler = ObjectNode::builder()
//!     .child("engine", engine.clone())
//!     .build();
//!
//! assert!(crawler.child("engine").is_some());
//! assert!(crawler.child("missing").is_none());
//! assert_eq!(crawler.children(), vec!["engine".to_string()]);
//! ```

use crate::method::Method;
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Capability of an object that can be reached and invoked remotely
pub trait Exposed: Send + Sync {
    /// The child named `name`, if any
    fn child(&self, _name: &str) -> Option<Arc<dyn Exposed>> {
        None
    }

    /// The method named `name`, if any
    fn method(&self, _name: &str) -> Option<Arc<dyn Method>> {
        None
    }

    /// Names of enumerable children
    fn children(&self) -> Vec<String> {
        Vec::new()
    }

    /// Names of invocable methods
    fn methods(&self) -> Vec<String> {
        Vec::new()
    }

    /// Introspection document served on GET
    fn describe(&self) -> Value {
        json!({
            "children": self.children(),
            "methods": self.methods(),
        })
    }

    /// Whether POSTed calls may target this object
    fn accepts_rpc(&self) -> bool {
        true
    }
}

/// Dynamic child lookup consulted after the static child table
pub type ChildLookup = dyn Fn(&str) -> Option<Arc<dyn Exposed>> + Send + Sync;

/// Exposed object backed by registration tables
#[derive(Default)]
pub struct ObjectNode {
    methods: RwLock<HashMap<String, Arc<dyn Method>>>,
    children: RwLock<HashMap<String, Arc<dyn Exposed>>>,
    lookup: Option<Box<ChildLookup>>,
}

impl ObjectNode {
    /// Create an empty node
    pub fn new() -> Self {
        Self::default()
    }

    /// Start building a node
    pub fn builder() -> ObjectNodeBuilder {
        ObjectNodeBuilder::new()
    }

    /// Register (or replace) a method
    pub fn register(&self, name: impl Into<String>, method: Box<dyn Method>) {
        self.methods.write().insert(name.into(), Arc::from(method));
    }

    /// Remove a method, returning whether it existed
    pub fn unregister(&self, name: &str) -> bool {
        self.methods.write().remove(name).is_some()
    }

    /// Attach (or replace) a child
    pub fn add_child(&self, name: impl Into<String>, child: Arc<dyn Exposed>) {
        self.children.write().insert(name.into(), child);
    }

    /// Detach a child, returning whether it existed
    pub fn remove_child(&self, name: &str) -> bool {
        self.children.write().remove(name).is_some()
    }

    /// Check if a method is registered
    pub fn has_method(&self, name: &str) -> bool {
        self.methods.read().contains_key(name)
    }
}

impl Exposed for ObjectNode {
    fn child(&self, name: &str) -> Option<Arc<dyn Exposed>> {
        if let Some(child) = self.children.read().get(name) {
            return Some(Arc::clone(child));
        }
        self.lookup.as_ref().and_then(|lookup| lookup(name))
    }

    fn method(&self, name: &str) -> Option<Arc<dyn Method>> {
        self.methods.read().get(name).cloned()
    }

    fn children(&self) -> Vec<String> {
        let mut names: Vec<String> = self.children.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn methods(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.read().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Builder for constructing an [`ObjectNode`]
pub struct ObjectNodeBuilder {
    node: ObjectNode,
}

impl ObjectNodeBuilder {
    pub fn new() -> Self {
        Self {
            node: ObjectNode::new(),
        }
    }

    /// Add a method
    pub fn method(self, name: impl Into<String>, method: Box<dyn Method>) -> Self {
        self.node.register(name, method);
        self
    }

    /// Add a child
    pub fn child(self, name: impl Into<String>, child: Arc<dyn Exposed>) -> Self {
        self.node.add_child(name, child);
        self
    }

    /// Serve children not in the static table
    pub fn lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<Arc<dyn Exposed>> + Send + Sync + 'static,
    {
        self.node.lookup = Some(Box::new(lookup));
        self
    }

    /// Build the node
    pub fn build(self) -> Arc<ObjectNode> {
        Arc::new(self.node)
    }
}

impl Default for ObjectNodeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
