//! Resource tree bootstrap
//!
//! The web service serves a fixed root whose children are the mounted
//! resources: the host's controller, stats and engine status objects, or
//! whatever else it registered. Which resources are mounted, and in which
//! order, comes from [`Settings`]; how to build each one comes from a
//! [`ResourceRegistry`].
//!
//! The root itself lists the mounted names on GET and takes no calls.
//!
//! ```rust
//! use objrpc_server::{ObjectNode, ResourceRegistry, ResourceTree, Settings};
//!
//! let mut registry = ResourceRegistry::new();
//! registry.register("crawler", || ObjectNode::builder().build());
//! registry.register("stats", || ObjectNode::builder().build());
//!
//! let settings = Settings::default()
//!     .with_base_resource("crawler", 1)
//!     .with_base_resource("stats", 2);
//!
//! let tree = ResourceTree::from_settings(&settings, &registry).unwrap();
//! assert_eq!(tree.names(), &["crawler", "stats"]);
//! ```

use crate::object::Exposed;
use crate::resolver::{resolve, Path, ResolveError};
use crate::settings::Settings;
use objrpc_core::{Error, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds one resource object
pub type ResourceFactory = dyn Fn() -> Arc<dyn Exposed> + Send + Sync;

/// Named resource factories known to the host
#[derive(Default)]
pub struct ResourceRegistry {
    factories: HashMap<String, Arc<ResourceFactory>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the factory for `name`
    pub fn register<F, E>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Arc<E> + Send + Sync + 'static,
        E: Exposed + 'static,
    {
        self.factories.insert(
            name.into(),
            Arc::new(move || factory() as Arc<dyn Exposed>),
        );
        self
    }

    /// Whether a factory is registered for `name`
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Build the resource `name`
    pub fn create(&self, name: &str) -> Option<Arc<dyn Exposed>> {
        self.factories.get(name).map(|factory| factory())
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}

/// The service root: a fixed set of named resources
pub struct RootNode {
    order: Vec<String>,
    mounts: HashMap<String, Arc<dyn Exposed>>,
}

impl Exposed for RootNode {
    fn child(&self, name: &str) -> Option<Arc<dyn Exposed>> {
        self.mounts.get(name).cloned()
    }

    fn children(&self) -> Vec<String> {
        self.order.clone()
    }

    fn describe(&self) -> Value {
        json!({ "resources": self.order })
    }

    fn accepts_rpc(&self) -> bool {
        false
    }
}

impl fmt::Debug for RootNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootNode").field("resources", &self.order).finish()
    }
}

/// Root plus its mounted resources, fixed after construction
#[derive(Clone, Debug)]
pub struct ResourceTree {
    root: Arc<RootNode>,
}

impl ResourceTree {
    /// Mount resources explicitly
    pub fn builder() -> ResourceTreeBuilder {
        ResourceTreeBuilder::default()
    }

    /// Mount the enabled resources of `settings`, in configured order
    ///
    /// # Errors
    ///
    /// `Error::Config` when an enabled name has no registered factory.
    pub fn from_settings(settings: &Settings, registry: &ResourceRegistry) -> Result<Self> {
        let mut builder = Self::builder();
        for name in settings.component_list() {
            let resource = registry.create(&name).ok_or_else(|| {
                Error::Config(format!(
                    "unknown resource {:?} (registered: {})",
                    name,
                    registry.names().join(", ")
                ))
            })?;
            tracing::debug!(resource = %name, "mounting resource");
            builder = builder.mount(name, resource);
        }
        Ok(builder.build())
    }

    /// The root as an exposed object
    pub fn root(&self) -> Arc<dyn Exposed> {
        self.root.clone()
    }

    /// Mounted names in order
    pub fn names(&self) -> &[String] {
        &self.root.order
    }

    /// Resolve a request path from the root
    pub fn resolve(&self, path: &Path) -> std::result::Result<Arc<dyn Exposed>, ResolveError> {
        resolve(&self.root(), path.segments())
    }
}

/// Builder for a [`ResourceTree`]
#[derive(Default)]
pub struct ResourceTreeBuilder {
    order: Vec<String>,
    mounts: HashMap<String, Arc<dyn Exposed>>,
}

impl ResourceTreeBuilder {
    /// Mount `resource` under `name`; a repeated name replaces in place
    pub fn mount(mut self, name: impl Into<String>, resource: Arc<dyn Exposed>) -> Self {
        let name = name.into();
        if self.mounts.insert(name.clone(), resource).is_none() {
            self.order.push(name);
        }
        self
    }

    pub fn build(self) -> ResourceTree {
        ResourceTree {
            root: Arc::new(RootNode {
                order: self.order,
                mounts: self.mounts,
            }),
        }
    }
}
