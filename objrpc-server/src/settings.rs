//! Web service settings
//!
//! Settings come from a TOML document or are built in code. Every field has
//! a default, so an empty document is a valid configuration:
//!
//! ```toml
//! enabled = true
//! host = "127.0.0.1"
//! port = [6023, 6073]
//! logfile = "/var/log/webservice.log"
//! expose_traces = true
//! introspection = "all"
//! version_policy = "lenient"
//!
//! [resources_base]
//! crawler = 1
//! stats = 1
//!
//! [resources]
//! stats = false     # disable a base resource
//! enginestatus = 2
//! ```
//!
//! TOML has no `null`, so a resource order of `false` disables the entry.
//! JSON-sourced settings may use `null` as well.

use objrpc_core::{Error, Result, VersionPolicy};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

/// Default POST body limit
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Resource name → mount order; `None` disables the entry
pub type ResourceOrders = BTreeMap<String, Option<i64>>;

/// Which nodes answer GET with their description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Introspection {
    /// Every RPC-capable node
    #[default]
    All,
    /// Only the root listing; GET elsewhere is 405
    RootOnly,
}

/// Configuration of the web service
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// When false the service is not built at all
    pub enabled: bool,
    /// Access log file; when unset access lines go to `tracing`
    pub logfile: Option<PathBuf>,
    /// `[]` ephemeral, `[port]` exact, `[lo, hi]` first bindable in range
    pub port: Vec<u16>,
    /// Bind host
    pub host: String,
    /// Base resource table
    #[serde(deserialize_with = "deserialize_orders")]
    pub resources_base: ResourceOrders,
    /// Overrides merged over `resources_base`
    #[serde(deserialize_with = "deserialize_orders")]
    pub resources: ResourceOrders,
    /// POST bodies larger than this are rejected with 413
    pub max_body_size: usize,
    /// Put stack traces in error `data`
    pub expose_traces: bool,
    /// GET introspection scope
    pub introspection: Introspection,
    /// Whether requests must carry `"jsonrpc": "2.0"`
    pub version_policy: VersionPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            logfile: None,
            port: vec![6023, 6073],
            host: "127.0.0.1".to_string(),
            resources_base: ResourceOrders::new(),
            resources: ResourceOrders::new(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            expose_traces: true,
            introspection: Introspection::default(),
            version_policy: VersionPolicy::default(),
        }
    }
}

impl Settings {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Settings =
            toml::from_str(text).map_err(|e| Error::Config(format!("invalid settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Check the fields serde can't
    pub fn validate(&self) -> Result<()> {
        self.port_range()?;
        if self.host.trim().is_empty() {
            return Err(Error::Config("host must not be empty".into()));
        }
        if self.max_body_size == 0 {
            return Err(Error::Config("max_body_size must be positive".into()));
        }
        Ok(())
    }

    /// Ports to try, in order
    ///
    /// ```rust
    /// use objrpc_server::Settings;
    ///
    /// let settings = Settings::default().with_port(vec![]);
    /// assert_eq!(settings.port_range().unwrap(), 0..=0);
    ///
    /// let settings = Settings::default().with_port(vec![1, 2, 3]);
    /// assert!(settings.port_range().is_err());
    /// ```
    pub fn port_range(&self) -> Result<RangeInclusive<u16>> {
        match self.port.as_slice() {
            [] => Ok(0..=0),
            [port] => Ok(*port..=*port),
            [lo, hi] if lo <= hi => Ok(*lo..=*hi),
            [lo, hi] => Err(Error::Config(format!("port range {}-{} is empty", lo, hi))),
            more => Err(Error::Config(format!(
                "port takes at most two entries, got {}",
                more.len()
            ))),
        }
    }

    /// True when `host` only accepts local connections
    pub fn is_loopback_host(&self) -> bool {
        match self.host.parse::<IpAddr>() {
            Ok(ip) => ip.is_loopback(),
            Err(_) => self.host.eq_ignore_ascii_case("localhost"),
        }
    }

    /// Enabled resource names in mount order
    pub fn component_list(&self) -> Vec<String> {
        build_component_list(&self.resources_base, &self.resources)
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: Vec<u16>) -> Self {
        self.port = port;
        self
    }

    pub fn with_logfile(mut self, path: impl Into<PathBuf>) -> Self {
        self.logfile = Some(path.into());
        self
    }

    /// Add a base resource at `order`
    pub fn with_base_resource(mut self, name: impl Into<String>, order: i64) -> Self {
        self.resources_base.insert(name.into(), Some(order));
        self
    }

    /// Override a resource; `None` disables it
    pub fn with_resource(mut self, name: impl Into<String>, order: Option<i64>) -> Self {
        self.resources.insert(name.into(), order);
        self
    }

    pub fn with_max_body_size(mut self, limit: usize) -> Self {
        self.max_body_size = limit;
        self
    }

    pub fn with_expose_traces(mut self, expose: bool) -> Self {
        self.expose_traces = expose;
        self
    }

    pub fn with_introspection(mut self, introspection: Introspection) -> Self {
        self.introspection = introspection;
        self
    }

    pub fn with_version_policy(mut self, policy: VersionPolicy) -> Self {
        self.version_policy = policy;
        self
    }
}

/// Merge `overrides` over `base` and order the enabled names
///
/// Entries whose order is `None` are dropped. The rest are sorted by order,
/// ties broken by name.
///
/// ```rust
/// use objrpc_server::build_component_list;
/// use std::collections::BTreeMap;
///
/// let base = BTreeMap::from([("stats".to_string(), Some(1)), ("crawler".to_string(), Some(1))]);
/// let overrides = BTreeMap::from([("stats".to_string(), None), ("engine".to_string(), Some(0))]);
///
/// assert_eq!(build_component_list(&base, &overrides), vec!["engine", "crawler"]);
/// ```
pub fn build_component_list(base: &ResourceOrders, overrides: &ResourceOrders) -> Vec<String> {
    let mut merged = base.clone();
    merged.extend(overrides.iter().map(|(k, v)| (k.clone(), *v)));

    let mut enabled: Vec<(i64, String)> = merged
        .into_iter()
        .filter_map(|(name, order)| order.map(|o| (o, name)))
        .collect();
    enabled.sort();
    enabled.into_iter().map(|(_, name)| name).collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOrder {
    Order(i64),
    Flag(Option<bool>),
}

fn deserialize_orders<'de, D>(deserializer: D) -> std::result::Result<ResourceOrders, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, RawOrder>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(name, order)| match order {
            RawOrder::Order(o) => Ok((name, Some(o))),
            RawOrder::Flag(None) | RawOrder::Flag(Some(false)) => Ok((name, None)),
            RawOrder::Flag(Some(true)) => Err(serde::de::Error::custom(format!(
                "resource {:?}: expected an order number or false",
                name
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();

        assert!(settings.enabled);
        assert_eq!(settings.port, vec![6023, 6073]);
        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.max_body_size, 1024 * 1024);
        assert!(settings.expose_traces);
        assert_eq!(settings.introspection, Introspection::All);
        assert_eq!(settings.version_policy, VersionPolicy::Lenient);
        assert!(settings.is_loopback_host());
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(Settings::from_toml_str("").unwrap(), Settings::default());
    }

    #[test]
    fn test_full_toml() {
        let settings = Settings::from_toml_str(
            r#"
            enabled = false
            host = "0.0.0.0"
            port = [7000]
            logfile = "access.log"
            max_body_size = 2048
            expose_traces = false
            introspection = "root_only"
            version_policy = "strict"

            [resources_base]
            crawler = 1
            stats = 1

            [resources]
            stats = false
            enginestatus = 0
            "#,
        )
        .unwrap();

        assert!(!settings.enabled);
        assert!(!settings.is_loopback_host());
        assert_eq!(settings.port_range().unwrap(), 7000..=7000);
        assert_eq!(settings.logfile, Some(PathBuf::from("access.log")));
        assert_eq!(settings.introspection, Introspection::RootOnly);
        assert_eq!(settings.version_policy, VersionPolicy::Strict);
        assert_eq!(settings.resources.get("stats"), Some(&None));
        assert_eq!(settings.component_list(), vec!["enginestatus", "crawler"]);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            Settings::from_toml_str("port = [1, 2, 3]"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Settings::from_toml_str("unknown_key = 1"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Settings::from_toml_str("[resources]\ncrawler = true"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_port_range() {
        let range = |ports: Vec<u16>| Settings::default().with_port(ports).port_range();

        assert_eq!(range(vec![6023, 6073]).unwrap(), 6023..=6073);
        assert!(range(vec![10, 5]).is_err());
    }

    #[test]
    fn test_component_list_ordering() {
        let settings = Settings::default()
            .with_base_resource("b", 2)
            .with_base_resource("a", 2)
            .with_base_resource("c", 1)
            .with_resource("d", Some(-5))
            .with_resource("c", None);

        assert_eq!(settings.component_list(), vec!["d", "a", "b"]);
    }

    #[test]
    fn test_json_null_disables() {
        let settings: Settings =
            serde_json::from_str(r#"{"resources_base":{"x":1},"resources":{"x":null}}"#).unwrap();
        assert!(settings.component_list().is_empty());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("webservice.toml");
        std::fs::write(&path, "host = \"localhost\"\nport = []\n").unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert!(settings.is_loopback_host());
        assert_eq!(settings.port_range().unwrap(), 0..=0);

        assert!(Settings::from_file(dir.path().join("missing.toml")).is_err());
    }
}
