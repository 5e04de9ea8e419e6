//! Client builder for HTTP options and observability
//!
//! # Examples
//!
//! ```rust,no_run
//! use objrpc_client::ClientBuilder;
//! use std::time::Duration;
//!
//! # fn example() -> objrpc_core::Result<()> {
//! let client = ClientBuilder::new()
//!     .timeout(Duration::from_secs(10))
//!     .user_agent("crawler-console/1.0")
//!     .build()?;
//!
//! // With observability
//! let traced = ClientBuilder::new()
//!     .with_default_observability()
//!     .service_name("crawler-console")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use crate::RpcClient;
use objrpc_core::{Error, ObservabilityConfig, Result};
use std::time::Duration;

/// Builder for configuring and creating an [`RpcClient`]
#[derive(Debug, Default)]
pub struct ClientBuilder {
    timeout: Option<Duration>,
    user_agent: Option<String>,
    observability_config: Option<ObservabilityConfig>,
    service_name: Option<String>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whole-call timeout; unset means wait indefinitely
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// `User-Agent` header sent with every call
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Enable OpenTelemetry observability with custom configuration
    pub fn with_observability(mut self, config: ObservabilityConfig) -> Self {
        self.observability_config = Some(config);
        self
    }

    /// Enable OpenTelemetry observability with default configuration
    pub fn with_default_observability(mut self) -> Self {
        self.observability_config = Some(ObservabilityConfig::default());
        self
    }

    /// Set service name for observability (used if observability is enabled)
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Build the client
    pub fn build(self) -> Result<RpcClient> {
        if let Some(mut config) = self.observability_config {
            if let Some(name) = self.service_name {
                config.service_name = name;
            }
            objrpc_core::init_observability(config)
                .map_err(|e| Error::Internal(format!("Failed to initialize observability: {}", e)))?;
        }

        let mut http = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            http = http.timeout(timeout);
        }
        if let Some(agent) = self.user_agent {
            http = http.user_agent(agent);
        }
        let http = http.build().map_err(|e| Error::Http(e.to_string()))?;

        Ok(RpcClient::with_http_client(http))
    }
}
