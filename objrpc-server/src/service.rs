//! Web service lifecycle
//!
//! A [`WebService`] owns the resource tree, the dispatcher and the settings.
//! It listens only between the host's engine start and stop signals:
//!
//! - [`EngineSignal::Started`] binds a port from the configured range and
//!   spawns the accept loop
//! - [`EngineSignal::Stopped`] stops accepting and waits for the accept loop
//!
//! Each accepted connection is served on its own task with hyper's HTTP/1
//! connection driver.

use crate::access_log::AccessLog;
use crate::dispatcher::Dispatcher;
use crate::http::{handle_request, HttpState};
use crate::metrics::ServerMetrics;
use crate::panic_guard::install_panic_hook;
use crate::resource::{ResourceRegistry, ResourceTree};
use crate::settings::Settings;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use objrpc_core::{Codec, Error, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;

/// Host lifecycle events the service follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineSignal {
    /// Start listening
    Started,
    /// Stop listening
    Stopped,
}

struct Listening {
    addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// The JSON-RPC web service
pub struct WebService {
    settings: Settings,
    state: Arc<HttpState>,
    listening: Mutex<Option<Listening>>,
}

impl WebService {
    /// Start configuring a service
    pub fn builder(settings: Settings) -> WebServiceBuilder {
        WebServiceBuilder::new(settings)
    }

    /// Build the service for `settings`, mounting resources from `registry`
    ///
    /// Returns `Ok(None)` when the service is disabled.
    ///
    /// # Errors
    ///
    /// `Error::Config` for invalid settings, an unknown resource name or an
    /// unopenable log file.
    pub fn from_settings(settings: Settings, registry: &ResourceRegistry) -> Result<Option<Self>> {
        Self::builder(settings).registry(registry).build()
    }

    /// The settings the service was built with
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The mounted resource tree
    pub fn tree(&self) -> &ResourceTree {
        &self.state.tree
    }

    /// Address currently listened on
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.listening.lock().await.as_ref().map(|l| l.addr)
    }

    /// Bind and start accepting connections
    ///
    /// Calling this while already listening logs a warning and returns the
    /// existing address.
    #[tracing::instrument(skip(self), name = "webservice.start")]
    pub async fn start_listening(&self) -> Result<SocketAddr> {
        let mut listening = self.listening.lock().await;
        if let Some(current) = listening.as_ref() {
            tracing::warn!(addr = %current.addr, "web service already listening");
            return Ok(current.addr);
        }

        let listener = bind_listener(&self.settings).await?;
        let addr = listener.local_addr()?;
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(accept_loop(listener, Arc::clone(&self.state), shutdown_rx));

        tracing::debug!("Web service listening on {}:{}", addr.ip(), addr.port());
        *listening = Some(Listening {
            addr,
            shutdown,
            task,
        });
        Ok(addr)
    }

    /// Stop accepting connections; a no-op when not listening
    ///
    /// Connections already accepted finish their in-flight requests.
    #[tracing::instrument(skip(self), name = "webservice.stop")]
    pub async fn stop_listening(&self) {
        let Some(listening) = self.listening.lock().await.take() else {
            tracing::debug!("web service not listening");
            return;
        };

        let _ = listening.shutdown.send(true);
        if let Err(e) = listening.task.await {
            tracing::error!(error = %e, "accept loop failed");
        }
        tracing::debug!(addr = %listening.addr, "web service stopped listening");
    }

    /// Follow engine signals until `Stopped` or until the channel closes
    ///
    /// ```rust,no_run
    /// use objrpc_server::{EngineSignal, ResourceRegistry, Settings, WebService};
    /// use std::sync::Arc;
    ///
    /// # async fn example() -> objrpc_core::Result<()> {
    /// let service = WebService::from_settings(Settings::default(), &ResourceRegistry::new())?
    ///     .expect("enabled");
    /// let service = Arc::new(service);
    /// let (signals, rx) = tokio::sync::broadcast::channel(4);
    ///
    /// let follower = tokio::spawn({
    ///     let service = Arc::clone(&service);
    ///     async move { service.serve_signals(rx).await }
    /// });
    ///
    /// signals.send(EngineSignal::Started).ok();
    /// // ... engine runs ...
    /// signals.send(EngineSignal::Stopped).ok();
    /// follower.await.expect("join")?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn serve_signals(&self, mut signals: broadcast::Receiver<EngineSignal>) -> Result<()> {
        loop {
            match signals.recv().await {
                Ok(EngineSignal::Started) => {
                    self.start_listening().await?;
                }
                Ok(EngineSignal::Stopped) => {
                    self.stop_listening().await;
                    return Ok(());
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "missed engine signals");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    self.stop_listening().await;
                    return Ok(());
                }
            }
        }
    }
}

/// Builder for constructing a [`WebService`]
pub struct WebServiceBuilder {
    settings: Settings,
    tree: Option<ResourceTree>,
    registry_error: Option<Error>,
    codec: Codec,
    metrics: Option<Arc<ServerMetrics>>,
}

impl WebServiceBuilder {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            tree: None,
            registry_error: None,
            codec: Codec::default(),
            metrics: None,
        }
    }

    /// Mount the resources `settings` enables, built from `registry`
    pub fn registry(mut self, registry: &ResourceRegistry) -> Self {
        if self.settings.enabled {
            match ResourceTree::from_settings(&self.settings, registry) {
                Ok(tree) => self.tree = Some(tree),
                Err(e) => self.registry_error = Some(e),
            }
        }
        self
    }

    /// Use an explicitly built tree
    pub fn tree(mut self, tree: ResourceTree) -> Self {
        self.tree = Some(tree);
        self.registry_error = None;
        self
    }

    /// Use a codec with custom value encoder or decoder
    ///
    /// The version policy always comes from the settings.
    pub fn codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    /// Record OpenTelemetry metrics
    pub fn metrics(mut self, metrics: Arc<ServerMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Record metrics on the global meter under `service_name`
    pub fn with_default_metrics(self, service_name: impl Into<String>) -> Self {
        self.metrics(Arc::new(ServerMetrics::new(service_name)))
    }

    /// Build the service, or `None` when the settings disable it
    pub fn build(self) -> Result<Option<WebService>> {
        if !self.settings.enabled {
            tracing::debug!("web service disabled");
            return Ok(None);
        }
        if let Some(e) = self.registry_error {
            return Err(e);
        }
        self.settings.validate()?;

        if self.settings.expose_traces && !self.settings.is_loopback_host() {
            tracing::warn!(
                host = %self.settings.host,
                "stack traces are exposed in error responses on a non-loopback host"
            );
        }

        install_panic_hook();

        let codec = self.codec.with_version_policy(self.settings.version_policy);
        let mut dispatcher = Dispatcher::new(codec).with_expose_traces(self.settings.expose_traces);
        if let Some(metrics) = &self.metrics {
            dispatcher = dispatcher.with_metrics(Arc::clone(metrics));
        }

        let state = HttpState {
            tree: self.tree.unwrap_or_else(|| ResourceTree::builder().build()),
            dispatcher,
            access_log: AccessLog::open(self.settings.logfile.as_deref())?,
            introspection: self.settings.introspection,
            max_body_size: self.settings.max_body_size,
            metrics: self.metrics,
        };

        Ok(Some(WebService {
            settings: self.settings,
            state: Arc::new(state),
            listening: Mutex::new(None),
        }))
    }
}

/// Bind the first available port of the configured range
async fn bind_listener(settings: &Settings) -> Result<TcpListener> {
    let mut last_error = None;
    for port in settings.port_range()? {
        match TcpListener::bind((settings.host.as_str(), port)).await {
            Ok(listener) => return Ok(listener),
            Err(e) => {
                tracing::trace!(port, error = %e, "port unavailable");
                last_error = Some(e);
            }
        }
    }
    Err(Error::Io(format!(
        "cannot listen on {} ports {:?}: {}",
        settings.host,
        settings.port,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    )))
}

async fn accept_loop(
    listener: TcpListener,
    state: Arc<HttpState>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tracing::trace!(%peer, "connection accepted");
                    let state = Arc::clone(&state);
                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let service = service_fn(move |req| {
                            handle_request(req, Arc::clone(&state), Some(peer))
                        });
                        if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                            tracing::debug!(%peer, error = %err, "connection closed with error");
                        }
                    });
                }
                Err(e) => tracing::warn!(error = %e, "failed to accept connection"),
            },
            _ = shutdown.changed() => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectNode;

    fn local() -> Settings {
        Settings::default().with_port(vec![])
    }

    #[test]
    fn test_disabled_service_is_none() {
        let service =
            WebService::from_settings(Settings::default().with_enabled(false), &ResourceRegistry::new())
                .unwrap();
        assert!(service.is_none());
    }

    #[test]
    fn test_unknown_resource_fails() {
        let settings = local().with_base_resource("crawler", 1);
        let result = WebService::from_settings(settings, &ResourceRegistry::new());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_start_stop() {
        let service = WebService::from_settings(local(), &ResourceRegistry::new())
            .unwrap()
            .unwrap();

        assert!(service.local_addr().await.is_none());
        service.stop_listening().await;

        let addr = service.start_listening().await.unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(service.start_listening().await.unwrap(), addr);
        assert_eq!(service.local_addr().await, Some(addr));

        service.stop_listening().await;
        assert!(service.local_addr().await.is_none());
        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_port_range_skips_taken_ports() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let settings = local().with_port(vec![port, port.saturating_add(20)]);
        let service = WebService::builder(settings)
            .tree(ResourceTree::builder().mount("n", ObjectNode::builder().build()).build())
            .build()
            .unwrap()
            .unwrap();

        let addr = service.start_listening().await.unwrap();
        assert_ne!(addr.port(), port);
        service.stop_listening().await;
    }

    #[tokio::test]
    async fn test_single_taken_port_fails() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let service = WebService::builder(local().with_port(vec![port]))
            .build()
            .unwrap()
            .unwrap();
        assert!(matches!(service.start_listening().await, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_signals() {
        let service = Arc::new(
            WebService::builder(local()).build().unwrap().unwrap(),
        );
        let (tx, rx) = broadcast::channel(4);
        let follower = tokio::spawn({
            let service = Arc::clone(&service);
            async move { service.serve_signals(rx).await }
        });

        tx.send(EngineSignal::Started).unwrap();
        tx.send(EngineSignal::Started).unwrap();
        tx.send(EngineSignal::Stopped).unwrap();

        follower.await.unwrap().unwrap();
        assert!(service.local_addr().await.is_none());
    }
}
