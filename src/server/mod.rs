//! Proxy server lifecycle.
//!
//! Owns the listener and the state shared by all sessions of one run:
//!
//! ```text
//!   start() ──► binding table ──► listen 127.0.0.1:port ──► accept loop
//!                                        │                     │
//!                                        ▼                     ▼
//!                               blocklist reload        one task per client
//!                               (background)            (proxy::session)
//! ```
//!
//! `stop()` ends the accept loop and any blocklist load started with it;
//! sessions already running drain on their own.

pub mod config;
mod metrics;
mod status;

pub use config::{default_config_dir, ConfigFile, ProxyConfig, CONFIG_FILE_NAME};
pub use metrics::{MetricsSnapshot, ProxyMetrics};
pub use status::{ServerStatus, StatusLog};

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::classify::{BlocklistSource, DomainClassifier};
use crate::error::{Error, Result};
use crate::net::{BindingTable, BoundDialer, Dialer, InterfaceResolver, SystemInterfaces};
use crate::proxy::{self, SessionContext};
use crate::routing::Router;

/// A started server: the accept task, its stop signal and the initial
/// blocklist load.
struct Running {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    accept_task: JoinHandle<()>,
    reload_task: JoinHandle<()>,
}

/// The routing SOCKS5 proxy server.
pub struct ProxyServer {
    config: RwLock<Arc<ProxyConfig>>,
    config_dir: Option<PathBuf>,
    classifier: Arc<DomainClassifier>,
    resolver: Arc<dyn InterfaceResolver>,
    dialer: Arc<dyn Dialer>,
    metrics: Arc<ProxyMetrics>,
    status: Arc<StatusLog>,
    running: Mutex<Option<Running>>,
}

impl ProxyServer {
    /// Create a stopped server using the OS interface table and the
    /// platform egress binder.
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            config: RwLock::new(Arc::new(config)),
            config_dir: None,
            classifier: Arc::new(DomainClassifier::new()),
            resolver: Arc::new(SystemInterfaces),
            dialer: Arc::new(BoundDialer::platform()),
            metrics: Arc::new(ProxyMetrics::new()),
            status: Arc::new(StatusLog::new()),
            running: Mutex::new(None),
        }
    }

    /// Resolve relative blocklist paths against `dir`.
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    /// Use a different interface resolver.
    pub fn with_resolver(mut self, resolver: Arc<dyn InterfaceResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Use a different outbound dialer.
    pub fn with_dialer(mut self, dialer: Arc<dyn Dialer>) -> Self {
        self.dialer = dialer;
        self
    }

    /// Start listening on `127.0.0.1:<port>`.
    ///
    /// Returns the bound address. Must be called from within a Tokio
    /// runtime. The blocklist is reloaded in the background; a failed
    /// reload is logged and does not stop the server.
    pub fn start(&self) -> Result<SocketAddr> {
        let mut running = self.running.lock();
        if running.is_some() {
            return Err(Error::AlreadyRunning);
        }

        let config = self.config();
        let bindings = BindingTable::build(
            [
                config.default_interface.as_str(),
                config.blocklist_interface.as_str(),
                config.company_interface.as_str(),
            ],
            self.resolver.as_ref(),
        );

        let listener = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, config.port))?;
        listener.set_nonblocking(true)?;
        let listener = TcpListener::from_std(listener)?;
        let local_addr = listener.local_addr()?;

        self.classifier
            .set_domain_lists(&config.company_domains, &config.extra_blocklist_domains);

        let ctx = Arc::new(SessionContext {
            router: Router::new(Arc::clone(&self.classifier), config.interface_names()),
            bindings: Arc::new(bindings),
            dialer: Arc::clone(&self.dialer),
            metrics: Arc::clone(&self.metrics),
        });

        let (shutdown, shutdown_rx) = oneshot::channel();
        let accept_task = tokio::spawn(accept_loop(listener, shutdown_rx, ctx));

        let classifier = Arc::clone(&self.classifier);
        let status = Arc::clone(&self.status);
        let descriptor = config.blocklist_source.clone();
        let config_dir = self.config_dir.clone();
        let reload_task = tokio::spawn(async move {
            let _ = reload(&classifier, &status, &descriptor, config_dir.as_deref()).await;
        });

        *running = Some(Running {
            local_addr,
            shutdown,
            accept_task,
            reload_task,
        });
        drop(running);

        self.status
            .record(format!("SOCKS5 Proxy started on {}", local_addr));
        Ok(local_addr)
    }

    /// Stop accepting connections. Stopping a stopped server is a no-op.
    ///
    /// Returns once the listener is closed.
    pub async fn stop(&self) {
        let running = self.running.lock().take();
        if let Some(running) = running {
            running.reload_task.abort();
            let _ = running.shutdown.send(());
            if let Err(e) = running.accept_task.await {
                tracing::warn!("Accept loop ended abnormally: {}", e);
            }
            self.status.record("Proxy server stopped");
        }
    }

    /// Check if the server is accepting connections.
    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Address the listener is bound to, while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().as_ref().map(|r| r.local_addr)
    }

    /// Current configuration.
    pub fn config(&self) -> Arc<ProxyConfig> {
        Arc::clone(&self.config.read())
    }

    /// Replace the configuration.
    ///
    /// Interface names and the port apply from the next `start`; domain
    /// lists and the blocklist source from the next start or reload.
    pub fn set_config(&self, config: ProxyConfig) {
        *self.config.write() = Arc::new(config);
    }

    /// Reload the blocklist from the configured source.
    pub async fn reload_blocklist(&self) -> Result<usize> {
        let config = self.config();
        self.classifier
            .set_domain_lists(&config.company_domains, &config.extra_blocklist_domains);
        reload(
            &self.classifier,
            &self.status,
            &config.blocklist_source,
            self.config_dir.as_deref(),
        )
        .await
    }

    /// The shared domain classifier.
    pub fn classifier(&self) -> &Arc<DomainClassifier> {
        &self.classifier
    }

    /// Server metrics.
    pub fn metrics(&self) -> &ProxyMetrics {
        &self.metrics
    }

    /// Running flag, port and recent status lines.
    pub fn status(&self) -> ServerStatus {
        ServerStatus {
            running: self.is_running(),
            port: self.config().port,
            logs: self.status.lines(),
        }
    }
}

async fn reload(
    classifier: &DomainClassifier,
    status: &StatusLog,
    descriptor: &str,
    config_dir: Option<&Path>,
) -> Result<usize> {
    let result = match BlocklistSource::parse(descriptor, config_dir) {
        Ok(source) => classifier.load_blocklist(&source).await,
        Err(e) => Err(e),
    };

    match &result {
        Ok(count) => status.record(format!("Loaded {} domains from GFWList", count)),
        Err(e) => status.record(format!("Failed to load GFWList: {}", e)),
    }
    result
}

async fn accept_loop(
    listener: TcpListener,
    mut shutdown: oneshot::Receiver<()>,
    ctx: Arc<SessionContext>,
) {
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            result = listener.accept() => match result {
                Ok((stream, peer)) => {
                    tracing::debug!("SOCKS5 connection from {}", peer);
                    tokio::spawn(proxy::serve(stream, peer, Arc::clone(&ctx)));
                }
                Err(e) => {
                    tracing::warn!("Accept error: {}", e);
                }
            },
        }
    }
}
