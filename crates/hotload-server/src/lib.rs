//! Live reload server for plugin development.
//!
//! Watches a build output directory and pushes the newest `index_*.js`
//! artifact to every connected WebSocket client, so a remote host can
//! hot-load fresh builds. A second port serves a small status page with
//! connection instructions.
//!
//! # Quick Start
//!
//! ```ignore
//! use hotload_server::{Server, ServerConfig, shutdown_signal};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = Server::bind(ServerConfig::default()).await.unwrap();
//!     server.serve(shutdown_signal()).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Plugin host ──WebSocket──► live port ──► LiveReloadService
//!                                              │
//!                                              ├─► notify (dist dir)
//!                                              └─► ArtifactStore (index_*.js)
//!
//! Browser ─────HTTP────────► status port ──► status page
//! ```

mod app;
mod error;
mod handlers;
mod live_reload;
mod middleware;
mod network;
mod state;

use std::future::{Future, IntoFuture};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub use error::ServerError;
use hotload_artifact::{ArtifactSelection, ArtifactStore, PluginMetadata};
use live_reload::{LiveReloadService, ServiceHandle};
pub use network::local_network_host;
use state::StatusState;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address both listeners bind to.
    pub host: String,
    /// WebSocket port (0 picks a free port).
    pub ws_port: u16,
    /// Status page port (0 picks a free port).
    pub http_port: u16,
    /// Build output directory to watch.
    pub dist_dir: PathBuf,
    /// Plugin metadata file.
    pub plugin_json: PathBuf,
    /// Debounce delay in milliseconds.
    pub debounce_ms: u64,
    /// Rule for choosing among several artifacts.
    pub selection: ArtifactSelection,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            ws_port: 8080,
            http_port: 3000,
            dist_dir: PathBuf::from("dist"),
            plugin_json: PathBuf::from("plugin.json"),
            debounce_ms: 100,
            selection: ArtifactSelection::default(),
        }
    }
}

/// Create server configuration from hotload config.
#[must_use]
pub fn server_config_from_config(config: &hotload_config::Config) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        ws_port: config.server.ws_port,
        http_port: config.server.http_port,
        dist_dir: config.build_resolved.dist_dir.clone(),
        plugin_json: config.build_resolved.plugin_json.clone(),
        debounce_ms: config.build_resolved.debounce_ms,
        selection: config.build_resolved.selection,
    }
}

/// Bound server with a running live reload service.
pub struct Server {
    live_listener: TcpListener,
    status_listener: TcpListener,
    metadata: Arc<PluginMetadata>,
    service: LiveReloadService,
    handle: ServiceHandle,
}

impl Server {
    /// Bind both listeners, load plugin metadata and start watching.
    ///
    /// # Errors
    ///
    /// Returns an error if a port cannot be bound or the output directory
    /// cannot be created or watched.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let live_listener = bind_listener("WebSocket", &config.host, config.ws_port).await?;
        let status_listener = bind_listener("HTTP", &config.host, config.http_port).await?;

        let metadata = Arc::new(PluginMetadata::load(&config.plugin_json));
        tracing::info!(
            name = %metadata.name,
            version = %metadata.version,
            "Loaded plugin metadata"
        );

        let store = ArtifactStore::new(config.dist_dir).with_selection(config.selection);
        let mut service = LiveReloadService::new(
            store,
            Arc::clone(&metadata),
            Duration::from_millis(config.debounce_ms),
        );
        let handle = service.start()?;

        Ok(Self {
            live_listener,
            status_listener,
            metadata,
            service,
            handle,
        })
    }

    /// Address of the WebSocket listener.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address cannot be read.
    pub fn live_addr(&self) -> io::Result<SocketAddr> {
        self.live_listener.local_addr()
    }

    /// Address of the status page listener.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address cannot be read.
    pub fn status_addr(&self) -> io::Result<SocketAddr> {
        self.status_listener.local_addr()
    }

    /// Plugin metadata sent with every build.
    #[must_use]
    pub fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    /// Serve until `shutdown` completes.
    ///
    /// On shutdown the live reload service stops first, closing every client
    /// connection, then both listeners drain.
    ///
    /// # Errors
    ///
    /// Returns an error if either server fails.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send,
    {
        let Self {
            live_listener,
            status_listener,
            metadata,
            mut service,
            handle,
        } = self;

        let ws_port = live_listener.local_addr()?.port();
        let http_port = status_listener.local_addr()?.port();
        let status_state = Arc::new(StatusState {
            metadata,
            lan_host: local_network_host(),
            ws_port,
            http_port,
        });

        let (stop_tx, stop_rx) = watch::channel(false);
        let live = axum::serve(live_listener, app::live_router(handle))
            .with_graceful_shutdown(stopped(stop_rx.clone()))
            .into_future();
        let status = axum::serve(status_listener, app::status_router(status_state))
            .with_graceful_shutdown(stopped(stop_rx))
            .into_future();
        let servers = async { tokio::try_join!(live, status) };
        tokio::pin!(servers);

        tokio::select! {
            result = &mut servers => {
                service.stop().await;
                result?;
            }
            () = shutdown => {
                tracing::info!("Shutdown signal received, stopping server...");
                service.stop().await;
                let _ = stop_tx.send(true);
                servers.await?;
            }
        }

        tracing::info!("Server stopped");
        Ok(())
    }
}

async fn bind_listener(
    name: &'static str,
    host: &str,
    port: u16,
) -> Result<TcpListener, ServerError> {
    let listener = TcpListener::bind((host, port))
        .await
        .map_err(|source| ServerError::Bind {
            name,
            addr: format!("{host}:{port}"),
            source,
        })?;
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(server = name, address = %addr, "Listening");
    }
    Ok(listener)
}

/// Resolve once the stop flag is raised or its sender is gone.
async fn stopped(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stopped| *stopped).await;
}

/// Wait for a shutdown signal (Ctrl-C, or SIGTERM on Unix).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use pretty_assertions::assert_eq;

    use super::*;

    fn test_config(dir: &Path) -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_owned(),
            ws_port: 0,
            http_port: 0,
            dist_dir: dir.join("dist"),
            plugin_json: dir.join("plugin.json"),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.ws_port, 8080);
        assert_eq!(config.http_port, 3000);
        assert_eq!(config.dist_dir, PathBuf::from("dist"));
        assert_eq!(config.plugin_json, PathBuf::from("plugin.json"));
        assert_eq!(config.debounce_ms, 100);
        assert_eq!(config.selection, ArtifactSelection::Newest);
    }

    #[test]
    fn test_server_config_from_config() {
        let mut config = hotload_config::Config::default();
        config.server.ws_port = 9000;
        config.build_resolved.debounce_ms = 250;
        config.build_resolved.selection = ArtifactSelection::First;

        let server_config = server_config_from_config(&config);

        assert_eq!(server_config.ws_port, 9000);
        assert_eq!(server_config.http_port, 3000);
        assert_eq!(server_config.debounce_ms, 250);
        assert_eq!(server_config.selection, ArtifactSelection::First);
        assert_eq!(server_config.dist_dir, config.build_resolved.dist_dir);
    }

    #[tokio::test]
    async fn test_bind_creates_dist_and_loads_metadata() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("plugin.json"),
            r#"{"name": "my-plugin", "version": "2.0.0"}"#,
        )
        .unwrap();

        let server = Server::bind(test_config(dir.path())).await.unwrap();

        assert!(dir.path().join("dist").is_dir());
        assert_eq!(server.metadata().name, "my-plugin");
        assert_ne!(server.live_addr().unwrap().port(), 0);
        assert_ne!(server.status_addr().unwrap().port(), 0);
        server.serve(async {}).await.unwrap();
    }

    #[tokio::test]
    async fn test_bind_port_in_use() {
        let dir = tempfile::tempdir().unwrap();
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let config = ServerConfig {
            ws_port: taken.local_addr().unwrap().port(),
            ..test_config(dir.path())
        };

        let result = Server::bind(config).await;

        assert!(matches!(
            result,
            Err(ServerError::Bind {
                name: "WebSocket",
                ..
            })
        ));
    }
}
