//! Live reload service.
//!
//! Coordinates file watching, debouncing and broadcasting. A single
//! dispatcher task owns all mutable state; socket tasks talk to it through
//! [`ServiceHandle`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use hotload_artifact::{ArtifactStore, PluginMetadata};
use notify::RecursiveMode;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::debouncer::{Debouncer, Settled};
use super::message::{CodeMessage, Payload};
use super::registry::{ClientConnection, ConnectionId, ConnectionRegistry};
use super::watcher::{BuildWatcher, ChangeEvent};
use crate::error::ServerError;

/// Request from a socket task to the dispatcher.
#[derive(Debug)]
enum Command {
    Connect(ClientConnection),
    Disconnect(ConnectionId),
}

/// Cloneable handle used by socket tasks to (de)register themselves.
#[derive(Clone, Debug)]
pub(crate) struct ServiceHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl ServiceHandle {
    /// Register a connection. Returns `false` if the service has stopped.
    pub(crate) fn connect(&self, connection: ClientConnection) -> bool {
        self.commands.send(Command::Connect(connection)).is_ok()
    }

    /// Unregister a connection. No-op if the service has stopped.
    pub(crate) fn disconnect(&self, id: ConnectionId) {
        let _ = self.commands.send(Command::Disconnect(id));
    }
}

/// Dispatcher task state while the service runs.
struct Running {
    handle: ServiceHandle,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Watches the output directory and pushes builds to connected clients.
///
/// Constructed explicitly and driven through [`start`](Self::start) and
/// [`stop`](Self::stop); independent instances do not share state.
pub(crate) struct LiveReloadService {
    store: ArtifactStore,
    metadata: Arc<PluginMetadata>,
    debounce: Duration,
    running: Option<Running>,
}

impl LiveReloadService {
    /// Create a stopped service.
    pub(crate) fn new(
        store: ArtifactStore,
        metadata: Arc<PluginMetadata>,
        debounce: Duration,
    ) -> Self {
        Self {
            store,
            metadata,
            debounce,
            running: None,
        }
    }

    /// Start watching and dispatching.
    ///
    /// Creates the output directory if needed. Must be called inside a tokio
    /// runtime. Calling it on a running service only returns its handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the output directory cannot be created or watched.
    pub(crate) fn start(&mut self) -> Result<ServiceHandle, ServerError> {
        if let Some(running) = &self.running {
            return Ok(running.handle.clone());
        }

        let dist_dir = self.store.dist_dir().to_path_buf();
        self.store
            .ensure_dir()
            .map_err(|source| ServerError::OutputDir {
                path: dist_dir.clone(),
                source,
            })?;
        let (watcher, events) = BuildWatcher::start(&dist_dir, RecursiveMode::Recursive)?;

        Ok(self.spawn(events, Some(watcher)))
    }

    /// Spawn the dispatcher over an event stream.
    fn spawn(
        &mut self,
        events: mpsc::Receiver<ChangeEvent>,
        watcher: Option<BuildWatcher>,
    ) -> ServiceHandle {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let dispatcher = Dispatcher {
            store: self.store.clone(),
            metadata: Arc::clone(&self.metadata),
            registry: ConnectionRegistry::default(),
            debouncer: Debouncer::new(self.debounce),
            watcher,
        };
        let task = tokio::spawn(dispatcher.run(events, commands_rx, shutdown_rx));

        let handle = ServiceHandle {
            commands: commands_tx,
        };
        self.running = Some(Running {
            handle: handle.clone(),
            shutdown: shutdown_tx,
            task,
        });
        handle
    }

    #[cfg(test)]
    pub(crate) fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Stop the service.
    ///
    /// Cancels any pending debounce window, stops the watcher and closes all
    /// connections. Waits for the dispatcher task to finish.
    pub(crate) async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        let _ = running.shutdown.send(());
        if let Err(e) = running.task.await {
            tracing::error!(error = %e, "Live reload dispatcher terminated abnormally");
        }
    }
}

/// Event loop owning the registry, the debounce timer and the watcher.
struct Dispatcher {
    store: ArtifactStore,
    metadata: Arc<PluginMetadata>,
    registry: ConnectionRegistry,
    debouncer: Debouncer,
    watcher: Option<BuildWatcher>,
}

impl Dispatcher {
    async fn run(
        mut self,
        mut events: mpsc::Receiver<ChangeEvent>,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        let mut events_open = true;

        loop {
            tokio::select! {
                biased;

                // Fires on explicit stop and when the service is dropped
                _ = &mut shutdown => break,

                Some(command) = commands.recv() => self.handle_command(command),

                event = events.recv(), if events_open => match event {
                    Some(event) => self.debouncer.record(&event),
                    None => {
                        events_open = false;
                        tracing::warn!(
                            "Filesystem event stream ended; builds will no longer be pushed"
                        );
                    }
                },

                settled = self.debouncer.settled() => self.dispatch(&settled),
            }
        }

        self.shutdown();
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect(connection) => {
                let id = connection.id();
                self.registry.connect(connection);
                tracing::info!(conn_id = %id, clients = self.registry.len(), "Client connected");
                self.sync(id);
            }
            Command::Disconnect(id) => {
                if let Some(connection) = self.registry.disconnect(id) {
                    tracing::info!(
                        conn_id = %id,
                        state = ?connection.state(),
                        clients = self.registry.len(),
                        "Client disconnected"
                    );
                }
            }
        }
    }

    /// Send the current build to a newly connected client.
    fn sync(&mut self, id: ConnectionId) {
        let artifact = match self.store.load_latest() {
            Ok(artifact) => artifact,
            Err(e) if e.is_not_found() => {
                tracing::debug!(conn_id = %id, "No build yet, nothing to sync");
                return;
            }
            Err(e) => {
                tracing::warn!(conn_id = %id, error = %e, "Skipping sync for new client");
                return;
            }
        };
        let Some(payload) = self.encode(&CodeMessage::new(&artifact, &self.metadata)) else {
            return;
        };

        match self.registry.send_to(id, &payload) {
            Ok(()) => tracing::info!(
                conn_id = %id,
                file = %artifact.file_name,
                size_bytes = artifact.size_bytes,
                "Sent current build to new client"
            ),
            Err(e) => tracing::warn!(conn_id = %id, error = %e, "Failed to sync new client"),
        }
    }

    /// Read the current build once and broadcast it.
    fn dispatch(&mut self, settled: &Settled) {
        let start = Instant::now();
        tracing::info!(
            events = settled.events,
            path = ?settled.last_path,
            "Build completed"
        );

        if self.registry.is_empty() {
            tracing::debug!("No clients connected, skipping dispatch");
            return;
        }

        let artifact = match self.store.load_latest() {
            Ok(artifact) => artifact,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping dispatch");
                return;
            }
        };
        let Some(payload) = self.encode(&CodeMessage::new(&artifact, &self.metadata)) else {
            return;
        };

        let report = self.registry.broadcast(&payload);
        tracing::info!(
            file = %artifact.file_name,
            size_bytes = artifact.size_bytes,
            delivered = report.delivered,
            failed = report.failed,
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Dispatched build"
        );
    }

    fn encode(&self, message: &CodeMessage<'_>) -> Option<Payload> {
        message
            .to_payload()
            .inspect_err(|e| tracing::error!(error = %e, "Failed to serialize build message"))
            .ok()
    }

    fn shutdown(&mut self) {
        if self.debouncer.is_pending() {
            self.debouncer.cancel();
        }
        if let Some(watcher) = self.watcher.take() {
            watcher.stop();
        }
        let closed = self.registry.close_all();
        tracing::info!(closed_connections = closed, "Live reload service stopped");
    }
}
