//! Application state.
//!
//! Shared state for the status page handlers.

use std::sync::Arc;

use hotload_artifact::PluginMetadata;

/// State shared by status page handlers.
pub(crate) struct StatusState {
    /// Plugin metadata loaded at startup.
    pub(crate) metadata: Arc<PluginMetadata>,
    /// Local-network host clients can reach (or "localhost").
    pub(crate) lan_host: String,
    /// Port of the live reload WebSocket server.
    pub(crate) ws_port: u16,
    /// Port of the status page server.
    pub(crate) http_port: u16,
}
