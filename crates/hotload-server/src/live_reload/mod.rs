//! Live reload pipeline.
//!
//! ```text
//! notify ──► BuildWatcher ──ChangeEvent──► Dispatcher ──► ConnectionRegistry ──► sockets
//!                                            │   ▲
//!                                 Debouncer ─┘   └── Command (connect/disconnect)
//! ```
//!
//! The dispatcher task is the only owner of the registry and the debounce
//! timer, so neither needs a lock.

mod debouncer;
mod message;
mod registry;
mod service;
mod watcher;
mod websocket;

pub(crate) use service::LiveReloadService;
pub(crate) use service::ServiceHandle;
pub(crate) use websocket::ws_handler;
