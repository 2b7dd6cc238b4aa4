//! Router construction.
//!
//! The live reload socket and the status page listen on separate ports, so
//! each gets its own router.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::live_reload::{self, ServiceHandle};
use crate::middleware::security;
use crate::state::StatusState;

/// Create the live reload router.
///
/// Any path upgrades to the live reload socket.
pub(crate) fn live_router(handle: ServiceHandle) -> Router {
    Router::new()
        .route("/", get(live_reload::ws_handler))
        .fallback(live_reload::ws_handler)
        .layer(CorsLayer::permissive())
        .with_state(handle)
}

/// Create the status page router.
///
/// Every path serves the status page.
pub(crate) fn status_router(state: Arc<StatusState>) -> Router {
    let [csp, content_type_options, frame_options] = security::header_layers();
    Router::new()
        .route("/", get(handlers::status::get_status))
        .fallback(handlers::status::get_status)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(csp)
                .layer(content_type_options)
                .layer(frame_options),
        )
        .with_state(state)
}
