//! WebSocket handler for live reload.
//!
//! Registers each socket with the dispatcher and forwards queued builds to
//! the client.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::registry::ClientConnection;
use super::service::ServiceHandle;

/// Outbound messages buffered per client before sends start failing.
const OUTBOUND_QUEUE_CAPACITY: usize = 32;

/// Handle WebSocket upgrade for live reload.
pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(handle): State<ServiceHandle>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, handle))
}

/// Handle an established WebSocket connection.
async fn handle_socket(mut socket: WebSocket, handle: ServiceHandle) {
    let id = Uuid::new_v4();
    let (tx, mut outbound) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);

    if !handle.connect(ClientConnection::new(id, tx)) {
        // Service stopped between upgrade and registration
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    loop {
        tokio::select! {
            // Forward builds to client
            payload = outbound.recv() => match payload {
                Some(payload) => {
                    if let Err(e) = socket.send(Message::Text(payload)).await {
                        tracing::debug!(conn_id = %id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                None => {
                    // Unregistered by the service
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
            },
            // Inbound messages are ignored; only watch for close
            message = socket.recv() => match message {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    handle.disconnect(id);
}
