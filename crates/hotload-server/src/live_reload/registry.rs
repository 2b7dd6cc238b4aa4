//! Connection registry and fan-out.
//!
//! Each client has a bounded outbound queue drained by its socket task. The
//! registry only ever pushes into those queues, so a slow or dead client
//! cannot stall delivery to the others.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use super::message::Payload;

/// Connection identifier.
pub(crate) type ConnectionId = Uuid;

/// Lifecycle of a client connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ConnectionState {
    /// Socket accepted, not yet registered.
    Connecting,
    /// Registered and receiving builds.
    Open,
    /// Removed from the registry. Terminal.
    Closed,
}

/// Why a message did not reach a connection.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub(crate) enum SendFailure {
    #[error("outbound queue is full")]
    QueueFull,
    #[error("connection is closed")]
    Closed,
    #[error("connection is not registered")]
    Unknown,
}

/// Registry-side handle to a client socket.
#[derive(Debug)]
pub(crate) struct ClientConnection {
    id: ConnectionId,
    state: ConnectionState,
    outbound: mpsc::Sender<Payload>,
}

impl ClientConnection {
    /// Create a connection in the `Connecting` state.
    pub(crate) fn new(id: ConnectionId, outbound: mpsc::Sender<Payload>) -> Self {
        Self {
            id,
            state: ConnectionState::Connecting,
            outbound,
        }
    }

    pub(crate) fn id(&self) -> ConnectionId {
        self.id
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.state
    }

    /// Queue a payload without waiting.
    fn send(&self, payload: &Payload) -> Result<(), SendFailure> {
        if self.state != ConnectionState::Open {
            return Err(SendFailure::Closed);
        }
        self.outbound
            .try_send(payload.clone())
            .map_err(|e| match e {
                TrySendError::Full(_) => SendFailure::QueueFull,
                TrySendError::Closed(_) => SendFailure::Closed,
            })
    }
}

/// Result of a broadcast.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Set of open connections.
#[derive(Debug, Default)]
pub(crate) struct ConnectionRegistry {
    connections: HashMap<ConnectionId, ClientConnection>,
}

impl ConnectionRegistry {
    /// Register a connection and mark it `Open`.
    pub(crate) fn connect(&mut self, mut connection: ClientConnection) {
        connection.state = ConnectionState::Open;
        let id = connection.id;
        if self.connections.insert(id, connection).is_some() {
            tracing::warn!(conn_id = %id, "Replaced connection with duplicate id");
        }
    }

    /// Mark a connection `Closed` and remove it.
    ///
    /// Dropping the returned connection closes its outbound queue.
    pub(crate) fn disconnect(&mut self, id: ConnectionId) -> Option<ClientConnection> {
        let mut connection = self.connections.remove(&id)?;
        connection.state = ConnectionState::Closed;
        Some(connection)
    }

    /// Send a payload to one connection.
    ///
    /// A connection whose queue turns out closed is removed.
    pub(crate) fn send_to(
        &mut self,
        id: ConnectionId,
        payload: &Payload,
    ) -> Result<(), SendFailure> {
        let result = self
            .connections
            .get(&id)
            .map_or(Err(SendFailure::Unknown), |c| c.send(payload));
        if result == Err(SendFailure::Closed) {
            self.disconnect(id);
        }
        result
    }

    /// Send a payload to every open connection.
    ///
    /// Failures are logged per connection and never stop the fan-out.
    /// Connections found closed are removed.
    pub(crate) fn broadcast(&mut self, payload: &Payload) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let mut closed = Vec::new();

        for connection in self.connections.values() {
            match connection.send(payload) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        conn_id = %connection.id,
                        error = %e,
                        "Failed to send build to client"
                    );
                    if e == SendFailure::Closed {
                        closed.push(connection.id);
                    }
                }
            }
        }

        for id in closed {
            self.disconnect(id);
        }
        report
    }

    /// Close and remove every connection. Returns how many were open.
    pub(crate) fn close_all(&mut self) -> usize {
        let ids: Vec<_> = self.connections.keys().copied().collect();
        for id in &ids {
            self.disconnect(*id);
        }
        ids.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.connections.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }
}
