//! The connection registry: every connected client and how to reach it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use gunduel_protocol::{ClientId, ServerMessage};
use tokio::sync::mpsc;

use crate::LobbyError;

/// Channel sender for delivering outbound messages to one client.
///
/// Unbounded so emitting never blocks the coordinator; the connection
/// handler on the other end drains it onto the socket.
pub type ClientSender = mpsc::UnboundedSender<ServerMessage>;

/// Outbound side of the message gateway.
///
/// Delivery is fire-and-forget. A message addressed to a client that has
/// already gone away is dropped silently; state is overwrite-based, so a
/// lost notification is superseded by the next one.
pub trait Gateway {
    /// Sends `msg` to a single client.
    fn emit(&self, to: ClientId, msg: ServerMessage);
}

struct ClientEntry {
    sender: ClientSender,
    connected_at: Instant,
}

/// Tracks every connected client.
///
/// Session membership is indexed by the session manager; queue membership
/// by [`MatchQueue`](crate::MatchQueue). The registry only answers "is this
/// client still here, and how do I reach it".
#[derive(Default)]
pub struct ConnectionRegistry {
    clients: HashMap<ClientId, ClientEntry>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a newly connected client.
    ///
    /// # Errors
    /// [`LobbyError::AlreadyConnected`] if the id is already registered.
    pub fn register(
        &mut self,
        client_id: ClientId,
        sender: ClientSender,
    ) -> Result<(), LobbyError> {
        if self.clients.contains_key(&client_id) {
            return Err(LobbyError::AlreadyConnected(client_id));
        }
        self.clients.insert(
            client_id,
            ClientEntry {
                sender,
                connected_at: Instant::now(),
            },
        );
        tracing::info!(%client_id, clients = self.clients.len(), "client connected");
        Ok(())
    }

    /// Removes a client. Returns how long it was connected.
    ///
    /// # Errors
    /// [`LobbyError::NotConnected`] if the id is unknown.
    pub fn unregister(&mut self, client_id: ClientId) -> Result<Duration, LobbyError> {
        let entry = self
            .clients
            .remove(&client_id)
            .ok_or(LobbyError::NotConnected(client_id))?;
        Ok(entry.connected_at.elapsed())
    }

    /// Returns `true` if the client is registered.
    pub fn is_connected(&self, client_id: &ClientId) -> bool {
        self.clients.contains_key(client_id)
    }

    /// Number of connected clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns `true` if nobody is connected.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl Gateway for ConnectionRegistry {
    fn emit(&self, to: ClientId, msg: ServerMessage) {
        match self.clients.get(&to) {
            Some(entry) => {
                if entry.sender.send(msg).is_err() {
                    tracing::debug!(client_id = %to, "outbound channel closed, dropping message");
                }
            }
            None => {
                tracing::debug!(client_id = %to, "stale target, dropping message");
            }
        }
    }
}
