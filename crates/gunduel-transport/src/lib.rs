//! Socket layer for Gunduel.
//!
//! [`Transport`] hands out accepted [`Connection`]s; a connection moves
//! opaque byte payloads in both directions. Nothing here knows about
//! messages, players or sessions.
//!
//! The `websocket` feature (on by default) provides
//! [`WebSocketTransport`], which is what browser clients connect to.

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

use std::fmt;
use std::io;
use std::net::SocketAddr;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{MAX_MESSAGE_SIZE, WebSocketConnection, WebSocketTransport};

/// Identifies one accepted connection. Never reused by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A listener producing client connections.
pub trait Transport: Send + 'static {
    type Connection: Connection;

    /// Waits for the next client and completes its handshake.
    ///
    /// A failed handshake is returned as an error; the listener itself
    /// keeps working and the caller may simply accept again.
    async fn accept(&mut self) -> Result<Self::Connection, TransportError>;

    /// The bound address.
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

/// One client connection.
///
/// A handler waits on `recv` and `send` concurrently from one task, so
/// the two directions must not share a lock.
pub trait Connection: Send + Sync + 'static {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError>;

    /// The next payload, or `Ok(None)` once the client has closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError>;

    async fn close(&self) -> Result<(), TransportError>;

    fn id(&self) -> ConnectionId;

    fn peer_addr(&self) -> SocketAddr;
}
