use std::io;

/// Socket-level failures.
///
/// Only [`Bind`](TransportError::Bind) is fatal to the server; the rest
/// end a single connection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// TCP accept failed.
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    /// The client connected but the WebSocket upgrade failed.
    #[error("WebSocket handshake failed: {0}")]
    Handshake(#[source] io::Error),

    #[error("send failed: {0}")]
    Send(#[source] io::Error),

    /// Reading failed, including oversized or malformed frames.
    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),
}
