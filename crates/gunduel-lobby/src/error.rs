//! Error types for the lobby layer.

use gunduel_protocol::ClientId;

/// Errors raised by the connection registry.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// A client with this id is already registered.
    #[error("client {0} is already connected")]
    AlreadyConnected(ClientId),

    /// No client with this id is registered.
    #[error("client {0} is not connected")]
    NotConnected(ClientId),
}
