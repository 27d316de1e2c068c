//! Unified error type for the Gunduel server.

use gunduel_lobby::LobbyError;
use gunduel_protocol::ProtocolError;
use gunduel_session::SessionError;
use gunduel_transport::TransportError;

/// Top-level error that wraps every crate-specific error.
///
/// `#[from]` on each variant lets `?` convert sub-crate errors, so the
/// server and binary deal with this single type.
#[derive(Debug, thiserror::Error)]
pub enum GunduelError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A lobby-level error (duplicate or unknown client).
    #[error(transparent)]
    Lobby(#[from] LobbyError),

    /// A session-level error (unknown session, bad pairing).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The coordinator task has stopped and no longer takes commands.
    #[error("coordinator is not running")]
    CoordinatorGone,

    /// A configuration value could not be parsed.
    #[error("invalid {key}: {value:?}")]
    InvalidConfig { key: &'static str, value: String },
}
