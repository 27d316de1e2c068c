//! Error types for the session layer.

use gunduel_protocol::{ClientId, SessionId};

/// Errors that can occur during session operations.
///
/// None of these is fatal. The coordinator logs them and carries on;
/// the client only ever sees the absence of a reaction.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session does not exist (never did, or already torn down).
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// The client is not a member of any live session.
    #[error("client {0} is not in a session")]
    NotInSession(ClientId),

    /// A session was requested with the same client on both sides.
    #[error("client {0} cannot duel themselves")]
    SamePlayer(ClientId),

    /// The client is already a member of a live session.
    #[error("client {0} is already in session {1}")]
    AlreadyInSession(ClientId, SessionId),
}
