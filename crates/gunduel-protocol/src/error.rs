//! Codec errors.

/// A message could not be turned into bytes, or bytes into a message.
///
/// Decode failures are routine (old clients, typos, hostile input) and
/// are never fatal to a connection.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[cfg(feature = "json")]
    #[error("could not encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// Malformed JSON, an unknown `type`, or a payload of the wrong shape.
    #[cfg(feature = "json")]
    #[error("could not decode message: {0}")]
    Decode(#[source] serde_json::Error),
}
