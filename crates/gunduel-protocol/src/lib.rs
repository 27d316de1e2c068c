//! Messages exchanged between browser clients and the duel server.
//!
//! Every frame is a JSON object `{"type": "<event>", "data": <payload>}`
//! with camelCase event and field names; unit events carry no `data`.
//! [`ClientMessage`] lists what a client may send, [`ServerMessage`] what
//! it may receive. Identifiers ([`ClientId`], [`SessionId`]) are plain
//! numbers on the wire.
//!
//! The server only touches bytes through a [`Codec`]; [`JsonCodec`] is
//! the one browsers need.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientId, ClientMessage, GunSide, HitReport, PlayerState, PlayerStateDelta,
    Recipient, Scores, ServerMessage, SessionId, Vec3,
};
