//! Lobby layer for Gunduel: who is connected, and who is waiting.
//!
//! - [`ConnectionRegistry`]: every connected client and its outbound
//!   channel. Implements [`Gateway`], the seam through which the session
//!   layer emits notifications.
//! - [`MatchQueue`]: FIFO queue of clients waiting for an opponent.
//!
//! Neither type is thread-safe on its own. Both are owned by the
//! coordinator task, which processes one client event at a time.

mod error;
mod queue;
mod registry;

pub use error::LobbyError;
pub use queue::MatchQueue;
pub use registry::{ClientSender, ConnectionRegistry, Gateway};
