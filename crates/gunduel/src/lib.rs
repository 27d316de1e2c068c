//! # Gunduel
//!
//! Real-time coordinator for two-player browser duels.
//!
//! Clients connect over WebSocket and speak JSON `{"type", "data"}`
//! messages. The server queues them, pairs them first-come first-served,
//! relays movement and shots between the two members of a session, and
//! resolves client-reported hits into kills, round resets and a match win.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gunduel::prelude::*;
//!
//! # async fn start() -> Result<(), GunduelError> {
//! let server = GunduelServer::builder()
//!     .bind("0.0.0.0:3000")
//!     .match_config(MatchConfig { win_score: 5, ..MatchConfig::default() })
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod coordinator;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use coordinator::{Coordinator, CoordinatorHandle, CoordinatorStats};
pub use error::GunduelError;
pub use server::{GunduelServer, GunduelServerBuilder};

/// Commonly used types, re-exported for convenience.
pub mod prelude {
    pub use crate::{
        CoordinatorHandle, CoordinatorStats, GunduelError, GunduelServer, ServerConfig,
    };
    pub use gunduel_protocol::{
        ClientId, ClientMessage, GunSide, HitReport, PlayerState, PlayerStateDelta,
        ServerMessage, SessionId,
    };
    pub use gunduel_session::MatchConfig;
}
