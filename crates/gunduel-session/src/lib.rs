//! Duel sessions for Gunduel.
//!
//! A session pairs two clients and holds their authoritative state.
//! Combat rules live in [`CombatResolver`]; [`SessionManager`] owns all
//! live sessions and routes resolver output through a
//! [`Gateway`](gunduel_lobby::Gateway).
//!
//! # Key types
//!
//! - [`SessionManager`]: creates/ends sessions, dispatches client events
//! - [`CombatResolver`]: pure damage, kill, round-reset and win rules
//! - [`Session`]: one duel: two players, their state, and its phase
//! - [`MatchConfig`]: hp, ammo, win score, spawn point, teardown delay
//! - [`MatchPhase`]: per-session lifecycle state machine

mod combat;
mod config;
mod error;
mod manager;
mod session;

pub use combat::{CombatResolver, HitResolution, Outbound};
pub use config::{MatchConfig, MatchPhase};
pub use error::SessionError;
pub use manager::{EndReason, HitOutcome, SessionManager};
pub use session::Session;
