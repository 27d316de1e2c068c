//! Match configuration and the per-session phase machine.

use std::fmt;
use std::time::Duration;

use gunduel_protocol::{PlayerState, Vec3};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// MatchConfig
// ---------------------------------------------------------------------------

/// Rules shared by every session on a server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Hit points at spawn; also the upper bound for hp.
    pub max_hp: u32,

    /// Magazine size of each pistol.
    pub max_ammo: u32,

    /// Kills needed to win the match.
    pub win_score: u32,

    /// Where both players respawn each round.
    pub spawn_position: Vec3,

    pub spawn_rotation: Vec3,

    /// Delay between `matchWin` and the session being torn down, so
    /// clients can show the victory screen.
    pub teardown_delay: Duration,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_hp: 100,
            max_ammo: 8,
            win_score: 3,
            spawn_position: [0.0, 1.6, 0.0],
            spawn_rotation: [0.0, 0.0, 0.0],
            teardown_delay: Duration::from_secs(5),
        }
    }
}

impl MatchConfig {
    /// A fresh player at the spawn point with zero score.
    pub fn spawn_state(&self) -> PlayerState {
        PlayerState {
            position: self.spawn_position,
            rotation: self.spawn_rotation,
            hp: self.max_hp,
            ammo_left: self.max_ammo,
            ammo_right: self.max_ammo,
            score: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// MatchPhase
// ---------------------------------------------------------------------------

/// Where a session is in its combat lifecycle.
///
/// ```text
///          kill, score < win          reset done
/// Active ───────────────────→ RoundResetting ───────→ Active
///    │
///    └── kill, score == win ──→ MatchEnded  (terminal; torn down after a delay)
/// ```
///
/// `RoundResetting` never outlives the processing of the hit that caused
/// it, so outside the resolver a session is always `Active` or
/// `MatchEnded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchPhase {
    Active,
    RoundResetting,
    MatchEnded,
}

impl MatchPhase {
    /// Returns `true` while gameplay events are accepted.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns `true` once a winner has been decided.
    pub fn is_ended(&self) -> bool {
        matches!(self, Self::MatchEnded)
    }

    /// Returns `true` if moving to `target` is a legal transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Active, Self::RoundResetting)
                | (Self::RoundResetting, Self::Active)
                | (Self::Active, Self::MatchEnded)
        )
    }
}

impl fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::RoundResetting => write!(f, "RoundResetting"),
            Self::MatchEnded => write!(f, "MatchEnded"),
        }
    }
}
