//! A single duel: two players, their authoritative state, and the phase.

use std::collections::HashMap;

use gunduel_protocol::{ClientId, PlayerState, Scores, SessionId};

use crate::{MatchConfig, MatchPhase};

/// A paired two-player match.
///
/// Fields are private: outside this crate a session is read-only, and
/// inside it only the combat resolver mutates player state.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    players: [ClientId; 2],
    states: HashMap<ClientId, PlayerState>,
    phase: MatchPhase,
    round: u32,
}

impl Session {
    /// Builds a session with both players at spawn. `a` and `b` must be
    /// distinct; the manager checks this before calling.
    pub(crate) fn new(
        id: SessionId,
        a: ClientId,
        b: ClientId,
        config: &MatchConfig,
    ) -> Self {
        debug_assert_ne!(a, b, "a session needs two distinct players");
        let states = HashMap::from([(a, config.spawn_state()), (b, config.spawn_state())]);
        Self {
            id,
            players: [a, b],
            states,
            phase: MatchPhase::Active,
            round: 1,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Both members, in pairing order.
    pub fn players(&self) -> [ClientId; 2] {
        self.players
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// The current round, starting at 1.
    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn is_member(&self, client_id: &ClientId) -> bool {
        self.players.contains(client_id)
    }

    /// The other member, or `None` if `client_id` isn't in this session.
    pub fn opponent_of(&self, client_id: &ClientId) -> Option<ClientId> {
        match self.players {
            [a, b] if a == *client_id => Some(b),
            [a, b] if b == *client_id => Some(a),
            _ => None,
        }
    }

    /// Authoritative state of one member.
    pub fn state(&self, client_id: &ClientId) -> Option<&PlayerState> {
        self.states.get(client_id)
    }

    /// Both members' scores.
    pub fn scores(&self) -> Scores {
        self.states
            .iter()
            .map(|(id, state)| (*id, state.score))
            .collect()
    }

    pub(crate) fn state_mut(&mut self, client_id: &ClientId) -> Option<&mut PlayerState> {
        self.states.get_mut(client_id)
    }

    pub(crate) fn transition(&mut self, target: MatchPhase) {
        debug_assert!(
            self.phase.can_transition_to(target),
            "illegal phase transition {} -> {}",
            self.phase,
            target
        );
        tracing::trace!(session_id = %self.id, from = %self.phase, to = %target, "phase transition");
        if target == MatchPhase::RoundResetting {
            self.round += 1;
        }
        self.phase = target;
    }
}
