//! Session manager: creates, tracks, and tears down duel sessions.

use std::collections::HashMap;

use gunduel_lobby::Gateway;
use gunduel_protocol::{
    ClientId, GunSide, HitReport, PlayerStateDelta, Recipient, ServerMessage, SessionId,
};

use crate::combat::Outbound;
use crate::{CombatResolver, MatchConfig, Session, SessionError};

/// Why a session is being torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The post-win grace delay elapsed.
    MatchComplete,
    /// A member's connection closed.
    Disconnected(ClientId),
    /// A member asked to leave.
    Left(ClientId),
}

impl EndReason {
    /// The member who walked away, if any.
    pub fn leaver(&self) -> Option<ClientId> {
        match self {
            Self::MatchComplete => None,
            Self::Disconnected(id) | Self::Left(id) => Some(*id),
        }
    }
}

/// What a hit report led to, as far as the caller needs to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    /// The session is still running.
    Continue,
    /// The match was decided; the caller schedules teardown.
    MatchWon { winner: ClientId },
}

/// Owns every live session and the client → session index.
///
/// A client is in at most one session (key invariant), and every
/// session has exactly two members in the index.
pub struct SessionManager {
    sessions: HashMap<SessionId, Session>,

    /// Maps each member to its session for O(1) lookup.
    player_sessions: HashMap<ClientId, SessionId>,

    resolver: CombatResolver,

    /// Next id to hand out. Ids are never reused.
    next_session_id: u64,
}

impl SessionManager {
    /// Creates an empty manager whose sessions follow `config`.
    pub fn new(config: MatchConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            player_sessions: HashMap::new(),
            resolver: CombatResolver::new(config),
            next_session_id: 1,
        }
    }

    pub fn config(&self) -> &MatchConfig {
        self.resolver.config()
    }

    /// Pairs two clients into a new session and sends each its own
    /// `matchFound`.
    ///
    /// # Errors
    /// - [`SessionError::SamePlayer`] if `a == b`
    /// - [`SessionError::AlreadyInSession`] if either is already playing
    pub fn create_session<G: Gateway + ?Sized>(
        &mut self,
        a: ClientId,
        b: ClientId,
        gateway: &G,
    ) -> Result<SessionId, SessionError> {
        if a == b {
            return Err(SessionError::SamePlayer(a));
        }
        for player in [a, b] {
            if let Some(existing) = self.player_sessions.get(&player) {
                return Err(SessionError::AlreadyInSession(player, *existing));
            }
        }

        let session_id = SessionId(self.next_session_id);
        self.next_session_id += 1;

        let session = Session::new(session_id, a, b, self.config());
        self.player_sessions.insert(a, session_id);
        self.player_sessions.insert(b, session_id);

        // Each side gets its own view; never a broadcast.
        for (me, opponent) in [(a, b), (b, a)] {
            let (Some(your_state), Some(opponent_state)) =
                (session.state(&me), session.state(&opponent))
            else {
                continue;
            };
            gateway.emit(
                me,
                ServerMessage::MatchFound {
                    session_id,
                    opponent_id: opponent,
                    opponent_state: opponent_state.clone(),
                    your_state: your_state.clone(),
                },
            );
        }

        self.sessions.insert(session_id, session);
        tracing::info!(%session_id, player_a = %a, player_b = %b, "session created");
        Ok(session_id)
    }

    /// Resolves the session a client belongs to.
    ///
    /// `None` for clients that are idle or still queued.
    pub fn lookup_session_for(&self, client_id: &ClientId) -> Option<SessionId> {
        self.player_sessions.get(client_id).copied()
    }

    /// Returns a live session.
    pub fn get(&self, session_id: &SessionId) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    /// Tears a session down and tells its members.
    ///
    /// If a member walked away, the other one gets `playerLeft` first.
    /// Both then get `matchEnded` (a departed client's copy is dropped
    /// by the gateway). Returns the removed session, or `None` if it was
    /// already gone, in which case nothing is sent. Safe to call twice
    /// for the same id: a win-triggered and a disconnect-triggered
    /// teardown can race.
    pub fn end_session<G: Gateway + ?Sized>(
        &mut self,
        session_id: SessionId,
        reason: EndReason,
        gateway: &G,
    ) -> Option<Session> {
        let session = self.sessions.remove(&session_id)?;
        for player in session.players() {
            self.player_sessions.remove(&player);
        }

        if let Some(remaining) = reason.leaver().and_then(|id| session.opponent_of(&id)) {
            gateway.emit(remaining, ServerMessage::PlayerLeft);
        }
        for player in session.players() {
            gateway.emit(player, ServerMessage::MatchEnded);
        }

        tracing::info!(%session_id, ?reason, rounds = session.round(), "session ended");
        Some(session)
    }

    /// Applies a movement/ammo sync from `sender`.
    ///
    /// # Errors
    /// [`SessionError::NotInSession`] if the sender has no session.
    pub fn handle_update<G: Gateway + ?Sized>(
        &mut self,
        sender: ClientId,
        delta: PlayerStateDelta,
        gateway: &G,
    ) -> Result<(), SessionError> {
        let session = session_of_mut(&mut self.sessions, &self.player_sessions, &sender)?;
        let out = self.resolver.apply_update(session, sender, delta);
        dispatch(session, out, gateway);
        Ok(())
    }

    /// Relays a shot from `sender` to its opponent.
    ///
    /// # Errors
    /// [`SessionError::NotInSession`] if the sender has no session.
    pub fn handle_shot<G: Gateway + ?Sized>(
        &mut self,
        sender: ClientId,
        side: GunSide,
        gateway: &G,
    ) -> Result<(), SessionError> {
        let session = session_of_mut(&mut self.sessions, &self.player_sessions, &sender)?;
        let out = self.resolver.apply_shot(session, sender, side);
        dispatch(session, out, gateway);
        Ok(())
    }

    /// Applies a hit report from `sender`.
    ///
    /// On [`HitOutcome::MatchWon`] the session stays alive in its
    /// terminal phase; the caller is responsible for the delayed
    /// [`end_session`](Self::end_session).
    ///
    /// # Errors
    /// [`SessionError::NotInSession`] if the sender has no session.
    pub fn handle_hit<G: Gateway + ?Sized>(
        &mut self,
        sender: ClientId,
        hit: HitReport,
        gateway: &G,
    ) -> Result<HitOutcome, SessionError> {
        let session = session_of_mut(&mut self.sessions, &self.player_sessions, &sender)?;
        let resolution = self.resolver.apply_hit(session, sender, hit);
        dispatch(session, resolution.messages, gateway);
        Ok(match resolution.winner {
            Some(winner) => HitOutcome::MatchWon { winner },
            None => HitOutcome::Continue,
        })
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if there are no live sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Resolves a client's live session. Takes the maps separately so the
/// caller can still borrow the resolver.
fn session_of_mut<'a>(
    sessions: &'a mut HashMap<SessionId, Session>,
    player_sessions: &HashMap<ClientId, SessionId>,
    client_id: &ClientId,
) -> Result<&'a mut Session, SessionError> {
    let session_id = player_sessions
        .get(client_id)
        .ok_or(SessionError::NotInSession(*client_id))?;
    sessions
        .get_mut(session_id)
        .ok_or(SessionError::NotFound(*session_id))
}

/// Delivers resolver output to the right members of `session`.
fn dispatch<G: Gateway + ?Sized>(session: &Session, out: Outbound, gateway: &G) {
    for (recipient, msg) in out {
        match recipient {
            Recipient::All => {
                for player in session.players() {
                    gateway.emit(player, msg.clone());
                }
            }
            Recipient::AllExcept(excluded) => {
                for player in session.players() {
                    if player != excluded {
                        gateway.emit(player, msg.clone());
                    }
                }
            }
        }
    }
}
