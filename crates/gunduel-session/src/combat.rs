//! The combat resolver: applies gameplay events to a session.
//!
//! Every method takes the session, the member who sent the event and the
//! event itself, mutates the session, and returns the notifications to
//! send as `(Recipient, ServerMessage)` pairs. Nothing here does I/O, so
//! the rules can be tested without channels or sockets.
//!
//! Hit reports are trusted: the reporting client decided the projectile
//! connected, and no trajectory or position cross-check happens here.

use gunduel_protocol::{
    ClientId, GunSide, HitReport, PlayerStateDelta, Recipient, ServerMessage,
};

use crate::{MatchConfig, MatchPhase, Session};

/// Notifications produced by one event.
pub type Outbound = Vec<(Recipient, ServerMessage)>;

/// Result of resolving a hit report.
#[derive(Debug, Default)]
pub struct HitResolution {
    pub messages: Outbound,
    /// Set when this hit decided the match.
    pub winner: Option<ClientId>,
}

/// Applies movement, shots and hits to sessions according to a
/// [`MatchConfig`].
#[derive(Debug, Clone)]
pub struct CombatResolver {
    config: MatchConfig,
}

impl CombatResolver {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Merges a movement/ammo delta into the sender's state and relays it
    /// to the opponent.
    ///
    /// `hp` is stripped (damage only comes from hit reports) and ammo is
    /// clamped to the magazine size.
    pub fn apply_update(
        &self,
        session: &mut Session,
        sender: ClientId,
        mut delta: PlayerStateDelta,
    ) -> Outbound {
        if !session.phase().is_active() {
            return Vec::new();
        }
        delta.hp = None;
        delta.ammo_left = delta.ammo_left.map(|ammo| ammo.min(self.config.max_ammo));
        delta.ammo_right = delta.ammo_right.map(|ammo| ammo.min(self.config.max_ammo));
        if delta.is_empty() {
            return Vec::new();
        }

        let Some(state) = session.state_mut(&sender) else {
            return Vec::new();
        };
        if let Some(position) = delta.position {
            state.position = position;
        }
        if let Some(rotation) = delta.rotation {
            state.rotation = rotation;
        }
        if let Some(ammo) = delta.ammo_left {
            state.ammo_left = ammo;
        }
        if let Some(ammo) = delta.ammo_right {
            state.ammo_right = ammo;
        }

        vec![(
            Recipient::AllExcept(sender),
            ServerMessage::PlayerUpdated {
                id: sender,
                state: delta,
            },
        )]
    }

    /// Relays a shot to the opponent. The server keeps no projectile state.
    pub fn apply_shot(&self, session: &Session, sender: ClientId, side: GunSide) -> Outbound {
        if !session.phase().is_active() {
            return Vec::new();
        }
        vec![(
            Recipient::AllExcept(sender),
            ServerMessage::PlayerShot {
                id: sender,
                gun_side: side,
            },
        )]
    }

    /// Applies a hit report.
    ///
    /// Damage clamps hp at zero. A kill scores a point for the shooter and
    /// either resets the round or, at `win_score`, ends the match.
    pub fn apply_hit(&self, session: &mut Session, sender: ClientId, hit: HitReport) -> HitResolution {
        let session_id = session.id();
        if !session.phase().is_active() {
            tracing::debug!(%session_id, %sender, phase = %session.phase(), "hit after match end ignored");
            return HitResolution::default();
        }
        if hit.victim_id == hit.shooter_id
            || !session.is_member(&hit.victim_id)
            || !session.is_member(&hit.shooter_id)
        {
            tracing::debug!(
                %session_id,
                %sender,
                victim = %hit.victim_id,
                shooter = %hit.shooter_id,
                "hit report names players outside the duel, ignoring"
            );
            return HitResolution::default();
        }

        let Some(victim) = session.state_mut(&hit.victim_id) else {
            return HitResolution::default();
        };
        if victim.hp == 0 {
            return HitResolution::default();
        }
        victim.hp = victim.hp.saturating_sub(hit.damage);
        let hp = victim.hp;

        let mut resolution = HitResolution::default();
        resolution.messages.push((
            Recipient::All,
            ServerMessage::PlayerUpdated {
                id: hit.victim_id,
                state: PlayerStateDelta::hp(hp),
            },
        ));
        tracing::debug!(%session_id, victim = %hit.victim_id, shooter = %hit.shooter_id, damage = hit.damage, hp, "hit applied");

        if hp > 0 {
            return resolution;
        }

        resolution.messages.push((
            Recipient::All,
            ServerMessage::PlayerKilled {
                shooter_id: hit.shooter_id,
                victim_id: hit.victim_id,
            },
        ));
        let score = match session.state_mut(&hit.shooter_id) {
            Some(shooter) => {
                shooter.score += 1;
                shooter.score
            }
            None => return resolution,
        };
        resolution.messages.push((
            Recipient::All,
            ServerMessage::ScoreUpdate(session.scores()),
        ));

        if score >= self.config.win_score {
            session.transition(MatchPhase::MatchEnded);
            resolution.messages.push((
                Recipient::All,
                ServerMessage::MatchWin {
                    winner_id: hit.shooter_id,
                    scores: session.scores(),
                },
            ));
            resolution.winner = Some(hit.shooter_id);
            tracing::info!(%session_id, winner = %hit.shooter_id, "match won");
        } else {
            session.transition(MatchPhase::RoundResetting);
            self.reset_round(session, &mut resolution.messages);
            session.transition(MatchPhase::Active);
            tracing::info!(%session_id, round = session.round(), "round reset");
        }
        resolution
    }

    /// Puts both players back at spawn with full hp and ammo, keeping
    /// scores and rotation, and announces each player's new state separately.
    fn reset_round(&self, session: &mut Session, out: &mut Outbound) {
        let spawn = self.config.spawn_state();
        for player_id in session.players() {
            let Some(state) = session.state_mut(&player_id) else {
                continue;
            };
            state.hp = spawn.hp;
            state.ammo_left = spawn.ammo_left;
            state.ammo_right = spawn.ammo_right;
            state.position = spawn.position;

            out.push((
                Recipient::All,
                ServerMessage::RoundReset {
                    player_id,
                    state: state.clone(),
                },
            ));
        }
    }
}
