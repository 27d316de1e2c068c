//! Core protocol types for Gunduel's wire format.
//!
//! Every type here travels on the wire as JSON. The message enums use
//! adjacent tagging so each frame looks like
//! `{"type": "playerHit", "data": {...}}`, with `data` omitted for
//! events that carry nothing (`findMatch`, `playerLeft`, ...).

use std::collections::BTreeMap;
use std::fmt;

use gunduel_transport::ConnectionId;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifies one connected client for the lifetime of its connection.
///
/// Serialized as a plain number, and as a string key when it appears
/// inside a score map. Decoding accepts either form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ClientId(pub u64);

impl<'de> Deserialize<'de> for ClientId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Map keys reach us as strings, and buffered content (adjacent
        // tagging, `from_value`) never re-parses them as numbers.
        deserializer.deserialize_any(ClientIdVisitor)
    }
}

struct ClientIdVisitor;

impl Visitor<'_> for ClientIdVisitor {
    type Value = ClientId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a client id as a number or numeric string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<ClientId, E> {
        Ok(ClientId(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<ClientId, E> {
        u64::try_from(v)
            .map(ClientId)
            .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<ClientId, E> {
        v.parse()
            .map(ClientId)
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0)
    }
}

impl From<ConnectionId> for ClientId {
    fn from(id: ConnectionId) -> Self {
        Self(id.into_inner())
    }
}

/// Identifies one duel session.
///
/// Allocated from a monotonic counter and never reused, so a late timer
/// or a stale client can never address a newer session by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who inside a session should receive a server message.
///
/// The combat resolver returns `(Recipient, ServerMessage)` pairs and the
/// session manager resolves them against the session's two members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Both members of the session.
    All,
    /// Every member except the given one, i.e. the opponent.
    AllExcept(ClientId),
}

// ---------------------------------------------------------------------------
// Player state
// ---------------------------------------------------------------------------

/// `[x, y, z]` for positions, `[pitch, yaw, roll]` for rotations.
pub type Vec3 = [f32; 3];

/// Final or running scores keyed by client.
pub type Scores = BTreeMap<ClientId, u32>;

/// Which of the two pistols fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GunSide {
    Left,
    Right,
}

/// Authoritative per-player state inside a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub position: Vec3,
    pub rotation: Vec3,
    /// Always within `0..=max_hp`.
    pub hp: u32,
    pub ammo_left: u32,
    pub ammo_right: u32,
    /// Kills this match. Never decreases within a session.
    pub score: u32,
}

/// A partial [`PlayerState`]. Absent fields mean "unchanged".
///
/// Clients send these as `playerUpdate`; the server relays them as
/// `playerUpdated`, and also uses an hp-only delta to announce damage.
/// `score` is deliberately absent: it only changes through kills.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStateDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Vec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hp: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ammo_left: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ammo_right: Option<u32>,
}

impl PlayerStateDelta {
    /// A delta that only carries hit points.
    pub fn hp(hp: u32) -> Self {
        Self {
            hp: Some(hp),
            ..Self::default()
        }
    }

    /// Returns `true` if no field is set.
    pub fn is_empty(&self) -> bool {
        self.position.is_none()
            && self.rotation.is_none()
            && self.hp.is_none()
            && self.ammo_left.is_none()
            && self.ammo_right.is_none()
    }
}

/// A client's claim that a projectile struck a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitReport {
    pub victim_id: ClientId,
    pub damage: u32,
    pub shooter_id: ClientId,
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Everything a client can send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    /// Join the matchmaking queue.
    FindMatch,
    /// Leave the matchmaking queue before being paired.
    LeaveQueue,
    /// Abandon the current session; both members get `matchEnded`.
    LeaveMatch,
    /// Movement / ammo sync.
    PlayerUpdate(PlayerStateDelta),
    /// A shot was fired from the given gun.
    Shoot { gun_side: GunSide },
    /// A projectile hit someone.
    PlayerHit(HitReport),
}

/// Everything the server can send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// First message on every connection.
    Connected { client_id: ClientId },

    /// Sent to each member individually when a session is created.
    MatchFound {
        session_id: SessionId,
        opponent_id: ClientId,
        opponent_state: PlayerState,
        your_state: PlayerState,
    },

    /// Some fields of player `id` changed.
    PlayerUpdated { id: ClientId, state: PlayerStateDelta },

    /// Player `id` fired.
    PlayerShot { id: ClientId, gun_side: GunSide },

    PlayerKilled {
        shooter_id: ClientId,
        victim_id: ClientId,
    },

    /// Both players' scores; `data` is the bare id-to-score map.
    ScoreUpdate(Scores),

    MatchWin { winner_id: ClientId, scores: Scores },

    /// A new round started; `state` is the player's respawn state.
    RoundReset {
        player_id: ClientId,
        state: PlayerState,
    },

    /// The opponent disconnected.
    PlayerLeft,

    /// The session is gone; the client is back in the lobby.
    MatchEnded,
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The browser client parses these shapes directly, so the tests pin
    //! the JSON rather than just checking that decoding undoes encoding.

    use serde_json::json;

    use super::*;

    fn state() -> PlayerState {
        PlayerState {
            position: [0.0, 1.5, 0.0],
            rotation: [0.0, 0.0, 0.0],
            hp: 100,
            ammo_left: 8,
            ammo_right: 8,
            score: 0,
        }
    }

    #[test]
    fn test_client_id_serializes_as_plain_number() {
        assert_eq!(serde_json::to_string(&ClientId(42)).unwrap(), "42");
        assert_eq!(ClientId(7).to_string(), "C-7");
    }

    #[test]
    fn test_client_id_decodes_from_number_or_numeric_string() {
        assert_eq!(serde_json::from_str::<ClientId>("42").unwrap(), ClientId(42));
        assert_eq!(serde_json::from_str::<ClientId>(r#""42""#).unwrap(), ClientId(42));
        assert_eq!(serde_json::from_value::<ClientId>(json!("7")).unwrap(), ClientId(7));
        assert!(serde_json::from_str::<ClientId>("-1").is_err());
        assert!(serde_json::from_str::<ClientId>(r#""abc""#).is_err());
    }

    #[test]
    fn test_client_id_from_connection_id() {
        let id: ClientId = ConnectionId::new(9).into();
        assert_eq!(id, ClientId(9));
    }

    #[test]
    fn test_session_id_display() {
        assert_eq!(SessionId(3).to_string(), "S-3");
    }

    #[test]
    fn test_find_match_has_no_data() {
        let msg: ClientMessage =
            serde_json::from_value(json!({ "type": "findMatch" })).unwrap();
        assert_eq!(msg, ClientMessage::FindMatch);

        let value = serde_json::to_value(ClientMessage::FindMatch).unwrap();
        assert_eq!(value, json!({ "type": "findMatch" }));
    }

    #[test]
    fn test_player_update_partial_fields_decode_to_none() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "playerUpdate",
            "data": { "position": [1.0, 2.0, 3.0], "ammoLeft": 4 }
        }))
        .unwrap();

        match msg {
            ClientMessage::PlayerUpdate(delta) => {
                assert_eq!(delta.position, Some([1.0, 2.0, 3.0]));
                assert_eq!(delta.ammo_left, Some(4));
                assert_eq!(delta.rotation, None);
                assert_eq!(delta.ammo_right, None);
                assert_eq!(delta.hp, None);
            }
            other => panic!("expected PlayerUpdate, got {other:?}"),
        }
    }

    #[test]
    fn test_player_update_ignores_unknown_fields() {
        // Clients also send `score`; it must not break decoding.
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "playerUpdate",
            "data": { "score": 99, "ammoRight": 2 }
        }))
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::PlayerUpdate(PlayerStateDelta {
                ammo_right: Some(2),
                ..PlayerStateDelta::default()
            })
        );
    }

    #[test]
    fn test_shoot_carries_lowercase_side() {
        let msg: ClientMessage =
            serde_json::from_value(json!({ "type": "shoot", "data": { "gunSide": "left" } }))
                .unwrap();
        assert_eq!(msg, ClientMessage::Shoot { gun_side: GunSide::Left });
    }

    #[test]
    fn test_player_hit_uses_camel_case_ids() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "playerHit",
            "data": { "victimId": 2, "damage": 15, "shooterId": 1 }
        }))
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::PlayerHit(HitReport {
                victim_id: ClientId(2),
                damage: 15,
                shooter_id: ClientId(1),
            })
        );
    }

    #[test]
    fn test_negative_damage_is_rejected() {
        let result: Result<ClientMessage, _> = serde_json::from_value(json!({
            "type": "playerHit",
            "data": { "victimId": 2, "damage": -50, "shooterId": 1 }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_client_message_type_is_rejected() {
        let result: Result<ClientMessage, _> =
            serde_json::from_value(json!({ "type": "flyToMoon" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_match_found_json_format() {
        let msg = ServerMessage::MatchFound {
            session_id: SessionId(1),
            opponent_id: ClientId(2),
            opponent_state: state(),
            your_state: state(),
        };
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "matchFound");
        assert_eq!(json["data"]["sessionId"], 1);
        assert_eq!(json["data"]["opponentId"], 2);
        assert_eq!(json["data"]["yourState"]["hp"], 100);
        assert_eq!(json["data"]["opponentState"]["ammoLeft"], 8);
    }

    #[test]
    fn test_hp_only_player_updated_omits_other_fields() {
        let msg = ServerMessage::PlayerUpdated {
            id: ClientId(5),
            state: PlayerStateDelta::hp(40),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            json!({ "type": "playerUpdated", "data": { "id": 5, "state": { "hp": 40 } } })
        );
    }

    #[test]
    fn test_score_maps_use_string_keys() {
        let mut scores = Scores::new();
        scores.insert(ClientId(1), 3);
        scores.insert(ClientId(2), 1);
        let msg = ServerMessage::MatchWin {
            winner_id: ClientId(1),
            scores,
        };
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["data"]["winnerId"], 1);
        assert_eq!(json["data"]["scores"], json!({ "1": 3, "2": 1 }));

        let back: ServerMessage = serde_json::from_value(json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_score_update_data_is_the_bare_map() {
        let mut scores = Scores::new();
        scores.insert(ClientId(1), 1);
        scores.insert(ClientId(2), 0);
        let msg = ServerMessage::ScoreUpdate(scores);

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json, json!({ "type": "scoreUpdate", "data": { "1": 1, "2": 0 } }));

        let from_value: ServerMessage = serde_json::from_value(json).unwrap();
        assert_eq!(from_value, msg);

        // `data` before `type` forces serde to buffer the payload.
        let reordered: ServerMessage =
            serde_json::from_str(r#"{"data":{"1":1,"2":0},"type":"scoreUpdate"}"#).unwrap();
        assert_eq!(reordered, msg);
    }

    #[test]
    fn test_unit_server_messages() {
        assert_eq!(
            serde_json::to_value(ServerMessage::PlayerLeft).unwrap(),
            json!({ "type": "playerLeft" })
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::MatchEnded).unwrap(),
            json!({ "type": "matchEnded" })
        );
    }

    #[test]
    fn test_player_shot_json_format() {
        let msg = ServerMessage::PlayerShot {
            id: ClientId(1),
            gun_side: GunSide::Right,
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({ "type": "playerShot", "data": { "id": 1, "gunSide": "right" } })
        );
    }

    #[test]
    fn test_delta_is_empty() {
        assert!(PlayerStateDelta::default().is_empty());
        assert!(!PlayerStateDelta::hp(0).is_empty());
    }
}
