//! Integration tests for the Gunduel server: real WebSocket clients
//! against a server bound to a random local port.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use gunduel::prelude::*;
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Starts a server on a random port and returns its address and a
/// coordinator handle.
async fn start_server(match_config: MatchConfig) -> (String, CoordinatorHandle) {
    let server = GunduelServer::builder()
        .bind("127.0.0.1:0")
        .match_config(match_config)
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();
    let coordinator = server.coordinator();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    (addr, coordinator)
}

/// Connects and consumes the `connected` greeting. Returns the socket and
/// the client id the server assigned.
async fn connect(addr: &str) -> (ClientWs, ClientId) {
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    match recv(&mut ws).await {
        ServerMessage::Connected { client_id } => (ws, client_id),
        other => panic!("expected connected, got {other:?}"),
    }
}

async fn send(ws: &mut ClientWs, value: Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("send");
}

async fn recv_raw(ws: &mut ClientWs) -> Value {
    let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("timed out waiting for a message")
        .expect("stream ended")
        .expect("recv error");
    assert!(msg.is_text(), "server sends text frames, got {msg:?}");
    serde_json::from_slice(&msg.into_data()).expect("valid JSON")
}

async fn recv(ws: &mut ClientWs) -> ServerMessage {
    serde_json::from_value(recv_raw(ws).await).expect("a known server message")
}

/// Asserts nothing arrives within a short window.
async fn assert_silent(ws: &mut ClientWs) {
    let result = tokio::time::timeout(Duration::from_millis(100), ws.next()).await;
    assert!(result.is_err(), "expected silence, got {result:?}");
}

/// Connects two clients and pairs them.
async fn duel(addr: &str) -> (ClientWs, ClientId, ClientWs, ClientId) {
    let (mut a, a_id) = connect(addr).await;
    let (mut b, b_id) = connect(addr).await;
    send(&mut a, json!({ "type": "findMatch" })).await;
    send(&mut b, json!({ "type": "findMatch" })).await;
    assert!(matches!(recv(&mut a).await, ServerMessage::MatchFound { .. }));
    assert!(matches!(recv(&mut b).await, ServerMessage::MatchFound { .. }));
    (a, a_id, b, b_id)
}

fn hit(victim: ClientId, damage: u32, shooter: ClientId) -> Value {
    json!({
        "type": "playerHit",
        "data": { "victimId": victim, "damage": damage, "shooterId": shooter }
    })
}

// =========================================================================
// Connection
// =========================================================================

#[tokio::test]
async fn test_each_client_gets_a_distinct_id() {
    let (addr, _) = start_server(MatchConfig::default()).await;

    let (_a, a_id) = connect(&addr).await;
    let (_b, b_id) = connect(&addr).await;

    assert_ne!(a_id, b_id);
}

#[tokio::test]
async fn test_malformed_messages_are_ignored() {
    let (addr, coordinator) = start_server(MatchConfig::default()).await;
    let (mut ws, _) = connect(&addr).await;

    ws.send(Message::Text("not json".into())).await.unwrap();
    send(&mut ws, json!({ "type": "teleport" })).await;
    send(&mut ws, json!({ "type": "shoot", "data": { "gunSide": "middle" } })).await;
    assert_silent(&mut ws).await;

    // Still connected and usable.
    send(&mut ws, json!({ "type": "findMatch" })).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(coordinator.stats().await.unwrap().queued, 1);
}

#[tokio::test]
async fn test_disconnect_is_reported_to_coordinator() {
    let (addr, coordinator) = start_server(MatchConfig::default()).await;
    let (mut ws, _) = connect(&addr).await;
    send(&mut ws, json!({ "type": "findMatch" })).await;

    ws.close(None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let stats = coordinator.stats().await.unwrap();
    assert_eq!(stats.clients, 0);
    assert_eq!(stats.queued, 0);
}

// =========================================================================
// Matchmaking
// =========================================================================

#[tokio::test]
async fn test_pairing_sends_consistent_match_found() {
    let (addr, _) = start_server(MatchConfig::default()).await;
    let (mut a, a_id) = connect(&addr).await;
    let (mut b, b_id) = connect(&addr).await;

    send(&mut a, json!({ "type": "findMatch" })).await;
    assert_silent(&mut a).await;
    send(&mut b, json!({ "type": "findMatch" })).await;

    let found_a = recv_raw(&mut a).await;
    let found_b = recv_raw(&mut b).await;

    assert_eq!(found_a["type"], "matchFound");
    assert_eq!(found_a["data"]["opponentId"], json!(b_id));
    assert_eq!(found_b["data"]["opponentId"], json!(a_id));
    assert_eq!(found_a["data"]["sessionId"], found_b["data"]["sessionId"]);
    assert_eq!(found_a["data"]["yourState"]["hp"], 100);
    assert_eq!(found_a["data"]["yourState"]["ammoLeft"], 8);
    assert_eq!(found_a["data"]["opponentState"]["position"], json!([0.0, 1.6, 0.0]));
}

// =========================================================================
// Combat
// =========================================================================

#[tokio::test]
async fn test_movement_and_shots_are_relayed() {
    let (addr, _) = start_server(MatchConfig::default()).await;
    let (mut a, a_id, mut b, _) = duel(&addr).await;

    send(
        &mut a,
        json!({ "type": "playerUpdate", "data": { "position": [2.0, 1.6, 3.0] } }),
    )
    .await;
    send(&mut a, json!({ "type": "shoot", "data": { "gunSide": "left" } })).await;

    let updated = recv_raw(&mut b).await;
    assert_eq!(updated["type"], "playerUpdated");
    assert_eq!(updated["data"]["id"], json!(a_id));
    assert_eq!(updated["data"]["state"], json!({ "position": [2.0, 1.6, 3.0] }));

    assert_eq!(
        recv(&mut b).await,
        ServerMessage::PlayerShot { id: a_id, gun_side: GunSide::Left }
    );
    assert_silent(&mut a).await;
}

#[tokio::test]
async fn test_overkill_hit_kills_scores_and_resets() {
    let (addr, _) = start_server(MatchConfig::default()).await;
    let (mut a, a_id, mut b, b_id) = duel(&addr).await;

    send(&mut a, hit(b_id, 150, a_id)).await;

    for ws in [&mut a, &mut b] {
        assert_eq!(
            recv(ws).await,
            ServerMessage::PlayerUpdated { id: b_id, state: PlayerStateDelta::hp(0) }
        );
        assert_eq!(
            recv(ws).await,
            ServerMessage::PlayerKilled { shooter_id: a_id, victim_id: b_id }
        );
        let scores = recv_raw(ws).await;
        assert_eq!(scores["type"], "scoreUpdate");
        assert_eq!(scores["data"][a_id.0.to_string()], 1);
        assert_eq!(scores["data"][b_id.0.to_string()], 0);
        for _ in 0..2 {
            match recv(ws).await {
                ServerMessage::RoundReset { state, .. } => assert_eq!(state.hp, 100),
                other => panic!("expected roundReset, got {other:?}"),
            }
        }
    }
}

#[tokio::test]
async fn test_win_then_delayed_teardown() {
    let config = MatchConfig {
        win_score: 1,
        teardown_delay: Duration::from_millis(300),
        ..MatchConfig::default()
    };
    let (addr, coordinator) = start_server(config).await;
    let (mut a, a_id, mut b, b_id) = duel(&addr).await;

    send(&mut b, hit(a_id, 100, b_id)).await;

    let mut last = Value::Null;
    for _ in 0..4 {
        last = recv_raw(&mut a).await;
    }
    assert_eq!(last["type"], "matchWin");
    assert_eq!(last["data"]["winnerId"], json!(b_id));

    // Frozen during the grace period.
    send(&mut a, hit(b_id, 100, a_id)).await;
    assert_silent(&mut a).await;
    assert_eq!(coordinator.stats().await.unwrap().sessions, 1);

    assert_eq!(recv(&mut a).await, ServerMessage::MatchEnded);
    let mut seen = Vec::new();
    for _ in 0..4 {
        seen.push(recv(&mut b).await);
    }
    let Some(ServerMessage::ScoreUpdate(scores)) = seen.get(2) else {
        panic!("expected scoreUpdate third, got {seen:?}");
    };
    assert_eq!(scores[&b_id], 1);
    assert_eq!(scores[&a_id], 0);
    let Some(ServerMessage::MatchWin { winner_id, scores }) = seen.get(3) else {
        panic!("expected matchWin fourth, got {seen:?}");
    };
    assert_eq!(*winner_id, b_id);
    assert_eq!(scores[&b_id], 1);
    assert_eq!(recv(&mut b).await, ServerMessage::MatchEnded);

    let stats = coordinator.stats().await.unwrap();
    assert_eq!(stats.sessions, 0);
    assert_eq!(stats.pending_teardowns, 0);
}

#[tokio::test]
async fn test_opponent_disconnect_ends_match() {
    let (addr, coordinator) = start_server(MatchConfig::default()).await;
    let (a, _, mut b, _) = duel(&addr).await;

    drop(a);

    assert_eq!(recv(&mut b).await, ServerMessage::PlayerLeft);
    assert_eq!(recv(&mut b).await, ServerMessage::MatchEnded);
    assert_silent(&mut b).await;
    assert_eq!(coordinator.stats().await.unwrap().sessions, 0);

    // The survivor is back in the lobby and can queue again.
    send(&mut b, json!({ "type": "findMatch" })).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(coordinator.stats().await.unwrap().queued, 1);
}

#[tokio::test]
async fn test_leave_match() {
    let (addr, _) = start_server(MatchConfig::default()).await;
    let (mut a, _, mut b, _) = duel(&addr).await;

    send(&mut a, json!({ "type": "leaveMatch" })).await;

    assert_eq!(recv(&mut b).await, ServerMessage::PlayerLeft);
    assert_eq!(recv(&mut b).await, ServerMessage::MatchEnded);
    assert_eq!(recv(&mut a).await, ServerMessage::MatchEnded);
}

// =========================================================================
// Shutdown
// =========================================================================

#[tokio::test]
async fn test_shutdown_signal_closes_clients() {
    let server = GunduelServer::builder()
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");
    let addr = server.local_addr().unwrap().to_string();
    let coordinator = server.coordinator();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let running = tokio::spawn(server.run_until(async {
        let _ = stop_rx.await;
    }));
    tokio::time::sleep(Duration::from_millis(10)).await;

    let (mut ws, _) = connect(&addr).await;
    stop_tx.send(()).unwrap();
    running.await.unwrap().expect("clean shutdown");

    // The handler sees its outbound channel close and closes the socket.
    let next = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("socket should close promptly");
    assert!(matches!(next, None | Some(Ok(Message::Close(_))) | Some(Err(_))));
    assert!(coordinator.stats().await.is_err());
}
