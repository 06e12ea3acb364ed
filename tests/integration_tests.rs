//! Integration tests for the live-session subsystem.
//!
//! These validate cross-component behavior: the wire protocol as the remote
//! authority speaks it, the transport against a real WebSocket endpoint, and
//! snapshot ingestion into the world state store.

use client::game::WorldStateStore;
use client::network::{JoinInfo, SessionTransport, TransportEvent};
use client::rendering::{eye_offsets, head_eye_offsets};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use shared::{decode_frame, Direction, FoodKind, ServerFrame};
use std::time::{Duration, Instant};
use tokio_tungstenite::tungstenite::Message;

fn join_info() -> JoinInfo {
    JoinInfo {
        username: "ada".to_string(),
        skin: "default".to_string(),
        color: "#4dff91".to_string(),
    }
}

/// PROTOCOL TESTS
mod protocol_tests {
    use super::*;

    /// The authority's `game_state` broadcast lands in the store and the
    /// local player view mirrors the looked-up player state.
    #[test]
    fn game_state_broadcast_feeds_local_view() {
        let frame = json!({
            "type": "game_state",
            "state": {
                "players": {
                    "p1": {
                        "username": "p1",
                        "color": "#4dff91",
                        "body": [[5, 5]],
                        "direction": "RIGHT",
                        "score": 0,
                        "coins": 0,
                        "alive": true
                    }
                },
                "foods": [{"position": [6, 5], "type": "normal"}]
            },
            "leaderboard": [{"username": "p1", "score": 0}]
        })
        .to_string();

        let mut store = WorldStateStore::new();
        store.apply(decode_frame(&frame).unwrap(), "p1");

        let snapshot = store.snapshot().expect("snapshot applied");
        let p1 = snapshot.players.get("p1").unwrap();
        assert_eq!(p1.body[0], (5, 5));
        assert!(p1.alive);
        assert_eq!(snapshot.foods[0].position, (6, 5));
        assert_eq!(snapshot.foods[0].kind, FoodKind::Normal);

        assert_eq!(store.local_view().score, 0);
        assert_eq!(store.local_view().coins, 0);
        assert_eq!(store.player_count(), 1);

        // The head decorates with the right-facing eye preset.
        assert_eq!(
            head_eye_offsets(p1.direction),
            eye_offsets(Direction::Right)
        );
    }

    /// Frames applied in arrival order: of two snapshots received between
    /// paints, only the latest is observable.
    #[test]
    fn later_snapshot_shadows_earlier_one() {
        let make = |score: u32| {
            json!({
                "type": "game_state",
                "state": {
                    "players": {"p1": {"body": [[1, 1]], "score": score, "coins": 0}},
                    "foods": []
                },
                "leaderboard": []
            })
            .to_string()
        };

        let mut store = WorldStateStore::new();
        store.apply(decode_frame(&make(10)).unwrap(), "p1");
        store.apply(decode_frame(&make(20)).unwrap(), "p1");

        assert_eq!(store.local_view().score, 20);
        assert_eq!(
            store.snapshot().unwrap().players.get("p1").unwrap().score,
            20
        );
    }

    /// A dead snake keeps its body in the snapshot; only the alive flag
    /// changes what the head decoration will be.
    #[test]
    fn dead_player_keeps_body_in_snapshot() {
        let frame = json!({
            "type": "game_state",
            "state": {
                "players": {
                    "p2": {"body": [[3, 3], [2, 3], [1, 3]], "alive": false, "score": 40}
                },
                "foods": []
            }
        })
        .to_string();

        let mut store = WorldStateStore::new();
        store.apply(decode_frame(&frame).unwrap(), "p1");

        let p2 = store.snapshot().unwrap().players.get("p2").unwrap();
        assert!(!p2.alive);
        assert_eq!(p2.body.len(), 3);
    }
}

/// TRANSPORT TESTS against a real in-test WebSocket authority.
mod transport_tests {
    use super::*;

    /// Full session: connect, `join_room` first on the wire, ingest
    /// `room_joined` and `game_state`, then a `move` intent goes out.
    /// An unknown frame kind in the middle is ignored without breaking
    /// the session.
    #[test]
    fn websocket_session_round_trip() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (addr_tx, addr_rx) = std::sync::mpsc::channel();
        let (wire_tx, wire_rx) = std::sync::mpsc::channel::<String>();

        rt.spawn(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            addr_tx.send(listener.local_addr().unwrap()).unwrap();

            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

            // First client message must be the join intent.
            if let Some(Ok(msg)) = ws.next().await {
                let _ = wire_tx.send(msg.into_text().unwrap());
            }

            let frames = [
                json!({"type": "room_joined", "room_id": "global"}),
                // Forward-compatibility: unknown kinds are skipped.
                json!({"type": "tournament_started", "bracket": []}),
                json!({
                    "type": "game_state",
                    "state": {
                        "players": {
                            "p1": {
                                "username": "ada",
                                "color": "#4dff91",
                                "body": [[5, 5], [4, 5]],
                                "direction": "RIGHT",
                                "score": 30,
                                "coins": 12,
                                "alive": true
                            }
                        },
                        "foods": [{"position": [6, 5], "type": "golden", "value": 30}]
                    },
                    "leaderboard": [{"username": "ada", "score": 30}]
                }),
            ];
            for frame in frames {
                ws.send(Message::Text(frame.to_string())).await.unwrap();
            }

            // Relay the next client message (the move intent).
            if let Some(Ok(msg)) = ws.next().await {
                let _ = wire_tx.send(msg.into_text().unwrap());
            }

            // Keep the socket open while the client finishes its asserts.
            tokio::time::sleep(Duration::from_secs(3)).await;
        });

        let addr = addr_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let mut transport = SessionTransport::new(
            rt.handle().clone(),
            format!("http://{}", addr),
            "p1".to_string(),
        );
        transport.connect("global", join_info());

        let mut store = WorldStateStore::new();
        let mut saw_room_joined = false;
        let deadline = Instant::now() + Duration::from_secs(5);

        while Instant::now() < deadline && store.snapshot().is_none() {
            for event in transport.poll(true) {
                if let TransportEvent::Frame { frame, .. } = event {
                    if matches!(frame, ServerFrame::RoomJoined { .. }) {
                        saw_room_joined = true;
                    }
                    store.apply(frame, "p1");
                }
            }
            std::thread::sleep(Duration::from_millis(10));
        }

        let join_wire = wire_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        let join: serde_json::Value = serde_json::from_str(&join_wire).unwrap();
        assert_eq!(join["action"], "join_room");
        assert_eq!(join["room_id"], "global");
        assert_eq!(join["username"], "ada");
        assert_eq!(join["skin"], "default");
        assert_eq!(join["color"], "#4dff91");

        assert!(saw_room_joined);
        assert!(transport.is_open());
        assert_eq!(store.room_label(), Some("global"));
        assert_eq!(store.local_view().score, 30);
        assert_eq!(store.local_view().coins, 12);
        assert_eq!(
            store.snapshot().unwrap().foods[0].kind,
            shared::FoodKind::Golden
        );

        // Now a movement intent crosses the wire.
        transport.send(&shared::ClientIntent::Move {
            direction: Direction::Up,
        });
        let move_wire = wire_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let intent: serde_json::Value = serde_json::from_str(&move_wire).unwrap();
        assert_eq!(intent["action"], "move");
        assert_eq!(intent["direction"], "UP");
    }

    /// Closing from the client side tears the connection down and a
    /// subsequent send has no observable effect.
    #[test]
    fn close_then_send_is_a_no_op() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (addr_tx, addr_rx) = std::sync::mpsc::channel();

        rt.spawn(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            addr_tx.send(listener.local_addr().unwrap()).unwrap();
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            // Swallow the join intent, then wait for the close.
            while let Some(Ok(msg)) = ws.next().await {
                if matches!(msg, Message::Close(_)) {
                    break;
                }
            }
        });

        let addr = addr_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let mut transport = SessionTransport::new(
            rt.handle().clone(),
            format!("http://{}", addr),
            "p1".to_string(),
        );
        transport.connect("global", join_info());

        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline && !transport.is_open() {
            transport.poll(true);
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(transport.is_open());

        transport.close();
        assert!(!transport.is_open());

        // No exception, no backlog: the intent simply disappears.
        transport.send(&shared::ClientIntent::Move {
            direction: Direction::Left,
        });
        transport.close();
    }
}
