//! Integration tests for the netplay protocol
//!
//! These tests validate cross-component interactions and real network
//! behavior: wire encoding, the full WebSocket session lifecycle against a
//! live server, and the client-side authority rules.

use bincode::{deserialize, serialize};
use futures_util::{SinkExt, StreamExt};
use shared::{BallSnapshot, ErrorKind, Packet, Roster};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Boots a relay server on an ephemeral port and returns its ws URL.
async fn spawn_server() -> String {
    let state = Arc::new(server::network::AppState::new(Vec::new()));
    let app = server::network::router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("ws://{}/ws", addr)
}

async fn connect(url: &str) -> WsStream {
    let (socket, _) = connect_async(url).await.unwrap();
    socket
}

async fn send(socket: &mut WsStream, packet: Packet) {
    let data = serialize(&packet).unwrap();
    socket.send(Message::Binary(data.into())).await.unwrap();
}

/// Receives the next protocol packet, skipping transport-level frames.
async fn recv(socket: &mut WsStream) -> Packet {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), socket.next())
            .await
            .expect("timed out waiting for a packet")
            .expect("connection closed while waiting for a packet")
            .expect("transport error while waiting for a packet");

        match frame {
            Message::Binary(data) => return deserialize(&data).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("Unexpected frame {:?}", other),
        }
    }
}

/// NETWORK PROTOCOL TESTS
mod protocol_tests {
    use super::*;

    /// Packet round-trip across every variant that crosses the wire.
    #[tokio::test]
    async fn packet_serialization_roundtrip() {
        let test_packets = vec![
            Packet::ListRooms,
            Packet::CreateRoom { paddle_y: 300.0 },
            Packet::JoinRoom {
                room_id: "AB3DE".to_string(),
                paddle_y: 450.0,
            },
            Packet::PaddleMove { y: 512.0 },
            Packet::BallUpdate {
                ball: BallSnapshot::new(100.0, 200.0, -330.0, 80.0),
            },
            Packet::RoomAssigned {
                room_id: "AB3DE".to_string(),
                is_primary: true,
            },
            Packet::RoomList {
                rooms: vec!["AAAAA".to_string(), "BBBBB".to_string()],
            },
            Packet::RosterUpdate {
                roster: Roster {
                    primary_y: Some(300.0),
                    secondary_y: None,
                },
            },
            Packet::MatchStarted { started: true },
            Packet::BallSync {
                ball: BallSnapshot::serve(),
            },
            Packet::PeerLeft,
            Packet::Error {
                kind: ErrorKind::RoomFull,
                message: "room AB3DE already has two players".to_string(),
            },
        ];

        for packet in test_packets {
            let serialized = serialize(&packet).unwrap();
            let deserialized: Packet = deserialize(&serialized).unwrap();
            assert_eq!(packet, deserialized);
        }
    }
}

/// LIVE SESSION TESTS
mod session_tests {
    use super::*;

    /// Two clients run a full session: create, list, join, paddle and ball
    /// traffic, then a disconnect that stops the match for the survivor.
    #[tokio::test]
    async fn full_match_lifecycle_over_websocket() {
        let url = spawn_server().await;

        // Creator becomes the primary and gets the initial roster.
        let mut primary = connect(&url).await;
        send(&mut primary, Packet::CreateRoom { paddle_y: 300.0 }).await;

        let room_id = match recv(&mut primary).await {
            Packet::RoomAssigned {
                room_id,
                is_primary,
            } => {
                assert!(is_primary);
                room_id
            }
            other => panic!("Expected RoomAssigned, got {:?}", other),
        };
        match recv(&mut primary).await {
            Packet::RosterUpdate { roster } => {
                assert_eq!(roster.primary_y, Some(300.0));
                assert_eq!(roster.secondary_y, None);
            }
            other => panic!("Expected RosterUpdate, got {:?}", other),
        }

        // Second client sees the room and joins it; the match starts for
        // both sides.
        let mut secondary = connect(&url).await;
        send(&mut secondary, Packet::ListRooms).await;
        match recv(&mut secondary).await {
            Packet::RoomList { rooms } => assert_eq!(rooms, vec![room_id.clone()]),
            other => panic!("Expected RoomList, got {:?}", other),
        }

        send(
            &mut secondary,
            Packet::JoinRoom {
                room_id: room_id.clone(),
                paddle_y: 450.0,
            },
        )
        .await;

        match recv(&mut secondary).await {
            Packet::RoomAssigned {
                room_id: assigned,
                is_primary,
            } => {
                assert_eq!(assigned, room_id);
                assert!(!is_primary);
            }
            other => panic!("Expected RoomAssigned, got {:?}", other),
        }
        match recv(&mut secondary).await {
            Packet::RosterUpdate { roster } => {
                assert_eq!(roster.secondary_y, Some(450.0));
            }
            other => panic!("Expected RosterUpdate, got {:?}", other),
        }
        assert_eq!(
            recv(&mut secondary).await,
            Packet::MatchStarted { started: true }
        );

        match recv(&mut primary).await {
            Packet::RosterUpdate { roster } => {
                assert_eq!(roster.primary_y, Some(300.0));
                assert_eq!(roster.secondary_y, Some(450.0));
            }
            other => panic!("Expected RosterUpdate, got {:?}", other),
        }
        assert_eq!(
            recv(&mut primary).await,
            Packet::MatchStarted { started: true }
        );

        // Ball snapshots fan out to the other side only.
        let ball = BallSnapshot::new(512.0, 400.0, -330.0, 120.0);
        send(&mut primary, Packet::BallUpdate { ball }).await;
        assert_eq!(recv(&mut secondary).await, Packet::BallSync { ball });

        // Paddle moves come back as roster updates to everyone.
        send(&mut secondary, Packet::PaddleMove { y: 500.0 }).await;
        match recv(&mut primary).await {
            Packet::RosterUpdate { roster } => {
                assert_eq!(roster.secondary_y, Some(500.0));
            }
            other => panic!("Expected RosterUpdate, got {:?}", other),
        }
        match recv(&mut secondary).await {
            Packet::RosterUpdate { roster } => {
                assert_eq!(roster.secondary_y, Some(500.0));
            }
            other => panic!("Expected RosterUpdate, got {:?}", other),
        }

        // The primary dropping its connection stops the match for the
        // survivor.
        primary.close(None).await.unwrap();

        assert_eq!(recv(&mut secondary).await, Packet::PeerLeft);
        assert_eq!(
            recv(&mut secondary).await,
            Packet::MatchStarted { started: false }
        );
    }

    /// Registry failures come back to the requesting connection as typed
    /// errors and leave everyone else undisturbed.
    #[tokio::test]
    async fn join_failures_return_typed_errors() {
        let url = spawn_server().await;

        let mut client = connect(&url).await;
        send(
            &mut client,
            Packet::JoinRoom {
                room_id: "ZZZZZ".to_string(),
                paddle_y: 400.0,
            },
        )
        .await;

        match recv(&mut client).await {
            Packet::Error { kind, message } => {
                assert_eq!(kind, ErrorKind::RoomNotFound);
                assert!(message.contains("ZZZZZ"));
            }
            other => panic!("Expected Error, got {:?}", other),
        }

        // Fill a room, then try to squeeze in a third player.
        let mut primary = connect(&url).await;
        send(&mut primary, Packet::CreateRoom { paddle_y: 300.0 }).await;
        let room_id = match recv(&mut primary).await {
            Packet::RoomAssigned { room_id, .. } => room_id,
            other => panic!("Expected RoomAssigned, got {:?}", other),
        };

        let mut secondary = connect(&url).await;
        send(
            &mut secondary,
            Packet::JoinRoom {
                room_id: room_id.clone(),
                paddle_y: 450.0,
            },
        )
        .await;
        match recv(&mut secondary).await {
            Packet::RoomAssigned { .. } => {}
            other => panic!("Expected RoomAssigned, got {:?}", other),
        }

        send(
            &mut client,
            Packet::JoinRoom {
                room_id: room_id.clone(),
                paddle_y: 200.0,
            },
        )
        .await;
        match recv(&mut client).await {
            Packet::Error { kind, .. } => assert_eq!(kind, ErrorKind::RoomFull),
            other => panic!("Expected Error, got {:?}", other),
        }
    }

    /// A room whose last member leaves disappears from the listing.
    #[tokio::test]
    async fn abandoned_rooms_are_closed() {
        let url = spawn_server().await;

        let mut primary = connect(&url).await;
        send(&mut primary, Packet::CreateRoom { paddle_y: 300.0 }).await;
        match recv(&mut primary).await {
            Packet::RoomAssigned { .. } => {}
            other => panic!("Expected RoomAssigned, got {:?}", other),
        }

        primary.close(None).await.unwrap();

        // Give the server a moment to process the close.
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut observer = connect(&url).await;
        send(&mut observer, Packet::ListRooms).await;
        match recv(&mut observer).await {
            Packet::RoomList { rooms } => assert!(rooms.is_empty()),
            other => panic!("Expected RoomList, got {:?}", other),
        }
    }
}

/// AUTHORITY SPLIT TESTS
mod authority_tests {
    use client::game::{MatchPhase, MatchState};
    use shared::{BallSnapshot, BALL_SYNC_INTERVAL};

    /// A snapshot published by the primary, adopted by the secondary,
    /// leaves both sides with an identical ball.
    #[test]
    fn published_snapshots_converge_both_sides() {
        let mut primary = MatchState::new(true);
        let mut secondary = MatchState::new(false);
        primary.set_started(true);
        secondary.set_started(true);

        let mut published = None;
        while published.is_none() {
            published = primary.advance(BALL_SYNC_INTERVAL / 2.0);
        }

        secondary.adopt_snapshot(published.unwrap());
        assert_eq!(primary.ball(), secondary.ball());
    }

    /// The secondary never generates snapshots of its own, whatever its
    /// local extrapolation does.
    #[test]
    fn secondary_never_publishes() {
        let mut secondary = MatchState::new(false);
        secondary.set_started(true);
        secondary.adopt_snapshot(BallSnapshot::new(400.0, 300.0, 250.0, -100.0));

        for _ in 0..100 {
            assert_eq!(secondary.advance(0.05), None);
        }
        assert_eq!(secondary.phase(), MatchPhase::Running);
    }
}
