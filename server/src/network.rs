//! WebSocket and HTTP front of the relay server
//!
//! Exposes two routes: `GET /ws` upgrades to the relay connection protocol
//! (binary, bincode-framed [`shared::Packet`] values), and `GET /rooms`
//! returns the joinable room ids as a JSON array for tooling and
//! diagnostics outside the live-connection protocol.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header::ORIGIN, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use log::{error, info, warn};
use shared::Packet;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::relay::Relay;

pub struct AppState {
    pub relay: Mutex<Relay>,
    /// Origins permitted to open connections. Empty means unrestricted.
    /// Connections without an Origin header (native clients, tooling) are
    /// always admitted; the list fences browser contexts only.
    pub allowed_origins: Vec<String>,
}

impl AppState {
    pub fn new(allowed_origins: Vec<String>) -> Self {
        Self {
            relay: Mutex::new(Relay::new()),
            allowed_origins,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/rooms", get(list_rooms))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn list_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.relay.lock().await.joinable_rooms())
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let origin = headers.get(ORIGIN).and_then(|v| v.to_str().ok());
    if !origin_allowed(&state.allowed_origins, origin) {
        warn!("Rejected connection from disallowed origin {:?}", origin);
        return (StatusCode::FORBIDDEN, "origin not allowed").into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state))
        .into_response()
}

fn origin_allowed(allowed: &[String], origin: Option<&str>) -> bool {
    if allowed.is_empty() {
        return true;
    }
    match origin {
        Some(origin) => allowed.iter().any(|a| a == origin),
        None => true,
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<Packet>();
    let connection_id = state.relay.lock().await.register(tx);
    info!("Connection {} opened", connection_id);

    // Writer task: drains the relay's outbound queue for this connection.
    let writer = tokio::spawn(async move {
        while let Some(packet) = rx.recv().await {
            match bincode::serialize(&packet) {
                Ok(data) => {
                    if sender.send(Message::Binary(data.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => error!("Failed to encode outbound packet: {}", e),
            }
        }
    });

    while let Some(Ok(message)) = receiver.next().await {
        match message {
            Message::Binary(data) => match bincode::deserialize::<Packet>(&data) {
                Ok(packet) => {
                    state
                        .relay
                        .lock()
                        .await
                        .handle_packet(connection_id, packet);
                }
                Err(_) => {
                    warn!("Malformed frame from connection {}", connection_id);
                }
            },
            Message::Close(_) => break,
            // Text frames are not part of the protocol; ping/pong is
            // handled by the transport.
            _ => {}
        }
    }

    // A dropped connection and an explicit leave share one cleanup path.
    state.relay.lock().await.disconnect(connection_id);
    writer.abort();
    info!("Connection {} closed", connection_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_allow_list_admits_everyone() {
        assert!(origin_allowed(&[], Some("http://localhost:5173")));
        assert!(origin_allowed(&[], None));
    }

    #[test]
    fn test_allow_list_filters_browser_origins() {
        let allowed = vec!["http://localhost:5173".to_string()];

        assert!(origin_allowed(&allowed, Some("http://localhost:5173")));
        assert!(!origin_allowed(&allowed, Some("http://evil.example")));
    }

    #[test]
    fn test_native_clients_send_no_origin() {
        let allowed = vec!["http://localhost:5173".to_string()];
        assert!(origin_allowed(&allowed, None));
    }

    #[tokio::test]
    async fn test_rooms_endpoint_reads_relay_state() {
        let state = Arc::new(AppState::new(Vec::new()));

        {
            let mut relay = state.relay.lock().await;
            let (tx, _rx) = mpsc::unbounded_channel();
            let conn = relay.register(tx);
            relay.handle_packet(conn, Packet::CreateRoom { paddle_y: 300.0 });
        }

        let Json(rooms) = list_rooms(State(state)).await;
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].len(), 5);
    }
}
