//! Sync client: the single logical connection to the relay server
//!
//! Commands (create/join/list/paddle/ball/disconnect) fail fast with
//! [`SyncError::NotConnected`] when no connection is live; they are never
//! queued. Inbound packets are decoded on a reader task and buffered; they
//! reach the registered handlers only from [`SyncClient::poll`], which the
//! frame loop calls once per frame, so no callback ever runs concurrently
//! with another callback or with a frame update.
//!
//! Exactly one handler per event kind can be registered at a time; the
//! last registration wins. That single-slot contract is deliberate: one
//! client process drives one active match.

use futures_util::{SinkExt, StreamExt};
use log::{error, warn};
use shared::{BallSnapshot, ErrorKind, Packet, Roster};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("no live server connection")]
    NotConnected,
    #[error("websocket error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
}

#[derive(Debug)]
enum Command {
    Send(Packet),
    Close,
}

#[derive(Debug)]
enum Inbound {
    Packet(Packet),
    ConnectionLost,
}

/// One slot per event kind; re-registration overwrites.
#[derive(Default)]
struct Handlers {
    room_created: Option<Box<dyn FnMut(String)>>,
    room_joined: Option<Box<dyn FnMut(String)>>,
    roster_update: Option<Box<dyn FnMut(Roster)>>,
    match_started: Option<Box<dyn FnMut(bool)>>,
    ball_sync: Option<Box<dyn FnMut(BallSnapshot)>>,
    peer_left: Option<Box<dyn FnMut()>>,
    room_list: Option<Box<dyn FnMut(Vec<String>)>>,
    error: Option<Box<dyn FnMut(ErrorKind, String)>>,
}

pub struct SyncClient {
    command_tx: Option<mpsc::UnboundedSender<Command>>,
    event_rx: Option<mpsc::UnboundedReceiver<Inbound>>,
    room_id: Option<String>,
    /// Recorded on the first room assignment and immutable until the
    /// connection is torn down.
    is_primary: Option<bool>,
    handlers: Handlers,
}

impl SyncClient {
    pub fn new() -> Self {
        Self {
            command_tx: None,
            event_rx: None,
            room_id: None,
            is_primary: None,
            handlers: Handlers::default(),
        }
    }

    /// Opens the connection and spawns its reader/writer tasks on the
    /// current tokio runtime. Any previous connection is torn down first.
    pub async fn connect(&mut self, url: &str) -> Result<(), SyncError> {
        self.disconnect();

        let (socket, _) = connect_async(url).await?;
        let (mut write, mut read) = socket.split();

        let (command_tx, mut command_rx) = mpsc::unbounded_channel::<Command>();
        let (event_tx, event_rx) = mpsc::unbounded_channel::<Inbound>();

        tokio::spawn(async move {
            while let Some(command) = command_rx.recv().await {
                match command {
                    Command::Send(packet) => match bincode::serialize(&packet) {
                        Ok(data) => {
                            if write.send(Message::Binary(data.into())).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => error!("Failed to encode packet: {}", e),
                    },
                    Command::Close => {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        });

        tokio::spawn(async move {
            while let Some(message) = read.next().await {
                match message {
                    Ok(Message::Binary(data)) => match bincode::deserialize::<Packet>(&data) {
                        Ok(packet) => {
                            if event_tx.send(Inbound::Packet(packet)).is_err() {
                                return;
                            }
                        }
                        Err(_) => warn!("Malformed frame from server"),
                    },
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
            let _ = event_tx.send(Inbound::ConnectionLost);
        });

        self.command_tx = Some(command_tx);
        self.event_rx = Some(event_rx);
        Ok(())
    }

    /// Tears the connection down. Handlers stay registered for a later
    /// reconnect; the recorded side assignment does not survive.
    pub fn disconnect(&mut self) {
        if let Some(tx) = self.command_tx.take() {
            let _ = tx.send(Command::Close);
        }
        self.event_rx = None;
        self.room_id = None;
        self.is_primary = None;
    }

    pub fn is_connected(&self) -> bool {
        self.command_tx.is_some()
    }

    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    /// The side assigned on the first successful create/join, if any.
    pub fn is_primary(&self) -> Option<bool> {
        self.is_primary
    }

    pub fn create_room(&self, paddle_y: f32) -> Result<(), SyncError> {
        self.send(Packet::CreateRoom { paddle_y })
    }

    pub fn join_room(&self, room_id: &str, paddle_y: f32) -> Result<(), SyncError> {
        self.send(Packet::JoinRoom {
            room_id: room_id.to_string(),
            paddle_y,
        })
    }

    pub fn list_rooms(&self) -> Result<(), SyncError> {
        self.send(Packet::ListRooms)
    }

    pub fn send_paddle(&self, y: f32) -> Result<(), SyncError> {
        self.send(Packet::PaddleMove { y })
    }

    pub fn send_ball(&self, ball: BallSnapshot) -> Result<(), SyncError> {
        self.send(Packet::BallUpdate { ball })
    }

    fn send(&self, packet: Packet) -> Result<(), SyncError> {
        let tx = self.command_tx.as_ref().ok_or(SyncError::NotConnected)?;
        tx.send(Command::Send(packet))
            .map_err(|_| SyncError::NotConnected)
    }

    pub fn on_room_created(&mut self, handler: impl FnMut(String) + 'static) {
        self.handlers.room_created = Some(Box::new(handler));
    }

    pub fn on_room_joined(&mut self, handler: impl FnMut(String) + 'static) {
        self.handlers.room_joined = Some(Box::new(handler));
    }

    pub fn on_roster_update(&mut self, handler: impl FnMut(Roster) + 'static) {
        self.handlers.roster_update = Some(Box::new(handler));
    }

    pub fn on_match_started(&mut self, handler: impl FnMut(bool) + 'static) {
        self.handlers.match_started = Some(Box::new(handler));
    }

    pub fn on_ball_sync(&mut self, handler: impl FnMut(BallSnapshot) + 'static) {
        self.handlers.ball_sync = Some(Box::new(handler));
    }

    pub fn on_peer_left(&mut self, handler: impl FnMut() + 'static) {
        self.handlers.peer_left = Some(Box::new(handler));
    }

    pub fn on_room_list(&mut self, handler: impl FnMut(Vec<String>) + 'static) {
        self.handlers.room_list = Some(Box::new(handler));
    }

    pub fn on_error(&mut self, handler: impl FnMut(ErrorKind, String) + 'static) {
        self.handlers.error = Some(Box::new(handler));
    }

    /// Drains buffered inbound packets and dispatches them to the
    /// registered handlers. Call once per frame.
    pub fn poll(&mut self) {
        let Some(mut rx) = self.event_rx.take() else {
            return;
        };

        let mut lost = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                Inbound::Packet(packet) => self.dispatch(packet),
                Inbound::ConnectionLost => {
                    lost = true;
                    break;
                }
            }
        }

        if lost {
            warn!("Connection to server lost");
            self.command_tx = None;
            self.room_id = None;
            self.is_primary = None;
        } else {
            self.event_rx = Some(rx);
        }
    }

    fn dispatch(&mut self, packet: Packet) {
        match packet {
            Packet::RoomAssigned {
                room_id,
                is_primary,
            } => {
                self.room_id = Some(room_id.clone());
                if self.is_primary.is_none() {
                    self.is_primary = Some(is_primary);
                } else if self.is_primary != Some(is_primary) {
                    warn!("Server tried to flip the side assignment; keeping the original");
                }

                if is_primary {
                    if let Some(handler) = self.handlers.room_created.as_mut() {
                        handler(room_id);
                    }
                } else if let Some(handler) = self.handlers.room_joined.as_mut() {
                    handler(room_id);
                }
            }
            Packet::RoomList { rooms } => {
                if let Some(handler) = self.handlers.room_list.as_mut() {
                    handler(rooms);
                }
            }
            Packet::RosterUpdate { roster } => {
                if let Some(handler) = self.handlers.roster_update.as_mut() {
                    handler(roster);
                }
            }
            Packet::MatchStarted { started } => {
                if let Some(handler) = self.handlers.match_started.as_mut() {
                    handler(started);
                }
            }
            Packet::BallSync { ball } => {
                if let Some(handler) = self.handlers.ball_sync.as_mut() {
                    handler(ball);
                }
            }
            Packet::PeerLeft => {
                if let Some(handler) = self.handlers.peer_left.as_mut() {
                    handler();
                }
            }
            Packet::Error { kind, message } => {
                if let Some(handler) = self.handlers.error.as_mut() {
                    handler(kind, message);
                }
            }
            other => warn!("Unexpected packet from server: {:?}", other),
        }
    }
}

impl Default for SyncClient {
    fn default() -> Self {
        Self::new()
    }
}
