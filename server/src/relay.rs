//! Session relay: bridges live connections to registry operations
//!
//! One [`Relay`] value exists per process, guarded by a single mutex in the
//! network layer. Every inbound packet is handled to completion while that
//! lock is held, so registry mutations are atomic with respect to each
//! other and the resulting broadcasts are observable before the next
//! inbound message is processed.
//!
//! Fan-out rules: roster and start/stop transitions go to all members of
//! the affected room; ball snapshots go to the *other* members only (the
//! sender already knows what it just sent); errors go to the offending
//! caller alone.

use crate::registry::{ConnectionId, LeaveOutcome, RegistryError, RoomRegistry};
use log::{debug, warn};
use shared::{ErrorKind, Packet};
use std::collections::HashMap;
use tokio::sync::mpsc;

pub struct Relay {
    registry: RoomRegistry,
    peers: HashMap<ConnectionId, mpsc::UnboundedSender<Packet>>,
    next_connection_id: ConnectionId,
}

impl Relay {
    pub fn new() -> Self {
        Self {
            registry: RoomRegistry::new(),
            peers: HashMap::new(),
            next_connection_id: 1,
        }
    }

    /// Registers a new connection and returns its handle. `tx` feeds the
    /// connection's writer task.
    pub fn register(&mut self, tx: mpsc::UnboundedSender<Packet>) -> ConnectionId {
        let connection_id = self.next_connection_id;
        self.next_connection_id += 1;
        self.peers.insert(connection_id, tx);
        debug!("Connection {} registered", connection_id);
        connection_id
    }

    /// Transport close and explicit leave funnel into the same path.
    pub fn disconnect(&mut self, connection_id: ConnectionId) {
        self.peers.remove(&connection_id);
        self.apply_leave(connection_id);
        debug!("Connection {} removed", connection_id);
    }

    /// Joinable room ids for the HTTP diagnostics endpoint.
    pub fn joinable_rooms(&self) -> Vec<String> {
        self.registry.list_joinable()
    }

    pub fn connection_count(&self) -> usize {
        self.peers.len()
    }

    /// Dispatches one inbound packet from a connection.
    pub fn handle_packet(&mut self, connection_id: ConnectionId, packet: Packet) {
        match packet {
            Packet::ListRooms => {
                let rooms = self.registry.list_joinable();
                self.send_to(connection_id, Packet::RoomList { rooms });
            }

            Packet::CreateRoom { paddle_y } => {
                // Duplicate create from a bound connection is a no-op;
                // prevents double-booking from duplicate UI events.
                if self.registry.is_bound(connection_id) {
                    warn!(
                        "Connection {} tried to create a room while already bound",
                        connection_id
                    );
                    return;
                }

                let room_id = self.registry.create_room(connection_id, paddle_y);
                self.send_to(
                    connection_id,
                    Packet::RoomAssigned {
                        room_id: room_id.clone(),
                        is_primary: true,
                    },
                );
                self.broadcast_roster(&room_id);
            }

            Packet::JoinRoom { room_id, paddle_y } => {
                if self.registry.is_bound(connection_id) {
                    warn!(
                        "Connection {} tried to join {} while already bound",
                        connection_id, room_id
                    );
                    return;
                }

                match self.registry.join_room(connection_id, &room_id, paddle_y) {
                    Ok(()) => {
                        self.send_to(
                            connection_id,
                            Packet::RoomAssigned {
                                room_id: room_id.clone(),
                                is_primary: false,
                            },
                        );
                        self.broadcast_roster(&room_id);
                        self.broadcast_room(&room_id, Packet::MatchStarted { started: true }, None);
                    }
                    Err(err) => {
                        let kind = match err {
                            RegistryError::RoomNotFound(_) => ErrorKind::RoomNotFound,
                            RegistryError::RoomFull(_) => ErrorKind::RoomFull,
                        };
                        self.send_to(
                            connection_id,
                            Packet::Error {
                                kind,
                                message: err.to_string(),
                            },
                        );
                    }
                }
            }

            Packet::PaddleMove { y } => {
                // No-op while unbound.
                if let Some(room_id) = self.registry.update_paddle(connection_id, y) {
                    self.broadcast_roster(&room_id);
                }
            }

            Packet::BallUpdate { ball } => {
                // The registry drops snapshots for rooms that are not
                // started; nothing is relayed in that case.
                if let Some(room_id) = self.registry.update_ball(connection_id, ball) {
                    self.broadcast_room(&room_id, Packet::BallSync { ball }, Some(connection_id));
                }
            }

            other => {
                warn!(
                    "Unexpected packet from connection {}: {:?}",
                    connection_id, other
                );
            }
        }
    }

    fn apply_leave(&mut self, connection_id: ConnectionId) {
        match self.registry.leave(connection_id) {
            LeaveOutcome::MatchStopped { room_id, remaining } => {
                self.send_to(remaining, Packet::PeerLeft);
                self.send_to(remaining, Packet::MatchStarted { started: false });
                self.broadcast_roster(&room_id);
            }
            LeaveOutcome::RoomClosed { .. } | LeaveOutcome::NotMember => {}
        }
    }

    fn broadcast_roster(&self, room_id: &str) {
        if let Some(room) = self.registry.room(room_id) {
            let roster = room.roster();
            self.broadcast_room(room_id, Packet::RosterUpdate { roster }, None);
        }
    }

    fn broadcast_room(&self, room_id: &str, packet: Packet, exclude: Option<ConnectionId>) {
        let Some(room) = self.registry.room(room_id) else {
            return;
        };

        for member in room.members() {
            if Some(member.connection_id) == exclude {
                continue;
            }
            self.send_to(member.connection_id, packet.clone());
        }
    }

    fn send_to(&self, connection_id: ConnectionId, packet: Packet) {
        if let Some(tx) = self.peers.get(&connection_id) {
            // A closed channel means the writer task is already gone; the
            // read loop will notice the close and clean up.
            if tx.send(packet).is_err() {
                debug!("Dropping packet for closed connection {}", connection_id);
            }
        }
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new()
    }
}
