//! Room registry: the sole authority over room existence and membership
//!
//! All `Room` and `PlayerSession` records live here. The relay layer reads
//! and mutates them exclusively through the operations on [`RoomRegistry`];
//! nothing else in the process holds a copy. A connection belongs to at most
//! one room at a time, and a room with zero members is deleted, never kept
//! around empty.

use log::info;
use rand::Rng;
use shared::{BallSnapshot, Roster};
use std::collections::HashMap;
use thiserror::Error;

/// Opaque handle for one live connection, assigned by the relay.
pub type ConnectionId = u64;

const ROOM_ID_LEN: usize = 5;
// Besides the usual lookalikes (0/O, 1/I), C and R are excluded: the
// lobby binds them as create/refresh hotkeys, and codes must stay
// typeable there.
const ROOM_ID_CHARSET: &[u8] = b"ABDEFGHJKLMNPQSTUVWXYZ23456789";

/// Registry-level failures, reported to the requesting connection only.
/// The registry is left unchanged when these are returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("room {0} does not exist")]
    RoomNotFound(String),
    #[error("room {0} already has two players")]
    RoomFull(String),
}

/// One connected participant of a room.
#[derive(Debug, Clone)]
pub struct PlayerSession {
    pub connection_id: ConnectionId,
    /// Paddle center y. Only this axis is authoritative over the network;
    /// the horizontal offset is derived locally from the side assignment.
    pub paddle_y: f32,
    /// Fixes the left/right side assignment for the whole match.
    pub is_primary: bool,
}

/// One match: at most two members and the last known ball state.
#[derive(Debug)]
pub struct Room {
    pub id: String,
    members: Vec<PlayerSession>,
    /// Present only while `started`.
    pub ball: Option<BallSnapshot>,
    pub started: bool,
}

impl Room {
    fn new(id: String, creator: PlayerSession) -> Self {
        Self {
            id,
            members: vec![creator],
            ball: None,
            started: false,
        }
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn members(&self) -> &[PlayerSession] {
        &self.members
    }

    /// Both sides' paddle positions for roster broadcasts.
    pub fn roster(&self) -> Roster {
        let mut roster = Roster::default();
        for member in &self.members {
            if member.is_primary {
                roster.primary_y = Some(member.paddle_y);
            } else {
                roster.secondary_y = Some(member.paddle_y);
            }
        }
        roster
    }
}

/// Result of removing a connection from its room.
#[derive(Debug, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The connection was not a member of any room.
    NotMember,
    /// The last member left; the room was deleted.
    RoomClosed { room_id: String },
    /// One member remains; the match was stopped but the room persists so
    /// the remaining player can wait for a new opponent.
    MatchStopped {
        room_id: String,
        remaining: ConnectionId,
    },
}

/// Owns the room map and the connection-to-room bindings.
pub struct RoomRegistry {
    rooms: HashMap<String, Room>,
    bindings: HashMap<ConnectionId, String>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: HashMap::new(),
            bindings: HashMap::new(),
        }
    }

    /// Creates a room with the caller as its primary member and returns the
    /// fresh room id. The relay guarantees the caller is unbound.
    pub fn create_room(&mut self, connection_id: ConnectionId, paddle_y: f32) -> String {
        let room_id = self.generate_room_id();

        let creator = PlayerSession {
            connection_id,
            paddle_y,
            is_primary: true,
        };

        info!("Room {} created by connection {}", room_id, connection_id);
        self.rooms.insert(room_id.clone(), Room::new(room_id.clone(), creator));
        self.bindings.insert(connection_id, room_id.clone());

        room_id
    }

    /// Adds the caller as the secondary member of an existing room. The
    /// started flag flips to true exactly here, the moment the second
    /// member joins, and the ball is seeded with the fixed serve state.
    pub fn join_room(
        &mut self,
        connection_id: ConnectionId,
        room_id: &str,
        paddle_y: f32,
    ) -> Result<(), RegistryError> {
        let room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| RegistryError::RoomNotFound(room_id.to_string()))?;

        if room.member_count() >= 2 {
            return Err(RegistryError::RoomFull(room_id.to_string()));
        }

        room.members.push(PlayerSession {
            connection_id,
            paddle_y,
            is_primary: false,
        });
        room.started = true;
        room.ball = Some(BallSnapshot::serve());
        self.bindings.insert(connection_id, room_id.to_string());

        info!("Connection {} joined room {}, match started", connection_id, room_id);
        Ok(())
    }

    /// Removes the connection from whichever room it belongs to. Used for
    /// both explicit leaves and transport-level disconnects.
    pub fn leave(&mut self, connection_id: ConnectionId) -> LeaveOutcome {
        let Some(room_id) = self.bindings.remove(&connection_id) else {
            return LeaveOutcome::NotMember;
        };

        let Some(room) = self.rooms.get_mut(&room_id) else {
            return LeaveOutcome::NotMember;
        };

        room.members.retain(|m| m.connection_id != connection_id);

        if room.members.is_empty() {
            self.rooms.remove(&room_id);
            info!("Room {} closed (last member left)", room_id);
            return LeaveOutcome::RoomClosed { room_id };
        }

        // The match ends but the room is retained for the survivor, who is
        // promoted to primary so the one-primary invariant holds.
        room.started = false;
        room.ball = None;
        room.members[0].is_primary = true;
        let remaining = room.members[0].connection_id;

        info!("Match in room {} stopped, connection {} remains", room_id, remaining);
        LeaveOutcome::MatchStopped { room_id, remaining }
    }

    /// Rooms waiting for a second player, i.e. with exactly one member.
    /// No ordering is guaranteed.
    pub fn list_joinable(&self) -> Vec<String> {
        self.rooms
            .values()
            .filter(|room| room.member_count() == 1)
            .map(|room| room.id.clone())
            .collect()
    }

    /// Updates the caller's paddle position. Returns the owning room's id
    /// so the relay can broadcast the new roster, or `None` when the
    /// connection owns no room.
    pub fn update_paddle(&mut self, connection_id: ConnectionId, y: f32) -> Option<String> {
        let room_id = self.bindings.get(&connection_id)?;
        let room = self.rooms.get_mut(room_id)?;

        let member = room
            .members
            .iter_mut()
            .find(|m| m.connection_id == connection_id)?;
        member.paddle_y = y;

        Some(room.id.clone())
    }

    /// Stores a ball snapshot if the owning room is started; discarded
    /// silently otherwise so late messages from a just-ended match cannot
    /// resurrect state. Returns the room id when accepted.
    pub fn update_ball(
        &mut self,
        connection_id: ConnectionId,
        ball: BallSnapshot,
    ) -> Option<String> {
        let room_id = self.bindings.get(&connection_id)?;
        let room = self.rooms.get_mut(room_id)?;

        if !room.started {
            return None;
        }

        room.ball = Some(ball);
        Some(room.id.clone())
    }

    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    /// The room the connection is currently bound to, if any.
    pub fn room_of(&self, connection_id: ConnectionId) -> Option<&Room> {
        let room_id = self.bindings.get(&connection_id)?;
        self.rooms.get(room_id)
    }

    pub fn is_bound(&self, connection_id: ConnectionId) -> bool {
        self.bindings.contains_key(&connection_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Short shareable code, re-rolled until it misses every live room.
    fn generate_room_id(&self) -> String {
        let mut rng = rand::thread_rng();

        loop {
            let id: String = (0..ROOM_ID_LEN)
                .map(|_| {
                    let idx = rng.gen_range(0..ROOM_ID_CHARSET.len());
                    ROOM_ID_CHARSET[idx] as char
                })
                .collect();

            if !self.rooms.contains_key(&id) {
                return id;
            }
        }
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_create_room_single_primary_member() {
        let mut registry = RoomRegistry::new();
        let room_id = registry.create_room(1, 300.0);

        let room = registry.room(&room_id).unwrap();
        assert_eq!(room.member_count(), 1);
        assert!(room.members()[0].is_primary);
        assert_eq!(room.members()[0].connection_id, 1);
        assert!(!room.started);
        assert!(room.ball.is_none());
        assert!(registry.list_joinable().contains(&room_id));
    }

    #[test]
    fn test_room_ids_are_unique_and_well_formed() {
        let mut registry = RoomRegistry::new();
        let mut ids = Vec::new();

        for conn in 0..50 {
            ids.push(registry.create_room(conn, 300.0));
        }

        for id in &ids {
            assert_eq!(id.len(), 5);
            assert!(id.bytes().all(|b| ROOM_ID_CHARSET.contains(&b)));
            // Lobby hotkey letters never appear, so every code can be
            // typed into the join field.
            assert!(!id.contains('C') && !id.contains('R'));
        }

        let mut deduped = ids.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), ids.len());
    }

    #[test]
    fn test_join_starts_match_exactly_once() {
        let mut registry = RoomRegistry::new();
        let room_id = registry.create_room(1, 300.0);

        registry.join_room(2, &room_id, 450.0).unwrap();

        let room = registry.room(&room_id).unwrap();
        assert!(room.started);
        assert_eq!(room.member_count(), 2);
        let ball = room.ball.unwrap();
        assert_approx_eq!(ball.x, shared::WORLD_WIDTH / 2.0);
        assert_approx_eq!(ball.y, shared::WORLD_HEIGHT / 2.0);

        // Started rooms are no longer joinable.
        assert!(!registry.list_joinable().contains(&room_id));
    }

    #[test]
    fn test_join_unknown_room_leaves_registry_unchanged() {
        let mut registry = RoomRegistry::new();
        let room_id = registry.create_room(1, 300.0);

        let err = registry.join_room(2, "ZZZZZ", 450.0).unwrap_err();
        assert_eq!(err, RegistryError::RoomNotFound("ZZZZZ".to_string()));

        assert_eq!(registry.room_count(), 1);
        assert_eq!(registry.room(&room_id).unwrap().member_count(), 1);
        assert!(!registry.is_bound(2));
    }

    #[test]
    fn test_join_full_room_does_not_alter_membership() {
        let mut registry = RoomRegistry::new();
        let room_id = registry.create_room(1, 300.0);
        registry.join_room(2, &room_id, 450.0).unwrap();

        let err = registry.join_room(3, &room_id, 200.0).unwrap_err();
        assert_eq!(err, RegistryError::RoomFull(room_id.clone()));

        let room = registry.room(&room_id).unwrap();
        assert_eq!(room.member_count(), 2);
        assert!(room.started);
        assert!(!registry.is_bound(3));
    }

    #[test]
    fn test_exactly_one_primary_in_two_member_room() {
        let mut registry = RoomRegistry::new();
        let room_id = registry.create_room(1, 300.0);
        registry.join_room(2, &room_id, 450.0).unwrap();

        let room = registry.room(&room_id).unwrap();
        let primaries = room.members().iter().filter(|m| m.is_primary).count();
        assert_eq!(primaries, 1);
        assert!(room.members()[0].is_primary);
        assert!(!room.members()[1].is_primary);
    }

    #[test]
    fn test_leave_retains_room_for_survivor() {
        let mut registry = RoomRegistry::new();
        let room_id = registry.create_room(1, 300.0);
        registry.join_room(2, &room_id, 450.0).unwrap();

        let outcome = registry.leave(2);
        assert_eq!(
            outcome,
            LeaveOutcome::MatchStopped {
                room_id: room_id.clone(),
                remaining: 1,
            }
        );

        let room = registry.room(&room_id).unwrap();
        assert_eq!(room.member_count(), 1);
        assert!(!room.started);
        assert!(room.ball.is_none());
        // The survivor waits again and the room is joinable once more.
        assert!(registry.list_joinable().contains(&room_id));
    }

    #[test]
    fn test_primary_leave_promotes_survivor() {
        let mut registry = RoomRegistry::new();
        let room_id = registry.create_room(1, 300.0);
        registry.join_room(2, &room_id, 450.0).unwrap();

        let outcome = registry.leave(1);
        assert_eq!(
            outcome,
            LeaveOutcome::MatchStopped {
                room_id: room_id.clone(),
                remaining: 2,
            }
        );

        let room = registry.room(&room_id).unwrap();
        assert!(room.members()[0].is_primary);
        assert_eq!(room.members()[0].connection_id, 2);
    }

    #[test]
    fn test_last_leave_deletes_room() {
        let mut registry = RoomRegistry::new();
        let room_id = registry.create_room(1, 300.0);

        let outcome = registry.leave(1);
        assert_eq!(
            outcome,
            LeaveOutcome::RoomClosed {
                room_id: room_id.clone(),
            }
        );

        assert_eq!(registry.room_count(), 0);
        assert!(registry.list_joinable().is_empty());
        assert!(registry.room(&room_id).is_none());
    }

    #[test]
    fn test_leave_without_room_is_noop() {
        let mut registry = RoomRegistry::new();
        assert_eq!(registry.leave(99), LeaveOutcome::NotMember);
        assert_eq!(registry.room_count(), 0);
    }

    #[test]
    fn test_update_paddle() {
        let mut registry = RoomRegistry::new();
        let room_id = registry.create_room(1, 300.0);

        let updated = registry.update_paddle(1, 512.0);
        assert_eq!(updated, Some(room_id.clone()));

        let roster = registry.room(&room_id).unwrap().roster();
        assert_approx_eq!(roster.primary_y.unwrap(), 512.0);
        assert_eq!(roster.secondary_y, None);

        // Unbound connections are a no-op.
        assert_eq!(registry.update_paddle(42, 100.0), None);
    }

    #[test]
    fn test_ball_accepted_only_while_started() {
        let mut registry = RoomRegistry::new();
        let room_id = registry.create_room(1, 300.0);
        let ball = BallSnapshot::new(100.0, 100.0, 300.0, 300.0);

        // Not started yet: silently dropped.
        assert_eq!(registry.update_ball(1, ball), None);
        assert!(registry.room(&room_id).unwrap().ball.is_none());

        registry.join_room(2, &room_id, 450.0).unwrap();
        assert_eq!(registry.update_ball(1, ball), Some(room_id.clone()));
        assert_eq!(registry.room(&room_id).unwrap().ball, Some(ball));

        // Stale update after the match ended: dropped again.
        registry.leave(2);
        assert_eq!(registry.update_ball(1, ball), None);
        assert!(registry.room(&room_id).unwrap().ball.is_none());
    }

    #[test]
    fn test_joinable_listing_tracks_lifecycle() {
        let mut registry = RoomRegistry::new();
        let waiting = registry.create_room(1, 300.0);
        let full = registry.create_room(2, 300.0);
        registry.join_room(3, &full, 450.0).unwrap();

        let joinable = registry.list_joinable();
        assert_eq!(joinable, vec![waiting.clone()]);

        registry.leave(3);
        let mut joinable = registry.list_joinable();
        joinable.sort();
        let mut expected = vec![waiting, full];
        expected.sort();
        assert_eq!(joinable, expected);
    }
}
