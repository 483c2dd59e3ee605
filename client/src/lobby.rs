//! Matchmaking screen state
//!
//! Pure state machine: it consumes one [`FrameInput`] per frame and emits
//! at most one [`LobbyAction`] for the app shell to turn into a network
//! command. Room lists and errors flow back in through setters from the
//! sync client's handlers. No drawing or networking happens here, which
//! keeps the whole screen testable without a window.

use crate::input::FrameInput;

/// Matches the length of server-issued room codes.
pub const ROOM_CODE_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyAction {
    CreateRoom,
    JoinRoom(String),
    RefreshList,
}

pub struct LobbyState {
    rooms: Vec<String>,
    selected: usize,
    code_entry: String,
    status: Option<String>,
}

impl LobbyState {
    pub fn new() -> Self {
        Self {
            rooms: Vec::new(),
            selected: 0,
            code_entry: String::new(),
            status: None,
        }
    }

    pub fn rooms(&self) -> &[String] {
        &self.rooms
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn code_entry(&self) -> &str {
        &self.code_entry
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Replaces the joinable-room list, keeping the selection in range.
    pub fn set_rooms(&mut self, rooms: Vec<String>) {
        self.rooms = rooms;
        if self.selected >= self.rooms.len() {
            self.selected = self.rooms.len().saturating_sub(1);
        }
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    /// Folds one frame of input into the screen state. Typed characters
    /// build the room code field; a full code takes precedence over the
    /// list selection on confirm.
    ///
    /// The create/refresh hotkeys are evaluated before this frame's
    /// typing and only while the code field is empty. Server-issued codes
    /// never contain C or R, so once entry has begun those keys can only
    /// be stray presses, which land in the field instead of firing an
    /// action mid-code.
    pub fn handle_input(&mut self, input: &FrameInput) -> Option<LobbyAction> {
        if self.code_entry.is_empty() {
            if input.create {
                return Some(LobbyAction::CreateRoom);
            }
            if input.refresh {
                return Some(LobbyAction::RefreshList);
            }
        }

        for c in &input.typed {
            if self.code_entry.len() < ROOM_CODE_LEN {
                self.code_entry.push(*c);
            }
        }
        if input.backspace {
            self.code_entry.pop();
        }

        if input.up && self.selected > 0 {
            self.selected -= 1;
        }
        if input.down && self.selected + 1 < self.rooms.len() {
            self.selected += 1;
        }
        if input.confirm {
            if self.code_entry.len() == ROOM_CODE_LEN {
                let code = std::mem::take(&mut self.code_entry);
                return Some(LobbyAction::JoinRoom(code));
            }
            if let Some(room_id) = self.rooms.get(self.selected) {
                return Some(LobbyAction::JoinRoom(room_id.clone()));
            }
        }

        None
    }
}

impl Default for LobbyState {
    fn default() -> Self {
        Self::new()
    }
}
