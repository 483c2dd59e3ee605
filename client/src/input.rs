//! Keyboard sampling with per-key edge detection
//!
//! Paddle movement is level-sampled every frame; menu actions and list
//! navigation fire once per physical key press.

use macroquad::prelude::*;

/// Everything the current frame's keyboard state amounts to.
#[derive(Debug, Default, Clone)]
pub struct FrameInput {
    /// Held movement: -1.0 up, 1.0 down, 0.0 still.
    pub paddle_direction: f32,

    // Edge-detected presses
    pub up: bool,
    pub down: bool,
    pub create: bool,
    pub confirm: bool,
    pub refresh: bool,
    pub back: bool,
    pub backspace: bool,

    /// Characters typed this frame, normalized for the room code field.
    pub typed: Vec<char>,
}

pub struct InputManager {
    prev_up: bool,
    prev_down: bool,
    prev_c: bool,
    prev_enter: bool,
    prev_r: bool,
    prev_escape: bool,
    prev_backspace: bool,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            prev_up: false,
            prev_down: false,
            prev_c: false,
            prev_enter: false,
            prev_r: false,
            prev_escape: false,
            prev_backspace: false,
        }
    }

    /// Samples the keyboard once. Call exactly once per frame so edge
    /// detection lines up with the frame loop.
    pub fn update(&mut self) -> FrameInput {
        // Support both WASD and arrow keys
        let up_held = is_key_down(KeyCode::W) || is_key_down(KeyCode::Up);
        let down_held = is_key_down(KeyCode::S) || is_key_down(KeyCode::Down);

        let key_c = is_key_down(KeyCode::C);
        let key_enter = is_key_down(KeyCode::Enter);
        let key_r = is_key_down(KeyCode::R);
        let key_escape = is_key_down(KeyCode::Escape);
        let key_backspace = is_key_down(KeyCode::Backspace);

        let mut typed = Vec::new();
        while let Some(c) = get_char_pressed() {
            if c.is_ascii_alphanumeric() {
                typed.push(c.to_ascii_uppercase());
            }
        }

        let input = FrameInput {
            paddle_direction: direction(up_held, down_held),
            up: up_held && !self.prev_up,
            down: down_held && !self.prev_down,
            create: key_c && !self.prev_c,
            confirm: key_enter && !self.prev_enter,
            refresh: key_r && !self.prev_r,
            back: key_escape && !self.prev_escape,
            backspace: key_backspace && !self.prev_backspace,
            typed,
        };

        self.prev_up = up_held;
        self.prev_down = down_held;
        self.prev_c = key_c;
        self.prev_enter = key_enter;
        self.prev_r = key_r;
        self.prev_escape = key_escape;
        self.prev_backspace = key_backspace;

        input
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Opposed keys cancel out instead of favoring one side.
fn direction(up: bool, down: bool) -> f32 {
    match (up, down) {
        (true, false) => -1.0,
        (false, true) => 1.0,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_resolution() {
        assert_eq!(direction(true, false), -1.0);
        assert_eq!(direction(false, true), 1.0);
        assert_eq!(direction(false, false), 0.0);
        assert_eq!(direction(true, true), 0.0);
    }

    #[test]
    fn test_frame_input_defaults_idle() {
        let input = FrameInput::default();
        assert_eq!(input.paddle_direction, 0.0);
        assert!(!input.confirm);
        assert!(input.typed.is_empty());
    }
}
