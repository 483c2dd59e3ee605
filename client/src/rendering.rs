use crate::game::{EndReason, MatchPhase, MatchState};
use crate::lobby::LobbyState;
use macroquad::prelude::*;
use shared::{
    paddle_x, BALL_RADIUS, PADDLE_HEIGHT, PADDLE_WIDTH, WALL_THICKNESS, WORLD_HEIGHT, WORLD_WIDTH,
};

pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Renderer
    }

    pub fn render_lobby(&mut self, lobby: &LobbyState, connected: bool) {
        clear_background(Color::from_rgba(26, 26, 26, 255));

        draw_text("PONG NETPLAY", 40.0, 60.0, 48.0, WHITE);

        let connection_color = if connected { GREEN } else { RED };
        draw_rectangle(40.0, 80.0, 10.0, 10.0, connection_color);
        draw_text("server", 56.0, 90.0, 18.0, GRAY);

        draw_text(
            "[C] create room   [R] refresh list   [Enter] join   type a code to join directly",
            40.0,
            130.0,
            20.0,
            GRAY,
        );

        let code_display = format!("code: {}_", lobby.code_entry());
        draw_text(&code_display, 40.0, 170.0, 28.0, YELLOW);

        draw_text("open rooms", 40.0, 220.0, 24.0, WHITE);
        if lobby.rooms().is_empty() {
            draw_text("(none - create one)", 60.0, 250.0, 20.0, GRAY);
        }
        for (i, room_id) in lobby.rooms().iter().enumerate() {
            let y = 250.0 + (i as f32) * 26.0;
            let color = if i == lobby.selected() { GREEN } else { WHITE };
            let marker = if i == lobby.selected() { ">" } else { " " };
            draw_text(&format!("{} {}", marker, room_id), 60.0, y, 22.0, color);
        }

        if let Some(status) = lobby.status() {
            draw_text(status, 40.0, screen_height() - 30.0, 22.0, RED);
        }
    }

    pub fn render_match(&mut self, state: &MatchState, room_id: Option<&str>) {
        clear_background(Color::from_rgba(26, 26, 26, 255));

        // Uniform scale from world units to pixels, letterboxed.
        let scale = (screen_width() / WORLD_WIDTH).min(screen_height() / WORLD_HEIGHT);
        let off_x = (screen_width() - WORLD_WIDTH * scale) / 2.0;
        let off_y = (screen_height() - WORLD_HEIGHT * scale) / 2.0;
        let px = |x: f32| off_x + x * scale;
        let py = |y: f32| off_y + y * scale;

        let wall_color = Color::from_rgba(68, 68, 68, 255);
        draw_rectangle(
            px(0.0),
            py(0.0),
            WORLD_WIDTH * scale,
            WALL_THICKNESS * scale,
            wall_color,
        );
        draw_rectangle(
            px(0.0),
            py(WORLD_HEIGHT - WALL_THICKNESS),
            WORLD_WIDTH * scale,
            WALL_THICKNESS * scale,
            wall_color,
        );

        // Center line
        let mut y = WALL_THICKNESS;
        while y < WORLD_HEIGHT - WALL_THICKNESS {
            draw_rectangle(
                px(WORLD_WIDTH / 2.0 - 2.0),
                py(y),
                4.0 * scale,
                20.0 * scale,
                wall_color,
            );
            y += 40.0;
        }

        let local_is_primary = state.is_primary();
        self.draw_paddle(
            paddle_x(local_is_primary),
            state.local_paddle_y(),
            GREEN,
            scale,
            off_x,
            off_y,
        );
        self.draw_paddle(
            paddle_x(!local_is_primary),
            state.remote_paddle_y(),
            Color::from_rgba(255, 68, 68, 255),
            scale,
            off_x,
            off_y,
        );

        let ball = state.ball();
        draw_circle(px(ball.x), py(ball.y), BALL_RADIUS * scale, WHITE);

        let score_text = format!("{}  :  {}", state.local_score(), state.remote_score());
        draw_text(&score_text, px(WORLD_WIDTH / 2.0) - 40.0, 40.0, 36.0, WHITE);

        match state.phase() {
            MatchPhase::WaitingForPeer => {
                let message = match room_id {
                    Some(id) => format!("Waiting for opponent - share code {}", id),
                    None => "Waiting for opponent".to_string(),
                };
                self.draw_overlay(&message);
            }
            MatchPhase::Running => {}
            MatchPhase::Ended(reason) => {
                let headline = match reason {
                    EndReason::PeerLeft => "Opponent left".to_string(),
                    EndReason::Won if state.local_won() => "You win!".to_string(),
                    EndReason::Won => "You lose".to_string(),
                };
                let message = format!(
                    "{} - back to lobby in {}s",
                    headline,
                    state.countdown_remaining()
                );
                self.draw_overlay(&message);
            }
        }
    }

    fn draw_paddle(&mut self, x: f32, center_y: f32, color: Color, scale: f32, off_x: f32, off_y: f32) {
        draw_rectangle(
            off_x + x * scale,
            off_y + (center_y - PADDLE_HEIGHT / 2.0) * scale,
            PADDLE_WIDTH * scale,
            PADDLE_HEIGHT * scale,
            color,
        );
    }

    fn draw_overlay(&mut self, message: &str) {
        let width = screen_width();
        let height = screen_height();
        draw_rectangle(0.0, 0.0, width, height, Color::from_rgba(0, 0, 0, 160));

        let size = 32.0;
        let dims = measure_text(message, None, size as u16, 1.0);
        draw_text(
            message,
            (width - dims.width) / 2.0,
            height / 2.0,
            size,
            WHITE,
        );
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}
