//! Match state and the authority split
//!
//! Exactly one side of a match, the primary, integrates ball physics
//! against the paddles and publishes snapshots on a fixed cadence. The
//! secondary adopts every incoming snapshot wholesale and extrapolates
//! between them for presentation only (walls included, paddles never),
//! so a dropped or late snapshot degrades smoothness but never forks the
//! simulation. Goals are provisional bookkeeping on both sides: each
//! screen scores the ball it is currently showing, and the next
//! authoritative snapshot supersedes whatever the secondary guessed.
//!
//! Both sides own their local paddle unconditionally; the remote paddle
//! is whatever the last roster update said.

use shared::{
    bounce_walls, crossed_goal, deflect_off_paddle, step_ball, BallSnapshot, GoalLine, Roster,
    BALL_SERVE_SPEED, BALL_SYNC_INTERVAL, PADDLE_HEIGHT, PADDLE_SPEED, PEER_LEFT_GRACE_SECS,
    WALL_THICKNESS, WIN_SCORE, WORLD_HEIGHT,
};
use std::time::Instant;

/// Which screen the app is showing. A match screen owns its match state;
/// leaving it drops the whole simulation.
pub enum Screen {
    Lobby,
    Match(MatchState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    PeerLeft,
    Won,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    /// Room exists but the second player has not joined yet.
    WaitingForPeer,
    Running,
    /// Terminal. After a short on-screen countdown the app returns to
    /// matchmaking and reconnects fresh.
    Ended(EndReason),
}

pub struct MatchState {
    is_primary: bool,
    phase: MatchPhase,
    local_paddle_y: f32,
    remote_paddle_y: f32,
    ball: BallSnapshot,
    score_primary: u32,
    score_secondary: u32,
    /// Time since the primary last published a ball snapshot.
    sync_accumulator: f32,
    ended_at: Option<Instant>,
}

impl MatchState {
    pub fn new(is_primary: bool) -> Self {
        Self {
            is_primary,
            phase: MatchPhase::WaitingForPeer,
            local_paddle_y: WORLD_HEIGHT / 2.0,
            remote_paddle_y: WORLD_HEIGHT / 2.0,
            ball: BallSnapshot::serve(),
            score_primary: 0,
            score_secondary: 0,
            sync_accumulator: 0.0,
            ended_at: None,
        }
    }

    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn ball(&self) -> BallSnapshot {
        self.ball
    }

    pub fn local_paddle_y(&self) -> f32 {
        self.local_paddle_y
    }

    pub fn remote_paddle_y(&self) -> f32 {
        self.remote_paddle_y
    }

    pub fn scores(&self) -> (u32, u32) {
        (self.score_primary, self.score_secondary)
    }

    pub fn local_score(&self) -> u32 {
        if self.is_primary {
            self.score_primary
        } else {
            self.score_secondary
        }
    }

    pub fn remote_score(&self) -> u32 {
        if self.is_primary {
            self.score_secondary
        } else {
            self.score_primary
        }
    }

    pub fn local_won(&self) -> bool {
        self.local_score() >= WIN_SCORE
    }

    /// Applies a start/stop notification from the server.
    pub fn set_started(&mut self, started: bool) {
        if started {
            if self.phase == MatchPhase::WaitingForPeer {
                self.phase = MatchPhase::Running;
                self.ball = BallSnapshot::serve();
                self.sync_accumulator = 0.0;
            }
        } else if self.phase == MatchPhase::Running {
            self.end(EndReason::PeerLeft);
        }
    }

    pub fn peer_left(&mut self) {
        if !matches!(self.phase, MatchPhase::Ended(_)) {
            self.end(EndReason::PeerLeft);
        }
    }

    fn end(&mut self, reason: EndReason) {
        self.phase = MatchPhase::Ended(reason);
        self.ended_at = Some(Instant::now());
    }

    /// Whether the post-match countdown has run out.
    pub fn countdown_expired(&self) -> bool {
        match self.ended_at {
            Some(at) => at.elapsed().as_secs() >= PEER_LEFT_GRACE_SECS,
            None => false,
        }
    }

    /// Seconds left on the post-match countdown, for display.
    pub fn countdown_remaining(&self) -> u64 {
        match self.ended_at {
            Some(at) => PEER_LEFT_GRACE_SECS.saturating_sub(at.elapsed().as_secs()),
            None => PEER_LEFT_GRACE_SECS,
        }
    }

    /// Adopts the remote side's paddle position from a roster update. The
    /// local side's entry is ignored; the local paddle answers only to
    /// local input.
    pub fn apply_roster(&mut self, roster: Roster) {
        let remote = if self.is_primary {
            roster.secondary_y
        } else {
            roster.primary_y
        };
        if let Some(y) = remote {
            self.remote_paddle_y = y;
        }
    }

    /// Adopts an authoritative ball snapshot. Ignored on the primary,
    /// which never takes ball state from the network.
    pub fn adopt_snapshot(&mut self, ball: BallSnapshot) {
        if !self.is_primary {
            self.ball = ball;
        }
    }

    /// Moves the local paddle by `direction` (-1.0 up, 1.0 down, 0.0
    /// still), clamped to the playfield. Returns true when the position
    /// actually changed so the caller knows to publish it.
    pub fn move_paddle(&mut self, direction: f32, dt: f32) -> bool {
        if direction == 0.0 {
            return false;
        }

        let min = WALL_THICKNESS + PADDLE_HEIGHT / 2.0;
        let max = WORLD_HEIGHT - WALL_THICKNESS - PADDLE_HEIGHT / 2.0;
        let next = (self.local_paddle_y + direction * PADDLE_SPEED * dt).clamp(min, max);

        if next == self.local_paddle_y {
            return false;
        }
        self.local_paddle_y = next;
        true
    }

    /// Advances the ball one frame. On the primary this is the real
    /// simulation and may yield a snapshot to publish; on the secondary
    /// it extrapolates, books provisional goals, and never yields one.
    pub fn advance(&mut self, dt: f32) -> Option<BallSnapshot> {
        if self.phase != MatchPhase::Running {
            return None;
        }

        step_ball(&mut self.ball, dt);
        bounce_walls(&mut self.ball);

        if !self.is_primary {
            // Provisional scoring on the extrapolated ball; the next
            // snapshot overrides the serve placed here.
            if let Some(line) = crossed_goal(&self.ball) {
                self.record_goal(line);
            }
            return None;
        }

        // The primary's own paddle is the left one.
        let mut publish_now = deflect_off_paddle(&mut self.ball, self.local_paddle_y, true)
            || deflect_off_paddle(&mut self.ball, self.remote_paddle_y, false);

        if let Some(line) = crossed_goal(&self.ball) {
            self.record_goal(line);
            if matches!(self.phase, MatchPhase::Ended(_)) {
                return Some(self.ball);
            }
            publish_now = true;
        }

        self.sync_accumulator += dt;
        if publish_now || self.sync_accumulator >= BALL_SYNC_INTERVAL {
            self.sync_accumulator = 0.0;
            Some(self.ball)
        } else {
            None
        }
    }

    /// Books a goal and re-serves. Ends the match at the win score.
    fn record_goal(&mut self, line: GoalLine) {
        match line {
            GoalLine::Left => self.score_secondary += 1,
            GoalLine::Right => self.score_primary += 1,
        }

        self.ball = BallSnapshot::serve();

        if self.score_primary >= WIN_SCORE || self.score_secondary >= WIN_SCORE {
            self.end(EndReason::Won);
            return;
        }

        // Serve travels rightward after a left-line goal and leftward
        // after a right-line goal.
        self.ball.vel_x = match line {
            GoalLine::Left => BALL_SERVE_SPEED,
            GoalLine::Right => -BALL_SERVE_SPEED,
        };
    }
}
