use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

pub const WORLD_WIDTH: f32 = 1024.0;
pub const WORLD_HEIGHT: f32 = 800.0;
pub const WALL_THICKNESS: f32 = 6.0;
pub const PADDLE_WIDTH: f32 = 20.0;
pub const PADDLE_HEIGHT: f32 = 200.0;
pub const PADDLE_SPEED: f32 = 300.0;
pub const BALL_RADIUS: f32 = 40.0;
pub const BALL_SERVE_SPEED: f32 = 300.0;
/// Seconds between ball snapshots published by the authority side.
pub const BALL_SYNC_INTERVAL: f32 = 0.05;
/// Seconds to wait after a peer disconnect before returning to matchmaking.
pub const PEER_LEFT_GRACE_SECS: u64 = 3;
pub const WIN_SCORE: u32 = 5;

/// Immutable 2D vector used by the ball and paddle math.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn scale(self, factor: f32) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
        }
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x - other.x, self.y - other.y)
    }
}

/// Last known ball position and velocity. Ephemeral: every snapshot fully
/// supersedes the previous one and nothing is ever persisted.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct BallSnapshot {
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
}

impl BallSnapshot {
    pub fn new(x: f32, y: f32, vel_x: f32, vel_y: f32) -> Self {
        Self { x, y, vel_x, vel_y }
    }

    /// The state a match starts (and restarts) from: centered, with the
    /// fixed initial velocity.
    pub fn serve() -> Self {
        Self::new(
            WORLD_WIDTH / 2.0,
            WORLD_HEIGHT / 2.0,
            BALL_SERVE_SPEED,
            BALL_SERVE_SPEED,
        )
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn velocity(&self) -> Vec2 {
        Vec2::new(self.vel_x, self.vel_y)
    }
}

/// Paddle y positions of both sides of a room, in side order. A side that
/// has no player yet is `None`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Roster {
    pub primary_y: Option<f32>,
    pub secondary_y: Option<f32>,
}

/// Registry failures reported back to the requesting connection only.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RoomNotFound,
    RoomFull,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    // client -> server
    ListRooms,
    CreateRoom {
        paddle_y: f32,
    },
    JoinRoom {
        room_id: String,
        paddle_y: f32,
    },
    PaddleMove {
        y: f32,
    },
    BallUpdate {
        ball: BallSnapshot,
    },

    // server -> client
    RoomAssigned {
        room_id: String,
        is_primary: bool,
    },
    RoomList {
        rooms: Vec<String>,
    },
    RosterUpdate {
        roster: Roster,
    },
    MatchStarted {
        started: bool,
    },
    BallSync {
        ball: BallSnapshot,
    },
    PeerLeft,
    Error {
        kind: ErrorKind,
        message: String,
    },
}

/// Which goal line the ball crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalLine {
    Left,
    Right,
}

/// Horizontal paddle placement is derived from the side assignment and
/// never travels over the network. The returned value is the paddle's
/// left edge.
pub fn paddle_x(is_primary: bool) -> f32 {
    if is_primary {
        PADDLE_WIDTH - WALL_THICKNESS
    } else {
        WORLD_WIDTH - PADDLE_WIDTH - WALL_THICKNESS
    }
}

/// Advances the ball along its velocity.
pub fn step_ball(ball: &mut BallSnapshot, dt: f32) {
    let pos = ball.position() + ball.velocity().scale(dt);
    ball.x = pos.x;
    ball.y = pos.y;
}

/// Reflects the ball off the top and bottom walls, clamping it back into
/// the playfield so it cannot tunnel out on a large step.
pub fn bounce_walls(ball: &mut BallSnapshot) {
    if ball.y - BALL_RADIUS < WALL_THICKNESS {
        ball.y = WALL_THICKNESS + BALL_RADIUS;
        ball.vel_y = -ball.vel_y;
    }

    if ball.y + BALL_RADIUS > WORLD_HEIGHT - WALL_THICKNESS {
        ball.y = WORLD_HEIGHT - WALL_THICKNESS - BALL_RADIUS;
        ball.vel_y = -ball.vel_y;
    }
}

/// Tests the ball against one side's paddle and deflects it on contact.
///
/// `paddle_y` is the paddle center. On a hit the ball is pushed clear of
/// the paddle face, its horizontal velocity reverses with a 10% speed-up,
/// and spin proportional to the contact offset is added. Returns whether
/// contact happened.
pub fn deflect_off_paddle(ball: &mut BallSnapshot, paddle_y: f32, is_primary: bool) -> bool {
    let px = paddle_x(is_primary);

    let overlaps = ball.x - BALL_RADIUS < px + PADDLE_WIDTH
        && ball.x + BALL_RADIUS > px
        && ball.y + BALL_RADIUS > paddle_y - PADDLE_HEIGHT / 2.0
        && ball.y - BALL_RADIUS < paddle_y + PADDLE_HEIGHT / 2.0;

    if !overlaps {
        return false;
    }

    ball.x = if is_primary {
        px + PADDLE_WIDTH + BALL_RADIUS
    } else {
        px - BALL_RADIUS
    };
    ball.vel_x = -1.1 * ball.vel_x;
    ball.vel_y += (ball.y - paddle_y) * 2.0;

    true
}

/// Reports the goal line the ball has fully crossed, if any.
pub fn crossed_goal(ball: &BallSnapshot) -> Option<GoalLine> {
    if ball.x < 0.0 {
        Some(GoalLine::Left)
    } else if ball.x > WORLD_WIDTH {
        Some(GoalLine::Right)
    } else {
        None
    }
}
