//! # Game Client Library
//!
//! Client side of the two-player pong netplay protocol: matchmaking,
//! the live match loop, and the synchronization rules that keep two
//! machines agreeing on one ball.
//!
//! ## Architecture Overview
//!
//! The design splits authority instead of duplicating it. Each client
//! owns its paddle outright and publishes position changes; ball physics
//! run on exactly one side per match:
//!
//! ### Authority Split
//! The player who created the room is the primary and integrates ball
//! movement, collisions, and scoring, publishing snapshots on a fixed
//! cadence. The secondary adopts every snapshot wholesale and only
//! extrapolates between them, so the two simulations can drift in
//! smoothness but never in outcome.
//!
//! ### Frame-Loop Dispatch
//! All network events are buffered on a channel and handed to callbacks
//! from a single `poll()` call per frame. Nothing touches game state from
//! a background task, which keeps the whole screen layer single-threaded
//! and testable.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! The sync client: WebSocket connection, bincode packet framing,
//! command sending, and the single-slot event handler table.
//!
//! ### Game Module (`game`)
//! Match state and the authoritative simulation:
//! - Paddle movement with playfield clamping
//! - Primary-side ball physics and scoring
//! - Secondary-side snapshot adoption and extrapolation
//! - Match phase transitions and the post-match countdown
//!
//! ### Lobby Module (`lobby`)
//! Matchmaking screen state: the joinable-room list, room code entry,
//! and the actions they produce.
//!
//! ### Input Module (`input`)
//! Keyboard sampling with edge detection for menu actions.
//!
//! ### Rendering Module (`rendering`)
//! macroquad drawing for both screens, scaled from world units.

pub mod game;
pub mod input;
pub mod lobby;
pub mod network;
pub mod rendering;
