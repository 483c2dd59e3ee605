//! # Relay Server Library
//!
//! Server side of the two-player pong netplay protocol. The server never
//! simulates the game: ball physics run on the primary client, and the
//! server's job is limited to matchmaking and message fan-out. Beyond
//! checking room membership and the started flag, game-state payloads are
//! relayed without inspection.
//!
//! ## Module Organization
//!
//! ### Registry (`registry`)
//! Single owner of all room and player-session records:
//! - Room creation with short shareable codes
//! - Join/leave lifecycle including the exactly-once match start
//! - Joinable-room listing and paddle/ball state updates
//!
//! ### Relay (`relay`)
//! Per-connection packet dispatch on top of the registry:
//! - Unbound/bound connection state machine
//! - Roster and start/stop broadcasts to room members
//! - Ball snapshot fan-out to non-senders only
//! - Shared cleanup path for disconnects and explicit leaves
//!
//! ### Network (`network`)
//! axum front door:
//! - `GET /ws` WebSocket upgrade with an origin allow-list
//! - `GET /rooms` JSON diagnostics endpoint
//! - bincode framing of [`shared::Packet`] over binary messages
//!
//! ## Concurrency Model
//!
//! A single [`relay::Relay`] value holds the registry and every
//! connection's outbound sender, guarded by one mutex. Each inbound packet
//! is handled to completion under that lock, so registry mutations never
//! interleave and every broadcast a handler produces is queued before the
//! next inbound packet is processed.

pub mod network;
pub mod registry;
pub mod relay;
