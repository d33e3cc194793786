//! # Maze Escape Client Library
//!
//! Client-side implementation of the multiplayer maze-escape game. The server
//! owns the maze, the roster and the round; this crate keeps a local copy of
//! that world consistent with the packets the server pushes, while letting
//! keyboard input drive the one player this client is authoritative for.
//!
//! ## Architecture Overview
//!
//! ### Server Authority
//! The grid, the set of remote players and the round outcome all come from
//! the server. The client never invents or patches them; it replaces the grid
//! wholesale on every sync or regeneration and copies remote snapshots
//! verbatim.
//!
//! ### Local Authority
//! The local player is the exception. Its position and facing are produced
//! here from input and sent outward as `Move` packets. Replication traffic
//! for the local id is ignored, so the player is never yanked back by its own
//! echo.
//!
//! ### Round Lifecycle
//! Each maze is one round: `Active` until somebody escapes, `Escaped` until
//! the server regenerates the map, then `Active` again. Reaching the gate is
//! reported at most once per round no matter how long the player stands on
//! it.
//!
//! ## Module Organization
//!
//! ### Sync Module (`sync`)
//! The `SyncEngine` dispatches every inbound packet to its handler and
//! returns the packets to send back. It defines the `PresentationHooks`
//! trait the rendering layer implements.
//!
//! ### World Module (`world`)
//! Grid storage, wall and gate geometry, spawn selection.
//!
//! ### Players Module (`players`)
//! Insertion-ordered roster with a handle to the local player.
//!
//! ### Round Module (`round`)
//! The escape/regeneration state machine and gate-contact edge detection.
//!
//! ### Game Module (`game`)
//! Local movement: turning, walking, wall blocking.
//!
//! ### Network Module (`network`)
//! The `EventChannel` seam, a UDP transport on background tokio tasks, and
//! the `Session` that pumps packets through the engine each frame.
//!
//! ### Input, Rendering and Config
//! Keyboard sampling and a top-down macroquad view, plus the command-line
//! options.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::{PacketChannel, Session};
//! use client::sync::{LocalProfile, NoopHooks, SyncEngine};
//! use client::game::MoveInput;
//!
//! let (channel, _server) = PacketChannel::pair();
//! let profile = LocalProfile { name: "ana".into(), color: "red".into() };
//! let mut session = Session::new(channel, SyncEngine::new(profile, None));
//!
//! session.start()?;
//! loop {
//!     // Apply everything the server sent since the last frame
//!     session.pump(&mut NoopHooks);
//!
//!     // Move the local player and report gate contact
//!     session.tick(&MoveInput::default(), 1.0 / 60.0);
//! }
//! # Ok::<(), client::network::ChannelError>(())
//! ```
//!
//! ## Concurrency
//!
//! Everything that touches game state runs on the frame loop. Only socket
//! I/O lives on tokio tasks, and it exchanges already-decoded packets with
//! the frame loop over channels. Handlers always run to completion before
//! the next packet or frame is processed.

pub mod config;
pub mod game;
pub mod input;
pub mod network;
pub mod players;
pub mod rendering;
pub mod round;
pub mod sync;
pub mod world;
