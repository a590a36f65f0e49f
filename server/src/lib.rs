//! # Session Host Library
//!
//! This library provides the session host for the shared world. Besides
//! accepting avatar connections it is the session authority for exit
//! positions: it remembers where every named avatar was, persists that with
//! the world save, and hands the position back when the avatar returns.
//!
//! ## Core Responsibilities
//!
//! ### Session Authority
//! The host keeps one exit-position slot per avatar name. Slots are refreshed
//! on a fixed snapshot interval, captured on departure, and captured one last
//! time right before the world is written to disk, so an ungraceful stop
//! loses at most what happened since that final capture.
//!
//! ### Restore Protocol
//! When an avatar connects and the session holds a position for its name, the
//! host sends exactly one restore message with the stored position to that
//! connection. The client runs the safe-spot search, so it knows when the
//! position had to be adjusted. Nothing is broadcast and nothing is
//! acknowledged; a duplicate would reapply the same position. The slot is
//! consumed once the avatar reports its state for the first time, and until
//! then the avatar is left out of every capture.
//!
//! ### Client Management
//! Handles the lifecycle of client connections including:
//! - Connection establishment and avatar name ownership
//! - Avatar state updates reported by clients
//! - Disconnection and timeout handling, which trigger departure capture
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Event Loop
//! All session mutations happen on the tick-loop task. Network receive, send
//! and timeout checks run as separate tasks that only talk to the loop through
//! channels, so the exit-position store never needs its own lock.
//!
//! ### UDP-Based Communication
//! Transport packets are bincode-encoded `shared::Packet`s. Mod messages ride
//! inside `Packet::Mod` with their own fixed byte layout.
//!
//! ## Module Organization
//!
//! ### Client Manager Module (`client_manager`)
//! Connection tracking, name uniqueness, capacity limits and timeouts.
//!
//! ### Session Module (`session`)
//! Connected avatars, the session exit-position store, snapshot scheduling
//! and world persistence.
//!
//! ### Network Module (`network`)
//! UDP socket tasks, packet handling and the fixed-rate tick loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use server::session::SessionState;
//! use shared::{PersistenceConfig, TileGrid, WorldSave};
//! use std::path::PathBuf;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let world = WorldSave {
//!         world_name: "Forest".to_string(),
//!         grid: TileGrid::flat_world(400, 200),
//!         exit_positions: Default::default(),
//!     };
//!     let session = SessionState::new(world, &PersistenceConfig::default());
//!
//!     let mut server = Server::new(
//!         "127.0.0.1:8080",
//!         Duration::from_millis(16),
//!         16,
//!         session,
//!         PathBuf::from("world.json"),
//!     )
//!     .await?;
//!
//!     // Runs until Ctrl+C, then takes the final snapshot and saves the world.
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod network;
pub mod session;
