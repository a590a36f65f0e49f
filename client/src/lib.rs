//! # Avatar Client Library
//!
//! This library provides the avatar side of the shared world. It owns
//! everything that belongs to the avatar's own process: the avatar's save with
//! its local exit record, entry processing when the avatar joins a world, and
//! the spawn immunity window that protects it right after entry.
//!
//! ## Architecture Overview
//!
//! ### Local Authority
//! When the host does not run session persistence, the avatar's own save is
//! the exit-position authority. The record is captured on departure, consumed
//! on entry and written back to disk both times, so a stale position is never
//! applied twice.
//!
//! ### Session Authority
//! When the host does run it, the local record is ignored. The avatar enters
//! at the default spawn and the host follows up with at most one restore
//! message; applying it re-runs entry with the session position. Applying the
//! same message twice lands in the same place.
//!
//! ### Spawn Immunity
//! Every entry ends by arming the immunity window on the same tick the
//! position is applied. Incoming damage passes through [`game::LocalPlayer::on_damage`],
//! which drops blocked events before they touch life or velocity.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! Avatar state, entry processing, restore handling, damage interception and
//! the local exit record.
//!
//! ### Network Module (`network`)
//! Manages all client-server communication:
//! - UDP socket management and connection handling
//! - Packet serialization and deserialization
//! - Periodic avatar state reports
//! - Departure and avatar save on shutdown
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::game::LocalPlayer;
//! use client::network::Client;
//! use shared::{LocalExitStore, PersistenceConfig, TileGrid};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let save_path = PathBuf::from("guide.json");
//!     let local_exit = LocalExitStore::open(&save_path)?;
//!     let player = LocalPlayer::new("Guide", PersistenceConfig::default(), local_exit);
//!
//!     let mut client = Client::new(
//!         "127.0.0.1:8080",
//!         0,
//!         player,
//!         TileGrid::flat_world(400, 200),
//!         Some(save_path),
//!     )
//!     .await?;
//!
//!     // Runs until Ctrl+C, then saves the exit position and disconnects.
//!     client.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod network;
