//! Shared core for exit-position persistence and spawn safety.
//!
//! Holds the types both processes agree on (avatar, transport packets, tick
//! and tile constants) and the components that run on either side: the
//! safe-spot search, both exit-position stores, the restore codec, spawn
//! immunity and the entry orchestrator.

use serde::{Deserialize, Serialize};

pub mod config;
pub mod damage;
pub mod entry;
pub mod grid;
pub mod immunity;
pub mod local_store;
pub mod persist;
pub mod protocol;
pub mod safe_spot;
pub mod session_store;

pub use config::{BlockPolicy, ConfigError, PersistenceConfig};
pub use damage::{DamageCategory, DamageEvent, DamageSource, IncomingDamage};
pub use entry::{
    EntryMode, EntryOrchestrator, EntryOutcome, EntryReport, ExitPositionSource, SessionRestore,
};
pub use grid::{Tile, TileGrid, WorldGrid};
pub use immunity::{ImmunityCue, ImmunityWindow, LogCue, Verdict};
pub use local_store::{AvatarSave, ExitPositionFields, ExitPositionRecord, LocalExitStore};
pub use persist::PersistError;
pub use protocol::{ModMessage, ProtocolError};
pub use safe_spot::{find_safe_position, search_safe_position, SafeSpot, SearchOutcome};
pub use session_store::{SessionExitData, SessionExitStore, SnapshotSchedule, WorldSave};

pub type Tick = u64;

pub const TICKS_PER_SECOND: u32 = 60;
pub const TILE_SIZE: f32 = 16.0;
pub const HITBOX_TILES_WIDE: i32 = 2;
pub const HITBOX_TILES_TALL: i32 = 3;
pub const HITBOX_WIDTH: f32 = HITBOX_TILES_WIDE as f32 * TILE_SIZE;
pub const HITBOX_HEIGHT: f32 = HITBOX_TILES_TALL as f32 * TILE_SIZE;
/// Applied after a restore so the avatar does not re-embed in the floor.
pub const UPWARD_NUDGE: f32 = 3.2;
pub const DEFAULT_IMMUNITY_SECONDS: f32 = 3.0;
pub const DEFAULT_SNAPSHOT_INTERVAL_SECONDS: f32 = 60.0;
pub const PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn offset(&self, dx: f32, dy: f32) -> Vec2 {
        Vec2 {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Transport packets exchanged between the session host and avatar clients.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Connect {
        client_version: u32,
        avatar_name: String,
    },
    AvatarState {
        x: f32,
        y: f32,
        vel_x: f32,
        vel_y: f32,
        alive: bool,
    },
    Disconnect,

    Connected {
        client_id: u32,
        session_persistence: bool,
    },
    /// Opaque mod payload, see [`protocol::ModMessage`].
    Mod {
        payload: Vec<u8>,
    },
    Disconnected {
        reason: String,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Avatar {
    pub name: String,
    pub position: Vec2,
    pub velocity: Vec2,
    pub alive: bool,
}

impl Avatar {
    pub fn new(name: impl Into<String>, position: Vec2) -> Self {
        Self {
            name: name.into(),
            position,
            velocity: Vec2::ZERO,
            alive: true,
        }
    }

    pub fn get_bounds(&self) -> (f32, f32, f32, f32) {
        (
            self.position.x,
            self.position.y,
            self.position.x + HITBOX_WIDTH,
            self.position.y + HITBOX_HEIGHT,
        )
    }
}

/// Converts seconds of simulation time into whole ticks, never less than one.
pub fn seconds_to_ticks(seconds: f32) -> Tick {
    let ticks = (seconds.max(0.0) * TICKS_PER_SECOND as f32).round() as Tick;
    ticks.max(1)
}
