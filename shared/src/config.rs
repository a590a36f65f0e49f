//! Persistence settings read from an optional JSON file.
//!
//! The core never owns a UI for these; binaries load them once at startup and
//! hand plain values down.

use crate::damage::DamageCategory;
use crate::{seconds_to_ticks, Tick, DEFAULT_IMMUNITY_SECONDS, DEFAULT_SNAPSHOT_INTERVAL_SECONDS};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    ReadError(#[source] std::io::Error),

    #[error("failed to write config: {0}")]
    WriteError(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    ParseError(#[source] serde_json::Error),

    #[error("failed to serialize config: {0}")]
    SerializeError(#[source] serde_json::Error),
}

/// Which damage categories the spawn immunity window swallows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockPolicy {
    pub environmental: bool,
    pub hostile_entity: bool,
    pub projectile: bool,
    pub other_avatar: bool,
}

impl Default for BlockPolicy {
    fn default() -> Self {
        Self {
            environmental: true,
            hostile_entity: true,
            projectile: true,
            other_avatar: true,
        }
    }
}

impl BlockPolicy {
    pub fn blocks(&self, category: DamageCategory) -> bool {
        match category {
            DamageCategory::Environmental => self.environmental,
            DamageCategory::HostileEntity => self.hostile_entity,
            DamageCategory::Projectile => self.projectile,
            DamageCategory::OtherAvatar => self.other_avatar,
        }
    }

    pub fn set(&mut self, category: DamageCategory, block: bool) {
        match category {
            DamageCategory::Environmental => self.environmental = block,
            DamageCategory::HostileEntity => self.hostile_entity = block,
            DamageCategory::Projectile => self.projectile = block,
            DamageCategory::OtherAvatar => self.other_avatar = block,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Keep an exit position in the avatar's own save.
    pub enable_local: bool,
    /// Let the session host keep and restore exit positions.
    pub enable_session: bool,
    /// Spawn immunity length, shared by both authorities.
    pub immunity_seconds: f32,
    /// Interval between periodic session snapshots.
    pub snapshot_interval_seconds: f32,
    pub block: BlockPolicy,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enable_local: true,
            enable_session: true,
            immunity_seconds: DEFAULT_IMMUNITY_SECONDS,
            snapshot_interval_seconds: DEFAULT_SNAPSHOT_INTERVAL_SECONDS,
            block: BlockPolicy::default(),
        }
    }
}

impl PersistenceConfig {
    pub fn immunity_ticks(&self) -> Tick {
        seconds_to_ticks(self.immunity_seconds)
    }

    pub fn snapshot_interval_ticks(&self) -> Tick {
        seconds_to_ticks(self.snapshot_interval_seconds)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config = serde_json::from_str(&contents).map_err(ConfigError::ParseError)?;
        log::info!("Loaded persistence config from {}", path.display());
        Ok(config)
    }

    /// Defaults when no path is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents =
            serde_json::to_string_pretty(self).map_err(ConfigError::SerializeError)?;
        std::fs::write(path, contents).map_err(ConfigError::WriteError)
    }
}
