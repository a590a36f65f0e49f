//! Exit position kept in the avatar's own save data.
//!
//! Only the avatar's own process reads or writes this store. Loading never
//! clears the record; the entry orchestrator consumes it explicitly once the
//! restored position has actually been applied.

use crate::entry::ExitPositionSource;
use crate::persist::{self, PersistError};
use crate::{Avatar, Vec2};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitPositionRecord {
    pub position: Vec2,
    pub valid: bool,
}

/// On-disk shape of the record inside an avatar save.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExitPositionFields {
    pub has_exit_position: bool,
    pub exit_position_x: f32,
    pub exit_position_y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarSave {
    pub name: String,
    #[serde(flatten)]
    pub exit: ExitPositionFields,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalExitStore {
    record: Option<ExitPositionRecord>,
}

impl LocalExitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures the avatar's position on departure. Dead avatars leave no record.
    pub fn save(&mut self, avatar: &Avatar) -> Option<ExitPositionRecord> {
        if !avatar.alive || !avatar.position.is_finite() {
            debug!("{} left while dead, no exit position kept", avatar.name);
            self.record = None;
            return None;
        }

        let record = ExitPositionRecord {
            position: avatar.position,
            valid: true,
        };
        self.record = Some(record);
        Some(record)
    }

    pub fn load(&self) -> Option<ExitPositionRecord> {
        self.record.filter(|record| record.valid)
    }

    pub fn clear(&mut self) {
        if let Some(record) = self.record.as_mut() {
            record.valid = false;
        }
    }

    pub fn from_fields(fields: ExitPositionFields) -> Self {
        let position = Vec2::new(fields.exit_position_x, fields.exit_position_y);
        let record = (fields.has_exit_position && position.is_finite()).then_some(
            ExitPositionRecord {
                position,
                valid: true,
            },
        );
        Self { record }
    }

    pub fn to_fields(&self) -> ExitPositionFields {
        match self.load() {
            Some(record) => ExitPositionFields {
                has_exit_position: true,
                exit_position_x: record.position.x,
                exit_position_y: record.position.y,
            },
            None => ExitPositionFields::default(),
        }
    }

    /// Reads the avatar save at `path`. A missing or unreadable save yields an empty store.
    pub fn open(path: &Path) -> Result<Self, PersistError> {
        match persist::read_json::<AvatarSave>(path) {
            Ok(Some(save)) => Ok(Self::from_fields(save.exit)),
            Ok(None) => Ok(Self::new()),
            Err(PersistError::Parse(e)) => {
                warn!(
                    "Avatar save {} is corrupt ({}), ignoring exit position",
                    path.display(),
                    e
                );
                Ok(Self::new())
            }
            Err(e) => Err(e),
        }
    }

    pub fn persist(&self, path: &Path, name: &str) -> Result<(), PersistError> {
        let save = AvatarSave {
            name: name.to_string(),
            exit: self.to_fields(),
        };
        persist::write_json(path, &save)
    }
}

impl ExitPositionSource for LocalExitStore {
    fn candidate(&self) -> Option<Vec2> {
        self.load().map(|record| record.position)
    }

    fn consume(&mut self) {
        self.clear();
    }
}
