//! Exit positions held by the session host, keyed by avatar name.
//!
//! The host is the only writer. Slots are created lazily on the first capture
//! of a name and overwritten in place after that, so the map only grows with
//! the number of distinct names seen during the session.

use crate::grid::TileGrid;
use crate::persist::{self, PersistError};
use crate::{Avatar, Tick, Vec2};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Parallel-array form stored inside the world save.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionExitData {
    pub names: Vec<String>,
    pub xs: Vec<f32>,
    pub ys: Vec<f32>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionExitStore {
    positions: HashMap<String, Vec2>,
}

impl SessionExitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lists of unequal length discard the whole set.
    pub fn from_data(data: SessionExitData) -> Self {
        if data.names.len() != data.xs.len() || data.names.len() != data.ys.len() {
            warn!(
                "Session exit positions are corrupt ({} names, {} xs, {} ys), discarding all",
                data.names.len(),
                data.xs.len(),
                data.ys.len()
            );
            return Self::new();
        }

        let positions = data
            .names
            .into_iter()
            .zip(data.xs.into_iter().zip(data.ys))
            .map(|(name, (x, y))| (name, Vec2::new(x, y)))
            .collect();
        Self { positions }
    }

    pub fn to_data(&self) -> SessionExitData {
        let mut entries: Vec<(&String, &Vec2)> = self.positions.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let mut data = SessionExitData::default();
        for (name, position) in entries {
            data.names.push(name.clone());
            data.xs.push(position.x);
            data.ys.push(position.y);
        }
        data
    }

    /// Records the current position of every active avatar. Dead avatars lose
    /// their slot instead, so a death before departure never restores.
    pub fn snapshot_all<'a, I>(&mut self, active_avatars: I) -> usize
    where
        I: IntoIterator<Item = &'a Avatar>,
    {
        let mut captured = 0;
        for avatar in active_avatars {
            if self.capture(avatar) {
                captured += 1;
            }
        }
        debug!("Session snapshot captured {} avatars", captured);
        captured
    }

    /// Returns false when nothing was written.
    pub fn capture(&mut self, avatar: &Avatar) -> bool {
        if !avatar.alive || !avatar.position.is_finite() {
            if self.positions.remove(&avatar.name).is_some() {
                debug!("Dropped exit position for dead avatar {}", avatar.name);
            }
            return false;
        }

        match self.positions.get_mut(&avatar.name) {
            Some(slot) => *slot = avatar.position,
            None => {
                self.positions.insert(avatar.name.clone(), avatar.position);
            }
        }
        true
    }

    pub fn get(&self, name: &str) -> Option<Vec2> {
        self.positions.get(name).copied()
    }

    pub fn clear(&mut self, name: &str) -> Option<Vec2> {
        self.positions.remove(name)
    }

    /// Drops everything when the session unloads.
    pub fn unload(&mut self) {
        self.positions.clear();
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Fixed-interval trigger for periodic snapshots.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotSchedule {
    interval: Tick,
    next_due: Tick,
}

impl SnapshotSchedule {
    pub fn new(interval: Tick, now: Tick) -> Self {
        let interval = interval.max(1);
        Self {
            interval,
            next_due: now.saturating_add(interval),
        }
    }

    pub fn due(&mut self, now: Tick) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due = now.saturating_add(self.interval);
        true
    }
}

/// World save shared by host and clients: terrain plus the session's exit positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSave {
    pub world_name: String,
    pub grid: TileGrid,
    #[serde(default)]
    pub exit_positions: SessionExitData,
}

impl WorldSave {
    pub fn load(path: &Path) -> Result<Option<Self>, PersistError> {
        let Some(save) = persist::read_json::<WorldSave>(path)? else {
            return Ok(None);
        };
        if !save.grid.is_consistent() {
            return Err(PersistError::InvalidWorld(format!(
                "tile count does not match grid size in {}",
                path.display()
            )));
        }
        info!(
            "Loaded world '{}' with {} stored exit positions",
            save.world_name,
            save.exit_positions.names.len()
        );
        Ok(Some(save))
    }

    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        persist::write_json(path, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn avatar(name: &str, x: f32, y: f32) -> Avatar {
        Avatar::new(name, Vec2::new(x, y))
    }

    #[test]
    fn test_snapshot_creates_and_overwrites() {
        let mut store = SessionExitStore::new();
        let mut guide = avatar("Guide", 10.0, 20.0);
        let merchant = avatar("Merchant", 30.0, 40.0);

        assert_eq!(store.snapshot_all([&guide, &merchant]), 2);
        assert_eq!(store.get("Guide"), Some(Vec2::new(10.0, 20.0)));

        guide.position = Vec2::new(11.0, 21.0);
        store.snapshot_all([&guide]);
        assert_eq!(store.get("Guide"), Some(Vec2::new(11.0, 21.0)));
        assert_eq!(store.get("Merchant"), Some(Vec2::new(30.0, 40.0)));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_dead_avatar_drops_slot() {
        let mut store = SessionExitStore::new();
        let mut guide = avatar("Guide", 500.0, 1200.0);
        store.snapshot_all([&guide]);

        guide.alive = false;
        assert_eq!(store.snapshot_all([&guide]), 0);
        assert!(store.get("Guide").is_none());
    }

    #[test]
    fn test_clear_and_unload() {
        let mut store = SessionExitStore::new();
        store.capture(&avatar("Guide", 1.0, 1.0));
        store.capture(&avatar("Merchant", 2.0, 2.0));

        assert_eq!(store.clear("Guide"), Some(Vec2::new(1.0, 1.0)));
        assert!(store.get("Guide").is_none());
        assert_eq!(store.clear("Guide"), None);

        store.unload();
        assert!(store.is_empty());
    }

    #[test]
    fn test_data_round_trip_sorted() {
        let mut store = SessionExitStore::new();
        store.capture(&avatar("Nurse", 5.0, 6.0));
        store.capture(&avatar("Guide", 1.0, 2.0));

        let data = store.to_data();
        assert_eq!(data.names, vec!["Guide".to_string(), "Nurse".to_string()]);
        assert_eq!(data.xs, vec![1.0, 5.0]);
        assert_eq!(data.ys, vec![2.0, 6.0]);

        let restored = SessionExitStore::from_data(data);
        assert_eq!(restored.get("Nurse"), Some(Vec2::new(5.0, 6.0)));
        assert_eq!(restored.len(), 2);
    }

    #[test]
    fn test_length_mismatch_discards_everything() {
        let data = SessionExitData {
            names: vec!["Guide".to_string(), "Nurse".to_string()],
            xs: vec![1.0, 2.0],
            ys: vec![3.0],
        };
        let store = SessionExitStore::from_data(data);
        assert!(store.is_empty());
        assert!(store.get("Guide").is_none());
    }

    #[test]
    fn test_schedule_fires_on_interval() {
        let mut schedule = SnapshotSchedule::new(10, 0);
        assert!(!schedule.due(9));
        assert!(schedule.due(10));
        assert!(!schedule.due(15));
        assert!(schedule.due(20));
    }

    #[test]
    fn test_world_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.json");

        let mut store = SessionExitStore::new();
        store.capture(&avatar("Guide", 500.0, 1200.0));
        let save = WorldSave {
            world_name: "Test".to_string(),
            grid: TileGrid::new(8, 8, Vec2::new(16.0, 16.0)),
            exit_positions: store.to_data(),
        };
        save.save(&path).unwrap();

        let loaded = WorldSave::load(&path).unwrap().unwrap();
        assert_eq!(loaded, save);
        assert!(WorldSave::load(&dir.path().join("missing.json"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_world_save_mismatched_lists_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.json");
        let json = r#"{
            "world_name": "Test",
            "grid": {"width": 1, "height": 1, "tiles": ["Empty"], "spawn": {"x": 0.0, "y": 0.0}},
            "exit_positions": {"names": ["Guide"], "xs": [], "ys": [1.0]}
        }"#;
        std::fs::write(&path, json).unwrap();

        let loaded = WorldSave::load(&path).unwrap().unwrap();
        assert!(SessionExitStore::from_data(loaded.exit_positions).is_empty());
    }
}
