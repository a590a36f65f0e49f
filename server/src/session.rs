use log::{debug, info, warn};
use shared::{
    Avatar, ModMessage, PersistError, PersistenceConfig, SessionExitStore, SnapshotSchedule, Tick,
    TileGrid, Vec2, WorldGrid, WorldSave,
};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Host-side session: connected avatars plus the session's exit positions.
///
/// Everything here runs on the tick-loop task; nothing else touches the store.
///
/// A joining avatar sits at the spawn point until its client reports where
/// entry actually put it. Until then it is never captured and its name's slot
/// is left alone, so a lost restore or an early shutdown keeps the old record.
#[derive(Debug)]
pub struct SessionState {
    pub tick: Tick,
    world_name: String,
    grid: TileGrid,
    avatars: HashMap<u32, Avatar>,
    unreported: HashSet<u32>,
    exits: SessionExitStore,
    schedule: SnapshotSchedule,
    persistence_enabled: bool,
}

impl SessionState {
    pub fn new(world: WorldSave, config: &PersistenceConfig) -> Self {
        let exits = if config.enable_session {
            SessionExitStore::from_data(world.exit_positions)
        } else {
            SessionExitStore::new()
        };

        Self {
            tick: 0,
            world_name: world.world_name,
            grid: world.grid,
            avatars: HashMap::new(),
            unreported: HashSet::new(),
            exits,
            schedule: SnapshotSchedule::new(config.snapshot_interval_ticks(), 0),
            persistence_enabled: config.enable_session,
        }
    }

    pub fn persistence_enabled(&self) -> bool {
        self.persistence_enabled
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn exits(&self) -> &SessionExitStore {
        &self.exits
    }

    pub fn avatar(&self, client_id: u32) -> Option<&Avatar> {
        self.avatars.get(&client_id)
    }

    pub fn is_reported(&self, client_id: u32) -> bool {
        self.avatars.contains_key(&client_id) && !self.unreported.contains(&client_id)
    }

    /// Spawns the avatar at the world spawn and returns the restore message
    /// for this connection, if the session holds a position for its name.
    pub fn add_avatar(&mut self, client_id: u32, name: &str) -> Option<ModMessage> {
        let avatar = Avatar::new(name, self.grid.spawn_point());
        info!(
            "Added avatar {} for client {} at ({}, {})",
            name, client_id, avatar.position.x, avatar.position.y
        );
        self.avatars.insert(client_id, avatar);
        self.unreported.insert(client_id);

        if self.persistence_enabled {
            self.restore_for(name)
        } else {
            None
        }
    }

    /// Builds the restore message for `name` from the stored position as-is.
    /// The receiving client runs the safe-spot search, so it can tell whether
    /// the position had to be adjusted. The slot is consumed on the avatar's
    /// first state report, not here.
    pub fn restore_for(&self, name: &str) -> Option<ModMessage> {
        let stored = self.exits.get(name)?;
        info!("Restoring {} to ({:.1}, {:.1})", name, stored.x, stored.y);
        Some(ModMessage::restore(stored))
    }

    pub fn update_avatar(&mut self, client_id: u32, position: Vec2, velocity: Vec2, alive: bool) {
        let Some(avatar) = self.avatars.get_mut(&client_id) else {
            warn!("State update for unknown client {}", client_id);
            return;
        };

        avatar.position = position;
        avatar.velocity = velocity;
        avatar.alive = alive;

        if self.unreported.remove(&client_id)
            && self.persistence_enabled
            && self.exits.clear(&avatar.name).is_some()
        {
            debug!("Consumed session exit position for {}", avatar.name);
        }
    }

    /// Removes the avatar, capturing where it left.
    pub fn remove_avatar(&mut self, client_id: &u32) -> Option<Avatar> {
        let avatar = self.avatars.remove(client_id)?;
        let reported = !self.unreported.remove(client_id);
        if self.persistence_enabled && reported {
            self.exits.capture(&avatar);
        }
        info!("Removed avatar {} (client {})", avatar.name, client_id);
        Some(avatar)
    }

    /// Advances one tick and takes the periodic snapshot when it is due.
    pub fn advance(&mut self) {
        self.tick += 1;
        if self.persistence_enabled && self.schedule.due(self.tick) {
            self.exits
                .snapshot_all(reported(&self.avatars, &self.unreported));
        }
    }

    pub fn to_world_save(&self) -> WorldSave {
        WorldSave {
            world_name: self.world_name.clone(),
            grid: self.grid.clone(),
            exit_positions: self.exits.to_data(),
        }
    }

    /// Last-chance snapshot of every active avatar, then write the world save.
    pub fn persist(&mut self, path: &Path) -> Result<(), PersistError> {
        if self.persistence_enabled {
            let captured = self
                .exits
                .snapshot_all(reported(&self.avatars, &self.unreported));
            info!("Final snapshot captured {} avatars", captured);
        }
        self.to_world_save().save(path)?;
        info!("Saved world '{}' to {}", self.world_name, path.display());
        Ok(())
    }

    /// Session teardown: the in-memory store does not outlive the session.
    pub fn unload(&mut self) {
        self.avatars.clear();
        self.unreported.clear();
        self.exits.unload();
    }
}

/// Avatars whose client has reported at least once.
fn reported<'a>(
    avatars: &'a HashMap<u32, Avatar>,
    unreported: &'a HashSet<u32>,
) -> impl Iterator<Item = &'a Avatar> + 'a {
    avatars
        .iter()
        .filter(move |(id, _)| !unreported.contains(*id))
        .map(|(_, avatar)| avatar)
}
