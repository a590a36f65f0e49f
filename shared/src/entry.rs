//! Avatar entry: pick the candidate, make it safe, apply it, arm immunity.
//!
//! [`EntryOrchestrator::enter`] runs the whole sequence in one synchronous
//! call, so no damage event can be evaluated between the position being
//! applied and the immunity window being armed.

use crate::config::PersistenceConfig;
use crate::grid::WorldGrid;
use crate::immunity::ImmunityWindow;
use crate::safe_spot::{search_safe_position, SearchOutcome};
use crate::{Avatar, Tick, Vec2, UPWARD_NUDGE};
use log::{debug, info, warn};

/// Where an entering avatar's candidate position comes from.
pub trait ExitPositionSource {
    fn candidate(&self) -> Option<Vec2>;

    /// Called only after the candidate has been applied.
    fn consume(&mut self);
}

/// Position received from the session host in a restore message.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionRestore {
    position: Option<Vec2>,
}

impl SessionRestore {
    pub fn new(position: Vec2) -> Self {
        Self {
            position: Some(position),
        }
    }
}

impl ExitPositionSource for SessionRestore {
    fn candidate(&self) -> Option<Vec2> {
        self.position
    }

    fn consume(&mut self) {
        self.position = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryMode {
    Disabled,
    Local,
    Session,
}

impl EntryMode {
    /// Session authority wins whenever the host runs it; local is the fallback.
    pub fn resolve(config: &PersistenceConfig, session_available: bool) -> Self {
        if config.enable_session && session_available {
            EntryMode::Session
        } else if config.enable_local {
            EntryMode::Local
        } else {
            EntryMode::Disabled
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntryOutcome {
    NoRecord,
    Restored,
    RestoredAdjusted { from: Vec2 },
    /// Stored position lay outside the world; treated as corrupt data.
    DefaultSpawn { rejected: Vec2 },
}

impl EntryOutcome {
    /// Player-facing message, if any.
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            EntryOutcome::NoRecord => None,
            EntryOutcome::Restored => Some("restored"),
            EntryOutcome::RestoredAdjusted { .. } => Some("restored with adjustment"),
            EntryOutcome::DefaultSpawn { .. } => Some("could not restore, used default spawn"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryReport {
    pub outcome: EntryOutcome,
    pub position: Vec2,
}

impl EntryReport {
    pub fn notice(&self) -> Option<&'static str> {
        self.outcome.notice()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EntryOrchestrator {
    immunity_ticks: Tick,
}

impl EntryOrchestrator {
    pub fn new(config: &PersistenceConfig) -> Self {
        Self {
            immunity_ticks: config.immunity_ticks(),
        }
    }

    pub fn immunity_ticks(&self) -> Tick {
        self.immunity_ticks
    }

    pub fn enter<G, S>(
        &self,
        avatar: &mut Avatar,
        immunity: &mut ImmunityWindow,
        source: &mut S,
        grid: &G,
        now: Tick,
    ) -> EntryReport
    where
        G: WorldGrid + ?Sized,
        S: ExitPositionSource + ?Sized,
    {
        let outcome = match source.candidate() {
            None => {
                debug!("No exit position for {}, using default spawn", avatar.name);
                avatar.position = grid.spawn_point();
                EntryOutcome::NoRecord
            }
            Some(candidate) if !grid.contains(candidate) => {
                warn!(
                    "Exit position ({}, {}) for {} is outside the world, using default spawn",
                    candidate.x, candidate.y, avatar.name
                );
                avatar.position = grid.spawn_point();
                source.consume();
                EntryOutcome::DefaultSpawn {
                    rejected: candidate,
                }
            }
            Some(candidate) => {
                let spot = search_safe_position(grid, candidate);
                if spot.outcome == SearchOutcome::Exhausted {
                    debug!(
                        "No clear spot near ({}, {}) after {} probes, leaving it to collision",
                        candidate.x, candidate.y, spot.probes
                    );
                }

                avatar.position = spot.position.offset(0.0, -UPWARD_NUDGE);
                source.consume();

                if spot.outcome == SearchOutcome::Adjusted {
                    EntryOutcome::RestoredAdjusted { from: candidate }
                } else {
                    EntryOutcome::Restored
                }
            }
        };

        avatar.velocity = Vec2::ZERO;
        immunity.arm(now, self.immunity_ticks);

        info!(
            "{} entered at ({:.1}, {:.1}): {:?}",
            avatar.name, avatar.position.x, avatar.position.y, outcome
        );

        EntryReport {
            outcome,
            position: avatar.position,
        }
    }
}
