//! Bounded search for a clear standing spot near a candidate position.
//!
//! The avatar hitbox is 2x3 tiles anchored at its top-left corner. A blocked
//! candidate is relocated to the first clear probe from a fixed offset table;
//! if none is clear the candidate comes back unchanged and the simulation's
//! own collision resolution has to push the avatar out.

use crate::grid::WorldGrid;
use crate::{Vec2, HITBOX_HEIGHT, HITBOX_TILES_TALL, HITBOX_TILES_WIDE, HITBOX_WIDTH, TILE_SIZE};

/// Per-axis probe offsets in tiles, smallest magnitude first.
pub const AXIS_OFFSETS: [f32; 9] = [0.0, -0.5, 0.5, -1.0, 1.0, -1.5, 1.5, -2.0, 2.0];

/// Every (dx, dy) pair except (0, 0).
pub const MAX_PROBES: usize = AXIS_OFFSETS.len() * AXIS_OFFSETS.len() - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Candidate was already clear.
    Clear,
    /// Candidate was blocked and a probe was used instead.
    Adjusted,
    /// Nothing in the probe set was clear; candidate returned unchanged.
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafeSpot {
    pub position: Vec2,
    pub outcome: SearchOutcome,
    /// Probes examined, excluding the candidate itself.
    pub probes: usize,
}

pub fn find_safe_position<G: WorldGrid + ?Sized>(grid: &G, candidate: Vec2) -> Vec2 {
    search_safe_position(grid, candidate).position
}

pub fn search_safe_position<G: WorldGrid + ?Sized>(grid: &G, candidate: Vec2) -> SafeSpot {
    if !candidate.is_finite() {
        return SafeSpot {
            position: candidate,
            outcome: SearchOutcome::Exhausted,
            probes: 0,
        };
    }

    if !is_blocked(grid, candidate) {
        return SafeSpot {
            position: candidate,
            outcome: SearchOutcome::Clear,
            probes: 0,
        };
    }

    let mut probes = 0;
    for (dx, dy) in probe_offsets() {
        probes += 1;
        let probe = candidate.offset(dx * TILE_SIZE, dy * TILE_SIZE);
        if !within_search_bounds(grid, probe) {
            continue;
        }
        if !is_blocked(grid, probe) {
            return SafeSpot {
                position: probe,
                outcome: SearchOutcome::Adjusted,
                probes,
            };
        }
    }

    SafeSpot {
        position: candidate,
        outcome: SearchOutcome::Exhausted,
        probes,
    }
}

/// True if any tile under the snapped hitbox is solid.
pub fn is_blocked<G: WorldGrid + ?Sized>(grid: &G, position: Vec2) -> bool {
    let tile_x = (position.x / TILE_SIZE).floor() as i32;
    let tile_y = (position.y / TILE_SIZE).floor() as i32;

    for dy in 0..HITBOX_TILES_TALL {
        for dx in 0..HITBOX_TILES_WIDE {
            if grid.is_solid(tile_x + dx, tile_y + dy) {
                return true;
            }
        }
    }
    false
}

/// Probes must keep one hitbox of clearance from every world edge.
fn within_search_bounds<G: WorldGrid + ?Sized>(grid: &G, position: Vec2) -> bool {
    let (width, height) = grid.bounds();
    position.x >= HITBOX_WIDTH
        && position.y >= HITBOX_HEIGHT
        && position.x + 2.0 * HITBOX_WIDTH <= width
        && position.y + 2.0 * HITBOX_HEIGHT <= height
}

fn probe_offsets() -> impl Iterator<Item = (f32, f32)> {
    AXIS_OFFSETS
        .iter()
        .flat_map(|&dx| AXIS_OFFSETS.iter().map(move |&dy| (dx, dy)))
        .filter(|&(dx, dy)| dx != 0.0 || dy != 0.0)
}
