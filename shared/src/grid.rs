//! Read-only view of the tile world.
//!
//! The simulation owns terrain; the persistence core only ever asks whether a
//! cell is solid and where the world's default spawn is. [`TileGrid`] is a
//! plain dense implementation used by the host, the headless client and tests.

use crate::{Vec2, TILE_SIZE};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tile {
    #[default]
    Empty,
    Solid,
    /// Walk-through-top surface. Never blocks a standing hitbox.
    Platform,
}

pub trait WorldGrid {
    fn width_tiles(&self) -> i32;
    fn height_tiles(&self) -> i32;
    fn tile(&self, x: i32, y: i32) -> Tile;
    fn spawn_point(&self) -> Vec2;

    /// Cells outside the grid count as solid.
    fn is_solid(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x >= self.width_tiles() || y >= self.height_tiles() {
            return true;
        }
        self.tile(x, y) == Tile::Solid
    }

    /// World size in world units.
    fn bounds(&self) -> (f32, f32) {
        (
            self.width_tiles() as f32 * TILE_SIZE,
            self.height_tiles() as f32 * TILE_SIZE,
        )
    }

    fn contains(&self, position: Vec2) -> bool {
        let (width, height) = self.bounds();
        position.is_finite()
            && position.x >= 0.0
            && position.y >= 0.0
            && position.x < width
            && position.y < height
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileGrid {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
    spawn: Vec2,
}

impl TileGrid {
    pub fn new(width: i32, height: i32, spawn: Vec2) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        Self {
            width,
            height,
            tiles: vec![Tile::Empty; (width * height) as usize],
            spawn,
        }
    }

    /// Solid ground from `row` down to the bottom edge.
    pub fn with_floor(mut self, row: i32) -> Self {
        let height = self.height - row;
        self.fill_rect(0, row, self.width, height, Tile::Solid);
        self
    }

    pub fn set(&mut self, x: i32, y: i32, tile: Tile) {
        if let Some(index) = self.index(x, y) {
            self.tiles[index] = tile;
        }
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32, tile: Tile) {
        for ty in y..y + height {
            for tx in x..x + width {
                self.set(tx, ty, tile);
            }
        }
    }

    /// Flat world with 20 rows of ground and the spawn standing on it, centred.
    pub fn flat_world(width: i32, height: i32) -> Self {
        let ground = (height - 20).max(0);
        let spawn = Vec2::new(
            (width / 2) as f32 * TILE_SIZE,
            (ground - crate::HITBOX_TILES_TALL) as f32 * TILE_SIZE,
        );
        Self::new(width, height, spawn).with_floor(ground)
    }

    pub fn set_spawn(&mut self, spawn: Vec2) {
        self.spawn = spawn;
    }

    /// False when a deserialized grid's tile vector does not match its size.
    pub fn is_consistent(&self) -> bool {
        self.width >= 0
            && self.height >= 0
            && self.tiles.len() == (self.width as usize) * (self.height as usize)
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            None
        } else {
            Some((y * self.width + x) as usize)
        }
    }
}

impl WorldGrid for TileGrid {
    fn width_tiles(&self) -> i32 {
        self.width
    }

    fn height_tiles(&self) -> i32 {
        self.height
    }

    fn tile(&self, x: i32, y: i32) -> Tile {
        self.index(x, y)
            .and_then(|index| self.tiles.get(index).copied())
            .unwrap_or(Tile::Solid)
    }

    fn spawn_point(&self) -> Vec2 {
        self.spawn
    }
}
