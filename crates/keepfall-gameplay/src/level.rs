//! Level assembly: maze, tile geometry, doors, spawns and chests.

use keepfall_common::{KeepfallError, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::block::{block_grounds, opening_span, tile_rect, ExitMask};
use crate::ground::Ground;
use crate::items::Item;
use crate::maze::{ForcedWall, Maze};
use crate::physics::AABB;

/// Level generation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LevelError {
    /// Grid without cells
    #[error("Degenerate grid: {cols}x{rows}")]
    DegenerateGrid {
        /// Columns requested
        cols: u32,
        /// Rows requested
        rows: u32,
    },
}

/// Result type for level generation.
pub type LevelResult<T> = Result<T, LevelError>;

impl From<LevelError> for KeepfallError {
    fn from(err: LevelError) -> Self {
        KeepfallError::Level(err.to_string())
    }
}

/// Level layout tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// Grid columns
    pub cols: u32,
    /// Grid rows
    pub rows: u32,
    /// Tile width in pixels
    pub tile_width: f32,
    /// Tile height in pixels
    pub tile_height: f32,
    /// Wall thickness
    pub wall_thickness: f32,
    /// Floor thickness
    pub floor_thickness: f32,
    /// Width of vertical openings
    pub opening_width: f32,
    /// Chance of a chest per eligible tile, 0..1
    pub chest_spawn_chance: f32,
    /// Chance of an enemy per eligible tile, 0..1
    pub candle_spawn_chance: f32,
    /// Walls carving must keep, in addition to the outer boundary
    pub forced_walls: Vec<ForcedWall>,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            cols: 7,
            rows: 4,
            tile_width: 274.0,
            tile_height: 270.0,
            wall_thickness: 16.0,
            floor_thickness: 16.0,
            opening_width: 96.0,
            chest_spawn_chance: 0.3,
            candle_spawn_chance: 0.5,
            forced_walls: Vec::new(),
        }
    }
}

/// Door kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoorKind {
    /// Where the player starts
    Entry,
    /// Where the level ends
    Exit,
}

/// A door standing on a tile floor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Door {
    /// Entry or exit
    pub kind: DoorKind,
    /// Trigger area
    pub bounds: AABB,
}

/// A chest holding one item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Chest {
    /// Trigger area
    pub bounds: AABB,
    /// Contents
    pub loot: Item,
    /// Already opened
    pub opened: bool,
}

impl Chest {
    /// Open once; returns the loot the first time.
    pub fn open(&mut self) -> Option<Item> {
        if self.opened {
            return None;
        }
        self.opened = true;
        Some(self.loot)
    }
}

/// Size of a door trigger.
pub const DOOR_SIZE: Vec2 = Vec2::new(64.0, 96.0);
/// Size of a chest trigger.
pub const CHEST_SIZE: Vec2 = Vec2::new(128.0, 128.0);

const LOOT_TABLE: [Item; 4] = [
    Item::SMALL_HEALTH_POTION,
    Item::SMALL_MANA_POTION,
    Item::HealthAmulet { bonus: 20 },
    Item::DamageAmulet { bonus: 5 },
];

/// A generated level.
#[derive(Debug, Clone)]
pub struct Level {
    config: LevelConfig,
    maze: Maze,
    grounds: Vec<Ground>,
    doors: Vec<Door>,
    chests: Vec<Chest>,
    enemy_spawns: Vec<Vec2>,
}

impl Level {
    /// Generate a level from a seed.
    pub fn generate(config: &LevelConfig, seed: u64) -> LevelResult<Self> {
        let mut rng = fastrand::Rng::with_seed(seed);
        let maze =
            Maze::generate_with_forced(config.cols, config.rows, &config.forced_walls, &mut rng)?;
        let level = Self::from_maze(config, maze, &mut rng);
        info!(
            "Level generated: {}x{} tiles, {} grounds, {} chests, {} enemies (seed {})",
            config.cols,
            config.rows,
            level.grounds.len(),
            level.chests.len(),
            level.enemy_spawns.len(),
            seed
        );
        Ok(level)
    }

    /// Build geometry and contents for an existing maze.
    pub fn from_maze(config: &LevelConfig, maze: Maze, rng: &mut fastrand::Rng) -> Self {
        let mut level = Self {
            config: config.clone(),
            maze,
            grounds: Vec::new(),
            doors: Vec::new(),
            chests: Vec::new(),
            enemy_spawns: Vec::new(),
        };

        let entry = level.maze.entry();
        let exit = level.maze.exit();
        let cells: Vec<(u32, u32, ExitMask)> = level
            .maze
            .nodes()
            .iter()
            .map(|node| (node.x, node.y, node.exit_mask()))
            .collect();

        for (x, y, mask) in cells {
            let tile = tile_rect(x, y, config);
            level.grounds.extend(block_grounds(mask, x, y, config));

            if (x, y) == entry {
                level.doors.push(level.door(DoorKind::Entry, &tile));
            }
            if (x, y) == exit {
                level.doors.push(level.door(DoorKind::Exit, &tile));
            }

            if mask.has_vertical_exit() {
                continue;
            }
            if rng.f32() < config.chest_spawn_chance {
                let loot = LOOT_TABLE[rng.usize(..LOOT_TABLE.len())];
                level.chests.push(Chest {
                    bounds: AABB::from_rect(
                        tile.center().x - CHEST_SIZE.x / 2.0,
                        level.floor_top(&tile) - CHEST_SIZE.y,
                        CHEST_SIZE.x,
                        CHEST_SIZE.y,
                    ),
                    loot,
                    opened: false,
                });
            }
            if (x, y) != entry && rng.f32() < config.candle_spawn_chance {
                level.enemy_spawns.push(tile.center());
            }
        }

        let blocked = level.blocked_openings();
        if !blocked.is_empty() {
            warn!("{} maze openings are blocked by geometry", blocked.len());
        }
        debug!("Built {} grounds", level.grounds.len());
        level
    }

    fn floor_top(&self, tile: &AABB) -> f32 {
        tile.max_y - self.config.floor_thickness / 2.0
    }

    fn door(&self, kind: DoorKind, tile: &AABB) -> Door {
        let x = match kind {
            DoorKind::Entry => tile.min_x + self.config.wall_thickness + 8.0,
            DoorKind::Exit => tile.max_x - self.config.wall_thickness - 8.0 - DOOR_SIZE.x,
        };
        Door {
            kind,
            bounds: AABB::from_rect(
                x,
                self.floor_top(tile) - DOOR_SIZE.y,
                DOOR_SIZE.x,
                DOOR_SIZE.y,
            ),
        }
    }

    /// Layout tunables.
    #[must_use]
    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    /// Underlying maze.
    #[must_use]
    pub fn maze(&self) -> &Maze {
        &self.maze
    }

    /// All static geometry.
    #[must_use]
    pub fn grounds(&self) -> &[Ground] {
        &self.grounds
    }

    /// Entry and exit doors.
    #[must_use]
    pub fn doors(&self) -> &[Door] {
        &self.doors
    }

    /// Door of a kind.
    #[must_use]
    pub fn door_of(&self, kind: DoorKind) -> Option<&Door> {
        self.doors.iter().find(|door| door.kind == kind)
    }

    /// Chests.
    #[must_use]
    pub fn chests(&self) -> &[Chest] {
        &self.chests
    }

    /// Enemy spawn points: centers of the tiles enemies start in.
    #[must_use]
    pub fn enemy_spawns(&self) -> &[Vec2] {
        &self.enemy_spawns
    }

    /// Center of the entry tile, for the player spawn.
    #[must_use]
    pub fn player_spawn(&self) -> Vec2 {
        let (x, y) = self.maze.entry();
        tile_rect(x, y, &self.config).center()
    }

    /// World-space rectangle covering every tile.
    #[must_use]
    pub fn world_bounds(&self) -> AABB {
        AABB::from_rect(
            0.0,
            0.0,
            self.config.tile_width * self.config.cols as f32,
            self.config.tile_height * self.config.rows as f32,
        )
    }

    /// Open maze walls whose gap is covered by solid geometry.
    ///
    /// Returns the pairs of tiles on either side.
    #[must_use]
    pub fn blocked_openings(&self) -> Vec<((u32, u32), (u32, u32))> {
        const PROBE: f32 = 6.0;
        let config = &self.config;
        let mut blocked = Vec::new();

        for node in self.maze.nodes() {
            let tile = tile_rect(node.x, node.y, config);

            if !node.walls.right && node.x + 1 < self.maze.cols() {
                let probe = AABB::from_rect(
                    tile.max_x - PROBE / 2.0,
                    tile.min_y + config.tile_height * 0.1,
                    PROBE,
                    config.tile_height * 0.8,
                );
                if self.is_blocked(&probe) {
                    blocked.push(((node.x, node.y), (node.x + 1, node.y)));
                }
            }

            if !node.walls.bottom && node.y + 1 < self.maze.rows() {
                let (left, right) = opening_span(&tile, config);
                let probe = AABB::from_edges(
                    left + 1.0,
                    tile.max_y - PROBE / 2.0,
                    right - 1.0,
                    tile.max_y + PROBE / 2.0,
                );
                if self.is_blocked(&probe) {
                    blocked.push(((node.x, node.y), (node.x, node.y + 1)));
                }
            }
        }
        blocked
    }

    fn is_blocked(&self, probe: &AABB) -> bool {
        self.grounds
            .iter()
            .any(|ground| ground.blocks_movement() && ground.bounds.overlaps(probe))
    }
}
