//! Tile geometry from an exit bitmask.
//!
//! Every tile is a box of walls with some sides opened. Walls and floors are
//! centered on tile boundaries so neighbouring tiles share them. Vertical
//! openings keep a short wall on each side of a centered gap, and a top
//! opening gets a ladder running down through the tile.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ground::Ground;
use crate::level::LevelConfig;
use crate::physics::AABB;

/// Set of open sides of a tile.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ExitMask(u8);

impl ExitMask {
    /// No exits.
    pub const NONE: Self = Self(0);
    /// Open to the left.
    pub const LEFT: Self = Self(1);
    /// Open upwards.
    pub const TOP: Self = Self(2);
    /// Open to the right.
    pub const RIGHT: Self = Self(4);
    /// Open downwards.
    pub const BOTTOM: Self = Self(8);

    /// Mask from raw bits; bits above the four sides are dropped.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0b1111)
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether every side of `other` is open here.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Open the sides of `other`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Whether the tile opens up or down.
    #[must_use]
    pub const fn has_vertical_exit(self) -> bool {
        self.0 & (Self::TOP.0 | Self::BOTTOM.0) != 0
    }
}

impl std::ops::BitOr for ExitMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for ExitMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_set();
        for (flag, name) in [
            (Self::LEFT, "LEFT"),
            (Self::TOP, "TOP"),
            (Self::RIGHT, "RIGHT"),
            (Self::BOTTOM, "BOTTOM"),
        ] {
            if self.contains(flag) {
                list.entry(&name);
            }
        }
        list.finish()
    }
}

/// World-space rectangle of a tile.
#[must_use]
pub fn tile_rect(tile_x: u32, tile_y: u32, config: &LevelConfig) -> AABB {
    AABB::from_rect(
        config.tile_width * tile_x as f32,
        config.tile_height * tile_y as f32,
        config.tile_width,
        config.tile_height,
    )
}

/// Horizontal span of the centered gap in a vertical opening.
#[must_use]
pub fn opening_span(tile: &AABB, config: &LevelConfig) -> (f32, f32) {
    let side = side_width(config);
    (tile.min_x + side, tile.min_x + side + config.opening_width)
}

fn side_width(config: &LevelConfig) -> f32 {
    ((config.tile_width - config.opening_width) / 2.0).max(0.0)
}

/// Build the grounds of one tile.
#[must_use]
pub fn block_grounds(
    mask: ExitMask,
    tile_x: u32,
    tile_y: u32,
    config: &LevelConfig,
) -> Vec<Ground> {
    let tile = tile_rect(tile_x, tile_y, config);
    let (x, y) = (tile.min_x, tile.min_y);
    let (w, h) = (config.tile_width, config.tile_height);
    let half = config.wall_thickness / 2.0;
    let wall = config.wall_thickness;
    let side = side_width(config);

    let mut grounds = Vec::with_capacity(6);

    // Floor, which doubles as the bottom wall.
    if mask.contains(ExitMask::BOTTOM) {
        let top = y + h - config.floor_thickness / 2.0;
        grounds.push(Ground::solid(x, top, side, config.floor_thickness));
        grounds.push(Ground::solid(
            x + side + config.opening_width,
            top,
            side,
            config.floor_thickness,
        ));
    } else {
        grounds.push(Ground::solid(
            x,
            y + h - config.floor_thickness / 2.0,
            w,
            config.floor_thickness,
        ));
    }

    if !mask.contains(ExitMask::LEFT) {
        grounds.push(Ground::solid(x - half, y, wall, h));
    }
    if !mask.contains(ExitMask::RIGHT) {
        grounds.push(Ground::solid(x + w - half, y, wall, h));
    }

    if mask.contains(ExitMask::TOP) {
        grounds.push(Ground::solid(x, y - half, side, wall));
        grounds.push(Ground::solid(x + side + config.opening_width, y - half, side, wall));
        grounds.push(Ground::ladder(
            x + side,
            y - config.floor_thickness,
            config.opening_width,
            h + config.floor_thickness,
        ));
    } else {
        grounds.push(Ground::solid(x, y - half, w, wall));
    }

    grounds
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_count(grounds: &[Ground]) -> usize {
        grounds.iter().filter(|g| g.blocks_movement()).count()
    }

    #[test]
    fn test_closed_tile_has_four_walls() {
        let config = LevelConfig::default();
        let grounds = block_grounds(ExitMask::NONE, 0, 0, &config);
        assert_eq!(grounds.len(), 4);
        assert_eq!(solid_count(&grounds), 4);

        let floor = &grounds[0];
        assert_eq!(floor.bounds.min_y, config.tile_height - 8.0);
        assert_eq!(floor.bounds.width(), config.tile_width);
    }

    #[test]
    fn test_side_exits_remove_walls() {
        let config = LevelConfig::default();
        let grounds = block_grounds(ExitMask::LEFT | ExitMask::RIGHT, 2, 1, &config);
        assert_eq!(grounds.len(), 2);
        let tile = tile_rect(2, 1, &config);
        assert!(grounds
            .iter()
            .all(|g| g.bounds.width() == config.tile_width && g.bounds.min_x == tile.min_x));
    }

    #[test]
    fn test_top_exit_adds_ladder_and_split_wall() {
        let config = LevelConfig::default();
        let grounds = block_grounds(ExitMask::TOP, 1, 1, &config);
        let ladders: Vec<_> = grounds.iter().filter(|g| g.ladder).collect();
        assert_eq!(ladders.len(), 1);

        let tile = tile_rect(1, 1, &config);
        let (gap_left, gap_right) = opening_span(&tile, &config);
        assert_eq!(ladders[0].bounds.min_x, gap_left);
        assert_eq!(ladders[0].bounds.max_x, gap_right);

        // Nothing solid covers the gap at the top boundary.
        let probe =
            AABB::from_edges(gap_left + 1.0, tile.min_y - 2.0, gap_right - 1.0, tile.min_y + 2.0);
        assert!(!grounds
            .iter()
            .any(|g| g.blocks_movement() && g.bounds.overlaps(&probe)));
    }

    #[test]
    fn test_bottom_exit_splits_floor() {
        let config = LevelConfig::default();
        let grounds = block_grounds(ExitMask::BOTTOM, 0, 0, &config);
        let tile = tile_rect(0, 0, &config);
        let (gap_left, gap_right) = opening_span(&tile, &config);
        let probe =
            AABB::from_edges(gap_left + 1.0, tile.max_y - 2.0, gap_right - 1.0, tile.max_y + 2.0);
        assert!(!grounds
            .iter()
            .any(|g| g.blocks_movement() && g.bounds.overlaps(&probe)));
        assert_eq!(solid_count(&grounds), 5);
    }

    #[test]
    fn test_mask_bits() {
        let mut mask = ExitMask::from_bits(0xFF);
        assert_eq!(mask.bits(), 0b1111);
        mask = ExitMask::LEFT;
        mask.insert(ExitMask::BOTTOM);
        assert!(mask.has_vertical_exit());
        assert!(!mask.contains(ExitMask::TOP));
        assert_eq!(format!("{mask:?}"), "{\"LEFT\", \"BOTTOM\"}");
    }
}
