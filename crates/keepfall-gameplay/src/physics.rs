//! Character physics primitives.
//!
//! This module provides the AABB type shared by collision, combat and line of
//! sight, the per-tick contact flags, and penetration-depth resolution of a
//! moving box against a static one.

use keepfall_common::Vec2;
use serde::{Deserialize, Serialize};

use crate::ground::Ground;

/// Axis-aligned box in world pixels, y down.
///
/// Character bounds, grounds, attack boxes and sight probes are all `AABB`s.
/// Overlap is strict: boxes that only share an edge are resting on each
/// other, not colliding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AABB {
    /// Left edge
    pub min_x: f32,
    /// Top edge
    pub min_y: f32,
    /// Right edge
    pub max_x: f32,
    /// Bottom edge
    pub max_y: f32,
}

impl AABB {
    /// Box from its four edges.
    #[must_use]
    pub const fn from_edges(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            min_x: left,
            min_y: top,
            max_x: right,
            max_y: bottom,
        }
    }

    /// Box from a top-left corner and a size.
    #[must_use]
    pub fn from_rect(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self::from_edges(left, top, left + width, top + height)
    }

    /// Box centered on `center` with half-extents `half`.
    #[must_use]
    pub fn around(center: Vec2, half: Vec2) -> Self {
        Self::from_edges(
            center.x - half.x,
            center.y - half.y,
            center.x + half.x,
            center.y + half.y,
        )
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.min_x + self.max_x) * 0.5,
            (self.min_y + self.max_y) * 0.5,
        )
    }

    /// Horizontal extent.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    /// Vertical extent.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    /// Strict overlap; shared edges do not count.
    #[must_use]
    pub fn overlaps(&self, other: &AABB) -> bool {
        let overlap = self.axis_overlap(other);
        overlap.x > 0.0 && overlap.y > 0.0
    }

    /// The box pulled in by `skin` on every side.
    #[must_use]
    pub fn shrunk(&self, skin: f32) -> Self {
        Self::from_edges(
            self.min_x + skin,
            self.min_y + skin,
            self.max_x - skin,
            self.max_y - skin,
        )
    }

    /// Length of the shared span on each axis; negative values are gaps.
    #[must_use]
    pub fn axis_overlap(&self, other: &AABB) -> Vec2 {
        Vec2::new(
            self.max_x.min(other.max_x) - self.min_x.max(other.min_x),
            self.max_y.min(other.max_y) - self.min_y.max(other.min_y),
        )
    }

    /// Shortest translation that moves `self` out of `other`.
    ///
    /// Only one axis is nonzero; vertical wins ties so characters standing in
    /// a corner are lifted rather than shoved sideways.
    #[must_use]
    pub fn penetration(&self, other: &AABB) -> Option<Vec2> {
        if !self.overlaps(other) {
            return None;
        }
        let x = shortest_exit(self.min_x, self.max_x, other.min_x, other.max_x);
        let y = shortest_exit(self.min_y, self.max_y, other.min_y, other.max_y);
        Some(if x.abs() < y.abs() {
            Vec2::new(x, 0.0)
        } else {
            Vec2::new(0.0, y)
        })
    }
}

/// Signed push along one axis: back past `other_min` or forward past `other_max`.
fn shortest_exit(min: f32, max: f32, other_min: f32, other_max: f32) -> f32 {
    let back = max - other_min;
    let forward = other_max - min;
    if back < forward {
        -back
    } else {
        forward
    }
}

/// Side of a moving box that touched solid geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContactSide {
    /// Head against a ceiling
    Top,
    /// Feet on a floor
    Bottom,
    /// Left side against a wall
    Left,
    /// Right side against a wall
    Right,
}

/// Per-tick contact flags, recomputed from scratch every update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContactFlags {
    /// Touching something above
    pub top: bool,
    /// Touching something below
    pub bottom: bool,
    /// Touching something on the left
    pub left: bool,
    /// Touching something on the right
    pub right: bool,
}

impl ContactFlags {
    /// Raises the flag for one side.
    pub fn set(&mut self, side: ContactSide) {
        match side {
            ContactSide::Top => self.top = true,
            ContactSide::Bottom => self.bottom = true,
            ContactSide::Left => self.left = true,
            ContactSide::Right => self.right = true,
        }
    }

    /// Flags in `[top, bottom, left, right]` order.
    #[must_use]
    pub fn as_array(&self) -> [bool; 4] {
        [self.top, self.bottom, self.left, self.right]
    }

    /// True when any side is in contact.
    #[must_use]
    pub fn any(&self) -> bool {
        self.top || self.bottom || self.left || self.right
    }
}

/// Result of resolving one moving box against one solid box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundContact {
    /// Side of the moving box in contact
    pub side: ContactSide,
    /// Translation to apply to the moving box (zero for resting contact)
    pub push: Vec2,
}

/// Resolves `mover` against a single solid box.
///
/// A strict overlap is pushed out along the axis of minimum penetration.
/// Faces that touch within `skin` (with real overlap along the face) report
/// contact without moving, so a character resting on a floor stays grounded
/// from one tick to the next.
#[must_use]
pub fn resolve_penetration(mover: &AABB, solid: &AABB, skin: f32) -> Option<GroundContact> {
    if let Some(push) = mover.penetration(solid) {
        let side = if push.y < 0.0 {
            ContactSide::Bottom
        } else if push.y > 0.0 {
            ContactSide::Top
        } else if push.x < 0.0 {
            ContactSide::Right
        } else {
            ContactSide::Left
        };
        return Some(GroundContact { side, push });
    }

    let overlap = mover.axis_overlap(solid);
    let mover_center = mover.center();
    let solid_center = solid.center();

    if overlap.x > 0.0 && overlap.y <= 0.0 && overlap.y >= -skin {
        let side = if mover_center.y < solid_center.y {
            ContactSide::Bottom
        } else {
            ContactSide::Top
        };
        return Some(GroundContact {
            side,
            push: Vec2::ZERO,
        });
    }

    if overlap.y > 0.0 && overlap.x <= 0.0 && overlap.x >= -skin {
        let side = if mover_center.x < solid_center.x {
            ContactSide::Right
        } else {
            ContactSide::Left
        };
        return Some(GroundContact {
            side,
            push: Vec2::ZERO,
        });
    }

    None
}

/// Checks whether a box would overlap any solid, non-ladder ground.
///
/// The box is shrunk by `skin` first so resting contact does not count as a
/// collision.
#[must_use]
pub fn collides_with_grounds(bounds: &AABB, grounds: &[Ground], skin: f32) -> bool {
    let probe = bounds.shrunk(skin);
    grounds
        .iter()
        .any(|ground| ground.blocks_movement() && probe.overlaps(&ground.bounds))
}

/// Movement tunables for characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Gravity acceleration in px/s² (positive = down)
    pub gravity: f32,
    /// Maximum fall speed
    pub terminal_velocity: f32,
    /// Initial upward velocity of a jump
    pub jump_strength: f32,
    /// Horizontal speed while dashing
    pub dash_speed: f32,
    /// Dash duration in seconds
    pub dash_duration: f32,
    /// Delay between dashes in seconds
    pub dash_cooldown: f32,
    /// Vertical speed on ladders
    pub climb_speed: f32,
    /// Contact tolerance for resting contact
    pub skin_width: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 2000.0,
            terminal_velocity: 1800.0,
            jump_strength: 900.0,
            dash_speed: 1200.0,
            dash_duration: 0.18,
            dash_cooldown: 0.6,
            climb_speed: 260.0,
            skin_width: 0.01,
        }
    }
}
