//! Static level geometry.

use serde::{Deserialize, Serialize};

use crate::physics::AABB;

/// A static axis-aligned rectangle of level geometry.
///
/// Solid grounds push characters out; ladders are non-solid and only make
/// overlapping characters eligible to climb.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ground {
    /// World-space rectangle
    pub bounds: AABB,
    /// Whether characters collide with this ground
    pub solid: bool,
    /// Whether this ground is a climbable ladder
    pub ladder: bool,
}

impl Ground {
    /// Creates a solid ground from a top-left corner and size.
    #[must_use]
    pub fn solid(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            bounds: AABB::from_rect(x, y, width, height),
            solid: true,
            ladder: false,
        }
    }

    /// Creates a ladder from a top-left corner and size.
    #[must_use]
    pub fn ladder(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            bounds: AABB::from_rect(x, y, width, height),
            solid: false,
            ladder: true,
        }
    }

    /// Solid and not a ladder: pushes characters and blocks pushes.
    #[must_use]
    pub fn blocks_movement(&self) -> bool {
        self.solid && !self.ladder
    }

    /// Solid and not a ladder: occludes line of sight.
    #[must_use]
    pub fn blocks_sight(&self) -> bool {
        self.solid && !self.ladder
    }
}
