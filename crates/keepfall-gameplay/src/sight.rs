//! Sampled line-of-sight queries against level geometry.
//!
//! The segment is walked at a fixed step and a small square probe is tested
//! at every sample against solid, non-ladder grounds. This is an
//! approximation: thin obstacles narrower than the step minus the probe can
//! be missed, and probes grazing a wall near a corridor edge can report a
//! block that an exact segment test would not.

use keepfall_common::Vec2;
use serde::{Deserialize, Serialize};

use crate::ground::Ground;
use crate::physics::AABB;

/// Sampling parameters for line-of-sight queries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SightConfig {
    /// Distance between samples along the segment
    pub step: f32,
    /// Half the side of the square probe
    pub probe_half_extent: f32,
    /// Points closer than this always see each other
    pub coincident_epsilon: f32,
}

impl Default for SightConfig {
    fn default() -> Self {
        Self {
            step: 8.0,
            probe_half_extent: 4.0,
            coincident_epsilon: 1.0,
        }
    }
}

/// Checks whether `to` is visible from `from` with default sampling.
#[must_use]
pub fn has_line_of_sight(from: Vec2, to: Vec2, grounds: &[Ground]) -> bool {
    has_line_of_sight_with(&SightConfig::default(), from, to, grounds)
}

/// Checks whether `to` is visible from `from`.
#[must_use]
pub fn has_line_of_sight_with(
    config: &SightConfig,
    from: Vec2,
    to: Vec2,
    grounds: &[Ground],
) -> bool {
    let distance = from.distance(to);
    if distance < config.coincident_epsilon {
        return true;
    }

    let steps = (distance / config.step.max(0.5)).ceil() as u32;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        let half = Vec2::new(config.probe_half_extent, config.probe_half_extent);
        let probe = AABB::around(from.lerp(to, t), half);

        if grounds
            .iter()
            .any(|ground| ground.blocks_sight() && probe.overlaps(&ground.bounds))
        {
            return false;
        }
    }

    true
}
