//! # Keepfall Gameplay
//!
//! Simulation core for Keepfall, a 2D maze action-platformer.
//!
//! This crate provides:
//! - Character physics with axis-separated collision against static grounds
//! - Delayed-hit melee combat with knockback and stun
//! - Line-of-sight sampling used by combat and AI
//! - Animation states that drive the active hitbox
//! - Chase AI, player input, items and a stacked inventory
//! - Maze generation and tile geometry for levels
//! - The world tick and an event bus for its outcomes
//!
//! Coordinates are in pixels with y pointing down.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod animation;
pub mod behavior;
pub mod block;
pub mod character;
pub mod combat;
pub mod events;
pub mod factory;
pub mod ground;
pub mod input;
pub mod inventory;
pub mod items;
pub mod level;
pub mod maze;
pub mod physics;
pub mod sight;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::animation::*;
    pub use crate::behavior::*;
    pub use crate::block::*;
    pub use crate::character::*;
    pub use crate::combat::*;
    pub use crate::events::*;
    pub use crate::factory::*;
    pub use crate::ground::*;
    pub use crate::input::*;
    pub use crate::inventory::*;
    pub use crate::items::*;
    pub use crate::level::*;
    pub use crate::maze::*;
    pub use crate::physics::*;
    pub use crate::sight::*;
    pub use crate::world::*;
}

pub use prelude::*;
