//! Per-frame player input.
//!
//! The window layer fills a [`PlayerInput`] each frame; the world turns it
//! into character directives. Attacks need the other characters, so the world
//! handles `attack` itself.

use serde::{Deserialize, Serialize};

use crate::animation::Direction;
use crate::character::Character;

/// Player intent for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerInput {
    /// Horizontal axis, `-1` left to `1` right
    pub horizontal: f32,
    /// Vertical axis, `-1` up to `1` down (ladders)
    pub vertical: f32,
    /// Jump pressed this frame
    pub jump: bool,
    /// Dash pressed this frame
    pub dash: bool,
    /// Attack pressed this frame
    pub attack: bool,
    /// Inventory slot to use this frame
    pub use_slot: Option<usize>,
}

impl PlayerInput {
    /// Walking input.
    #[must_use]
    pub fn walk(horizontal: f32) -> Self {
        Self {
            horizontal,
            ..Self::default()
        }
    }

    /// Set the jump flag.
    #[must_use]
    pub fn with_jump(mut self) -> Self {
        self.jump = true;
        self
    }

    /// Set the dash flag.
    #[must_use]
    pub fn with_dash(mut self) -> Self {
        self.dash = true;
        self
    }

    /// Set the attack flag.
    #[must_use]
    pub fn with_attack(mut self) -> Self {
        self.attack = true;
        self
    }

    /// Set the vertical axis.
    #[must_use]
    pub fn with_vertical(mut self, vertical: f32) -> Self {
        self.vertical = vertical;
        self
    }

    /// Direction held, or the character's facing when none is.
    #[must_use]
    pub fn direction_or(&self, facing: Direction) -> Direction {
        Direction::from_dx(self.horizontal).unwrap_or(facing)
    }

    /// Apply movement directives: walk, climb, jump and dash.
    pub fn apply_movement(&self, character: &mut Character) {
        character.move_horizontal(self.horizontal);
        character.climb(self.vertical);
        if self.jump {
            character.jump();
        }
        if self.dash {
            character.start_dash(self.direction_or(character.facing()));
        }
    }
}
