//! Preset characters.

use std::sync::Arc;

use keepfall_common::Vec2;

use crate::animation::{AnimationClip, AnimationState, Animator, Hitbox};
use crate::behavior::{Behavior, ChaseAi, ChaseConfig};
use crate::character::{Character, CharacterTuning};
use crate::inventory::Inventory;

/// Builds the player and enemy presets with shared tuning.
#[derive(Debug, Clone, Default)]
pub struct CharacterFactory {
    tuning: Arc<CharacterTuning>,
    chase: ChaseConfig,
}

impl CharacterFactory {
    /// Creates a factory handing `tuning` to every character.
    #[must_use]
    pub fn new(tuning: Arc<CharacterTuning>) -> Self {
        Self {
            tuning,
            chase: ChaseConfig::default(),
        }
    }

    /// Set the chase AI tunables for enemies.
    #[must_use]
    pub fn with_chase_config(mut self, chase: ChaseConfig) -> Self {
        self.chase = chase;
        self
    }

    /// Shared tuning.
    #[must_use]
    pub fn tuning(&self) -> &Arc<CharacterTuning> {
        &self.tuning
    }

    /// The player: 100 hp, 50 mana, fast, scale 3.
    #[must_use]
    pub fn player(&self, position: Vec2) -> Character {
        let mut animator = Animator::new(Hitbox::new(5.0, 7.0, 17.0, 25.0));
        animator.register(AnimationState::Idle, AnimationClip::new(0, 4, 0.15));
        animator.register(AnimationState::WalkRight, AnimationClip::new(1, 6, 0.1));
        animator.register(AnimationState::WalkLeft, AnimationClip::new(2, 6, 0.1));
        animator.register(
            AnimationState::AttackRight,
            AnimationClip::new(3, 4, 0.08).with_sprite_offset(Vec2::new(6.0, 0.0)),
        );
        animator.register(
            AnimationState::AttackLeft,
            AnimationClip::new(4, 4, 0.08).with_sprite_offset(Vec2::new(-6.0, 0.0)),
        );

        Character::new("Player", Behavior::PlayerControlled, Arc::clone(&self.tuning))
            .with_hp(100)
            .with_mana(50)
            .with_stamina(100)
            .with_speed(500.0)
            .with_force(2.0)
            .with_sprite_scale(3.0)
            .with_animator(animator)
            .with_inventory(Inventory::new(Inventory::DEFAULT_CAPACITY))
            .with_position(position)
    }

    /// The candle enemy: 50 hp, slow, scale 4, chases the player.
    #[must_use]
    pub fn candle(&self, position: Vec2) -> Character {
        let mut animator = Animator::new(Hitbox::new(8.0, 4.0, 16.0, 28.0));
        animator.register(AnimationState::Idle, AnimationClip::new(0, 4, 0.2));
        animator.register(AnimationState::WalkRight, AnimationClip::new(1, 4, 0.15));
        animator.register(AnimationState::WalkLeft, AnimationClip::new(2, 4, 0.15));
        animator.register(
            AnimationState::AttackRight,
            AnimationClip::new(3, 5, 0.08).with_hitbox(Hitbox::new(6.0, 4.0, 20.0, 28.0)),
        );
        animator.register(
            AnimationState::AttackLeft,
            AnimationClip::new(4, 5, 0.08).with_hitbox(Hitbox::new(6.0, 4.0, 20.0, 28.0)),
        );

        let ai = ChaseAi::new(self.chase.clone());
        Character::new("Candle", Behavior::ChaseAndMelee(ai), Arc::clone(&self.tuning))
            .with_hp(50)
            .with_mana(0)
            .with_stamina(100)
            .with_speed(150.0)
            .with_force(1.0)
            .with_sprite_scale(4.0)
            .with_animator(animator)
            .with_inventory(Inventory::new(0))
            .with_position(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::Role;

    #[test]
    fn test_player_preset() {
        let player = CharacterFactory::default().player(Vec2::new(10.0, 20.0));
        assert_eq!(player.role(), Role::Player);
        assert_eq!(player.hp(), 100);
        assert_eq!(player.mana(), 50);
        assert_eq!(player.speed(), 500.0);

        let bounds = player.bounds();
        assert_eq!(bounds.min_x, 25.0);
        assert_eq!(bounds.min_y, 41.0);
        assert_eq!(bounds.width(), 51.0);
        assert_eq!(bounds.height(), 75.0);
    }

    #[test]
    fn test_candle_preset_is_weaker_and_chases() {
        let factory = CharacterFactory::default();
        let player = factory.player(Vec2::ZERO);
        let candle = factory.candle(Vec2::ZERO);
        assert_eq!(candle.role(), Role::NonPlayer);
        assert!(matches!(candle.behavior(), Behavior::ChaseAndMelee(_)));
        assert!(player.force() > candle.force());
        assert_eq!(candle.bounds().width(), 64.0);
    }
}
