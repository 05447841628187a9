//! Per-character control strategies.

use serde::{Deserialize, Serialize};

use crate::animation::Direction;
use crate::character::Character;
use crate::combat::AttackType;
use crate::ground::Ground;

/// Whether a character is the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Driven by player input
    Player,
    /// Driven by AI
    NonPlayer,
}

/// Control strategy selected when a character is spawned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Behavior {
    /// Directives come from `PlayerInput`
    PlayerControlled,
    /// Walks toward the player and strikes in range
    ChaseAndMelee(ChaseAi),
}

impl Behavior {
    /// Role implied by this behavior.
    #[must_use]
    pub fn role(&self) -> Role {
        match self {
            Behavior::PlayerControlled => Role::Player,
            Behavior::ChaseAndMelee(_) => Role::NonPlayer,
        }
    }
}

/// Chase AI tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaseConfig {
    /// Distance at which the player is noticed
    pub detection_range: f32,
    /// Distance at which an attack is attempted
    pub attack_range: f32,
    /// Attack used in range
    pub attack_type: AttackType,
}

impl Default for ChaseConfig {
    fn default() -> Self {
        Self {
            detection_range: 500.0,
            attack_range: 150.0,
            attack_type: AttackType::EnemyMelee,
        }
    }
}

/// What the chase AI wants to do this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChaseDecision {
    /// Player not detected: stand still
    Idle,
    /// Walk with this horizontal axis value
    Approach(f32),
    /// Walk with this axis and swing in this direction
    Strike(f32, Direction),
}

/// Chase-and-melee AI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChaseAi {
    /// Tunables
    pub config: ChaseConfig,
}

impl ChaseAi {
    /// Creates an AI with the given tunables.
    #[must_use]
    pub fn new(config: ChaseConfig) -> Self {
        Self { config }
    }

    /// Decide the next action of `me` against `player`.
    #[must_use]
    pub fn decide(
        &self,
        me: &Character,
        player: Option<&Character>,
        grounds: &[Ground],
    ) -> ChaseDecision {
        let Some(player) = player.filter(|p| p.is_alive()) else {
            return ChaseDecision::Idle;
        };

        let from = me.bounds().center();
        let to = player.bounds().center();
        let diff = to - from;
        let distance = diff.length();
        if distance > self.config.detection_range {
            return ChaseDecision::Idle;
        }

        let axis = diff.normalized().x;
        if distance <= self.config.attack_range && me.has_line_of_sight_to(player, grounds) {
            let direction = Direction::from_dx(diff.x).unwrap_or(me.facing());
            return ChaseDecision::Strike(axis, direction);
        }
        ChaseDecision::Approach(axis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::CharacterFactory;
    use keepfall_common::Vec2;

    #[test]
    fn test_role_from_behavior() {
        assert_eq!(Behavior::PlayerControlled.role(), Role::Player);
        assert_eq!(
            Behavior::ChaseAndMelee(ChaseAi::default()).role(),
            Role::NonPlayer
        );
    }

    #[test]
    fn test_chase_decisions_by_distance() {
        let factory = CharacterFactory::default();
        let ai = ChaseAi::default();
        let candle = factory.candle(Vec2::new(0.0, 0.0));

        let far = factory.player(Vec2::new(2000.0, 0.0));
        assert_eq!(ai.decide(&candle, Some(&far), &[]), ChaseDecision::Idle);
        assert_eq!(ai.decide(&candle, None, &[]), ChaseDecision::Idle);

        let mid = factory.player(Vec2::new(-300.0, 0.0));
        match ai.decide(&candle, Some(&mid), &[]) {
            ChaseDecision::Approach(axis) => assert!(axis < 0.0),
            other => panic!("expected approach, got {other:?}"),
        }

        let near = factory.player(Vec2::new(60.0, 0.0));
        match ai.decide(&candle, Some(&near), &[]) {
            ChaseDecision::Strike(_, direction) => assert_eq!(direction, Direction::Right),
            other => panic!("expected strike, got {other:?}"),
        }
    }

    #[test]
    fn test_wall_prevents_strike() {
        let factory = CharacterFactory::default();
        let ai = ChaseAi::default();
        let candle = factory.candle(Vec2::new(0.0, 0.0));
        let player = factory.player(Vec2::new(110.0, 10.0));
        let wall = vec![Ground::solid(98.0, -200.0, 8.0, 400.0)];

        assert!(matches!(
            ai.decide(&candle, Some(&player), &wall),
            ChaseDecision::Approach(_)
        ));
    }
}
