//! Combat configuration and delayed-hit resolution.
//!
//! This module provides:
//! - Per-attack-type parameter tables, loadable from RON
//! - Directional attack box construction
//! - The single-slot pending attack and its proximity re-check

use std::collections::HashMap;

use keepfall_common::{CharacterId, KeepfallError, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::animation::Direction;
use crate::character::Character;
use crate::physics::AABB;

// ============================================================================
// Errors
// ============================================================================

/// Combat configuration errors.
#[derive(Debug, Error)]
pub enum CombatConfigError {
    /// The attack table document could not be parsed
    #[error("Failed to parse attack table: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// A required attack type has no entry
    #[error("No attack data for {0:?}")]
    MissingAttackType(AttackType),
    /// An entry holds an unusable value
    #[error("Invalid attack data for {attack_type:?}: {reason}")]
    Invalid {
        /// Offending entry
        attack_type: AttackType,
        /// What is wrong with it
        reason: &'static str,
    },
}

/// Result type for combat configuration.
pub type CombatConfigResult<T> = Result<T, CombatConfigError>;

impl From<CombatConfigError> for KeepfallError {
    fn from(err: CombatConfigError) -> Self {
        KeepfallError::Config(err.to_string())
    }
}

// ============================================================================
// Attack data
// ============================================================================

/// Kind of attack, used as the key into the attack table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackType {
    /// Player sword swing
    Sword,
    /// Enemy close-range strike
    EnemyMelee,
}

impl AttackType {
    /// All attack types.
    pub const ALL: [AttackType; 2] = [AttackType::Sword, AttackType::EnemyMelee];
}

/// Box geometry on one side of the attacker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackSide {
    /// Horizontal extent from the attacker's edge
    pub reach: f32,
    /// Offset from the attacker's top edge
    pub vertical_offset: f32,
    /// Box height
    pub height: f32,
}

/// Static parameters of one attack type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackData {
    /// Geometry when attacking right, and left unless overridden
    pub right: AttackSide,
    /// Override used when attacking left
    #[serde(default)]
    pub left: Option<AttackSide>,
    /// Damage before the attacker's bonus
    pub damage: i32,
    /// Seconds between the swing and the hit landing
    pub delay: f32,
    /// Horizontal knockback speed given to the target
    pub knockback: f32,
    /// Stun applied to the target
    pub stun: f32,
    /// Attacker cooldown after the swing
    pub cooldown: f32,
}

impl AttackData {
    /// Shipped parameters for an attack type.
    #[must_use]
    pub fn shipped(attack_type: AttackType) -> Self {
        match attack_type {
            AttackType::Sword => Self {
                right: AttackSide {
                    reach: 60.0,
                    vertical_offset: 10.0,
                    height: 40.0,
                },
                left: None,
                damage: 20,
                delay: 0.15,
                knockback: 400.0,
                stun: 0.3,
                cooldown: 0.5,
            },
            AttackType::EnemyMelee => Self {
                right: AttackSide {
                    reach: 90.0,
                    vertical_offset: 0.0,
                    height: 80.0,
                },
                left: None,
                damage: 10,
                delay: 0.3,
                knockback: 300.0,
                stun: 0.25,
                cooldown: 1.5,
            },
        }
    }

    /// Geometry for a direction.
    #[must_use]
    pub fn side(&self, direction: Direction) -> &AttackSide {
        match (direction, &self.left) {
            (Direction::Left, Some(left)) => left,
            _ => &self.right,
        }
    }

    /// Attack box next to `bounds` in `direction`.
    ///
    /// The box starts at the attacker's edge and extends `reach` outwards.
    #[must_use]
    pub fn attack_box(&self, bounds: &AABB, direction: Direction) -> AABB {
        let side = self.side(direction);
        let left = match direction {
            Direction::Right => bounds.max_x,
            Direction::Left => bounds.min_x - side.reach,
        };
        AABB::from_rect(
            left,
            bounds.min_y + side.vertical_offset,
            side.reach,
            side.height,
        )
    }

    fn validate(&self, attack_type: AttackType) -> CombatConfigResult<()> {
        let invalid = |reason| CombatConfigError::Invalid {
            attack_type,
            reason,
        };
        for side in std::iter::once(&self.right).chain(self.left.as_ref()) {
            if side.reach <= 0.0 || side.height <= 0.0 {
                return Err(invalid("attack box must have a positive size"));
            }
        }
        if self.damage < 0 {
            return Err(invalid("damage must not be negative"));
        }
        if self.delay < 0.0 || self.stun < 0.0 || self.cooldown < 0.0 {
            return Err(invalid("timers must not be negative"));
        }
        Ok(())
    }
}

/// Attack parameters keyed by type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttackTable(HashMap<AttackType, AttackData, ahash::RandomState>);

impl Default for AttackTable {
    fn default() -> Self {
        Self(
            AttackType::ALL
                .into_iter()
                .map(|ty| (ty, AttackData::shipped(ty)))
                .collect(),
        )
    }
}

impl AttackTable {
    /// Parse a RON map of overrides, merged over the shipped table.
    pub fn from_ron(source: &str) -> CombatConfigResult<Self> {
        let overrides: HashMap<AttackType, AttackData, ahash::RandomState> =
            ron::from_str(source)?;
        let mut table = Self::default();
        for (attack_type, data) in overrides {
            data.validate(attack_type)?;
            table.0.insert(attack_type, data);
        }
        Ok(table)
    }

    /// Entry for a type, falling back to the shipped values.
    #[must_use]
    pub fn get(&self, attack_type: AttackType) -> AttackData {
        self.0
            .get(&attack_type)
            .copied()
            .unwrap_or_else(|| AttackData::shipped(attack_type))
    }

    /// Entry for a type without fallback.
    pub fn try_get(&self, attack_type: AttackType) -> CombatConfigResult<&AttackData> {
        self.0
            .get(&attack_type)
            .ok_or(CombatConfigError::MissingAttackType(attack_type))
    }

    /// Replace the entry for a type.
    pub fn insert(&mut self, attack_type: AttackType, data: AttackData) {
        self.0.insert(attack_type, data);
    }
}

// ============================================================================
// Combat tuning
// ============================================================================

/// Combat tunables shared by every character.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Half-width of the proximity box used to re-check a pending hit
    pub recheck_half_width: f32,
    /// Half-height of the proximity box used to re-check a pending hit
    pub recheck_half_height: f32,
    /// Stun applied by any damage
    pub hit_stun: f32,
    /// How long knockback velocity is held
    pub knockback_duration: f32,
    /// Damage flash duration
    pub damage_flash_duration: f32,
    /// How long the last attack box stays visible
    pub attack_box_display: f32,
    /// Stamina spent per player attack
    pub attack_stamina_cost: i32,
    /// Stamina spent per dash
    pub dash_stamina_cost: i32,
    /// Player cooldown between attacks
    pub player_attack_cooldown: f32,
    /// Stamina regained per second
    pub stamina_regen_per_sec: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            recheck_half_width: 120.0,
            recheck_half_height: 80.0,
            hit_stun: 0.3,
            knockback_duration: 0.2,
            damage_flash_duration: 0.15,
            attack_box_display: 0.2,
            attack_stamina_cost: 15,
            dash_stamina_cost: 20,
            player_attack_cooldown: 0.25,
            stamina_regen_per_sec: 25.0,
        }
    }
}

// ============================================================================
// Attack outcomes and pending hits
// ============================================================================

/// Why an attack did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// Attacker is stunned
    Stunned,
    /// Attack cooldown has not elapsed
    Cooldown,
    /// Not enough stamina
    NoStamina,
}

/// Result of an `attack` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackOutcome {
    /// Nothing happened
    Suppressed(SuppressReason),
    /// Swing happened, no target qualified
    Whiffed,
    /// Swing happened and a hit was queued on the target
    Queued(CharacterId),
    /// Swing happened but a previous hit is still pending; this one is dropped
    SlotBusy,
}

impl AttackOutcome {
    /// Whether the swing happened (cooldown, box and animation applied).
    #[must_use]
    pub fn swung(&self) -> bool {
        !matches!(self, AttackOutcome::Suppressed(_))
    }
}

/// A delayed hit waiting for its timer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingAttack {
    /// Character to re-check and damage
    pub target: CharacterId,
    /// Seconds until the hit lands
    pub timer: f32,
    /// Damage including the attacker's bonus
    pub damage: i32,
    /// Knockback direction
    pub direction: Direction,
    /// Knockback speed
    pub knockback: f32,
    /// Stun applied to the target
    pub stun: f32,
}

impl PendingAttack {
    /// Counts down; returns true once the delay has elapsed.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.timer -= dt;
        self.timer <= 0.0
    }
}

/// Proximity box around an attacker used to re-check a pending hit.
#[must_use]
pub fn recheck_box(attacker_bounds: &AABB, config: &CombatConfig) -> AABB {
    let half = Vec2::new(config.recheck_half_width, config.recheck_half_height);
    AABB::around(attacker_bounds.center(), half)
}

/// Apply an elapsed pending hit to its target.
///
/// The target is damaged only if it is still alive and inside the
/// attacker's proximity box; otherwise the hit is discarded. Returns whether
/// damage was dealt.
pub fn resolve_pending_attack(
    hit: &PendingAttack,
    attacker_bounds: &AABB,
    target: &mut Character,
    config: &CombatConfig,
) -> bool {
    if !target.is_alive() || !recheck_box(attacker_bounds, config).overlaps(&target.bounds()) {
        debug!("Pending hit on {} discarded: out of range", target.id());
        return false;
    }

    target.take_damage(hit.damage);
    target.apply_knockback(hit.direction.sign() * hit.knockback, config.knockback_duration);
    target.raise_stun(hit.stun);
    debug!(
        "Hit {} for {} ({} hp left)",
        target.id(),
        hit.damage,
        target.hp()
    );
    true
}
