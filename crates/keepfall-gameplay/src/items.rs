//! Consumable and equippable items.

use keepfall_common::ItemTypeId;
use serde::{Deserialize, Serialize};

use crate::character::Character;

/// An item with its effect magnitude.
///
/// Items only mutate characters through the narrow effect surface
/// (`heal`, `restore_mana`, `increase_max_hp`, `add_damage_bonus`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Item {
    /// Restores hit points
    HealthPotion {
        /// Hit points restored
        amount: i32,
    },
    /// Restores mana
    ManaPotion {
        /// Mana restored
        amount: i32,
    },
    /// Raises maximum hit points
    HealthAmulet {
        /// Maximum hit points added
        bonus: i32,
    },
    /// Raises outgoing damage
    DamageAmulet {
        /// Damage added to every hit
        bonus: i32,
    },
}

impl Item {
    /// Health potion as found in chests.
    pub const SMALL_HEALTH_POTION: Item = Item::HealthPotion { amount: 30 };
    /// Mana potion as found in chests.
    pub const SMALL_MANA_POTION: Item = Item::ManaPotion { amount: 20 };

    /// Apply the item's effect to a character.
    pub fn apply_effect(&self, character: &mut Character) {
        match *self {
            Item::HealthPotion { amount } => character.heal(amount),
            Item::ManaPotion { amount } => character.restore_mana(amount),
            Item::HealthAmulet { bonus } => character.increase_max_hp(bonus),
            Item::DamageAmulet { bonus } => character.add_damage_bonus(bonus),
        }
    }

    /// Stable type id, shared by every magnitude of the same kind.
    #[must_use]
    pub fn type_id(&self) -> ItemTypeId {
        match self {
            Item::HealthPotion { .. } => ItemTypeId::new(1),
            Item::ManaPotion { .. } => ItemTypeId::new(2),
            Item::HealthAmulet { .. } => ItemTypeId::new(3),
            Item::DamageAmulet { .. } => ItemTypeId::new(4),
        }
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Item::HealthPotion { .. } => "Health Potion",
            Item::ManaPotion { .. } => "Mana Potion",
            Item::HealthAmulet { .. } => "Health Amulet",
            Item::DamageAmulet { .. } => "Damage Amulet",
        }
    }

    /// One-line description for menus.
    #[must_use]
    pub fn description(&self) -> String {
        match *self {
            Item::HealthPotion { amount } => format!("Restores {amount} health."),
            Item::ManaPotion { amount } => format!("Restores {amount} mana."),
            Item::HealthAmulet { bonus } => format!("Raises maximum health by {bonus}."),
            Item::DamageAmulet { bonus } => format!("Raises damage by {bonus}."),
        }
    }

    /// Asset registry key of the item's icon.
    #[must_use]
    pub fn icon_key(&self) -> &'static str {
        match self {
            Item::HealthPotion { .. } => "items/health_potion",
            Item::ManaPotion { .. } => "items/mana_potion",
            Item::HealthAmulet { .. } => "items/health_amulet",
            Item::DamageAmulet { .. } => "items/damage_amulet",
        }
    }
}
