//! Fixed-capacity inventory of stacked items.

use keepfall_common::{ItemTypeId, KeepfallError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::items::Item;

/// Inventory error types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InventoryError {
    /// No free slot and no matching stack with room
    #[error("Inventory full: capacity {capacity}")]
    Full {
        /// Number of slots
        capacity: usize,
    },
    /// Slot holds nothing
    #[error("Slot {slot} is empty")]
    EmptySlot {
        /// Slot index
        slot: usize,
    },
    /// Slot index past the end
    #[error("Slot {slot} out of range (capacity {capacity})")]
    OutOfRange {
        /// Slot index
        slot: usize,
        /// Number of slots
        capacity: usize,
    },
}

/// Result type for inventory operations.
pub type InventoryResult<T> = Result<T, InventoryError>;

impl From<InventoryError> for KeepfallError {
    fn from(err: InventoryError) -> Self {
        KeepfallError::Inventory(err.to_string())
    }
}

/// Identical items sharing one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    /// The stacked item
    pub item: Item,
    /// How many are stacked
    pub count: u32,
}

/// A fixed number of slots, each holding one stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inventory {
    slots: Vec<Option<ItemStack>>,
    max_stack: u32,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl Inventory {
    /// Slots carried by a character unless configured otherwise.
    pub const DEFAULT_CAPACITY: usize = 8;
    /// Largest stack a slot holds.
    pub const DEFAULT_MAX_STACK: u32 = 99;

    /// Creates an empty inventory with the given number of slots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            max_stack: Self::DEFAULT_MAX_STACK,
        }
    }

    /// Set the maximum stack size.
    #[must_use]
    pub fn with_max_stack(mut self, max_stack: u32) -> Self {
        self.max_stack = max_stack.max(1);
        self
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Contents of a slot.
    #[must_use]
    pub fn slot(&self, slot: usize) -> Option<&ItemStack> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// True when no slot holds anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Total count of all items of a type.
    #[must_use]
    pub fn count(&self, type_id: ItemTypeId) -> u32 {
        self.stacks()
            .filter(|(_, stack)| stack.item.type_id() == type_id)
            .map(|(_, stack)| stack.count)
            .sum()
    }

    /// Occupied slots with their index.
    pub fn stacks(&self) -> impl Iterator<Item = (usize, &ItemStack)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|stack| (i, stack)))
    }

    /// Add one item, stacking onto an identical item first.
    ///
    /// Returns the slot that received it.
    pub fn add(&mut self, item: Item) -> InventoryResult<usize> {
        let max_stack = self.max_stack;
        let stackable = self
            .slots
            .iter()
            .position(|slot| matches!(slot, Some(s) if s.item == item && s.count < max_stack));
        if let Some(i) = stackable {
            if let Some(stack) = self.slots[i].as_mut() {
                stack.count += 1;
            }
            return Ok(i);
        }

        let capacity = self.capacity();
        let i = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(InventoryError::Full { capacity })?;
        self.slots[i] = Some(ItemStack { item, count: 1 });
        Ok(i)
    }

    /// Take one item out of a slot, clearing it when the stack empties.
    pub fn take_one(&mut self, slot: usize) -> InventoryResult<Item> {
        let entry = self.slot_mut(slot)?;
        let stack = entry.as_mut().ok_or(InventoryError::EmptySlot { slot })?;
        let item = stack.item;
        stack.count -= 1;
        if stack.count == 0 {
            *entry = None;
        }
        Ok(item)
    }

    /// Remove a whole stack.
    pub fn remove(&mut self, slot: usize) -> InventoryResult<ItemStack> {
        self.slot_mut(slot)?
            .take()
            .ok_or(InventoryError::EmptySlot { slot })
    }

    fn slot_mut(&mut self, slot: usize) -> InventoryResult<&mut Option<ItemStack>> {
        let capacity = self.capacity();
        self.slots
            .get_mut(slot)
            .ok_or(InventoryError::OutOfRange { slot, capacity })
    }
}
