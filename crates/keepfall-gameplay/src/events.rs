//! Event bus carrying gameplay outcomes to the host.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use keepfall_common::CharacterId;

use crate::behavior::Role;
use crate::combat::AttackType;
use crate::items::Item;

/// Event types that can be sent through the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Character added to the world
    CharacterSpawned {
        /// Character ID
        id: CharacterId,
        /// Player or non-player
        role: Role,
    },
    /// An attack found a target and queued a delayed hit
    AttackQueued {
        /// Attacking character
        attacker: CharacterId,
        /// Character that will be re-checked when the delay ends
        target: CharacterId,
        /// Attack used
        attack_type: AttackType,
    },
    /// A delayed hit landed
    CharacterDamaged {
        /// Character hit
        target: CharacterId,
        /// Damage dealt
        damage: i32,
        /// Attacker, if any
        source: Option<CharacterId>,
        /// Hit points left
        remaining_hp: i32,
    },
    /// A delayed hit expired with its target out of range
    AttackMissed {
        /// Attacking character
        attacker: CharacterId,
        /// Intended target
        target: CharacterId,
    },
    /// Hit points reached zero
    CharacterDied {
        /// Character ID
        id: CharacterId,
    },
    /// An item was consumed or equipped
    ItemUsed {
        /// Character using it
        id: CharacterId,
        /// Item applied
        item: Item,
    },
    /// The player opened a chest
    ChestOpened {
        /// Index of the chest in the level
        chest: usize,
        /// Item found, if it fit in the inventory
        item: Option<Item>,
    },
    /// The player reached the exit door
    ExitReached {
        /// Character ID
        id: CharacterId,
    },
}

/// Bounded queue between the world tick and its host.
///
/// The world publishes while it ticks; the host empties the queue between
/// ticks, either into a `Vec` or straight into an [`EventHandler`]. Events
/// published while the queue is full are dropped and counted.
#[derive(Debug)]
pub struct EventBus {
    tx: Sender<GameEvent>,
    rx: Receiver<GameEvent>,
    dropped: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

impl EventBus {
    /// Room for several frames of a busy level.
    pub const DEFAULT_CAPACITY: usize = 1024;

    /// A queue holding at most `capacity` undelivered events.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        Self {
            tx,
            rx,
            dropped: AtomicU64::new(0),
        }
    }

    /// Queue an event for the host.
    pub fn publish(&self, event: GameEvent) {
        let Err(err) = self.tx.try_send(event) else {
            return;
        };
        let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        if dropped == 1 {
            warn!("Event queue full, dropping {:?}", err.into_inner());
        } else {
            trace!("Dropped event #{}: {:?}", dropped, err.into_inner());
        }
    }

    /// Take every queued event in publish order.
    pub fn drain(&self) -> Vec<GameEvent> {
        self.rx.try_iter().collect()
    }

    /// Hand every queued event to `handler`; returns how many were delivered.
    pub fn dispatch<H: EventHandler + ?Sized>(&self, handler: &mut H) -> usize {
        let mut delivered = 0;
        for event in self.rx.try_iter() {
            handler.handle(&event);
            delivered += 1;
        }
        delivered
    }

    /// Events waiting for the host.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Events lost to a full queue since creation.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Consumer of world events.
pub trait EventHandler {
    /// Handles an event.
    fn handle(&mut self, event: &GameEvent);
}
