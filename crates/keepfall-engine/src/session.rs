//! Headless game session.
//!
//! Generates a level, drives the player with a simple autopilot and feeds
//! world events to a logging handler until the player exits, dies or the
//! session runs out of time.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use keepfall_common::{CharacterId, KeepfallResult};
use keepfall_gameplay::{
    Character, CharacterFactory, Direction, EventHandler, GameEvent, Item, Level, PlayerInput,
    Role, World,
};

use crate::assets::{AssetRegistry, CANDLE_SHEET, PLAYER_SHEET};
use crate::config::EngineConfig;
use crate::timing::FrameTiming;

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The player reached the exit door
    ExitReached,
    /// The player died
    PlayerDied,
    /// Session length elapsed
    TimeUp,
}

/// Counters gathered from world events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Enemies killed
    pub kills: u32,
    /// Damage dealt to the player
    pub damage_taken: i32,
    /// Damage dealt to enemies
    pub damage_dealt: i32,
    /// Delayed hits that found their target out of range
    pub misses: u32,
    /// Chests opened
    pub chests_opened: u32,
    /// Items consumed or equipped
    pub items_used: u32,
}

/// Event handler that logs and counts world events.
#[derive(Debug, Default)]
pub struct EventLog {
    roles: HashMap<CharacterId, Role>,
    stats: SessionStats,
    handled: u64,
}

impl EventLog {
    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Events handled so far.
    #[must_use]
    pub fn handled(&self) -> u64 {
        self.handled
    }

    fn is_player(&self, id: CharacterId) -> bool {
        self.roles.get(&id) == Some(&Role::Player)
    }
}

impl EventHandler for EventLog {
    fn handle(&mut self, event: &GameEvent) {
        self.handled += 1;
        match event {
            GameEvent::CharacterSpawned { id, role } => {
                self.roles.insert(*id, *role);
            },
            GameEvent::AttackQueued { attacker, target, attack_type } => {
                debug!("{} swings {:?} at {}", attacker, attack_type, target);
            },
            GameEvent::CharacterDamaged { target, damage, remaining_hp, .. } => {
                if self.is_player(*target) {
                    self.stats.damage_taken += damage;
                    info!("Player hit for {} ({} hp left)", damage, remaining_hp);
                } else {
                    self.stats.damage_dealt += damage;
                    debug!("{} hit for {} ({} hp left)", target, damage, remaining_hp);
                }
            },
            GameEvent::AttackMissed { attacker, target } => {
                self.stats.misses += 1;
                debug!("{} missed {}", attacker, target);
            },
            GameEvent::CharacterDied { id } => {
                if self.is_player(*id) {
                    info!("Player died");
                } else {
                    self.stats.kills += 1;
                    info!("Enemy {} defeated", id);
                }
            },
            GameEvent::ItemUsed { item, .. } => {
                self.stats.items_used += 1;
                info!("Used {}", item.name());
            },
            GameEvent::ChestOpened { chest, item } => {
                self.stats.chests_opened += 1;
                match item {
                    Some(item) => info!("Chest {} held {}", chest, item.name()),
                    None => info!("Chest {} loot did not fit", chest),
                }
            },
            GameEvent::ExitReached { id } => info!("{} reached the exit", id),
        }
    }
}

/// Scripted player driver for headless runs.
///
/// Walks toward the exit side, jumps at walls, climbs ladders, swings at
/// nearby enemies and drinks a health potion when low.
#[derive(Debug, Clone)]
pub struct Autopilot {
    direction: Direction,
    stuck_time: f32,
    last_x: f32,
}

impl Default for Autopilot {
    fn default() -> Self {
        Self {
            direction: Direction::Right,
            stuck_time: 0.0,
            last_x: f32::NAN,
        }
    }
}

impl Autopilot {
    /// Seconds without horizontal progress before turning around.
    const TURN_AFTER: f32 = 1.5;
    /// Horizontal distance at which an enemy is attacked.
    const STRIKE_RANGE: f32 = 110.0;

    /// Input for the next frame.
    pub fn next(&mut self, world: &World, dt: f32) -> PlayerInput {
        let Some(player) = world.player() else {
            return PlayerInput::default();
        };

        let x = player.position().x;
        if (x - self.last_x).abs() < 0.5 {
            self.stuck_time += dt;
        } else {
            self.stuck_time = 0.0;
        }
        self.last_x = x;
        if self.stuck_time > Self::TURN_AFTER {
            self.direction = self.direction.opposite();
            self.stuck_time = 0.0;
        }

        let mut input = PlayerInput::walk(self.direction.sign());

        if let Some(enemy) = nearest_enemy(world, player) {
            let dx = enemy.bounds().center().x - player.bounds().center().x;
            if dx.abs() < Self::STRIKE_RANGE {
                input.horizontal = dx.signum() * 0.1;
                input.attack = true;
            }
        }

        let contacts = player.contacts();
        let blocked = match self.direction {
            Direction::Left => contacts.left,
            Direction::Right => contacts.right,
        };
        if blocked && player.is_grounded() {
            input.jump = true;
        }
        if player.is_on_ladder() {
            input.vertical = -1.0;
        }

        if player.hp() * 2 < player.max_hp() {
            input.use_slot = health_potion_slot(player);
        }
        input
    }
}

fn nearest_enemy<'w>(world: &'w World, player: &Character) -> Option<&'w Character> {
    let origin = player.bounds().center();
    world
        .characters()
        .iter()
        .filter(|c| c.role() == Role::NonPlayer && c.is_alive())
        .filter(|c| (c.bounds().center().y - origin.y).abs() < player.bounds().height())
        .min_by(|a, b| {
            let da = a.bounds().center().distance(origin);
            let db = b.bounds().center().distance(origin);
            da.total_cmp(&db)
        })
}

fn health_potion_slot(player: &Character) -> Option<usize> {
    player
        .inventory()
        .stacks()
        .find(|(_, stack)| matches!(stack.item, Item::HealthPotion { .. }))
        .map(|(slot, _)| slot)
}

/// Result of a finished session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    /// Level seed
    pub seed: u64,
    /// How the session ended
    pub outcome: SessionOutcome,
    /// Frames simulated
    pub frames: u64,
    /// Simulated seconds
    pub elapsed: f64,
    /// Event counters
    pub stats: SessionStats,
    /// Player hit points at the end
    pub player_hp: i32,
}

/// One headless run of a level.
#[derive(Debug)]
pub struct Session {
    seed: u64,
    total_frames: u64,
    show_overlay: bool,
    overlay_interval: f32,
    overlay_timer: f32,
    world: World,
    timing: FrameTiming,
    log: EventLog,
    autopilot: Autopilot,
}

impl Session {
    /// Generate the level and populate the world.
    pub fn new(config: &EngineConfig, assets: &AssetRegistry) -> KeepfallResult<Self> {
        let seed = config.resolve_seed();
        let tuning = Arc::new(config.tuning()?);
        let factory = CharacterFactory::new(tuning).with_chase_config(config.chase.clone());
        let level = Level::generate(&config.level, seed)?;
        let world = World::from_level(&level, &factory);

        debug!(
            "Sprites: player {}, candle {}",
            assets.get(PLAYER_SHEET).path.display(),
            assets.get(CANDLE_SHEET).path.display()
        );

        let timing = FrameTiming::new(config.target_fps).with_max_dt(config.max_frame_delta);
        let total_frames = (config.session_seconds * timing.target_fps() as f32).round() as u64;
        info!("Session seed {} for {} frames", seed, total_frames);

        Ok(Self {
            seed,
            total_frames,
            show_overlay: config.show_debug_overlay,
            overlay_interval: config.debug_overlay_interval,
            overlay_timer: 0.0,
            world,
            timing,
            log: EventLog::default(),
            autopilot: Autopilot::default(),
        })
    }

    /// The world being simulated.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Level seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Event counters so far.
    #[must_use]
    pub fn stats(&self) -> &SessionStats {
        self.log.stats()
    }

    /// Simulate one frame; returns the outcome once the session is over.
    pub fn step(&mut self) -> Option<SessionOutcome> {
        let dt = self.timing.record(self.timing.nominal_dt());
        let input = self.autopilot.next(&self.world, dt);
        self.world.tick(dt, &input);

        self.world.dispatch_events(&mut self.log);

        if self.show_overlay {
            self.overlay_timer += dt;
            if self.overlay_timer >= self.overlay_interval {
                self.overlay_timer = 0.0;
                info!("\n{}", self.world.dev_info());
            }
        }

        if self.world.exit_reached() {
            Some(SessionOutcome::ExitReached)
        } else if !self.world.player_alive() {
            Some(SessionOutcome::PlayerDied)
        } else if self.world.frame() >= self.total_frames {
            Some(SessionOutcome::TimeUp)
        } else {
            None
        }
    }

    /// Run until the session ends.
    pub fn run(&mut self) -> SessionSummary {
        let outcome = loop {
            if let Some(outcome) = self.step() {
                break outcome;
            }
        };
        let summary = self.summary(outcome);
        info!(
            "Session over: {:?} after {} frames ({:.1}s, {:.0} fps avg)",
            summary.outcome,
            summary.frames,
            summary.elapsed,
            self.timing.current_fps()
        );
        summary
    }

    fn summary(&self, outcome: SessionOutcome) -> SessionSummary {
        SessionSummary {
            seed: self.seed,
            outcome,
            frames: self.world.frame(),
            elapsed: self.world.elapsed(),
            stats: self.log.stats().clone(),
            player_hp: self.world.player().map_or(0, Character::hp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_log_counts_by_role() {
        let player = CharacterId::from_raw(1);
        let enemy = CharacterId::from_raw(2);
        let mut log = EventLog::default();
        for event in [
            GameEvent::CharacterSpawned { id: player, role: Role::Player },
            GameEvent::CharacterSpawned { id: enemy, role: Role::NonPlayer },
            GameEvent::CharacterDamaged {
                target: player,
                damage: 10,
                source: Some(enemy),
                remaining_hp: 90,
            },
            GameEvent::CharacterDamaged {
                target: enemy,
                damage: 20,
                source: Some(player),
                remaining_hp: 0,
            },
            GameEvent::CharacterDied { id: enemy },
            GameEvent::ChestOpened { chest: 0, item: None },
        ] {
            log.handle(&event);
        }

        let stats = log.stats();
        assert_eq!(stats.damage_taken, 10);
        assert_eq!(stats.damage_dealt, 20);
        assert_eq!(stats.kills, 1);
        assert_eq!(stats.chests_opened, 1);
        assert_eq!(log.handled(), 6);
    }

    #[test]
    fn test_autopilot_drinks_when_low() {
        let factory = CharacterFactory::default();
        let mut world = World::new(Vec::new(), Arc::clone(factory.tuning()));
        let mut player = factory.player(keepfall_common::Vec2::ZERO);
        player.inventory_mut().add(Item::SMALL_MANA_POTION).expect("room");
        player.inventory_mut().add(Item::SMALL_HEALTH_POTION).expect("room");
        player.take_damage(60);
        world.spawn(player);

        let input = Autopilot::default().next(&world, 1.0 / 60.0);
        assert_eq!(input.use_slot, Some(1));
        assert_eq!(input.horizontal, 1.0);
    }
}
