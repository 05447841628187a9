//! The world: grounds, characters and the per-frame tick.
//!
//! A frame runs in a fixed order:
//!
//! 1. player input (movement, item use, attack)
//! 2. chase AI decisions for every non-player
//! 3. `update` on every character, collecting elapsed pending hits
//! 4. pairwise character pushes
//! 5. pending-hit re-check and application
//! 6. chests and the exit door
//! 7. pruning of dead non-players
//!
//! Outcomes are published on the [`EventBus`].

use std::fmt::Write as _;
use std::sync::Arc;

use keepfall_common::{CharacterId, Vec2};
use tracing::{debug, info, trace};

use crate::animation::Direction;
use crate::behavior::{Behavior, ChaseDecision, Role};
use crate::character::{Character, CharacterTuning};
use crate::combat::{resolve_pending_attack, AttackOutcome, AttackType, PendingAttack};
use crate::events::{EventBus, EventHandler, GameEvent};
use crate::factory::CharacterFactory;
use crate::ground::Ground;
use crate::input::PlayerInput;
use crate::level::{Chest, Door, DoorKind, Level};

/// A running level.
#[derive(Debug)]
pub struct World {
    tuning: Arc<CharacterTuning>,
    grounds: Vec<Ground>,
    doors: Vec<Door>,
    chests: Vec<Chest>,
    characters: Vec<Character>,
    events: EventBus,
    exit_reached: bool,
    elapsed: f64,
    frame: u64,
}

impl World {
    /// An empty world over `grounds`.
    #[must_use]
    pub fn new(grounds: Vec<Ground>, tuning: Arc<CharacterTuning>) -> Self {
        Self {
            tuning,
            grounds,
            doors: Vec::new(),
            chests: Vec::new(),
            characters: Vec::new(),
            events: EventBus::default(),
            exit_reached: false,
            elapsed: 0.0,
            frame: 0,
        }
    }

    /// Populate a world from a generated level.
    ///
    /// The player is centered on the entry tile and one candle on every
    /// enemy spawn point.
    #[must_use]
    pub fn from_level(level: &Level, factory: &CharacterFactory) -> Self {
        let mut world = Self::new(level.grounds().to_vec(), Arc::clone(factory.tuning()));
        world.doors = level.doors().to_vec();
        world.chests = level.chests().to_vec();

        let player = factory.player(Vec2::ZERO);
        world.spawn_centered(player, level.player_spawn());
        for &spawn in level.enemy_spawns() {
            world.spawn_centered(factory.candle(Vec2::ZERO), spawn);
        }

        info!(
            "World ready: {} characters, {} chests",
            world.characters.len(),
            world.chests.len()
        );
        world
    }

    /// Add a character as is.
    pub fn spawn(&mut self, character: Character) -> CharacterId {
        let id = character.id();
        self.events.publish(GameEvent::CharacterSpawned {
            id,
            role: character.role(),
        });
        debug!("Spawned {} {}", character.name(), id);
        self.characters.push(character);
        id
    }

    /// Add a character with its bounds centered on `center`.
    pub fn spawn_centered(&mut self, mut character: Character, center: Vec2) -> CharacterId {
        let offset = center - character.bounds_at(Vec2::ZERO).center();
        character.set_position(offset);
        self.spawn(character)
    }

    /// Add doors.
    pub fn add_door(&mut self, door: Door) {
        self.doors.push(door);
    }

    /// Add a chest.
    pub fn add_chest(&mut self, chest: Chest) {
        self.chests.push(chest);
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Shared tuning.
    #[must_use]
    pub fn tuning(&self) -> &CharacterTuning {
        &self.tuning
    }

    /// Static geometry.
    #[must_use]
    pub fn grounds(&self) -> &[Ground] {
        &self.grounds
    }

    /// Doors.
    #[must_use]
    pub fn doors(&self) -> &[Door] {
        &self.doors
    }

    /// Chests.
    #[must_use]
    pub fn chests(&self) -> &[Chest] {
        &self.chests
    }

    /// Living characters plus the player, dead or not.
    #[must_use]
    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    /// Character by ID.
    #[must_use]
    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.characters.iter().find(|c| c.id() == id)
    }

    /// Character by ID, mutably.
    pub fn character_mut(&mut self, id: CharacterId) -> Option<&mut Character> {
        self.characters.iter_mut().find(|c| c.id() == id)
    }

    /// The player character.
    #[must_use]
    pub fn player(&self) -> Option<&Character> {
        self.characters.iter().find(|c| c.role() == Role::Player)
    }

    /// Take every event published since the last drain.
    pub fn drain_events(&self) -> Vec<GameEvent> {
        self.events.drain()
    }

    /// Feed every pending event to `handler`.
    pub fn dispatch_events<H: EventHandler + ?Sized>(&self, handler: &mut H) -> usize {
        self.events.dispatch(handler)
    }

    /// Whether the player has reached the exit door.
    #[must_use]
    pub fn exit_reached(&self) -> bool {
        self.exit_reached
    }

    /// Whether the player is alive.
    #[must_use]
    pub fn player_alive(&self) -> bool {
        self.player().is_some_and(Character::is_alive)
    }

    /// Simulated seconds.
    #[must_use]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Frames ticked.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    fn index_of(&self, id: CharacterId) -> Option<usize> {
        self.characters.iter().position(|c| c.id() == id)
    }

    fn player_index(&self) -> Option<usize> {
        self.characters.iter().position(|c| c.role() == Role::Player)
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Advance one frame of `dt` seconds.
    pub fn tick(&mut self, dt: f32, input: &PlayerInput) {
        self.frame += 1;
        self.elapsed += f64::from(dt);

        self.apply_player_input(input);
        self.run_behaviors();

        let mut hits = Vec::new();
        for character in &mut self.characters {
            if let Some(hit) = character.update(dt, &self.grounds) {
                hits.push((character.id(), hit));
            }
        }

        self.resolve_pushes();
        self.resolve_hits(&hits);
        self.check_interactions();
        self.prune_dead();
        trace!("Frame {} done ({} characters)", self.frame, self.characters.len());
    }

    fn apply_player_input(&mut self, input: &PlayerInput) {
        let Some(index) = self.player_index() else {
            return;
        };
        if !self.characters[index].is_alive() {
            return;
        }

        input.apply_movement(&mut self.characters[index]);

        if let Some(slot) = input.use_slot {
            let player = &mut self.characters[index];
            match player.use_item(slot) {
                Ok(item) => self.events.publish(GameEvent::ItemUsed {
                    id: player.id(),
                    item,
                }),
                Err(err) => debug!("Item use ignored: {}", err),
            }
        }

        if input.attack {
            let direction = input.direction_or(self.characters[index].facing());
            self.attack_from(index, direction, AttackType::Sword, |_| true);
        }
    }

    fn run_behaviors(&mut self) {
        let player = self.player_index();
        let decisions: Vec<(usize, ChaseDecision, AttackType)> = self
            .characters
            .iter()
            .enumerate()
            .filter_map(|(i, c)| match c.behavior() {
                Behavior::ChaseAndMelee(ai) if c.is_alive() => {
                    let target = player.map(|p| &self.characters[p]);
                    Some((i, ai.decide(c, target, &self.grounds), ai.config.attack_type))
                }
                _ => None,
            })
            .collect();

        for (index, decision, attack_type) in decisions {
            match decision {
                ChaseDecision::Idle => self.characters[index].move_horizontal(0.0),
                ChaseDecision::Approach(axis) => self.characters[index].move_horizontal(axis),
                ChaseDecision::Strike(axis, direction) => {
                    self.characters[index].move_horizontal(axis);
                    self.attack_from(index, direction, attack_type, |c| c.role() == Role::Player);
                }
            }
        }
    }

    fn attack_from(
        &mut self,
        index: usize,
        direction: Direction,
        attack_type: AttackType,
        eligible: impl Fn(&Character) -> bool,
    ) {
        let (before, rest) = self.characters.split_at_mut(index);
        let Some((attacker, after)) = rest.split_first_mut() else {
            return;
        };
        let targets = before.iter().chain(after.iter()).filter(|&c| eligible(c));
        let outcome = attacker.attack(direction, targets, attack_type, &self.grounds);

        match outcome {
            AttackOutcome::Queued(target) => self.events.publish(GameEvent::AttackQueued {
                attacker: attacker.id(),
                target,
                attack_type,
            }),
            AttackOutcome::Suppressed(reason) => {
                trace!("{} attack suppressed: {:?}", attacker.id(), reason);
            }
            AttackOutcome::Whiffed | AttackOutcome::SlotBusy => {}
        }
    }

    fn resolve_pushes(&mut self) {
        let count = self.characters.len();
        for j in 1..count {
            let (head, tail) = self.characters.split_at_mut(j);
            let other = &mut tail[0];
            for character in head.iter_mut() {
                if !character.is_alive() || !other.is_alive() {
                    continue;
                }
                let outcome = character.resolve_collision_with_character(other, &self.grounds);
                trace!("Push {} / {}: {:?}", character.id(), other.id(), outcome);
            }
        }
    }

    fn resolve_hits(&mut self, hits: &[(CharacterId, PendingAttack)]) {
        for (attacker, hit) in hits {
            let Some(attacker_bounds) = self.character(*attacker).map(Character::bounds) else {
                continue;
            };
            let Some(target_index) = self.index_of(hit.target) else {
                continue;
            };

            let target = &mut self.characters[target_index];
            if resolve_pending_attack(hit, &attacker_bounds, target, &self.tuning.combat) {
                self.events.publish(GameEvent::CharacterDamaged {
                    target: hit.target,
                    damage: hit.damage,
                    source: Some(*attacker),
                    remaining_hp: target.hp(),
                });
                if !target.is_alive() {
                    info!("{} {} died", target.name(), hit.target);
                    self.events.publish(GameEvent::CharacterDied { id: hit.target });
                }
            } else {
                self.events.publish(GameEvent::AttackMissed {
                    attacker: *attacker,
                    target: hit.target,
                });
            }
        }
    }

    fn check_interactions(&mut self) {
        let Some(index) = self.player_index() else {
            return;
        };
        let player = &mut self.characters[index];
        if !player.is_alive() {
            return;
        }
        let bounds = player.bounds();

        for (i, chest) in self.chests.iter_mut().enumerate() {
            if chest.opened || !chest.bounds.overlaps(&bounds) {
                continue;
            }
            let Some(loot) = chest.open() else {
                continue;
            };
            let item = match player.inventory_mut().add(loot) {
                Ok(_) => Some(loot),
                Err(err) => {
                    debug!("Chest loot lost: {}", err);
                    None
                }
            };
            info!("Chest {} opened: {:?}", i, item);
            self.events.publish(GameEvent::ChestOpened { chest: i, item });
        }

        if !self.exit_reached
            && self
                .doors
                .iter()
                .any(|door| door.kind == DoorKind::Exit && door.bounds.overlaps(&bounds))
        {
            self.exit_reached = true;
            info!("{} reached the exit after {:.1}s", player.id(), self.elapsed);
            self.events.publish(GameEvent::ExitReached { id: player.id() });
        }
    }

    fn prune_dead(&mut self) {
        let before = self.characters.len();
        self.characters
            .retain(|c| c.is_alive() || c.role() == Role::Player);
        let pruned = before - self.characters.len();
        if pruned > 0 {
            debug!("Pruned {} dead characters", pruned);
        }
    }

    // ========================================================================
    // Debug
    // ========================================================================

    /// Developer overlay text.
    #[must_use]
    pub fn dev_info(&self) -> String {
        let mut out = String::new();
        if let Some(player) = self.player() {
            let pos = player.position();
            let vel = player.velocity();
            let _ = writeln!(out, "pos: ({:.1}, {:.1})", pos.x, pos.y);
            let _ = writeln!(out, "vel: ({:.1}, {:.1})", vel.x, vel.y);
            let _ = writeln!(out, "grounded: {}", player.is_grounded());
            let _ = writeln!(out, "hp: {}/{}", player.hp(), player.max_hp());
            let _ = writeln!(out, "mana: {}/{}", player.mana(), player.max_mana());
            let _ = writeln!(out, "stamina: {}/{}", player.stamina(), player.max_stamina());
        }
        for character in self.characters.iter().filter(|c| c.role() != Role::Player) {
            let _ = writeln!(
                out,
                "{} {}: hp {}/{}",
                character.name(),
                character.id(),
                character.hp(),
                character.max_hp()
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::Item;
    use crate::level::LevelConfig;
    use crate::physics::AABB;

    fn floor() -> Vec<Ground> {
        vec![Ground::solid(-1000.0, 300.0, 3000.0, 40.0)]
    }

    fn settle(world: &mut World, frames: usize) {
        for _ in 0..frames {
            world.tick(1.0 / 60.0, &PlayerInput::default());
        }
    }

    #[test]
    fn test_candle_chases_and_hurts_player() {
        let factory = CharacterFactory::default();
        let mut world = World::new(floor(), Arc::clone(factory.tuning()));
        let player = world.spawn(factory.player(Vec2::new(0.0, 200.0)));
        world.spawn(factory.candle(Vec2::new(300.0, 170.0)));

        settle(&mut world, 400);

        let hp = world.character(player).map(Character::hp).expect("player");
        assert!(hp < 100, "player hp {hp}");
        let events = world.drain_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::CharacterDamaged { target, .. } if *target == player)));
    }

    #[test]
    fn test_player_kills_candle_and_it_is_pruned() {
        let factory = CharacterFactory::default();
        let mut world = World::new(floor(), Arc::clone(factory.tuning()));
        world.spawn(factory.player(Vec2::new(0.0, 200.0)));
        let candle = world.spawn(factory.candle(Vec2::new(40.0, 170.0)));
        settle(&mut world, 30);

        if let Some(c) = world.character_mut(candle) {
            c.take_damage(45);
        }
        let direction = {
            let p = world.player().expect("player").bounds().center();
            let c = world.character(candle).expect("candle").bounds().center();
            if c.x >= p.x { 1.0 } else { -1.0 }
        };

        let mut died = false;
        for _ in 0..120 {
            let input = PlayerInput {
                horizontal: direction * 0.1,
                attack: true,
                ..PlayerInput::default()
            };
            world.tick(1.0 / 60.0, &input);
            if world
                .drain_events()
                .iter()
                .any(|e| *e == GameEvent::CharacterDied { id: candle })
            {
                died = true;
                break;
            }
        }
        assert!(died);
        assert!(world.character(candle).is_none());
        assert!(world.player_alive());
    }

    #[test]
    fn test_equal_force_characters_do_not_pass_through() {
        let factory = CharacterFactory::default();
        let mut world = World::new(floor(), Arc::clone(factory.tuning()));
        let player = world.spawn(factory.player(Vec2::new(0.0, 200.0)).with_force(1.0));
        let candle = world.spawn(factory.candle(Vec2::new(200.0, 170.0)));

        let bounds = |world: &World, id| world.character(id).map(Character::bounds).expect("alive");
        let mut closest = f32::MAX;
        for frame in 0..240 {
            world.tick(1.0 / 60.0, &PlayerInput::walk(1.0));
            let (p, c) = (bounds(&world, player), bounds(&world, candle));
            assert!(
                p.center().x < c.center().x,
                "frame {frame}: player {p:?} candle {c:?}"
            );
            closest = closest.min(c.min_x - p.max_x);
        }
        assert!(closest < 1.0, "never met: gap {closest}");
    }

    #[test]
    fn test_chest_goes_to_inventory_once() {
        let factory = CharacterFactory::default();
        let mut world = World::new(floor(), Arc::clone(factory.tuning()));
        world.spawn(factory.player(Vec2::new(0.0, 200.0)));
        world.add_chest(Chest {
            bounds: AABB::from_rect(0.0, 172.0, 128.0, 128.0),
            loot: Item::SMALL_HEALTH_POTION,
            opened: false,
        });

        settle(&mut world, 10);
        let opened: Vec<_> = world
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::ChestOpened { .. }))
            .collect();
        assert_eq!(
            opened,
            vec![GameEvent::ChestOpened {
                chest: 0,
                item: Some(Item::SMALL_HEALTH_POTION)
            }]
        );
        let player = world.player().expect("player");
        assert_eq!(player.inventory().count(Item::SMALL_HEALTH_POTION.type_id()), 1);
    }

    #[test]
    fn test_item_use_from_input() {
        let factory = CharacterFactory::default();
        let mut world = World::new(floor(), Arc::clone(factory.tuning()));
        let mut player = factory.player(Vec2::new(0.0, 200.0));
        player.take_damage(50);
        player
            .inventory_mut()
            .add(Item::SMALL_HEALTH_POTION)
            .expect("room");
        let id = world.spawn(player);
        world.drain_events();

        let input = PlayerInput {
            use_slot: Some(0),
            ..PlayerInput::default()
        };
        world.tick(1.0 / 60.0, &input);
        assert_eq!(world.character(id).map(Character::hp), Some(80));
        assert!(world.drain_events().contains(&GameEvent::ItemUsed {
            id,
            item: Item::SMALL_HEALTH_POTION
        }));

        world.tick(1.0 / 60.0, &input);
        assert_eq!(world.character(id).map(Character::hp), Some(80));
    }

    #[test]
    fn test_exit_door_reported_once() {
        let factory = CharacterFactory::default();
        let mut world = World::new(floor(), Arc::clone(factory.tuning()));
        world.spawn(factory.player(Vec2::new(0.0, 200.0)));
        world.add_door(Door {
            kind: DoorKind::Exit,
            bounds: AABB::from_rect(0.0, 204.0, 64.0, 96.0),
        });

        settle(&mut world, 5);
        assert!(world.exit_reached());
        let exits = world
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::ExitReached { .. }))
            .count();
        assert_eq!(exits, 1);
    }

    #[test]
    fn test_generated_level_runs() {
        let factory = CharacterFactory::default();
        let level = Level::generate(&LevelConfig::default(), 1234).expect("level");
        let mut world = World::from_level(&level, &factory);
        assert_eq!(world.characters().len(), 1 + level.enemy_spawns().len());

        settle(&mut world, 120);
        let player = world.player().expect("player");
        assert!(player.is_grounded());
        let entry = level.maze().entry();
        let tile = crate::block::tile_rect(entry.0, entry.1, level.config());
        assert!(tile.overlaps(&player.bounds()));
        assert!(world.dev_info().contains("grounded: true"));
    }
}
