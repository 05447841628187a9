//! The character record and its per-tick physics and combat.
//!
//! One concrete type serves the player and every enemy; control differs only
//! through [`Behavior`]. A tick is `update(dt, grounds)`: reset contacts,
//! apply forces, advance animation, resolve grounds one at a time, apply
//! contact effects, then tick timers.
//!
//! `previous_position` is the position at the start of the latest `update`,
//! before forces were integrated. It is read in two places: animation
//! direction sensing (this tick's horizontal delta) and equal-force stalemate
//! rollback in [`Character::resolve_collision_with_character`], which runs
//! after every character has been updated.

use std::sync::Arc;

use keepfall_common::{CharacterId, Vec2};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::animation::{Animator, Direction, Hitbox};
use crate::behavior::{Behavior, Role};
use crate::combat::{
    AttackOutcome, AttackTable, AttackType, CombatConfig, PendingAttack, SuppressReason,
};
use crate::ground::Ground;
use crate::inventory::{Inventory, InventoryResult};
use crate::items::Item;
use crate::physics::{
    collides_with_grounds, resolve_penetration, ContactFlags, ContactSide, PhysicsConfig, AABB,
};
use crate::sight::{has_line_of_sight_with, SightConfig};

/// Tunables shared by every character in a world.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterTuning {
    /// Movement
    pub physics: PhysicsConfig,
    /// Combat timers and costs
    pub combat: CombatConfig,
    /// Line-of-sight sampling
    pub sight: SightConfig,
    /// Attack parameters by type
    pub attacks: AttackTable,
}

/// Dash state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DashState {
    /// Currently dashing
    pub active: bool,
    /// Locked dash direction
    pub direction: Direction,
    /// Remaining dash time
    pub timer: f32,
    /// Time until the next dash is allowed
    pub cooldown: f32,
    /// Re-armed on landing
    pub can_dash: bool,
}

impl Default for DashState {
    fn default() -> Self {
        Self {
            active: false,
            direction: Direction::Right,
            timer: 0.0,
            cooldown: 0.0,
            can_dash: true,
        }
    }
}

/// Outcome of character-vs-character push resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PushOutcome {
    /// Bounds do not overlap
    Separate,
    /// `self` pushed `other` by this offset
    PushedOther(Vec2),
    /// `other` pushed `self` by this offset
    PushedSelf(Vec2),
    /// The push would have moved the weaker character into solid ground
    Blocked,
    /// Equal force: both rolled back to their previous positions
    Stalemate,
}

/// A player or enemy.
#[derive(Debug, Clone)]
pub struct Character {
    id: CharacterId,
    name: String,
    behavior: Behavior,

    hp: i32,
    max_hp: i32,
    mana: i32,
    max_mana: i32,
    stamina: i32,
    max_stamina: i32,
    stamina_pool: f32,
    speed: f32,
    force: f32,
    damage_bonus: i32,

    position: Vec2,
    velocity: Vec2,
    previous_position: Vec2,
    sprite_scale: f32,
    contacts: ContactFlags,
    grounded: bool,
    on_ladder: bool,
    climbing: bool,
    dash: DashState,

    stun_timer: f32,
    knockback_timer: f32,
    damage_flash_timer: f32,
    attack_cooldown: f32,
    attack_box: Option<AABB>,
    attack_box_timer: f32,
    pending_attack: Option<PendingAttack>,

    animator: Animator,
    inventory: Inventory,
    tuning: Arc<CharacterTuning>,
}

impl Character {
    /// Creates a character at the origin with 100 hp and no mana.
    #[must_use]
    pub fn new(name: impl Into<String>, behavior: Behavior, tuning: Arc<CharacterTuning>) -> Self {
        Self {
            id: CharacterId::new(),
            name: name.into(),
            behavior,
            hp: 100,
            max_hp: 100,
            mana: 0,
            max_mana: 0,
            stamina: 100,
            max_stamina: 100,
            stamina_pool: 100.0,
            speed: 200.0,
            force: 1.0,
            damage_bonus: 0,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            previous_position: Vec2::ZERO,
            sprite_scale: 1.0,
            contacts: ContactFlags::default(),
            grounded: false,
            on_ladder: false,
            climbing: false,
            dash: DashState::default(),
            stun_timer: 0.0,
            knockback_timer: 0.0,
            damage_flash_timer: 0.0,
            attack_cooldown: 0.0,
            attack_box: None,
            attack_box_timer: 0.0,
            pending_attack: None,
            animator: Animator::default(),
            inventory: Inventory::default(),
            tuning,
        }
    }

    /// Place the character; previous position is set too.
    #[must_use]
    pub fn with_position(mut self, position: Vec2) -> Self {
        self.set_position(position);
        self
    }

    /// Set maximum and current hit points.
    #[must_use]
    pub fn with_hp(mut self, max_hp: i32) -> Self {
        self.max_hp = max_hp.max(1);
        self.hp = self.max_hp;
        self
    }

    /// Set maximum and current mana.
    #[must_use]
    pub fn with_mana(mut self, max_mana: i32) -> Self {
        self.max_mana = max_mana.max(0);
        self.mana = self.max_mana;
        self
    }

    /// Set maximum and current stamina.
    #[must_use]
    pub fn with_stamina(mut self, max_stamina: i32) -> Self {
        self.max_stamina = max_stamina.max(0);
        self.stamina = self.max_stamina;
        self.stamina_pool = self.max_stamina as f32;
        self
    }

    /// Set walking speed in px/s.
    #[must_use]
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Set push priority.
    #[must_use]
    pub fn with_force(mut self, force: f32) -> Self {
        self.force = force;
        self
    }

    /// Set the sprite scale applied to hitboxes.
    #[must_use]
    pub fn with_sprite_scale(mut self, scale: f32) -> Self {
        self.sprite_scale = scale;
        self
    }

    /// Set the animation state machine.
    #[must_use]
    pub fn with_animator(mut self, animator: Animator) -> Self {
        self.animator = animator;
        self
    }

    /// Replace the inventory.
    #[must_use]
    pub fn with_inventory(mut self, inventory: Inventory) -> Self {
        self.inventory = inventory;
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Unique id.
    #[must_use]
    pub fn id(&self) -> CharacterId {
        self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Control strategy.
    #[must_use]
    pub fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    /// Player or non-player.
    #[must_use]
    pub fn role(&self) -> Role {
        self.behavior.role()
    }

    /// Shared tunables.
    #[must_use]
    pub fn tuning(&self) -> &CharacterTuning {
        &self.tuning
    }

    /// Current hit points.
    #[must_use]
    pub fn hp(&self) -> i32 {
        self.hp
    }

    /// Maximum hit points.
    #[must_use]
    pub fn max_hp(&self) -> i32 {
        self.max_hp
    }

    /// Current mana.
    #[must_use]
    pub fn mana(&self) -> i32 {
        self.mana
    }

    /// Maximum mana.
    #[must_use]
    pub fn max_mana(&self) -> i32 {
        self.max_mana
    }

    /// Current stamina, rounded down.
    #[must_use]
    pub fn stamina(&self) -> i32 {
        self.stamina
    }

    /// Maximum stamina.
    #[must_use]
    pub fn max_stamina(&self) -> i32 {
        self.max_stamina
    }

    /// Walking speed.
    #[must_use]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Push priority.
    #[must_use]
    pub fn force(&self) -> f32 {
        self.force
    }

    /// Damage added to every hit.
    #[must_use]
    pub fn damage_bonus(&self) -> i32 {
        self.damage_bonus
    }

    /// Sprite top-left in world space.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Position at the end of the last update.
    #[must_use]
    pub fn previous_position(&self) -> Vec2 {
        self.previous_position
    }

    /// Velocity in px/s.
    #[must_use]
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Contact flags from the last update.
    #[must_use]
    pub fn contacts(&self) -> ContactFlags {
        self.contacts
    }

    /// Contacts as `[top, bottom, left, right]`.
    #[must_use]
    pub fn contact_array(&self) -> [bool; 4] {
        self.contacts.as_array()
    }

    /// Standing on solid ground.
    #[must_use]
    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    /// Overlapping a ladder.
    #[must_use]
    pub fn is_on_ladder(&self) -> bool {
        self.on_ladder
    }

    /// Climbing a ladder.
    #[must_use]
    pub fn is_climbing(&self) -> bool {
        self.climbing
    }

    /// Dash is armed (landed since the last dash).
    #[must_use]
    pub fn can_dash(&self) -> bool {
        self.dash.can_dash
    }

    /// Dash state.
    #[must_use]
    pub fn dash(&self) -> &DashState {
        &self.dash
    }

    /// Hit points above zero.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Stun timer running.
    #[must_use]
    pub fn is_stunned(&self) -> bool {
        self.stun_timer > 0.0
    }

    /// Remaining stun.
    #[must_use]
    pub fn stun_timer(&self) -> f32 {
        self.stun_timer
    }

    /// Remaining knockback.
    #[must_use]
    pub fn knockback_timer(&self) -> f32 {
        self.knockback_timer
    }

    /// Damage flash running.
    #[must_use]
    pub fn is_damage_flashing(&self) -> bool {
        self.damage_flash_timer > 0.0
    }

    /// Remaining attack cooldown.
    #[must_use]
    pub fn attack_cooldown(&self) -> f32 {
        self.attack_cooldown
    }

    /// Last attack box, while its display timer runs.
    #[must_use]
    pub fn attack_box(&self) -> Option<AABB> {
        self.attack_box
    }

    /// Whether an attack box is being displayed.
    #[must_use]
    pub fn has_active_attack_box(&self) -> bool {
        self.attack_box.is_some()
    }

    /// The hit in flight, if any.
    #[must_use]
    pub fn pending_attack(&self) -> Option<&PendingAttack> {
        self.pending_attack.as_ref()
    }

    /// Animation state machine.
    #[must_use]
    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    /// Last facing direction.
    #[must_use]
    pub fn facing(&self) -> Direction {
        self.animator.facing()
    }

    /// Carried items.
    #[must_use]
    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Carried items, mutably.
    pub fn inventory_mut(&mut self) -> &mut Inventory {
        &mut self.inventory
    }

    /// Cosmetic draw position: position plus the clip's sprite offset.
    #[must_use]
    pub fn draw_position(&self) -> Vec2 {
        self.position + self.animator.sprite_offset()
    }

    /// Collision and combat box from the active animation hitbox.
    #[must_use]
    pub fn bounds(&self) -> AABB {
        self.bounds_at(self.position)
    }

    /// Collision box if the character stood at `position`.
    #[must_use]
    pub fn bounds_at(&self, position: Vec2) -> AABB {
        let Hitbox {
            x,
            y,
            width,
            height,
        } = self.animator.active_hitbox();
        let s = self.sprite_scale;
        AABB::from_rect(position.x + x * s, position.y + y * s, width * s, height * s)
    }

    // ------------------------------------------------------------------
    // Directives
    // ------------------------------------------------------------------

    /// Teleport; previous position follows so no movement is sensed.
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
        self.previous_position = position;
    }

    /// Set horizontal velocity from an axis in `[-1, 1]`.
    ///
    /// Ignored while stunned or knocked back.
    pub fn move_horizontal(&mut self, axis: f32) {
        if self.is_stunned() || self.knockback_timer > 0.0 {
            return;
        }
        self.velocity.x = axis.clamp(-1.0, 1.0) * self.speed;
    }

    /// Jump if grounded and not stunned.
    pub fn jump(&mut self) -> bool {
        if !self.grounded || self.is_stunned() {
            return false;
        }
        self.velocity.y = -self.tuning.physics.jump_strength;
        self.grounded = false;
        true
    }

    /// Start a dash if armed, off cooldown, not stunned and stamina allows.
    pub fn start_dash(&mut self, direction: Direction) -> bool {
        if self.is_stunned() || !self.dash.can_dash || self.dash.cooldown > 0.0 || self.dash.active
        {
            return false;
        }
        if !self.consume_stamina(self.tuning.combat.dash_stamina_cost) {
            trace!("{} dash refused: no stamina", self.id);
            return false;
        }
        let physics = &self.tuning.physics;
        self.dash = DashState {
            active: true,
            direction,
            timer: physics.dash_duration,
            cooldown: physics.dash_cooldown,
            can_dash: false,
        };
        true
    }

    /// Climb with a vertical axis (`-1` up, `1` down) while on a ladder.
    pub fn climb(&mut self, axis: f32) {
        if self.is_stunned() {
            return;
        }
        if self.on_ladder && axis != 0.0 {
            self.climbing = true;
            self.velocity.y = axis.clamp(-1.0, 1.0) * self.tuning.physics.climb_speed;
        } else if self.climbing {
            self.velocity.y = 0.0;
        }
    }

    /// Enter or leave climbing; entering requires ladder overlap.
    pub fn set_climbing(&mut self, climbing: bool) {
        if self.is_stunned() {
            return;
        }
        self.climbing = climbing && self.on_ladder;
        if self.climbing {
            self.velocity.y = 0.0;
        }
    }

    /// Swing at the first qualifying target.
    ///
    /// A target qualifies when it is alive, is not `self`, overlaps the attack
    /// box and is in line of sight. Scanning stops at the first match. If a
    /// hit is already pending, the swing still happens but queues nothing.
    pub fn attack<'a, I>(
        &mut self,
        direction: Direction,
        targets: I,
        attack_type: AttackType,
        grounds: &[Ground],
    ) -> AttackOutcome
    where
        I: IntoIterator<Item = &'a Character>,
    {
        if self.is_stunned() {
            return AttackOutcome::Suppressed(SuppressReason::Stunned);
        }
        if self.attack_cooldown > 0.0 {
            return AttackOutcome::Suppressed(SuppressReason::Cooldown);
        }

        let tuning = Arc::clone(&self.tuning);
        let is_player = self.role() == Role::Player;
        if is_player && !self.consume_stamina(tuning.combat.attack_stamina_cost) {
            return AttackOutcome::Suppressed(SuppressReason::NoStamina);
        }

        let data = tuning.attacks.get(attack_type);
        let bounds = self.bounds();
        let attack_box = data.attack_box(&bounds, direction);

        self.animator.start_attack(direction);
        self.attack_box = Some(attack_box);
        self.attack_box_timer = tuning.combat.attack_box_display;
        self.attack_cooldown = if is_player {
            tuning.combat.player_attack_cooldown
        } else {
            data.cooldown
        };

        if self.pending_attack.is_some() {
            debug!("{} attack dropped: hit already pending", self.id);
            return AttackOutcome::SlotBusy;
        }

        let origin = bounds.center();
        let target = targets.into_iter().find(|target| {
            target.id != self.id
                && target.is_alive()
                && target.bounds().overlaps(&attack_box)
                && has_line_of_sight_with(&tuning.sight, origin, target.bounds().center(), grounds)
        });

        let Some(target) = target else {
            return AttackOutcome::Whiffed;
        };

        self.pending_attack = Some(PendingAttack {
            target: target.id,
            timer: data.delay,
            damage: data.damage.saturating_add(self.damage_bonus),
            direction,
            knockback: data.knockback,
            stun: data.stun,
        });
        debug!("{} queued {:?} on {}", self.id, attack_type, target.id);
        AttackOutcome::Queued(target.id)
    }

    // ------------------------------------------------------------------
    // Effect surface
    // ------------------------------------------------------------------

    /// Lose hit points (never below zero), flash, and get stunned.
    pub fn take_damage(&mut self, damage: i32) {
        let combat = &self.tuning.combat;
        self.hp = (self.hp - damage.max(0)).max(0);
        self.damage_flash_timer = combat.damage_flash_duration;
        self.stun_timer = self.stun_timer.max(combat.hit_stun);
    }

    /// Hold a horizontal knockback velocity for `duration`.
    pub fn apply_knockback(&mut self, velocity_x: f32, duration: f32) {
        self.velocity.x = velocity_x;
        self.knockback_timer = duration;
    }

    /// Raise the stun timer to at least `duration`.
    pub fn raise_stun(&mut self, duration: f32) {
        self.stun_timer = self.stun_timer.max(duration);
    }

    /// Regain hit points up to the maximum.
    pub fn heal(&mut self, amount: i32) {
        self.hp = self.hp.saturating_add(amount.max(0)).min(self.max_hp);
    }

    /// Regain mana up to the maximum.
    pub fn restore_mana(&mut self, amount: i32) {
        self.mana = self.mana.saturating_add(amount.max(0)).min(self.max_mana);
    }

    /// Raise maximum hit points and current hit points by the same amount.
    pub fn increase_max_hp(&mut self, amount: i32) {
        let amount = amount.max(0);
        self.max_hp = self.max_hp.saturating_add(amount);
        self.hp = self.hp.saturating_add(amount).min(self.max_hp);
    }

    /// Add to the damage of every future hit.
    pub fn add_damage_bonus(&mut self, amount: i32) {
        self.damage_bonus = self.damage_bonus.saturating_add(amount);
    }

    /// Spend stamina if enough is available.
    pub fn consume_stamina(&mut self, amount: i32) -> bool {
        let amount = amount.max(0) as f32;
        if self.stamina_pool < amount {
            return false;
        }
        self.stamina_pool -= amount;
        self.stamina = self.stamina_pool as i32;
        true
    }

    /// Regenerate stamina for `dt` seconds.
    pub fn regen_stamina(&mut self, dt: f32) {
        let max = self.max_stamina as f32;
        let regen = self.tuning.combat.stamina_regen_per_sec * dt;
        self.stamina_pool = (self.stamina_pool + regen).min(max);
        self.stamina = self.stamina_pool as i32;
    }

    /// Use one item from an inventory slot.
    pub fn use_item(&mut self, slot: usize) -> InventoryResult<Item> {
        let item = self.inventory.take_one(slot)?;
        item.apply_effect(self);
        debug!("{} used {}", self.id, item.name());
        Ok(item)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Whether the character's box at `position` would overlap solid ground.
    #[must_use]
    pub fn would_collide_with_grounds_at(&self, position: Vec2, grounds: &[Ground]) -> bool {
        collides_with_grounds(
            &self.bounds_at(position),
            grounds,
            self.tuning.physics.skin_width,
        )
    }

    /// Line of sight between the centers of both characters.
    #[must_use]
    pub fn has_line_of_sight_to(&self, other: &Character, grounds: &[Ground]) -> bool {
        has_line_of_sight_with(
            &self.tuning.sight,
            self.bounds().center(),
            other.bounds().center(),
            grounds,
        )
    }

    // ------------------------------------------------------------------
    // Character vs character
    // ------------------------------------------------------------------

    /// Separate two overlapping characters.
    ///
    /// The one with strictly greater force pushes the other out along the
    /// axis of minimum penetration, unless that would put the weaker one into
    /// solid ground. Equal force undoes both characters' movement from the
    /// latest `update` and stops them.
    pub fn resolve_collision_with_character(
        &mut self,
        other: &mut Character,
        grounds: &[Ground],
    ) -> PushOutcome {
        let mine = self.bounds();
        let theirs = other.bounds();
        if !mine.overlaps(&theirs) {
            return PushOutcome::Separate;
        }

        if self.force > other.force {
            match push_out(other, &theirs, &mine, grounds) {
                Some(push) => PushOutcome::PushedOther(push),
                None => PushOutcome::Blocked,
            }
        } else if other.force > self.force {
            match push_out(self, &mine, &theirs, grounds) {
                Some(push) => PushOutcome::PushedSelf(push),
                None => PushOutcome::Blocked,
            }
        } else {
            for character in [&mut *self, &mut *other] {
                character.position = character.previous_position;
                character.velocity = Vec2::ZERO;
            }
            PushOutcome::Stalemate
        }
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Advance one tick.
    ///
    /// Returns the pending attack once its delay has elapsed; the slot is
    /// cleared and the caller re-checks and applies it with
    /// [`crate::combat::resolve_pending_attack`].
    pub fn update(&mut self, dt: f32, grounds: &[Ground]) -> Option<PendingAttack> {
        self.contacts = ContactFlags::default();
        self.on_ladder = false;
        self.previous_position = self.position;

        self.apply_forces(dt);

        let dx = self.position.x - self.previous_position.x;
        self.animator.advance(dt, dx);

        self.resolve_grounds(grounds);
        self.apply_contact_effects();

        if self.climbing {
            self.velocity.y = 0.0;
        }

        self.tick_timers(dt)
    }

    fn apply_forces(&mut self, dt: f32) {
        let tuning = Arc::clone(&self.tuning);
        let physics = &tuning.physics;

        if self.dash.active {
            self.apply_gravity(physics, dt);
            self.position.x += self.dash.direction.sign() * physics.dash_speed * dt;
            self.position.y += self.velocity.y * dt;
            self.dash.timer -= dt;
            if self.dash.timer <= 0.0 {
                self.dash.active = false;
                self.dash.timer = 0.0;
            }
        } else if self.climbing {
            self.position += self.velocity * dt;
        } else {
            self.apply_gravity(physics, dt);
            self.position += self.velocity * dt;
        }
    }

    fn apply_gravity(&mut self, physics: &PhysicsConfig, dt: f32) {
        if !self.grounded {
            self.velocity.y =
                (self.velocity.y + physics.gravity * dt).min(physics.terminal_velocity);
        }
    }

    fn resolve_grounds(&mut self, grounds: &[Ground]) {
        let skin = self.tuning.physics.skin_width;
        for ground in grounds {
            let bounds = self.bounds();
            if ground.ladder {
                if bounds.overlaps(&ground.bounds) {
                    self.on_ladder = true;
                }
                continue;
            }
            if !ground.solid {
                continue;
            }

            let Some(contact) = resolve_penetration(&bounds, &ground.bounds, skin) else {
                continue;
            };
            self.position += contact.push;
            self.contacts.set(contact.side);
            match contact.side {
                ContactSide::Bottom if self.velocity.y > 0.0 => self.velocity.y = 0.0,
                ContactSide::Top if self.velocity.y < 0.0 => self.velocity.y = 0.0,
                _ => {}
            }
        }
    }

    fn apply_contact_effects(&mut self) {
        if self.contacts.bottom {
            self.velocity.y = self.velocity.y.min(0.0);
            self.grounded = true;
            self.dash.can_dash = true;
        } else {
            self.grounded = false;
        }
        if self.contacts.top {
            self.velocity.y = self.velocity.y.max(0.0);
        }
        if self.contacts.left || self.contacts.right {
            self.velocity.x = 0.0;
        }
        if !self.on_ladder {
            self.climbing = false;
        }
    }

    fn tick_timers(&mut self, dt: f32) -> Option<PendingAttack> {
        tick_down(&mut self.dash.cooldown, dt);
        tick_down(&mut self.attack_cooldown, dt);
        tick_down(&mut self.stun_timer, dt);
        tick_down(&mut self.damage_flash_timer, dt);

        if self.knockback_timer > 0.0 && tick_down(&mut self.knockback_timer, dt) {
            self.velocity.x = 0.0;
        }
        if self.attack_box.is_some() {
            tick_down(&mut self.attack_box_timer, dt);
            if self.attack_box_timer <= 0.0 {
                self.attack_box = None;
            }
        }

        self.regen_stamina(dt);

        let elapsed = self
            .pending_attack
            .as_mut()
            .is_some_and(|pending| pending.tick(dt));
        if elapsed {
            return self.pending_attack.take();
        }
        None
    }
}

/// Counts a timer down to zero; true when it reached zero on this call.
fn tick_down(timer: &mut f32, dt: f32) -> bool {
    if *timer <= 0.0 {
        return false;
    }
    *timer = (*timer - dt).max(0.0);
    *timer == 0.0
}

/// Pushes `weak` out of `strong` unless that lands it in solid ground.
fn push_out(
    weak: &mut Character,
    weak_bounds: &AABB,
    strong_bounds: &AABB,
    grounds: &[Ground],
) -> Option<Vec2> {
    let push = weak_bounds.penetration(strong_bounds)?;
    let candidate = weak.position + push;
    if weak.would_collide_with_grounds_at(candidate, grounds) {
        trace!("Push of {} dropped: blocked by ground", weak.id);
        return None;
    }
    weak.position = candidate;
    Some(push)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::ChaseAi;
    use proptest::prelude::*;

    const DT: f32 = 1.0 / 60.0;

    fn tuning() -> Arc<CharacterTuning> {
        Arc::new(CharacterTuning::default())
    }

    /// 20x40 box whose bounds equal its position rect.
    fn body(behavior: Behavior) -> Character {
        Character::new("body", behavior, tuning())
            .with_animator(Animator::new(Hitbox::new(0.0, 0.0, 20.0, 40.0)))
    }

    fn player_at(x: f32, y: f32) -> Character {
        body(Behavior::PlayerControlled).with_position(Vec2::new(x, y))
    }

    fn npc_at(x: f32, y: f32) -> Character {
        body(Behavior::ChaseAndMelee(ChaseAi::default())).with_position(Vec2::new(x, y))
    }

    fn floor() -> Vec<Ground> {
        vec![Ground::solid(-1000.0, 100.0, 2000.0, 16.0)]
    }

    fn settle(c: &mut Character, grounds: &[Ground]) {
        for _ in 0..120 {
            c.update(DT, grounds);
        }
    }

    #[test]
    fn test_falls_and_lands_on_floor() {
        let grounds = floor();
        let mut c = player_at(0.0, 0.0);
        settle(&mut c, &grounds);

        assert!(c.is_grounded());
        assert!((c.bounds().max_y - 100.0).abs() < 1.0e-3);
        assert_eq!(c.velocity().y, 0.0);
        assert_eq!(c.contact_array(), [false, true, false, false]);
    }

    #[test]
    fn test_zero_dt_is_idempotent() {
        let grounds = floor();
        let mut c = player_at(0.0, 0.0);
        settle(&mut c, &grounds);

        let position = c.position();
        let contacts = c.contacts();
        c.update(0.0, &grounds);
        c.update(0.0, &grounds);
        assert_eq!(c.position(), position);
        assert_eq!(c.contacts(), contacts);
    }

    #[test]
    fn test_wall_contact_stops_horizontal_motion() {
        let mut grounds = floor();
        grounds.push(Ground::solid(50.0, 0.0, 20.0, 100.0));
        let mut c = player_at(0.0, 60.0);
        settle(&mut c, &grounds);

        for _ in 0..30 {
            c.move_horizontal(1.0);
            c.update(DT, &grounds);
            assert!(c.bounds().max_x <= 50.0 + 1.0e-3);
        }
        assert!(c.contacts().right);
        assert_eq!(c.velocity().x, 0.0);
    }

    #[test]
    fn test_ceiling_clamps_upward_velocity() {
        let grounds = vec![Ground::solid(-100.0, -20.0, 200.0, 20.0)];
        let mut c = player_at(0.0, 5.0);
        c.velocity.y = -600.0;
        c.update(DT, &grounds);

        assert!(c.contacts().top);
        assert!(c.velocity().y >= 0.0);
        assert!(c.bounds().min_y >= -1.0e-3);
    }

    #[test]
    fn test_jump_requires_ground() {
        let grounds = floor();
        let mut c = player_at(0.0, 0.0);
        assert!(!c.jump());
        settle(&mut c, &grounds);
        assert!(c.jump());
        assert!(c.velocity().y < 0.0);
    }

    #[test]
    fn test_dash_rearms_on_landing() {
        let grounds = floor();
        let mut c = player_at(0.0, 0.0);
        settle(&mut c, &grounds);

        assert!(c.jump());
        c.update(DT, &grounds);
        assert!(!c.is_grounded());
        assert!(c.start_dash(Direction::Right));
        assert!(!c.can_dash());

        let mut landed = false;
        for _ in 0..240 {
            c.update(DT, &grounds);
            if c.contacts().bottom {
                landed = true;
                break;
            }
        }
        assert!(landed);
        assert!(c.can_dash());
    }

    #[test]
    fn test_dash_moves_at_dash_speed_and_expires() {
        let grounds = floor();
        let mut c = player_at(0.0, 60.0);
        settle(&mut c, &grounds);
        let start = c.position().x;

        assert!(c.start_dash(Direction::Left));
        c.update(0.1, &grounds);
        assert!((start - c.position().x - 120.0).abs() < 1.0e-3);
        c.update(0.1, &grounds);
        assert!(!c.dash().active);
        // Cooldown blocks a second dash.
        assert!(!c.start_dash(Direction::Left));
    }

    #[test]
    fn test_dash_costs_stamina() {
        let mut c = player_at(0.0, 0.0).with_stamina(10);
        c.dash.can_dash = true;
        assert!(!c.start_dash(Direction::Right));
        assert_eq!(c.stamina(), 10);
    }

    #[test]
    fn test_ladder_climb_suppresses_gravity() {
        let mut grounds = floor();
        grounds.push(Ground::ladder(-10.0, -200.0, 40.0, 300.0));
        let mut c = player_at(0.0, -100.0);
        c.update(DT, &grounds);
        assert!(c.is_on_ladder());

        c.climb(-1.0);
        let y = c.position().y;
        c.update(DT, &grounds);
        assert!(c.position().y < y);
        assert_eq!(c.velocity().y, 0.0);

        // Holding still on the ladder does not fall.
        c.climb(0.0);
        let y = c.position().y;
        c.update(DT, &grounds);
        assert_eq!(c.position().y, y);
    }

    #[test]
    fn test_leaving_ladder_stops_climbing() {
        let grounds = vec![Ground::ladder(-10.0, -200.0, 40.0, 300.0)];
        let mut c = player_at(0.0, -100.0);
        c.update(DT, &grounds);
        c.climb(-1.0);
        assert!(c.is_climbing());
        c.set_position(Vec2::new(500.0, -100.0));
        c.update(DT, &grounds);
        assert!(!c.is_climbing());
    }

    #[test]
    fn test_attack_queues_first_target_in_order() {
        let mut attacker = player_at(0.0, 0.0);
        let first = npc_at(25.0, 0.0);
        let second = npc_at(30.0, 0.0);

        let outcome = attacker.attack(Direction::Right, [&first, &second], AttackType::Sword, &[]);
        assert_eq!(outcome, AttackOutcome::Queued(first.id()));
        assert!(attacker.has_active_attack_box());
        assert_eq!(attacker.stamina(), 85);
        assert_eq!(attacker.attack_cooldown(), 0.25);
    }

    #[test]
    fn test_attack_ignores_self_dead_and_occluded_targets() {
        let mut attacker = player_at(0.0, 0.0);
        let me = attacker.clone();
        let mut dead = npc_at(25.0, 0.0);
        dead.take_damage(1000);
        let behind_wall = npc_at(60.0, 0.0);
        let wall = vec![Ground::solid(40.0, -50.0, 10.0, 200.0)];

        let outcome = attacker.attack(
            Direction::Right,
            [&me, &dead, &behind_wall],
            AttackType::Sword,
            &wall,
        );
        assert_eq!(outcome, AttackOutcome::Whiffed);
        assert!(attacker.pending_attack().is_none());
        assert!(attacker.has_active_attack_box());
    }

    #[test]
    fn test_second_attack_does_not_overwrite_pending_hit() {
        let grounds: Vec<Ground> = Vec::new();
        let mut attacker = npc_at(0.0, 0.0);
        let mut first = npc_at(25.0, 0.0);
        let mut second = npc_at(-30.0, 0.0);

        let outcome = attacker.attack(Direction::Right, [&first], AttackType::Sword, &grounds);
        assert_eq!(outcome, AttackOutcome::Queued(first.id()));

        // Bypass the cooldown so only the busy slot can stop the second hit.
        attacker.attack_cooldown = 0.0;
        let outcome = attacker.attack(Direction::Left, [&second], AttackType::Sword, &grounds);
        assert_eq!(outcome, AttackOutcome::SlotBusy);

        let hit = attacker
            .update(0.2, &grounds)
            .expect("first hit elapses");
        assert_eq!(hit.target, first.id());
        let combat = CombatConfig::default();
        crate::combat::resolve_pending_attack(&hit, &attacker.bounds(), &mut first, &combat);

        for _ in 0..60 {
            assert!(attacker.update(DT, &grounds).is_none());
        }
        assert_eq!(first.hp(), 80);
        assert_eq!(second.hp(), second.max_hp());
        second.update(DT, &grounds);
        assert_eq!(second.hp(), second.max_hp());
    }

    #[test]
    fn test_damage_bonus_adds_to_queued_hit() {
        let mut attacker = npc_at(0.0, 0.0);
        attacker.add_damage_bonus(7);
        let target = npc_at(25.0, 0.0);
        attacker.attack(Direction::Right, [&target], AttackType::Sword, &[]);
        assert_eq!(attacker.pending_attack().map(|p| p.damage), Some(27));
    }

    #[test]
    fn test_stun_suppresses_directives() {
        let grounds = floor();
        let mut c = player_at(0.0, 0.0);
        settle(&mut c, &grounds);
        let target = npc_at(25.0, 60.0);
        c.take_damage(1);

        let velocity = c.velocity();
        let stamina = c.stamina();
        let dash = *c.dash();
        let cooldown = c.attack_cooldown();
        let stun = c.stun_timer();

        let outcome = c.attack(Direction::Right, [&target], AttackType::Sword, &grounds);
        assert_eq!(outcome, AttackOutcome::Suppressed(SuppressReason::Stunned));
        assert!(!c.start_dash(Direction::Right));
        c.move_horizontal(1.0);
        assert!(!c.jump());

        assert_eq!(c.velocity(), velocity);
        assert_eq!(c.stamina(), stamina);
        assert_eq!(*c.dash(), dash);
        assert_eq!(c.attack_cooldown(), cooldown);
        assert_eq!(c.stun_timer(), stun);
        assert!(c.pending_attack().is_none());
        assert!(!c.has_active_attack_box());

        // Stun wears off and actions work again.
        for _ in 0..30 {
            c.update(DT, &grounds);
        }
        assert!(!c.is_stunned());
        c.move_horizontal(1.0);
        assert!(c.velocity().x > 0.0);
    }

    #[test]
    fn test_cooldown_and_stamina_gate_attacks() {
        let mut c = player_at(0.0, 0.0).with_stamina(20);
        let nobody: [&Character; 0] = [];
        assert!(c.attack(Direction::Right, nobody, AttackType::Sword, &[]).swung());
        assert_eq!(
            c.attack(Direction::Right, nobody, AttackType::Sword, &[]),
            AttackOutcome::Suppressed(SuppressReason::Cooldown)
        );
        c.attack_cooldown = 0.0;
        assert_eq!(
            c.attack(Direction::Right, nobody, AttackType::Sword, &[]),
            AttackOutcome::Suppressed(SuppressReason::NoStamina)
        );
    }

    #[test]
    fn test_knockback_holds_then_clears_velocity() {
        let mut c = npc_at(0.0, 0.0);
        c.apply_knockback(300.0, 0.2);
        c.move_horizontal(-1.0);
        assert_eq!(c.velocity().x, 300.0);
        for _ in 0..15 {
            c.update(DT, &[]);
        }
        assert_eq!(c.knockback_timer(), 0.0);
        assert_eq!(c.velocity().x, 0.0);
    }

    #[test]
    fn test_damage_sequence_to_death() {
        let mut c = player_at(0.0, 0.0).with_hp(100);
        for expected in [70, 40, 10] {
            c.take_damage(30);
            assert_eq!(c.hp(), expected);
            assert!(c.is_alive());
        }
        c.take_damage(30);
        assert_eq!(c.hp(), 0);
        assert!(!c.is_alive());
        assert!(c.is_damage_flashing());
    }

    #[test]
    fn test_stamina_regenerates_to_max() {
        let mut c = player_at(0.0, 0.0);
        assert!(c.consume_stamina(50));
        assert_eq!(c.stamina(), 50);
        c.regen_stamina(0.5);
        assert_eq!(c.stamina(), 62);
        c.regen_stamina(10.0);
        assert_eq!(c.stamina(), c.max_stamina());
    }

    #[test]
    fn test_use_item_applies_effect() {
        let mut c = player_at(0.0, 0.0).with_mana(50);
        c.take_damage(40);
        c.inventory_mut()
            .add(Item::HealthPotion { amount: 25 })
            .expect("room");
        let used = c.use_item(0).expect("item present");
        assert_eq!(used, Item::HealthPotion { amount: 25 });
        assert_eq!(c.hp(), 85);
        assert!(c.use_item(0).is_err());
    }

    #[test]
    fn test_stronger_character_pushes_weaker() {
        let mut strong = player_at(0.0, 0.0).with_force(2.0);
        let mut weak = npc_at(15.0, 0.0);

        let outcome = strong.resolve_collision_with_character(&mut weak, &[]);
        assert_eq!(outcome, PushOutcome::PushedOther(Vec2::new(5.0, 0.0)));
        assert_eq!(weak.position(), Vec2::new(20.0, 0.0));
        assert_eq!(strong.position(), Vec2::ZERO);

        let outcome = weak.resolve_collision_with_character(&mut strong, &[]);
        assert_eq!(outcome, PushOutcome::Separate);
    }

    #[test]
    fn test_push_into_wall_is_dropped() {
        let wall = vec![Ground::solid(35.0, -100.0, 20.0, 300.0)];
        let mut strong = player_at(0.0, 0.0).with_force(2.0);
        let mut weak = npc_at(15.0, 0.0);

        let outcome = strong.resolve_collision_with_character(&mut weak, &wall);
        assert_eq!(outcome, PushOutcome::Blocked);
        assert_eq!(weak.position(), Vec2::new(15.0, 0.0));
    }

    #[test]
    fn test_weaker_self_is_pushed() {
        let mut weak = npc_at(15.0, 0.0);
        let mut strong = player_at(0.0, 0.0).with_force(2.0);
        let outcome = weak.resolve_collision_with_character(&mut strong, &[]);
        assert_eq!(outcome, PushOutcome::PushedSelf(Vec2::new(5.0, 0.0)));
        assert_eq!(weak.position(), Vec2::new(20.0, 0.0));
    }

    #[test]
    fn test_equal_force_bodies_stop_at_contact() {
        let grounds = floor();
        let mut a = npc_at(0.0, 60.0);
        let mut b = npc_at(60.0, 60.0);
        settle(&mut a, &grounds);
        settle(&mut b, &grounds);

        let mut stalemates = 0;
        for _ in 0..60 {
            a.move_horizontal(1.0);
            b.move_horizontal(-1.0);
            let starts = (a.position(), b.position());
            a.update(DT, &grounds);
            b.update(DT, &grounds);

            if a.resolve_collision_with_character(&mut b, &grounds) == PushOutcome::Stalemate {
                stalemates += 1;
                assert_eq!((a.position(), b.position()), starts);
                assert_eq!(a.velocity(), Vec2::ZERO);
                assert_eq!(b.velocity(), Vec2::ZERO);
            }
            assert!(a.bounds().max_x <= b.bounds().min_x + 1.0e-3);
        }
        assert!(stalemates > 0);
    }

    #[test]
    fn test_previous_position_is_start_of_tick() {
        let mut c = player_at(0.0, 0.0);
        c.move_horizontal(1.0);
        let start = c.position();
        c.update(DT, &[]);

        assert_eq!(c.previous_position(), start);
        assert!(c.position().x > start.x);
        assert_eq!(
            c.animator().state(),
            crate::animation::AnimationState::WalkRight
        );
    }

    #[test]
    fn test_attack_box_clears_without_display_time() {
        let mut tuning = CharacterTuning::default();
        tuning.combat.attack_box_display = 0.0;
        let mut c = Character::new("body", Behavior::PlayerControlled, Arc::new(tuning))
            .with_animator(Animator::new(Hitbox::new(0.0, 0.0, 20.0, 40.0)));
        let nobody: [&Character; 0] = [];

        assert!(c.attack(Direction::Right, nobody, AttackType::Sword, &[]).swung());
        assert!(c.has_active_attack_box());
        c.update(DT, &[]);
        assert!(!c.has_active_attack_box());
    }

    #[test]
    fn test_effects_saturate_at_extremes() {
        let mut c = player_at(0.0, 0.0).with_mana(50);
        c.take_damage(10);
        c.heal(i32::MAX);
        assert_eq!(c.hp(), c.max_hp());
        c.restore_mana(i32::MAX);
        assert_eq!(c.mana(), 50);

        c.increase_max_hp(i32::MAX);
        assert_eq!(c.max_hp(), i32::MAX);
        assert_eq!(c.hp(), i32::MAX);

        let mut attacker = npc_at(0.0, 0.0);
        attacker.add_damage_bonus(i32::MAX);
        attacker.add_damage_bonus(1);
        assert_eq!(attacker.damage_bonus(), i32::MAX);
        let target = npc_at(25.0, 0.0);
        attacker.attack(Direction::Right, [&target], AttackType::Sword, &[]);
        assert_eq!(attacker.pending_attack().map(|p| p.damage), Some(i32::MAX));
    }

    #[test]
    fn test_would_collide_ignores_resting_contact() {
        let grounds = floor();
        let c = player_at(0.0, 0.0);
        assert!(!c.would_collide_with_grounds_at(Vec2::new(0.0, 60.0), &grounds));
        assert!(c.would_collide_with_grounds_at(Vec2::new(0.0, 70.0), &grounds));
    }

    /// A closed room: floor, ceiling and both walls, overlapping at the corners.
    fn room(left: f32, top: f32, width: f32, height: f32, wall: f32, slab: f32) -> Vec<Ground> {
        let (right, bottom) = (left + width, top + height);
        let outer_width = width + 2.0 * wall;
        let outer_height = height + 2.0 * slab;
        vec![
            Ground::solid(left - wall, bottom, outer_width, slab),
            Ground::solid(left - wall, top - slab, outer_width, slab),
            Ground::solid(left - wall, top - slab, wall, outer_height),
            Ground::solid(right, top - slab, wall, outer_height),
        ]
    }

    proptest! {
        #[test]
        fn prop_damage_never_goes_negative(
            max_hp in 1i32..500,
            hits in proptest::collection::vec(0i32..1000, 1..8),
        ) {
            let mut c = player_at(0.0, 0.0).with_hp(max_hp);
            for dmg in hits {
                c.take_damage(dmg);
                prop_assert!(c.hp() >= 0);
                prop_assert!(c.hp() <= c.max_hp());
            }
        }

        #[test]
        fn prop_update_never_leaves_character_in_solid_ground(
            left in -500.0f32..500.0,
            top in -300.0f32..300.0,
            width in 60.0f32..400.0,
            height in 80.0f32..400.0,
            wall in 20.0f32..60.0,
            slab in 24.0f32..60.0,
            start in (0.0f32..=1.0, 0.0f32..=1.0),
            vx in -400.0f32..400.0,
            vy in -1800.0f32..1800.0,
            dt in 0.001f32..0.012,
            rotation in 0usize..4,
        ) {
            let mut grounds = room(left, top, width, height, wall, slab);
            grounds.rotate_left(rotation);
            let x = left + start.0 * (width - 20.0);
            let y = top + start.1 * (height - 40.0);
            let mut c = player_at(x, y);
            c.velocity = Vec2::new(vx, vy);

            for _ in 0..40 {
                c.update(dt, &grounds);
                prop_assert!(!c.would_collide_with_grounds_at(c.position(), &grounds));
                let bounds = c.bounds();
                prop_assert!(bounds.min_x >= left - 1.0e-3);
                prop_assert!(bounds.max_x <= left + width + 1.0e-3);
                prop_assert!(bounds.min_y >= top - 1.0e-3);
                prop_assert!(bounds.max_y <= top + height + 1.0e-3);
            }
        }
    }
}
