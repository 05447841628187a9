//! Animation state machine driving the active hitbox.
//!
//! Presentation and physics share one value here: the hitbox of the active
//! clip is the character's collision and combat box. Sprite offsets are
//! cosmetic only and never reach collision.

use ahash::AHashMap;
use keepfall_common::Vec2;
use serde::{Deserialize, Serialize};

/// Horizontal direction for facing, dashes and attacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    /// Towards negative x
    Left,
    /// Towards positive x
    #[default]
    Right,
}

impl Direction {
    /// `-1.0` for left, `1.0` for right.
    #[must_use]
    pub fn sign(self) -> f32 {
        match self {
            Direction::Left => -1.0,
            Direction::Right => 1.0,
        }
    }

    /// Direction pointing along `dx`, or `None` for zero.
    #[must_use]
    pub fn from_dx(dx: f32) -> Option<Self> {
        if dx > 0.0 {
            Some(Direction::Right)
        } else if dx < 0.0 {
            Some(Direction::Left)
        } else {
            None
        }
    }

    /// The other direction.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

/// The mutually exclusive animation states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AnimationState {
    /// Standing still
    #[default]
    Idle,
    /// Moving towards negative x
    WalkLeft,
    /// Moving towards positive x
    WalkRight,
    /// Attacking towards negative x
    AttackLeft,
    /// Attacking towards positive x
    AttackRight,
}

impl AnimationState {
    /// Attack state for a direction.
    #[must_use]
    pub fn attack(direction: Direction) -> Self {
        match direction {
            Direction::Left => Self::AttackLeft,
            Direction::Right => Self::AttackRight,
        }
    }

    /// Walk state for a direction.
    #[must_use]
    pub fn walk(direction: Direction) -> Self {
        match direction {
            Direction::Left => Self::WalkLeft,
            Direction::Right => Self::WalkRight,
        }
    }

    /// Check if this is an attack state.
    #[must_use]
    pub fn is_attack(self) -> bool {
        matches!(self, Self::AttackLeft | Self::AttackRight)
    }
}

/// Hitbox in unscaled sprite pixels, relative to the sprite's top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hitbox {
    /// Offset from the sprite's left edge
    pub x: f32,
    /// Offset from the sprite's top edge
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl Hitbox {
    /// Creates a hitbox.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl Default for Hitbox {
    fn default() -> Self {
        Self::new(0.0, 0.0, 32.0, 32.0)
    }
}

/// Frame-set and physics override for one animation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationClip {
    /// Row in the sprite sheet
    pub row: u32,
    /// Number of frames in the cycle
    pub frame_count: u32,
    /// Seconds per frame
    pub frame_time: f32,
    /// Hitbox override, `None` uses the animator's default
    pub hitbox: Option<Hitbox>,
    /// Cosmetic draw offset in world pixels
    pub sprite_offset: Vec2,
}

impl AnimationClip {
    /// Creates a clip without overrides.
    #[must_use]
    pub fn new(row: u32, frame_count: u32, frame_time: f32) -> Self {
        Self {
            row,
            frame_count: frame_count.max(1),
            frame_time: frame_time.max(0.001),
            hitbox: None,
            sprite_offset: Vec2::ZERO,
        }
    }

    /// Set a hitbox override.
    #[must_use]
    pub fn with_hitbox(mut self, hitbox: Hitbox) -> Self {
        self.hitbox = Some(hitbox);
        self
    }

    /// Set a cosmetic sprite offset.
    #[must_use]
    pub fn with_sprite_offset(mut self, offset: Vec2) -> Self {
        self.sprite_offset = offset;
        self
    }
}

/// Finite state machine selecting the active clip.
#[derive(Debug, Clone, Default)]
pub struct Animator {
    clips: AHashMap<AnimationState, AnimationClip>,
    default_hitbox: Hitbox,
    state: AnimationState,
    frame: u32,
    frame_elapsed: f32,
    facing: Direction,
    still_time: f32,
}

impl Animator {
    /// Horizontal delta per tick, in pixels, that counts as walking.
    pub const WALK_THRESHOLD: f32 = 0.5;
    /// Seconds of stillness before reverting to idle.
    pub const IDLE_DEBOUNCE: f32 = 0.12;

    /// Create an animator with a default hitbox and no clips.
    #[must_use]
    pub fn new(default_hitbox: Hitbox) -> Self {
        Self {
            default_hitbox,
            ..Self::default()
        }
    }

    /// Register the clip for a state, replacing any previous one.
    pub fn register(&mut self, state: AnimationState, clip: AnimationClip) {
        self.clips.insert(state, clip);
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> AnimationState {
        self.state
    }

    /// Current frame index within the clip.
    #[must_use]
    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// Last facing direction.
    #[must_use]
    pub fn facing(&self) -> Direction {
        self.facing
    }

    /// Whether an attack clip is playing and locking walk transitions.
    #[must_use]
    pub fn is_attacking(&self) -> bool {
        self.state.is_attack()
    }

    /// Clip of the current state, if one was registered.
    #[must_use]
    pub fn current_clip(&self) -> Option<&AnimationClip> {
        self.clips.get(&self.state)
    }

    /// Hitbox of the current state, falling back to the default.
    #[must_use]
    pub fn active_hitbox(&self) -> Hitbox {
        self.current_clip()
            .and_then(|clip| clip.hitbox)
            .unwrap_or(self.default_hitbox)
    }

    /// Cosmetic offset of the current state.
    #[must_use]
    pub fn sprite_offset(&self) -> Vec2 {
        self.current_clip()
            .map_or(Vec2::ZERO, |clip| clip.sprite_offset)
    }

    /// Force the directional attack state and lock facing.
    pub fn start_attack(&mut self, direction: Direction) {
        self.facing = direction;
        self.enter(AnimationState::attack(direction));
    }

    /// Advance by `dt` given this tick's horizontal position delta.
    ///
    /// Attack clips play to the end of their cycle and then revert to idle;
    /// walk transitions are ignored until then.
    pub fn advance(&mut self, dt: f32, dx: f32) {
        if !self.state.is_attack() {
            self.sense_movement(dt, dx);
        }

        let Some((frame_count, frame_time)) = self
            .current_clip()
            .map(|clip| (clip.frame_count, clip.frame_time))
        else {
            // No clip registered: an attack has nothing to play.
            if self.state.is_attack() {
                self.enter(AnimationState::Idle);
            }
            return;
        };

        self.frame_elapsed += dt;
        while self.frame_elapsed >= frame_time {
            self.frame_elapsed -= frame_time;
            self.frame = (self.frame + 1) % frame_count;

            if self.frame == 0 && self.state.is_attack() {
                self.enter(AnimationState::Idle);
                return;
            }
        }
    }

    fn sense_movement(&mut self, dt: f32, dx: f32) {
        if dx.abs() > Self::WALK_THRESHOLD {
            let direction = if dx > 0.0 {
                Direction::Right
            } else {
                Direction::Left
            };
            self.still_time = 0.0;
            self.facing = direction;
            let walk = AnimationState::walk(direction);
            if self.state != walk {
                self.enter(walk);
            }
            return;
        }

        self.still_time += dt;
        if self.state != AnimationState::Idle && self.still_time >= Self::IDLE_DEBOUNCE {
            self.enter(AnimationState::Idle);
        }
    }

    fn enter(&mut self, state: AnimationState) {
        self.state = state;
        self.frame = 0;
        self.frame_elapsed = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn animator() -> Animator {
        let mut animator = Animator::new(Hitbox::new(5.0, 7.0, 17.0, 25.0));
        animator.register(AnimationState::Idle, AnimationClip::new(0, 1, 1.0));
        animator.register(AnimationState::WalkLeft, AnimationClip::new(1, 4, 0.1));
        animator.register(AnimationState::WalkRight, AnimationClip::new(2, 4, 0.1));
        animator.register(
            AnimationState::AttackRight,
            AnimationClip::new(3, 4, 0.05)
                .with_hitbox(Hitbox::new(2.0, 7.0, 24.0, 25.0))
                .with_sprite_offset(Vec2::new(6.0, 0.0)),
        );
        animator
    }

    #[test]
    fn test_walk_transition_from_delta() {
        let mut a = animator();
        a.advance(0.016, 3.0);
        assert_eq!(a.state(), AnimationState::WalkRight);
        a.advance(0.016, -3.0);
        assert_eq!(a.state(), AnimationState::WalkLeft);
        assert_eq!(a.facing(), Direction::Left);
    }

    #[test]
    fn test_idle_debounce() {
        let mut a = animator();
        a.advance(0.016, 3.0);
        a.advance(0.05, 0.0);
        assert_eq!(a.state(), AnimationState::WalkRight);
        a.advance(0.1, 0.0);
        assert_eq!(a.state(), AnimationState::Idle);
        assert_eq!(a.facing(), Direction::Right);
    }

    #[test]
    fn test_attack_locks_until_cycle_wraps() {
        let mut a = animator();
        a.start_attack(Direction::Right);
        assert_eq!(a.active_hitbox(), Hitbox::new(2.0, 7.0, 24.0, 25.0));
        assert_eq!(a.sprite_offset(), Vec2::new(6.0, 0.0));

        // Walking input is ignored mid-attack.
        a.advance(0.06, -5.0);
        assert_eq!(a.state(), AnimationState::AttackRight);

        a.advance(0.16, -5.0);
        assert_eq!(a.state(), AnimationState::Idle);
        assert_eq!(a.facing(), Direction::Right);
        assert_eq!(a.active_hitbox(), Hitbox::new(5.0, 7.0, 17.0, 25.0));
    }

    #[test]
    fn test_missing_clip_falls_back_to_default_hitbox() {
        let mut a = animator();
        a.start_attack(Direction::Left);
        assert_eq!(a.active_hitbox(), Hitbox::new(5.0, 7.0, 17.0, 25.0));
        a.advance(0.016, 0.0);
        assert_eq!(a.state(), AnimationState::Idle);
    }

    #[test]
    fn test_zero_dt_keeps_state() {
        let mut a = animator();
        a.advance(0.016, 3.0);
        let before = (a.state(), a.frame());
        a.advance(0.0, 0.0);
        a.advance(0.0, 0.0);
        assert_eq!((a.state(), a.frame()), before);
    }
}
