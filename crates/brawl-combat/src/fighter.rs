//! Fighter entity and its per-frame state machine.
//!
//! A [`Fighter`] owns its kinematics, vitals, attack geometry and exactly
//! one [`DefenseSystem`]. It knows nothing about where its commands come
//! from: controllers in [`crate::controller`] drive it through the public
//! action methods, and the match loop resolves hits between two fighters.
//!
//! Two body variants share this type. The classic figure runs its attack
//! window off fixed timers; the sprite figure opens its attack box on the
//! middle frame of the attack animation and ends the attack when the clip
//! finishes.

use fastrand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use brawl_common::FighterId;

use crate::animation::{AnimationClip, AnimationKey, AnimationSet, Animator};
use crate::config::{ArenaConfig, DefenseConfig, StaminaConfig};
use crate::defense::{Attack, BlockFeedback, DefenseState, DefenseSystem, EscapeKind, EscapeLaunch};
use crate::input::Vec2;
use crate::physics::{apply_gravity, check_ground_collision, Facing, Kinematics, AABB};
use crate::presentation::{DisplayHandle, FighterFrame};

/// Seconds between attacks.
pub const ATTACK_COOLDOWN: f32 = 0.5;

/// Horizontal velocity kept each frame.
pub const FRICTION: f32 = 0.85;

/// Scale from per-second velocity to per-frame displacement at 60 fps.
const FRAME_RATE_SCALE: f32 = 60.0;

// ============================================================================
// States and stats
// ============================================================================

/// Fighter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FighterState {
    /// Standing
    #[default]
    Idle,
    /// Walking
    Running,
    /// Airborne
    Jumping,
    /// Attack in progress
    Attacking,
    /// Hit stun
    Hurt,
    /// Holding block
    Blocking,
    /// Backdash escape
    Backdash,
    /// Roll escape
    Roll,
    /// Spot dodge escape
    Dodge,
    /// Knocked out (sprite variant with a knockout clip only)
    Dead,
}

impl FighterState {
    /// Lower-case state name for display layers.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Jumping => "jumping",
            Self::Attacking => "attacking",
            Self::Hurt => "hurt",
            Self::Blocking => "blocking",
            Self::Backdash => "backdash",
            Self::Roll => "roll",
            Self::Dodge => "dodge",
            Self::Dead => "dead",
        }
    }
}

/// Strength, speed and defense on a 0-100+ scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatStats {
    /// Scales attack damage
    pub strength: u32,
    /// Scales movement speed
    pub speed: u32,
    /// Scales damage reduction
    pub defense: u32,
}

impl CombatStats {
    /// Creates a stat block.
    #[must_use]
    pub const fn new(strength: u32, speed: u32, defense: u32) -> Self {
        Self {
            strength,
            speed,
            defense,
        }
    }
}

// ============================================================================
// Variants
// ============================================================================

/// Sprite sheet description; passed through to presentation untouched
/// apart from its size and clip timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteConfig {
    /// Width of one sprite frame in pixels
    pub sprite_width: f32,
    /// Height of one sprite frame in pixels
    pub sprite_height: f32,
    /// On-screen scale
    pub scale: f32,
    /// Clip table
    pub animations: AnimationSet,
}

impl Default for SpriteConfig {
    fn default() -> Self {
        Self {
            sprite_width: 96.0,
            sprite_height: 96.0,
            scale: 2.5,
            animations: AnimationSet::default(),
        }
    }
}

/// Which body a fighter uses.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum FighterVariant {
    /// 128x200 block figure with timer-driven attacks
    #[default]
    Classic,
    /// Scaled sprite with animation-driven attacks
    Sprite(SpriteConfig),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum AttackTiming {
    /// Box opens `startup` seconds in and stays open `active` seconds;
    /// the attack ends when the cooldown lapses
    Timed { startup: f32, active: f32 },
    /// Box opens on the clip's strike frame for `active` seconds; the
    /// attack ends when the clip completes
    Animated { active: f32 },
}

/// Body measurements and feel constants derived from the variant.
#[derive(Debug, Clone, Copy, PartialEq)]
struct FighterProfile {
    width: f32,
    height: f32,
    hitbox_width_ratio: f32,
    hitbox_height_ratio: f32,
    hitbox_y_ratio: f32,
    attack_width: f32,
    attack_height: f32,
    attack_front_ratio: f32,
    attack_inset: f32,
    attack_y_ratio: f32,
    attack_y_anchor: f32,
    base_damage: u32,
    strength_divisor: u32,
    knockback: f32,
    hurt_duration: f32,
    jump_strength: f32,
    reset_y: f32,
    clamp_vertical: bool,
    default_stats: CombatStats,
    timing: AttackTiming,
}

impl FighterProfile {
    const CLASSIC: Self = Self {
        width: 128.0,
        height: 200.0,
        hitbox_width_ratio: 0.5,
        hitbox_height_ratio: 1.0,
        hitbox_y_ratio: 0.0,
        attack_width: 80.0,
        attack_height: 60.0,
        attack_front_ratio: 1.0,
        attack_inset: 20.0,
        attack_y_ratio: 0.5,
        attack_y_anchor: 0.5,
        base_damage: 10,
        strength_divisor: 10,
        knockback: 6.0,
        hurt_duration: 0.3,
        jump_strength: -15.0,
        reset_y: 400.0,
        clamp_vertical: true,
        default_stats: CombatStats::new(70, 70, 70),
        timing: AttackTiming::Timed {
            startup: 0.08,
            active: 0.1,
        },
    };

    fn sprite(sprite: &SpriteConfig) -> Self {
        Self {
            width: sprite.sprite_width * sprite.scale,
            height: sprite.sprite_height * sprite.scale,
            hitbox_width_ratio: 0.4,
            hitbox_height_ratio: 0.9,
            hitbox_y_ratio: 0.1,
            attack_width: 100.0,
            attack_height: 80.0,
            attack_front_ratio: 0.6,
            attack_inset: 0.0,
            attack_y_ratio: 0.3,
            attack_y_anchor: 0.0,
            base_damage: 12,
            strength_divisor: 8,
            knockback: 8.0,
            hurt_duration: 0.4,
            jump_strength: -10.0,
            reset_y: 300.0,
            clamp_vertical: false,
            default_stats: CombatStats::new(75, 80, 65),
            timing: AttackTiming::Animated { active: 0.1 },
        }
    }

    fn for_variant(variant: &FighterVariant) -> Self {
        match variant {
            FighterVariant::Classic => Self::CLASSIC,
            FighterVariant::Sprite(sprite) => Self::sprite(sprite),
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Construction parameters for a fighter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FighterConfig {
    /// Display name
    pub name: String,
    /// Opaque character reference handed to presentation
    pub character: String,
    /// Spawn x
    pub x: f32,
    /// Spawn y (above the ground; the fighter falls into place)
    pub y: f32,
    /// Initial facing
    pub facing: Facing,
    /// Stat override; the variant's defaults when absent
    pub stats: Option<CombatStats>,
    /// Health pool
    pub max_health: i32,
    /// Body variant
    pub variant: FighterVariant,
    /// Defense tuning
    pub defense: DefenseConfig,
    /// Stamina tuning
    pub stamina: StaminaConfig,
    /// Playfield
    pub arena: ArenaConfig,
    /// Seed for cosmetic choices such as alternate attack clips
    pub seed: u64,
}

impl Default for FighterConfig {
    fn default() -> Self {
        Self {
            name: "Fighter".to_string(),
            character: "default".to_string(),
            x: 100.0,
            y: 300.0,
            facing: Facing::Right,
            stats: None,
            max_health: 100,
            variant: FighterVariant::Classic,
            defense: DefenseConfig::default(),
            stamina: StaminaConfig::default(),
            arena: ArenaConfig::default(),
            seed: 0x00c0_ffee,
        }
    }
}

impl FighterConfig {
    /// Creates a classic fighter config.
    #[must_use]
    pub fn new(name: impl Into<String>, x: f32) -> Self {
        Self {
            name: name.into(),
            x,
            ..Self::default()
        }
    }

    /// Sets the body variant.
    #[must_use]
    pub fn with_variant(mut self, variant: FighterVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Sets the stats.
    #[must_use]
    pub fn with_stats(mut self, stats: CombatStats) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Sets the initial facing.
    #[must_use]
    pub fn with_facing(mut self, facing: Facing) -> Self {
        self.facing = facing;
        self
    }

    /// Sets the character reference.
    #[must_use]
    pub fn with_character(mut self, character: impl Into<String>) -> Self {
        self.character = character.into();
        self
    }

    /// Returns a copy with unusable values replaced by defaults.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !self.x.is_finite() {
            tracing::warn!(name = %self.name, "Non-finite spawn x, using default");
            self.x = defaults.x;
        }
        if !self.y.is_finite() {
            tracing::warn!(name = %self.name, "Non-finite spawn y, using default");
            self.y = defaults.y;
        }
        if self.max_health <= 0 {
            tracing::warn!(name = %self.name, max_health = self.max_health, "Health pool must be positive, using default");
            self.max_health = defaults.max_health;
        }
        if let FighterVariant::Sprite(sprite) = &mut self.variant {
            let stock = SpriteConfig::default();
            sprite.sprite_width = crate::config::positive("sprite.sprite_width", sprite.sprite_width, stock.sprite_width);
            sprite.sprite_height = crate::config::positive("sprite.sprite_height", sprite.sprite_height, stock.sprite_height);
            sprite.scale = crate::config::positive("sprite.scale", sprite.scale, stock.scale);
        }
        self.arena = self.arena.sanitized();
        self.stamina = self.stamina.sanitized();
        self
    }
}

// ============================================================================
// Results and views
// ============================================================================

/// Outcome of [`Fighter::take_damage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DamageResult {
    /// Health actually removed
    pub damage: i32,
    /// Whether a block stopped the hit
    pub blocked: bool,
    /// Reserved for a timed-block mechanic; always false for now
    pub perfect_block: bool,
    /// Whether an invincibility window swallowed the hit
    pub invincible: bool,
    /// Block feedback, when a block was attempted
    pub feedback: Option<BlockFeedback>,
}

/// Read-only snapshot of a fighter for opponent-relative logic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpponentView {
    /// Top-left corner
    pub position: Vec2,
    /// Velocity
    pub velocity: Vec2,
    /// Current health
    pub health: i32,
    /// Maximum health
    pub max_health: i32,
    /// Mid-attack
    pub attacking: bool,
    /// Damageable region
    pub hitbox: AABB,
}

/// Attack geometry; only meaningful while `active`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AttackBox {
    /// Region in world space
    pub bounds: AABB,
    /// Whether the box can hit
    pub active: bool,
    /// Damage dealt on contact
    pub damage: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct AttackWindow {
    startup: f32,
    active: f32,
}

#[derive(Debug, Default)]
struct DisplaySlot(Option<Box<dyn DisplayHandle>>);

// ============================================================================
// Fighter
// ============================================================================

/// One combatant.
#[derive(Debug)]
pub struct Fighter {
    id: FighterId,
    name: String,
    character: String,
    variant: FighterVariant,
    profile: FighterProfile,
    arena: ArenaConfig,
    stamina_config: StaminaConfig,
    animations: AnimationSet,

    body: Kinematics,
    facing: Facing,
    on_ground: bool,

    health: i32,
    max_health: i32,
    stamina: f32,
    stamina_regen_timer: f32,
    stats: CombatStats,

    state: FighterState,
    state_timer: f32,
    moving: bool,
    attacking: bool,
    blocking: bool,
    hurt: bool,
    attack_cooldown: f32,
    hurt_cooldown: f32,
    attack_window: AttackWindow,

    hitbox: AABB,
    attack_box: AttackBox,
    defense: DefenseSystem,
    animator: Animator,
    attack_clip: AnimationKey,
    rng: Rng,
    display: DisplaySlot,
}

/// Per-tick request handed to [`Fighter::update`] by its controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FighterInput {
    /// Escape to attempt once the defense timers have advanced
    pub escape: Option<EscapeKind>,
}

impl Fighter {
    /// Builds a fighter from its config.
    #[must_use]
    pub fn new(config: FighterConfig) -> Self {
        let config = config.sanitized();
        let profile = FighterProfile::for_variant(&config.variant);
        let animations = match &config.variant {
            FighterVariant::Classic => AnimationSet::classic(),
            FighterVariant::Sprite(sprite) => sprite.animations.clone(),
        };
        let mut fighter = Self {
            id: FighterId::new(),
            name: config.name,
            character: config.character,
            variant: config.variant,
            profile,
            arena: config.arena,
            stamina_config: config.stamina,
            animations,
            body: Kinematics::at(config.x, config.y),
            facing: config.facing,
            on_ground: true,
            health: config.max_health,
            max_health: config.max_health,
            stamina: config.stamina.max,
            stamina_regen_timer: 0.0,
            stats: config.stats.unwrap_or(profile.default_stats),
            state: FighterState::Idle,
            state_timer: 0.0,
            moving: false,
            attacking: false,
            blocking: false,
            hurt: false,
            attack_cooldown: 0.0,
            hurt_cooldown: 0.0,
            attack_window: AttackWindow::default(),
            hitbox: AABB::default(),
            attack_box: AttackBox::default(),
            defense: DefenseSystem::with_config(config.defense),
            animator: Animator::default(),
            attack_clip: AnimationKey::Attacking,
            rng: Rng::with_seed(config.seed),
            display: DisplaySlot::default(),
        };
        fighter.update_boxes();
        fighter
    }

    // ------------------------------------------------------------------------
    // Per-frame update
    // ------------------------------------------------------------------------

    /// Advances the fighter by `dt` seconds.
    ///
    /// The order matters: timers, defense, stamina, gravity, arena bounds,
    /// friction and escape motion, hit geometry, animation, defense state
    /// sync, lapsed hurt/attack exits, facing, and finally the idle/run/jump
    /// derivation.
    pub fn update(&mut self, dt: f32, input: FighterInput, opponent: Option<&OpponentView>) {
        if self.state == FighterState::Dead {
            self.advance_animation(dt);
            return;
        }

        self.state_timer += dt;
        self.attack_cooldown = (self.attack_cooldown - dt).max(0.0);
        self.hurt_cooldown = (self.hurt_cooldown - dt).max(0.0);
        self.tick_attack_window(dt);

        let request = input.escape.filter(|&kind| self.escape_allowed(kind));
        let stamina = self.stamina_after(request);
        if let Some(launch) = self.defense.update(dt, request, self.facing, stamina) {
            self.apply_launch(launch);
        }

        self.regenerate_stamina(dt);

        apply_gravity(&mut self.body, dt);
        // Vertical velocity is applied once more as a per-frame displacement.
        self.body.position.y += self.body.velocity.y;

        let ground = self.arena.ground_y(self.profile.height);
        if check_ground_collision(&mut self.body, ground) {
            self.on_ground = true;
        }
        let max_x = (self.arena.width - self.profile.width).max(0.0);
        self.body.position.x = self.body.position.x.clamp(0.0, max_x);
        if self.profile.clamp_vertical {
            let max_y = (self.arena.height - self.profile.height).max(0.0);
            self.body.position.y = self.body.position.y.clamp(0.0, max_y);
        }

        self.body.velocity.x *= FRICTION;
        self.body.position.x += self.body.velocity.x * dt * FRAME_RATE_SCALE;

        self.update_boxes();
        self.advance_animation(dt);
        self.sync_defense_state();

        if self.hurt && self.hurt_cooldown <= 0.0 {
            self.hurt = false;
            self.set_state(FighterState::Idle);
        }
        if self.attacking && self.attack_finished() {
            self.attacking = false;
            self.attack_box.active = false;
            self.attack_window = AttackWindow::default();
            self.set_state(FighterState::Idle);
        }

        if let Some(opponent) = opponent {
            if !self.attacking && !self.hurt && !self.defense.is_in_escape_state() {
                self.facing = Facing::toward(self.body.position.x, opponent.position.x);
            }
        }

        let free = !self.attacking
            && !self.hurt
            && !self.blocking
            && self.defense.state() == DefenseState::Neutral;
        if free {
            if self.moving {
                self.set_state(FighterState::Running);
            } else if !self.on_ground {
                self.set_state(FighterState::Jumping);
            } else {
                self.set_state(FighterState::Idle);
            }
        }
    }

    fn set_state(&mut self, state: FighterState) {
        if self.state != state {
            trace!(fighter = %self.name, from = self.state.name(), to = state.name(), "State change");
            self.state = state;
            self.state_timer = 0.0;
            self.animator.restart();
        }
    }

    fn tick_attack_window(&mut self, dt: f32) {
        if self.attack_window.startup > 0.0 {
            self.attack_window.startup -= dt;
            if self.attack_window.startup <= 0.0 {
                self.attack_window.startup = 0.0;
                if self.attacking {
                    if let AttackTiming::Timed { active, .. } = self.profile.timing {
                        self.open_attack_box(active);
                    }
                }
            }
        } else if self.attack_window.active > 0.0 {
            self.attack_window.active -= dt;
            if self.attack_window.active <= 0.0 {
                self.attack_window.active = 0.0;
                self.attack_box.active = false;
            }
        }
    }

    fn open_attack_box(&mut self, seconds: f32) {
        self.attack_box.active = true;
        self.attack_window.active = seconds;
    }

    fn attack_finished(&self) -> bool {
        match self.profile.timing {
            AttackTiming::Timed { .. } => self.attack_cooldown <= 0.0,
            AttackTiming::Animated { .. } => self.animator.is_complete(),
        }
    }

    fn regenerate_stamina(&mut self, dt: f32) {
        if self.stamina < self.stamina_config.max {
            self.stamina_regen_timer += dt;
            if self.stamina_regen_timer >= self.stamina_config.regen_delay {
                self.stamina =
                    (self.stamina + self.stamina_config.regen_rate * dt).min(self.stamina_config.max);
            }
        } else {
            self.stamina_regen_timer = 0.0;
        }
    }

    fn update_boxes(&mut self) {
        let p = &self.profile;
        let pos = self.body.position;
        let hb_width = p.width * p.hitbox_width_ratio;
        let hb_height = p.height * p.hitbox_height_ratio;
        self.hitbox = AABB::from_rect(
            pos.x + (p.width - hb_width) / 2.0,
            pos.y + p.height * p.hitbox_y_ratio,
            hb_width,
            hb_height,
        );

        if self.attack_box.active {
            let x = match self.facing {
                Facing::Right => pos.x + p.width * p.attack_front_ratio - p.attack_inset,
                Facing::Left => {
                    pos.x - p.attack_width + p.width * (1.0 - p.attack_front_ratio) + p.attack_inset
                }
            };
            let y = pos.y + p.height * p.attack_y_ratio - p.attack_height * p.attack_y_anchor;
            self.attack_box.bounds = AABB::from_rect(x, y, p.attack_width, p.attack_height);
        }
    }

    fn animation_key(&self) -> AnimationKey {
        match self.state {
            FighterState::Idle | FighterState::Jumping => AnimationKey::Idle,
            FighterState::Running => AnimationKey::Running,
            FighterState::Attacking => self.attack_clip,
            FighterState::Hurt => AnimationKey::Hurt,
            FighterState::Blocking => AnimationKey::Blocking,
            FighterState::Backdash => AnimationKey::Backdash,
            FighterState::Roll => AnimationKey::Roll,
            FighterState::Dodge => AnimationKey::Dodge,
            FighterState::Dead => AnimationKey::Dead,
        }
    }

    fn current_clip(&self) -> AnimationClip {
        self.animations
            .clip(self.animation_key())
            .copied()
            .unwrap_or(self.animations.idle)
    }

    fn advance_animation(&mut self, dt: f32) {
        let clip = self.current_clip();
        let step = self.animator.advance(&clip, dt);
        if self.state != FighterState::Attacking {
            return;
        }
        if let AttackTiming::Animated { active } = self.profile.timing {
            if step.entered_frame == Some(clip.strike_frame()) {
                self.open_attack_box(active);
                self.update_boxes();
            }
        }
    }

    fn sync_defense_state(&mut self) {
        self.blocking = self.defense.is_blocking();
        if self.attacking || self.hurt {
            return;
        }
        match self.defense.state() {
            DefenseState::Backdash => self.set_state(FighterState::Backdash),
            DefenseState::Roll => self.set_state(FighterState::Roll),
            DefenseState::SpotDodge => self.set_state(FighterState::Dodge),
            _ => {}
        }
    }

    // ------------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------------

    /// Starts an attack. Returns false when the fighter is busy.
    pub fn attack(&mut self) -> bool {
        if self.attacking
            || self.attack_cooldown > 0.0
            || self.hurt
            || self.blocking
            || self.state == FighterState::Dead
            || self.defense.is_in_escape_state()
        {
            return false;
        }

        self.attacking = true;
        self.attack_cooldown = ATTACK_COOLDOWN;
        self.attack_box.damage = self.attack_damage();
        self.attack_clip = self.pick_attack_clip();
        if let AttackTiming::Timed { startup, .. } = self.profile.timing {
            self.attack_window = AttackWindow {
                startup,
                active: 0.0,
            };
        }
        self.set_state(FighterState::Attacking);
        self.animator.restart();
        debug!(fighter = %self.name, damage = self.attack_box.damage, "Attack started");
        true
    }

    fn pick_attack_clip(&mut self) -> AnimationKey {
        if self.animations.has_attack_variety() {
            [
                AnimationKey::Attacking,
                AnimationKey::Attacking2,
                AnimationKey::Attacking3,
            ][self.rng.usize(0..3)]
        } else {
            AnimationKey::Attacking
        }
    }

    /// Damage the next attack box will carry, from strength.
    #[must_use]
    pub fn attack_damage(&self) -> i32 {
        let p = &self.profile;
        (p.base_damage + self.stats.strength / p.strength_divisor) as i32
    }

    /// Raises or lowers the guard. Ignored while attacking, hurt, escaping
    /// or knocked out.
    pub fn block(&mut self, active: bool) {
        if self.attacking
            || self.hurt
            || self.state == FighterState::Dead
            || self.defense.is_in_escape_state()
        {
            return;
        }
        if active {
            self.defense.set_state(DefenseState::StandingBlock);
            self.blocking = true;
            self.set_state(FighterState::Blocking);
        } else {
            self.defense.set_state(DefenseState::Neutral);
            self.blocking = false;
            if self.state == FighterState::Blocking {
                self.set_state(FighterState::Idle);
            }
        }
    }

    fn escape_cost(&self, kind: EscapeKind) -> f32 {
        match kind {
            EscapeKind::Backdash => self.stamina_config.backdash_cost,
            EscapeKind::Roll => self.stamina_config.roll_cost,
            EscapeKind::SpotDodge => self.stamina_config.dodge_cost,
        }
    }

    fn stamina_after(&self, request: Option<EscapeKind>) -> f32 {
        request.map_or(self.stamina, |kind| self.stamina - self.escape_cost(kind))
    }

    fn escape_allowed(&self, kind: EscapeKind) -> bool {
        let cost = self.escape_cost(kind);
        !self.attacking
            && !self.hurt
            && self.state != FighterState::Dead
            && self.stamina >= cost
            && self.defense.can_escape(kind, self.stamina - cost)
    }

    fn apply_launch(&mut self, launch: EscapeLaunch) {
        if let Some(vx) = launch.velocity_x {
            self.body.velocity.x = vx;
        }
        self.consume_stamina(self.escape_cost(launch.kind) + launch.stamina_cost);
    }

    fn escape(&mut self, kind: EscapeKind) -> bool {
        if !self.escape_allowed(kind) {
            return false;
        }
        let stamina = self.stamina_after(Some(kind));
        match self.defense.execute(kind, self.facing, stamina) {
            Some(launch) => {
                self.apply_launch(launch);
                true
            }
            None => false,
        }
    }

    /// Hops backward. Returns false when not allowed.
    pub fn backdash(&mut self) -> bool {
        self.escape(EscapeKind::Backdash)
    }

    /// Rolls forward. Returns false when not allowed.
    pub fn roll(&mut self) -> bool {
        self.escape(EscapeKind::Roll)
    }

    /// Dodges in place. Returns false when not allowed.
    pub fn spot_dodge(&mut self) -> bool {
        self.escape(EscapeKind::SpotDodge)
    }

    /// Spends stamina if enough is available.
    pub fn consume_stamina(&mut self, amount: f32) -> bool {
        if self.stamina >= amount {
            self.stamina -= amount;
            self.stamina_regen_timer = 0.0;
            true
        } else {
            false
        }
    }

    /// Starts a jump from the ground.
    pub fn jump(&mut self) -> bool {
        if !self.on_ground || self.state == FighterState::Dead {
            return false;
        }
        self.body.velocity.y = self.profile.jump_strength;
        self.on_ground = false;
        true
    }

    /// Moves horizontally by `dx` this frame.
    pub fn walk(&mut self, dx: f32) {
        self.body.position.x += dx;
    }

    /// Marks whether the controller moved the fighter this frame.
    pub fn set_moving(&mut self, moving: bool) {
        self.moving = moving;
    }

    /// Turns the fighter.
    pub fn set_facing(&mut self, facing: Facing) {
        self.facing = facing;
    }

    /// Overrides horizontal velocity.
    pub fn set_velocity_x(&mut self, vx: f32) {
        self.body.velocity.x = vx;
    }

    /// Places the fighter at `x` with no horizontal motion and cancels any
    /// attack in progress.
    pub fn pin(&mut self, x: f32, facing: Facing) {
        self.body.position.x = x;
        self.body.velocity.x = 0.0;
        self.facing = facing;
        self.moving = false;
        if self.attacking {
            self.attacking = false;
            self.attack_box.active = false;
            self.attack_window = AttackWindow::default();
            self.set_state(FighterState::Idle);
        }
        self.update_boxes();
    }

    /// Restores health to the maximum.
    pub fn heal_full(&mut self) {
        self.health = self.max_health;
    }

    /// Replaces the health pool; current health is refilled to match.
    pub fn set_max_health(&mut self, max_health: i32) {
        self.max_health = max_health.max(1);
        self.health = self.max_health;
    }

    /// Replaces the stat block.
    pub fn set_stats(&mut self, stats: CombatStats) {
        self.stats = stats;
    }

    // ------------------------------------------------------------------------
    // Damage
    // ------------------------------------------------------------------------

    /// Applies an incoming hit.
    ///
    /// Precedence: hit stun or defeat ignores the hit, invincibility
    /// swallows it, a block with charges left reduces it to chip damage
    /// (never lethal), and anything else lands in full after defense
    /// reduction, at least 1, with knockback and hit stun.
    pub fn take_damage(&mut self, amount: i32, attacker_facing: Facing, attack: Option<Attack>) -> DamageResult {
        if self.hurt_cooldown > 0.0 || self.health <= 0 {
            return DamageResult::default();
        }
        if self.defense.is_invincible() {
            return DamageResult {
                invincible: true,
                ..DamageResult::default()
            };
        }

        let mut feedback = None;
        if self.defense.is_blocking() {
            let outcome = self
                .defense
                .attempt_block(attack.unwrap_or(Attack::new(amount)));
            feedback = Some(outcome.feedback);
            if outcome.blocked {
                let before = self.health;
                if outcome.chip_damage > 0 {
                    self.health = (self.health - outcome.chip_damage).max(1);
                }
                self.body.velocity.x = attacker_facing.sign() * outcome.pushback;
                return DamageResult {
                    damage: before - self.health,
                    blocked: true,
                    perfect_block: false,
                    invincible: false,
                    feedback,
                };
            }
        }

        let damage = self.reduced_damage(amount);
        self.body.velocity.x = attacker_facing.sign() * self.profile.knockback;
        self.hurt = true;
        self.hurt_cooldown = self.profile.hurt_duration;
        self.attacking = false;
        self.attack_box.active = false;
        self.attack_window = AttackWindow::default();
        self.set_state(FighterState::Hurt);
        self.animator.restart();

        let before = self.health;
        self.health = (self.health - damage).max(0);
        debug!(fighter = %self.name, damage, health = self.health, "Took damage");

        if self.health == 0 && self.animations.dead.is_some() {
            self.hurt = false;
            self.set_state(FighterState::Dead);
        }

        DamageResult {
            damage: before - self.health,
            blocked: false,
            perfect_block: false,
            invincible: false,
            feedback,
        }
    }

    /// `floor(amount * (1 - defense/200))`, at least 1.
    #[must_use]
    pub fn reduced_damage(&self, amount: i32) -> i32 {
        let factor = (200 - i64::from(self.stats.defense)).max(0);
        let scaled = i64::from(amount.max(0)) * factor;
        (scaled / 200).clamp(1, i64::from(i32::MAX)) as i32
    }

    /// Whether the active attack box overlaps `target`.
    #[must_use]
    pub fn is_attack_hitting(&self, target: &AABB) -> bool {
        self.attack_box.active && self.attack_box.bounds.overlaps(target)
    }

    /// Restores vitals, position and defense for a new round.
    ///
    /// `x` of `None` keeps the current horizontal position.
    pub fn reset(&mut self, x: Option<f32>) {
        self.health = self.max_health;
        if let Some(x) = x {
            self.body.position.x = x;
        }
        self.body.position.y = self.profile.reset_y;
        self.body.velocity = Vec2::ZERO;
        self.moving = false;
        self.attacking = false;
        self.blocking = false;
        self.hurt = false;
        self.attack_cooldown = 0.0;
        self.hurt_cooldown = 0.0;
        self.attack_window = AttackWindow::default();
        self.attack_box.active = false;
        self.state = FighterState::Idle;
        self.state_timer = 0.0;
        self.animator.restart();
        self.defense.reset();
        self.stamina = self.stamina_config.max;
        self.stamina_regen_timer = 0.0;
        self.update_boxes();
    }

    // ------------------------------------------------------------------------
    // Presentation
    // ------------------------------------------------------------------------

    /// Binds a display handle, replacing any previous one.
    pub fn attach(&mut self, handle: Box<dyn DisplayHandle>) {
        self.destroy();
        self.display.0 = Some(handle);
        self.render(false);
    }

    /// Pushes the current frame to the attached display, if any.
    pub fn render(&mut self, debug: bool) {
        if self.display.0.is_none() {
            return;
        }
        let frame = self.frame(debug);
        if let Some(handle) = self.display.0.as_mut() {
            handle.present(&frame);
        }
    }

    /// Releases the attached display.
    pub fn destroy(&mut self) {
        if let Some(mut handle) = self.display.0.take() {
            handle.release();
        }
    }

    /// Snapshot of everything a display layer draws.
    #[must_use]
    pub fn frame(&self, debug: bool) -> FighterFrame {
        FighterFrame {
            name: self.name.clone(),
            character: self.character.clone(),
            position: self.body.position,
            velocity: self.body.velocity,
            facing: self.facing,
            size: Vec2::new(self.profile.width, self.profile.height),
            state: self.state.name(),
            animation: self.animation_key().name(),
            frame: self.animator.frame(),
            health: self.health,
            max_health: self.max_health,
            stamina: self.stamina,
            hitbox: self.hitbox,
            attack_box: self.attack_box.active.then_some(self.attack_box.bounds),
            blocking: self.blocking,
            hurt: self.hurt,
            invincible: self.defense.is_invincible(),
            defense_state: self.defense.state(),
            block_charges: self.defense.block_charges(),
            debug,
        }
    }

    /// Snapshot for the opponent's logic.
    #[must_use]
    pub fn view(&self) -> OpponentView {
        OpponentView {
            position: self.body.position,
            velocity: self.body.velocity,
            health: self.health,
            max_health: self.max_health,
            attacking: self.attacking,
            hitbox: self.hitbox,
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Unique id.
    #[must_use]
    pub const fn id(&self) -> FighterId {
        self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Character reference.
    #[must_use]
    pub fn character(&self) -> &str {
        &self.character
    }

    /// Body variant.
    #[must_use]
    pub const fn variant(&self) -> &FighterVariant {
        &self.variant
    }

    /// Top-left corner.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.body.position
    }

    /// Velocity.
    #[must_use]
    pub const fn velocity(&self) -> Vec2 {
        self.body.velocity
    }

    /// Facing direction.
    #[must_use]
    pub const fn facing(&self) -> Facing {
        self.facing
    }

    /// Body width.
    #[must_use]
    pub const fn width(&self) -> f32 {
        self.profile.width
    }

    /// Body height.
    #[must_use]
    pub const fn height(&self) -> f32 {
        self.profile.height
    }

    /// Whether the fighter stands on the ground.
    #[must_use]
    pub const fn is_on_ground(&self) -> bool {
        self.on_ground
    }

    /// Current health.
    #[must_use]
    pub const fn health(&self) -> i32 {
        self.health
    }

    /// Maximum health.
    #[must_use]
    pub const fn max_health(&self) -> i32 {
        self.max_health
    }

    /// Whether health has run out.
    #[must_use]
    pub const fn is_defeated(&self) -> bool {
        self.health <= 0
    }

    /// Current stamina.
    #[must_use]
    pub const fn stamina(&self) -> f32 {
        self.stamina
    }

    /// Stamina pool size.
    #[must_use]
    pub const fn max_stamina(&self) -> f32 {
        self.stamina_config.max
    }

    /// Stat block.
    #[must_use]
    pub const fn stats(&self) -> CombatStats {
        self.stats
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> FighterState {
        self.state
    }

    /// Seconds since the state was entered.
    #[must_use]
    pub const fn state_timer(&self) -> f32 {
        self.state_timer
    }

    /// Mid-attack.
    #[must_use]
    pub const fn is_attacking(&self) -> bool {
        self.attacking
    }

    /// Holding block.
    #[must_use]
    pub const fn is_blocking(&self) -> bool {
        self.blocking
    }

    /// In hit stun.
    #[must_use]
    pub const fn is_hurt(&self) -> bool {
        self.hurt
    }

    /// Moved by its controller this frame.
    #[must_use]
    pub const fn is_moving(&self) -> bool {
        self.moving
    }

    /// Seconds until the next attack is allowed.
    #[must_use]
    pub const fn attack_cooldown(&self) -> f32 {
        self.attack_cooldown
    }

    /// Damageable region.
    #[must_use]
    pub const fn hitbox(&self) -> &AABB {
        &self.hitbox
    }

    /// Attack geometry.
    #[must_use]
    pub const fn attack_box(&self) -> &AttackBox {
        &self.attack_box
    }

    /// Owned defense system.
    #[must_use]
    pub const fn defense(&self) -> &DefenseSystem {
        &self.defense
    }

    /// Mutable access for hit registration by the match loop.
    pub fn defense_mut(&mut self) -> &mut DefenseSystem {
        &mut self.defense
    }

    /// Current animation frame.
    #[must_use]
    pub const fn animation_frame(&self) -> u32 {
        self.animator.frame()
    }
}
