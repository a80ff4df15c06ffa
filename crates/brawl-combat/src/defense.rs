//! Per-fighter blocking and escape state machine.
//!
//! A [`DefenseSystem`] is owned by exactly one fighter. It decides when the
//! fighter is invincible, how many blocks are left, and what velocity an
//! escape launches with. It never touches the fighter directly: escapes
//! return an [`EscapeLaunch`] that the owner applies.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{DefenseConfig, EscapeConfig};
use crate::physics::Facing;

// ============================================================================
// States
// ============================================================================

/// Defense state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DefenseState {
    /// Free to block or escape
    #[default]
    Neutral,
    /// Holding block
    StandingBlock,
    /// Backdash in progress
    Backdash,
    /// Roll in progress
    Roll,
    /// Spot dodge in progress
    SpotDodge,
    /// Punishable tail of an escape. Only entered through
    /// [`DefenseSystem::set_state`]; the escape timers return straight
    /// to neutral.
    EscapeRecovery,
}

impl DefenseState {
    /// Whether this is one of the escape states.
    #[must_use]
    pub const fn is_escape(self) -> bool {
        matches!(
            self,
            Self::Backdash | Self::Roll | Self::SpotDodge | Self::EscapeRecovery
        )
    }
}

/// The three escape moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscapeKind {
    /// Quick hop away from the facing direction
    Backdash,
    /// Longer invincible travel toward the facing direction
    Roll,
    /// In-place evade
    SpotDodge,
}

impl EscapeKind {
    /// Defense state entered by this move.
    #[must_use]
    pub const fn state(self) -> DefenseState {
        match self {
            Self::Backdash => DefenseState::Backdash,
            Self::Roll => DefenseState::Roll,
            Self::SpotDodge => DefenseState::SpotDodge,
        }
    }
}

/// Motion produced by a successful escape, for the owner to apply.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EscapeLaunch {
    /// Which escape fired
    pub kind: EscapeKind,
    /// New horizontal velocity, if the move travels
    pub velocity_x: Option<f32>,
    /// Stamina the owner must deduct
    pub stamina_cost: f32,
}

// ============================================================================
// Blocking
// ============================================================================

/// An incoming attack as seen by the block check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attack {
    /// Raw damage before any reduction
    pub damage: i32,
}

impl Attack {
    /// Creates an attack description.
    #[must_use]
    pub const fn new(damage: i32) -> Self {
        Self { damage }
    }
}

impl Default for Attack {
    fn default() -> Self {
        Self::new(10)
    }
}

/// Feedback shown to the defender after a block attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockFeedback {
    /// A charge was spent and the hit was stopped
    Blocked,
    /// No charges were left
    NoBlocks,
}

impl BlockFeedback {
    /// Short message for on-screen display.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Blocked => "BLOCK",
            Self::NoBlocks => "NO BLOCKS!",
        }
    }
}

/// Result of [`DefenseSystem::attempt_block`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockOutcome {
    /// Whether the hit was stopped
    pub blocked: bool,
    /// Damage that still applies; the full attack when not blocked
    pub damage: i32,
    /// Chip damage taken through the block
    pub chip_damage: i32,
    /// Horizontal pushback magnitude for the defender
    pub pushback: f32,
    /// Frame advantage after the exchange
    pub frame_advantage: i32,
    /// What to tell the player
    pub feedback: BlockFeedback,
}

/// Running totals for the HUD and end-of-match summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DefenseStats {
    /// Hits stopped by a block
    pub blocks_total: u32,
    /// Escapes performed
    pub escapes_used: u32,
}

/// Short-lived marker left behind by an escape, for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EscapeEffect {
    /// Escape that produced it
    pub kind: EscapeKind,
    /// Seconds until it disappears
    pub remaining: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
struct EscapeCooldowns {
    backdash: f32,
    roll: f32,
    spot_dodge: f32,
}

impl EscapeCooldowns {
    fn tick(&mut self, dt: f32) {
        self.backdash = (self.backdash - dt).max(0.0);
        self.roll = (self.roll - dt).max(0.0);
        self.spot_dodge = (self.spot_dodge - dt).max(0.0);
    }

    fn get(&self, kind: EscapeKind) -> f32 {
        match kind {
            EscapeKind::Backdash => self.backdash,
            EscapeKind::Roll => self.roll,
            EscapeKind::SpotDodge => self.spot_dodge,
        }
    }

    fn start(&mut self, kind: EscapeKind, seconds: f32) {
        match kind {
            EscapeKind::Backdash => self.backdash = seconds,
            EscapeKind::Roll => self.roll = seconds,
            EscapeKind::SpotDodge => self.spot_dodge = seconds,
        }
    }
}

// ============================================================================
// Defense system
// ============================================================================

/// Blocking and escape state for one fighter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefenseSystem {
    config: DefenseConfig,
    state: DefenseState,
    state_timer: f32,
    block_charges: u8,
    hit_counter: u8,
    cooldowns: EscapeCooldowns,
    continuous_block_time: f32,
    invincible: bool,
    stats: DefenseStats,
    effects: Vec<EscapeEffect>,
}

impl Default for DefenseSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl DefenseSystem {
    /// Creates a defense system with stock tuning.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DefenseConfig::default())
    }

    /// Creates a defense system with custom tuning.
    #[must_use]
    pub fn with_config(config: DefenseConfig) -> Self {
        let config = config.sanitized();
        Self {
            config,
            state: DefenseState::Neutral,
            state_timer: 0.0,
            block_charges: config.max_charges,
            hit_counter: 0,
            cooldowns: EscapeCooldowns::default(),
            continuous_block_time: 0.0,
            invincible: false,
            stats: DefenseStats::default(),
            effects: Vec::new(),
        }
    }

    /// Tuning in use.
    #[must_use]
    pub const fn config(&self) -> &DefenseConfig {
        &self.config
    }

    /// Tuning of one escape move.
    #[must_use]
    pub const fn escape_config(&self, kind: EscapeKind) -> &EscapeConfig {
        match kind {
            EscapeKind::Backdash => &self.config.backdash,
            EscapeKind::Roll => &self.config.roll,
            EscapeKind::SpotDodge => &self.config.spot_dodge,
        }
    }

    fn active_escape(&self) -> Option<EscapeKind> {
        match self.state {
            DefenseState::Backdash => Some(EscapeKind::Backdash),
            DefenseState::Roll => Some(EscapeKind::Roll),
            DefenseState::SpotDodge => Some(EscapeKind::SpotDodge),
            _ => None,
        }
    }

    /// Advances timers and processes a requested escape.
    ///
    /// Order: cooldowns tick, the state timer advances, invincibility is
    /// derived from the active escape's window, finished escapes return to
    /// neutral, and only then is `request` considered. `stamina` is the
    /// owner's current pool, used by the roll's own stamina check.
    pub fn update(
        &mut self,
        dt: f32,
        request: Option<EscapeKind>,
        facing: Facing,
        stamina: f32,
    ) -> Option<EscapeLaunch> {
        self.cooldowns.tick(dt);
        self.state_timer += dt;

        if self.state == DefenseState::StandingBlock {
            self.continuous_block_time += dt;
        } else {
            self.continuous_block_time = 0.0;
        }

        if let Some(kind) = self.active_escape() {
            let escape = *self.escape_config(kind);
            self.invincible = escape.is_invincible_at(self.state_timer);
            if self.state_timer >= escape.duration {
                self.invincible = false;
                self.set_state(DefenseState::Neutral);
            }
        }

        self.effects.retain_mut(|effect| {
            effect.remaining -= dt;
            effect.remaining > 0.0
        });

        if self.is_in_escape_state() {
            return None;
        }
        request.and_then(|kind| self.execute(kind, facing, stamina))
    }

    /// Changes state, restarting the state timer only on an actual change.
    pub fn set_state(&mut self, state: DefenseState) {
        if self.state != state {
            self.state = state;
            self.state_timer = 0.0;
        }
    }

    /// Spends a block charge against `attack` if one is left.
    pub fn attempt_block(&mut self, attack: Attack) -> BlockOutcome {
        if self.block_charges == 0 {
            return BlockOutcome {
                blocked: false,
                damage: attack.damage,
                chip_damage: 0,
                pushback: 0.0,
                frame_advantage: 0,
                feedback: BlockFeedback::NoBlocks,
            };
        }

        self.block_charges -= 1;
        self.stats.blocks_total += 1;

        let mut pushback = self.config.pushback;
        if self.continuous_block_time > self.config.anti_turtle_threshold {
            pushback *= self.config.anti_turtle_pushback_multiplier;
        }
        let chip_damage = (attack.damage.max(0) as f32 * self.config.chip_damage_percent) as i32;

        self.set_state(DefenseState::StandingBlock);
        debug!(charges = self.block_charges, pushback, "Hit blocked");

        BlockOutcome {
            blocked: true,
            damage: 0,
            chip_damage,
            pushback,
            frame_advantage: self.config.block_frame_advantage,
            feedback: BlockFeedback::Blocked,
        }
    }

    /// Whether the given escape may start now.
    #[must_use]
    pub fn can_escape(&self, kind: EscapeKind, stamina: f32) -> bool {
        self.state == DefenseState::Neutral
            && self.cooldowns.get(kind) <= 0.0
            && stamina >= self.escape_config(kind).stamina_cost
    }

    /// Whether a backdash may start now.
    #[must_use]
    pub fn can_backdash(&self) -> bool {
        self.can_escape(EscapeKind::Backdash, f32::INFINITY)
    }

    /// Whether a roll may start with the given stamina.
    #[must_use]
    pub fn can_roll(&self, stamina: f32) -> bool {
        self.can_escape(EscapeKind::Roll, stamina)
    }

    /// Whether a spot dodge may start now.
    #[must_use]
    pub fn can_spot_dodge(&self) -> bool {
        self.can_escape(EscapeKind::SpotDodge, f32::INFINITY)
    }

    /// Starts an escape if allowed.
    ///
    /// Backdash travels against `facing`, roll travels with it and spot
    /// dodge stays put. Backdash is invincible from its first instant; the
    /// others wait for their window to open on the next update.
    pub fn execute(&mut self, kind: EscapeKind, facing: Facing, stamina: f32) -> Option<EscapeLaunch> {
        if !self.can_escape(kind, stamina) {
            return None;
        }
        let escape = *self.escape_config(kind);

        self.set_state(kind.state());
        self.cooldowns.start(kind, escape.cooldown);
        self.invincible = kind == EscapeKind::Backdash;
        self.stats.escapes_used += 1;
        self.effects.push(EscapeEffect {
            kind,
            remaining: self.config.effect_duration,
        });

        let velocity_x = match kind {
            EscapeKind::Backdash => Some(escape.speed() * facing.flipped().sign()),
            EscapeKind::Roll => Some(escape.speed() * facing.sign()),
            EscapeKind::SpotDodge => None,
        };
        debug!(?kind, "Escape started");

        Some(EscapeLaunch {
            kind,
            velocity_x,
            stamina_cost: escape.stamina_cost,
        })
    }

    /// Counts an unblocked hit and returns a charge every few hits.
    pub fn register_hit(&mut self) {
        self.hit_counter += 1;
        if self.hit_counter >= self.config.hits_to_regen {
            self.hit_counter = 0;
            if self.block_charges < self.config.max_charges {
                self.block_charges += 1;
                debug!(charges = self.block_charges, "Block charge restored");
            }
        }
    }

    /// Hits still needed before the next charge comes back.
    #[must_use]
    pub fn hits_until_regen(&self) -> u8 {
        self.config.hits_to_regen - self.hit_counter
    }

    /// Whether the fighter is in an escape past its invincibility window.
    #[must_use]
    pub fn is_vulnerable(&self) -> bool {
        self.active_escape()
            .is_some_and(|kind| self.state_timer > self.escape_config(kind).invincibility_end)
    }

    /// Restores the fresh-round state. Lifetime statistics are kept.
    pub fn reset(&mut self) {
        self.state = DefenseState::Neutral;
        self.state_timer = 0.0;
        self.block_charges = self.config.max_charges;
        self.hit_counter = 0;
        self.cooldowns = EscapeCooldowns::default();
        self.continuous_block_time = 0.0;
        self.invincible = false;
        self.effects.clear();
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> DefenseState {
        self.state
    }

    /// Seconds since the current state was entered.
    #[must_use]
    pub const fn state_timer(&self) -> f32 {
        self.state_timer
    }

    /// Whether the fighter is holding block.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.state == DefenseState::StandingBlock
    }

    /// Whether an escape is in progress.
    #[must_use]
    pub const fn is_in_escape_state(&self) -> bool {
        self.state.is_escape()
    }

    /// Whether incoming hits are ignored right now.
    #[must_use]
    pub const fn is_invincible(&self) -> bool {
        self.invincible
    }

    /// Remaining block charges.
    #[must_use]
    pub const fn block_charges(&self) -> u8 {
        self.block_charges
    }

    /// Seconds spent blocking without letting go.
    #[must_use]
    pub const fn continuous_block_time(&self) -> f32 {
        self.continuous_block_time
    }

    /// Remaining cooldown of an escape.
    #[must_use]
    pub fn cooldown(&self, kind: EscapeKind) -> f32 {
        self.cooldowns.get(kind)
    }

    /// Lifetime statistics.
    #[must_use]
    pub const fn stats(&self) -> DefenseStats {
        self.stats
    }

    /// Escape effects still on screen.
    #[must_use]
    pub fn effects(&self) -> &[EscapeEffect] {
        &self.effects
    }
}
