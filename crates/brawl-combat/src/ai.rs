//! Enemy AI: a slow decision loop over a fast execution step.
//!
//! Every `decision_interval` seconds the AI picks a coarse [`AiState`]
//! from the distance to its opponent; every frame it acts on the current
//! state. Difficulty only changes the numbers (speed, aggressiveness,
//! reaction, decision rate, stats), never the algorithm. The AI does not
//! use escape moves.
//!
//! Two styles exist:
//! - [`AiStyle::Reactive`]: short reach, blocks on reaction, walks to
//!   within reach before swinging.
//! - [`AiStyle::Tactical`]: reaction-time based blocking, health-aware
//!   approach, opportunistic attacks on the way in.

use fastrand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

use crate::fighter::{CombatStats, Fighter, OpponentView};
use crate::physics::Facing;

/// Errors that can occur in the AI system.
#[derive(Debug, Clone, Error)]
pub enum AiError {
    /// Difficulty label not recognized
    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(String),
}

/// Result type for AI operations.
pub type AiResult<T> = Result<T, AiError>;

// ============================================================================
// Difficulty
// ============================================================================

/// Difficulty level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// Slow and passive
    Easy,
    /// Baseline
    #[default]
    Normal,
    /// Faster decisions, more attacks
    Hard,
    /// Near-instant reactions
    Expert,
    /// Expert reactions with boosted stats and a bigger health pool
    Boss,
}

impl Difficulty {
    /// Parses a label, falling back to [`Difficulty::Normal`] with a
    /// warning when it is not recognized.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or_else(|err: AiError| {
            warn!(%err, "Falling back to normal difficulty");
            Self::Normal
        })
    }

    /// Label used in configs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Normal => "normal",
            Self::Hard => "hard",
            Self::Expert => "expert",
            Self::Boss => "boss",
        }
    }

    /// Tuning numbers for the given style.
    #[must_use]
    pub const fn preset(self, style: AiStyle) -> DifficultyPreset {
        match style {
            AiStyle::Reactive => match self {
                Self::Easy => DifficultyPreset::reactive(0.7, 0.3, 0.5, 0),
                Self::Normal => DifficultyPreset::reactive(1.0, 0.5, 0.3, 0),
                Self::Hard => DifficultyPreset::reactive(1.2, 0.7, 0.2, 0),
                Self::Expert | Self::Boss => DifficultyPreset::reactive(1.4, 0.85, 0.15, 20),
            },
            AiStyle::Tactical => match self {
                Self::Easy => DifficultyPreset::tactical(0.3, 0.5, 0.6, 0.7, None),
                Self::Normal => DifficultyPreset::tactical(0.5, 0.3, 0.4, 1.0, None),
                Self::Hard => DifficultyPreset::tactical(0.7, 0.15, 0.25, 1.2, None),
                Self::Expert => DifficultyPreset::tactical(0.85, 0.1, 0.15, 1.3, None),
                Self::Boss => DifficultyPreset::tactical(0.85, 0.1, 0.2, 1.4, Some(120)),
            },
        }
    }
}

impl FromStr for Difficulty {
    type Err = AiError;

    fn from_str(s: &str) -> AiResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "normal" => Ok(Self::Normal),
            "hard" => Ok(Self::Hard),
            "expert" => Ok(Self::Expert),
            "boss" | "final_boss" => Ok(Self::Boss),
            _ => Err(AiError::UnknownDifficulty(s.to_string())),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Numbers a difficulty applies to an AI and its fighter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyPreset {
    /// Multiplier on the style's base move speed
    pub move_speed_multiplier: f32,
    /// Chance to choose aggression when a roll comes up
    pub aggressiveness: f32,
    /// Seconds a tactical AI needs to react to an attack
    pub reaction_time: f32,
    /// Seconds between decisions
    pub decision_interval: f32,
    /// Multiplier on strength and defense
    pub stat_multiplier: f32,
    /// Flat defense bonus
    pub defense_bonus: u32,
    /// Health pool override
    pub health: Option<i32>,
}

impl DifficultyPreset {
    const fn reactive(move_speed: f32, aggressiveness: f32, interval: f32, defense_bonus: u32) -> Self {
        Self {
            move_speed_multiplier: move_speed,
            aggressiveness,
            reaction_time: 0.3,
            decision_interval: interval,
            stat_multiplier: 1.0,
            defense_bonus,
            health: None,
        }
    }

    const fn tactical(
        aggressiveness: f32,
        reaction_time: f32,
        interval: f32,
        stat_multiplier: f32,
        health: Option<i32>,
    ) -> Self {
        Self {
            move_speed_multiplier: 1.0,
            aggressiveness,
            reaction_time,
            decision_interval: interval,
            stat_multiplier,
            defense_bonus: 0,
            health,
        }
    }

    /// Applies the stat side of the preset to a stat block.
    #[must_use]
    pub fn scale_stats(&self, stats: CombatStats) -> CombatStats {
        let scale = |value: u32| (value as f32 * self.stat_multiplier).floor() as u32;
        CombatStats {
            strength: scale(stats.strength),
            speed: stats.speed,
            defense: scale(stats.defense) + self.defense_bonus,
        }
    }
}

// ============================================================================
// AI
// ============================================================================

/// Decision style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AiStyle {
    /// Block-figure enemy behavior
    Reactive,
    /// Sprite enemy behavior
    #[default]
    Tactical,
}

/// Coarse behavior chosen by the decision loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AiState {
    /// Wait and face the opponent
    #[default]
    Idle,
    /// Close the distance
    Approach,
    /// Back away
    Retreat,
    /// Swing when in reach
    Attack,
    /// Hold block until the block timer runs out
    Block,
}

/// Distance bands and move speeds the AI works with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AiTuning {
    /// Horizontal speed in units per second
    pub move_speed: f32,
    /// Chance to choose aggression
    pub aggressiveness: f32,
    /// Seconds a tactical AI needs to react
    pub reaction_time: f32,
    /// Seconds between decisions
    pub decision_interval: f32,
    /// Reactive: close band and swing reach
    pub attack_range: f32,
}

/// AI controller for one enemy fighter.
#[derive(Debug, Clone)]
pub struct EnemyAi {
    style: AiStyle,
    difficulty: Difficulty,
    tuning: AiTuning,
    state: AiState,
    decision_timer: f32,
    block_timer: f32,
    rng: Rng,
}

impl EnemyAi {
    /// Reactive close band.
    pub const ATTACK_RANGE: f32 = 150.0;
    /// Reactive medium band.
    pub const MEDIUM_RANGE: f32 = 300.0;
    /// Reactive block hold.
    pub const REACTIVE_BLOCK_TIME: f32 = 0.3;

    /// Creates an AI and applies the difficulty's stat changes to `fighter`.
    pub fn new(style: AiStyle, difficulty: Difficulty, fighter: &mut Fighter, seed: u64) -> Self {
        let preset = difficulty.preset(style);
        let stats = preset.scale_stats(fighter.stats());
        fighter.set_stats(stats);
        if let Some(health) = preset.health {
            fighter.set_max_health(health);
        }

        let base_speed = match style {
            AiStyle::Reactive => 150.0 + stats.speed as f32,
            AiStyle::Tactical => 200.0 + stats.speed as f32 * 2.0,
        };
        let tuning = AiTuning {
            move_speed: base_speed * preset.move_speed_multiplier,
            aggressiveness: preset.aggressiveness,
            reaction_time: preset.reaction_time,
            decision_interval: preset.decision_interval,
            attack_range: Self::ATTACK_RANGE,
        };
        debug!(?style, %difficulty, fighter = fighter.name(), "Enemy AI ready");

        Self {
            style,
            difficulty,
            tuning,
            state: AiState::Idle,
            decision_timer: 0.0,
            block_timer: 0.0,
            rng: Rng::with_seed(seed),
        }
    }

    /// Overrides aggressiveness (tower floors tune it per floor).
    #[must_use]
    pub fn with_aggressiveness(mut self, aggressiveness: f32) -> Self {
        self.tuning.aggressiveness = aggressiveness.clamp(0.0, 1.0);
        self
    }

    /// Runs the decision loop and the execution step for one frame.
    ///
    /// Without an opponent, or once defeated, the AI stands still.
    pub fn drive(&mut self, fighter: &mut Fighter, opponent: Option<&OpponentView>, dt: f32) {
        let opponent = match opponent {
            Some(opponent) if fighter.health() > 0 => opponent,
            _ => {
                fighter.set_moving(false);
                return;
            }
        };
        match self.style {
            AiStyle::Reactive => {
                self.decision_timer += dt;
                if self.decision_timer >= self.tuning.decision_interval
                    && !fighter.is_hurt()
                    && !fighter.is_attacking()
                {
                    self.decision_timer = 0.0;
                    self.decide_reactive(fighter, opponent);
                }
                self.execute_reactive(fighter, opponent, dt);
            }
            AiStyle::Tactical => {
                self.decision_timer += dt;
                if self.decision_timer >= self.tuning.decision_interval {
                    self.decision_timer = 0.0;
                    if !fighter.is_hurt() && !fighter.is_attacking() {
                        self.decide_tactical(fighter, opponent);
                    }
                }
                self.execute_tactical(fighter, opponent, dt);
            }
        }
    }

    fn enter_block(&mut self, seconds: f32) {
        self.state = AiState::Block;
        self.block_timer = seconds;
    }

    fn decide_reactive(&mut self, fighter: &Fighter, opponent: &OpponentView) {
        let distance = (opponent.position.x - fighter.position().x).abs();
        if distance < self.tuning.attack_range {
            if opponent.attacking && self.rng.f32() < 0.6 {
                self.enter_block(Self::REACTIVE_BLOCK_TIME);
            } else if self.rng.f32() < self.tuning.aggressiveness {
                self.state = AiState::Attack;
            } else if self.rng.f32() < 0.5 {
                self.state = AiState::Retreat;
            } else {
                self.state = AiState::Idle;
            }
        } else if distance < Self::MEDIUM_RANGE {
            self.state = if self.rng.f32() < 0.7 {
                AiState::Approach
            } else {
                AiState::Idle
            };
        } else {
            self.state = AiState::Approach;
        }
    }

    fn execute_reactive(&mut self, fighter: &mut Fighter, opponent: &OpponentView, dt: f32) {
        let offset = opponent.position.x - fighter.position().x;
        let toward = Facing::toward(0.0, offset);
        fighter.set_moving(false);

        match self.state {
            AiState::Approach => {
                if offset.abs() > self.tuning.attack_range * 0.8 {
                    fighter.walk(toward.sign() * self.tuning.move_speed * dt);
                    fighter.set_facing(toward);
                    fighter.set_moving(true);
                }
            }
            AiState::Retreat => {
                fighter.walk(-toward.sign() * self.tuning.move_speed * 0.7 * dt);
                fighter.set_facing(toward);
                fighter.set_moving(true);
            }
            AiState::Attack => {
                if offset.abs() < self.tuning.attack_range && !fighter.is_blocking() {
                    fighter.attack();
                }
                self.state = AiState::Idle;
            }
            AiState::Block => self.hold_block(fighter, dt),
            AiState::Idle => fighter.set_facing(toward),
        }
    }

    fn decide_tactical(&mut self, fighter: &Fighter, opponent: &OpponentView) {
        let distance = (opponent.position.x - fighter.position().x).abs();
        let aggressiveness = self.tuning.aggressiveness;

        if opponent.attacking && distance < 180.0 && self.rng.f32() < 1.0 - self.tuning.reaction_time {
            let hold = 0.5 + self.rng.f32() * 0.3;
            self.enter_block(hold);
            return;
        }

        if distance < 100.0 {
            if self.rng.f32() < aggressiveness {
                self.state = AiState::Attack;
            } else if self.rng.f32() < 0.4 {
                self.state = AiState::Retreat;
            } else {
                let hold = 0.5 + self.rng.f32() * 0.3;
                self.enter_block(hold);
            }
        } else if distance < 250.0 {
            let ahead_on_health = fighter.health() > opponent.health;
            if self.rng.f32() < aggressiveness * 0.8 || ahead_on_health {
                self.state = AiState::Approach;
            } else if self.rng.f32() < 0.5 {
                self.state = AiState::Idle;
            } else {
                let hold = 0.5 + self.rng.f32() * 0.3;
                self.enter_block(hold);
            }
        } else {
            self.state = if self.rng.f32() < aggressiveness {
                AiState::Approach
            } else {
                AiState::Idle
            };
        }
    }

    fn execute_tactical(&mut self, fighter: &mut Fighter, opponent: &OpponentView, dt: f32) {
        if fighter.is_hurt() {
            fighter.block(false);
            fighter.set_moving(false);
            return;
        }
        if fighter.is_attacking() {
            fighter.set_moving(false);
            return;
        }

        let offset = opponent.position.x - fighter.position().x;
        let distance = offset.abs();
        let toward = Facing::toward(0.0, offset);
        let speed = self.tuning.move_speed;

        match self.state {
            AiState::Approach => {
                fighter.block(false);
                fighter.walk(toward.sign() * speed * dt);
                fighter.set_facing(toward);
                fighter.set_moving(true);
                if distance < 130.0 && self.rng.f32() < self.tuning.aggressiveness * 0.4 {
                    fighter.attack();
                }
            }
            AiState::Retreat => {
                fighter.block(false);
                fighter.walk(-toward.sign() * speed * 0.8 * dt);
                fighter.set_facing(toward);
                fighter.set_moving(true);
            }
            AiState::Attack => {
                fighter.block(false);
                if distance < 140.0 {
                    fighter.attack();
                } else {
                    fighter.walk(toward.sign() * speed * dt);
                    fighter.set_facing(toward);
                    fighter.set_moving(true);
                }
            }
            AiState::Block => {
                fighter.set_moving(false);
                self.hold_block(fighter, dt);
            }
            AiState::Idle => {
                fighter.block(false);
                fighter.set_moving(false);
                if self.rng.f32() < 0.02 {
                    fighter.set_velocity_x((self.rng.f32() - 0.5) * 3.0);
                }
            }
        }
    }

    fn hold_block(&mut self, fighter: &mut Fighter, dt: f32) {
        if self.block_timer > 0.0 {
            self.block_timer -= dt;
            fighter.block(true);
        } else {
            fighter.block(false);
            self.state = AiState::Idle;
        }
    }

    /// Current behavior.
    #[must_use]
    pub const fn state(&self) -> AiState {
        self.state
    }

    /// Forces a behavior; the next decision replaces it.
    pub fn set_state(&mut self, state: AiState) {
        self.state = state;
    }

    /// Decision style.
    #[must_use]
    pub const fn style(&self) -> AiStyle {
        self.style
    }

    /// Difficulty in use.
    #[must_use]
    pub const fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Tuning in use.
    #[must_use]
    pub const fn tuning(&self) -> &AiTuning {
        &self.tuning
    }

    /// Seconds of block hold left.
    #[must_use]
    pub const fn block_timer(&self) -> f32 {
        self.block_timer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fighter::{FighterConfig, FighterInput, FighterVariant, SpriteConfig};

    const DT: f32 = 1.0 / 60.0;

    fn grounded(x: f32, variant: FighterVariant) -> Fighter {
        let mut fighter = Fighter::new(FighterConfig::new("Bot", x).with_variant(variant));
        for _ in 0..90 {
            fighter.update(DT, FighterInput::default(), None);
        }
        fighter
    }

    fn tick(ai: &mut EnemyAi, fighter: &mut Fighter, opponent: &OpponentView) {
        ai.drive(fighter, Some(opponent), DT);
        fighter.update(DT, FighterInput::default(), Some(opponent));
    }

    #[test]
    fn test_difficulty_labels() {
        assert_eq!(Difficulty::from_label("hard"), Difficulty::Hard);
        assert_eq!(Difficulty::from_label("FINAL_BOSS"), Difficulty::Boss);
        assert_eq!(Difficulty::from_label("medium"), Difficulty::Normal);
        assert!("nightmare".parse::<Difficulty>().is_err());
        assert_eq!(Difficulty::Expert.to_string(), "expert");
    }

    #[test]
    fn test_decision_interval_range() {
        for difficulty in [
            Difficulty::Easy,
            Difficulty::Normal,
            Difficulty::Hard,
            Difficulty::Expert,
            Difficulty::Boss,
        ] {
            for style in [AiStyle::Reactive, AiStyle::Tactical] {
                let interval = difficulty.preset(style).decision_interval;
                assert!((0.15..=0.6).contains(&interval), "{difficulty} {style:?}");
            }
        }
    }

    #[test]
    fn test_reactive_presets_scale_speed_and_defense() {
        let mut fighter = grounded(600.0, FighterVariant::Classic);
        let ai = EnemyAi::new(AiStyle::Reactive, Difficulty::Expert, &mut fighter, 1);
        assert!((ai.tuning().move_speed - (150.0 + 70.0) * 1.4).abs() < 1e-3);
        assert_eq!(fighter.stats().defense, 90);
        assert_eq!(ai.tuning().decision_interval, 0.15);

        let mut fighter = grounded(600.0, FighterVariant::Classic);
        let ai = EnemyAi::new(AiStyle::Reactive, Difficulty::Easy, &mut fighter, 1);
        assert!((ai.tuning().move_speed - 220.0 * 0.7).abs() < 1e-3);
        assert_eq!(ai.tuning().aggressiveness, 0.3);
    }

    #[test]
    fn test_tactical_boss_boosts_stats_and_health() {
        let mut fighter = grounded(600.0, FighterVariant::Sprite(SpriteConfig::default()));
        let before = fighter.stats();
        let ai = EnemyAi::new(AiStyle::Tactical, Difficulty::Boss, &mut fighter, 1);
        assert_eq!(fighter.stats().strength, (before.strength as f32 * 1.4).floor() as u32);
        assert_eq!(fighter.stats().defense, (before.defense as f32 * 1.4).floor() as u32);
        assert_eq!(fighter.max_health(), 120);
        assert!((ai.tuning().move_speed - (200.0 + 80.0 * 2.0)).abs() < 1e-3);
    }

    #[test]
    fn test_far_opponent_is_approached() {
        let mut fighter = grounded(800.0, FighterVariant::Classic);
        let mut ai = EnemyAi::new(AiStyle::Reactive, Difficulty::Normal, &mut fighter, 7);
        let opponent = grounded(100.0, FighterVariant::Classic).view();

        let start = fighter.position().x;
        for _ in 0..30 {
            tick(&mut ai, &mut fighter, &opponent);
        }
        assert_eq!(ai.state(), AiState::Approach);
        assert!(fighter.position().x < start, "walked toward the opponent");
        assert_eq!(fighter.facing(), Facing::Left);
    }

    #[test]
    fn test_reactive_approach_stops_at_reach() {
        let mut fighter = grounded(300.0, FighterVariant::Classic);
        let mut ai = EnemyAi::new(AiStyle::Reactive, Difficulty::Normal, &mut fighter, 3);
        ai.set_state(AiState::Approach);
        let opponent = grounded(400.0, FighterVariant::Classic).view();
        let x = fighter.position().x;
        ai.execute_reactive(&mut fighter, &opponent, DT);
        assert_eq!(fighter.position().x, x, "already inside 0.8 of reach");
        assert!(!fighter.is_moving());
    }

    #[test]
    fn test_reactive_attack_in_range_then_idle() {
        let mut fighter = grounded(300.0, FighterVariant::Classic);
        let mut ai = EnemyAi::new(AiStyle::Reactive, Difficulty::Normal, &mut fighter, 3);
        ai.set_state(AiState::Attack);
        let opponent = grounded(400.0, FighterVariant::Classic).view();
        ai.execute_reactive(&mut fighter, &opponent, DT);
        assert!(fighter.is_attacking());
        assert_eq!(ai.state(), AiState::Idle);
    }

    #[test]
    fn test_block_hold_expires_to_idle() {
        let mut fighter = grounded(300.0, FighterVariant::Classic);
        let mut ai = EnemyAi::new(AiStyle::Reactive, Difficulty::Normal, &mut fighter, 3);
        ai.enter_block(EnemyAi::REACTIVE_BLOCK_TIME);
        let opponent = grounded(420.0, FighterVariant::Classic).view();

        ai.execute_reactive(&mut fighter, &opponent, DT);
        fighter.update(DT, FighterInput::default(), Some(&opponent));
        assert!(fighter.is_blocking());

        for _ in 0..30 {
            ai.execute_reactive(&mut fighter, &opponent, DT);
            fighter.update(DT, FighterInput::default(), Some(&opponent));
        }
        assert_eq!(ai.state(), AiState::Idle);
        assert!(!fighter.is_blocking());
    }

    #[test]
    fn test_tactical_blocks_fast_when_reaction_allows() {
        let mut fighter = grounded(300.0, FighterVariant::Sprite(SpriteConfig::default()));
        let mut ai = EnemyAi::new(AiStyle::Tactical, Difficulty::Expert, &mut fighter, 11);
        let mut opponent = grounded(400.0, FighterVariant::Classic).view();
        opponent.attacking = true;

        let mut blocked = 0;
        for seed in 0..50 {
            ai.rng = Rng::with_seed(seed);
            ai.decide_tactical(&fighter, &opponent);
            if ai.state() == AiState::Block {
                blocked += 1;
                assert!((0.5..=0.8).contains(&ai.block_timer()));
            }
        }
        assert!(blocked > 35, "expert reacts about 90% of the time, got {blocked}");
    }

    #[test]
    fn test_never_escapes() {
        let mut fighter = grounded(500.0, FighterVariant::Sprite(SpriteConfig::default()));
        let mut ai = EnemyAi::new(AiStyle::Tactical, Difficulty::Hard, &mut fighter, 5);
        let mut opponent = grounded(350.0, FighterVariant::Classic).view();
        for frame in 0..600 {
            opponent.attacking = frame % 40 < 10;
            tick(&mut ai, &mut fighter, &opponent);
            assert!(!fighter.defense().is_in_escape_state());
        }
        assert_eq!(fighter.defense().stats().escapes_used, 0);
    }

    #[test]
    fn test_same_seed_same_behavior() {
        let run = |seed: u64| {
            let mut fighter = grounded(700.0, FighterVariant::Classic);
            let mut ai = EnemyAi::new(AiStyle::Reactive, Difficulty::Hard, &mut fighter, seed);
            let opponent = grounded(200.0, FighterVariant::Classic).view();
            let mut trace = Vec::new();
            for _ in 0..300 {
                tick(&mut ai, &mut fighter, &opponent);
                trace.push((ai.state(), fighter.position().x.to_bits()));
            }
            trace
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn test_missing_opponent_is_tolerated() {
        let mut fighter = grounded(300.0, FighterVariant::Classic);
        let mut ai = EnemyAi::new(AiStyle::Tactical, Difficulty::Normal, &mut fighter, 1);
        fighter.set_moving(true);
        ai.drive(&mut fighter, None, DT);
        assert!(!fighter.is_moving());
        assert_eq!(ai.state(), AiState::Idle);
    }
}
