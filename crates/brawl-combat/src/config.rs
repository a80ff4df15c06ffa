//! Tuning configuration shared by the combat systems.
//!
//! Every struct here carries the stock numbers in its `Default` impl and
//! can be overridden from RON. Values are checked once when a system is
//! built; out-of-range numbers fall back to their defaults with a warning
//! so a bad tuning file can never stop a match.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use brawl_common::BrawlError;

/// Errors raised while reading tuning data.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Text could not be parsed
    #[error("failed to parse {format} config: {reason}")]
    Parse {
        /// Source format name
        format: &'static str,
        /// Parser message
        reason: String,
    },

    /// A value is outside its valid range
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

impl From<ConfigError> for BrawlError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Parses any tuning struct from RON text.
pub fn from_ron<T: DeserializeOwned>(text: &str) -> ConfigResult<T> {
    ron::from_str(text).map_err(|e| ConfigError::Parse {
        format: "ron",
        reason: e.to_string(),
    })
}

/// Replaces a non-finite or negative value with its default.
pub(crate) fn non_negative(field: &'static str, value: f32, default: f32) -> f32 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        warn!(field, value, default, "Out-of-range tuning value, using default");
        default
    }
}

/// Replaces a non-finite or non-positive value with its default.
pub(crate) fn positive(field: &'static str, value: f32, default: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        warn!(field, value, default, "Out-of-range tuning value, using default");
        default
    }
}

/// Size of the playfield.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Arena width
    pub width: f32,
    /// Arena height
    pub height: f32,
    /// Gap between a grounded fighter's feet and the bottom edge
    pub ground_margin: f32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 540.0,
            ground_margin: 20.0,
        }
    }
}

impl ArenaConfig {
    /// Y coordinate at which a body of the given height stands on the ground.
    #[must_use]
    pub fn ground_y(&self, body_height: f32) -> f32 {
        self.height - body_height - self.ground_margin
    }

    /// Returns a copy with invalid dimensions replaced by defaults.
    #[must_use]
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        Self {
            width: positive("arena.width", self.width, defaults.width),
            height: positive("arena.height", self.height, defaults.height),
            ground_margin: non_negative(
                "arena.ground_margin",
                self.ground_margin,
                defaults.ground_margin,
            ),
        }
    }
}

/// Timing and motion of one escape move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EscapeConfig {
    /// Horizontal distance covered; zero for moves that stay in place
    pub distance: f32,
    /// Total time spent in the escape state
    pub duration: f32,
    /// Invincibility opens at this time since state entry
    pub invincibility_start: f32,
    /// Invincibility closes at this time since state entry
    pub invincibility_end: f32,
    /// Length of the punishable tail after invincibility
    pub recovery_vulnerable: f32,
    /// Time before the move can be used again
    pub cooldown: f32,
    /// Stamina drained by the defense system itself
    pub stamina_cost: f32,
}

impl EscapeConfig {
    /// Stock backdash.
    pub const BACKDASH: Self = Self {
        distance: 150.0,
        duration: 0.3,
        invincibility_start: 0.0,
        invincibility_end: 0.15,
        recovery_vulnerable: 0.12,
        cooldown: 0.8,
        stamina_cost: 0.0,
    };

    /// Stock roll.
    pub const ROLL: Self = Self {
        distance: 200.0,
        duration: 0.5,
        invincibility_start: 0.05,
        invincibility_end: 0.35,
        recovery_vulnerable: 0.15,
        cooldown: 1.2,
        stamina_cost: 20.0,
    };

    /// Stock spot dodge.
    pub const SPOT_DODGE: Self = Self {
        distance: 0.0,
        duration: 0.25,
        invincibility_start: 0.02,
        invincibility_end: 0.18,
        recovery_vulnerable: 0.07,
        cooldown: 0.6,
        stamina_cost: 0.0,
    };

    /// Horizontal speed while the move runs.
    #[must_use]
    pub fn speed(&self) -> f32 {
        self.distance / self.duration
    }

    /// Whether `elapsed` seconds into the move fall inside the invincibility window.
    #[must_use]
    pub fn is_invincible_at(&self, elapsed: f32) -> bool {
        elapsed >= self.invincibility_start && elapsed <= self.invincibility_end
    }

    fn sanitized(self, name: &'static str, defaults: Self) -> Self {
        let duration = positive(name, self.duration, defaults.duration);
        let start = non_negative(name, self.invincibility_start, defaults.invincibility_start)
            .min(duration);
        let end = non_negative(name, self.invincibility_end, defaults.invincibility_end)
            .clamp(start, duration);
        Self {
            distance: non_negative(name, self.distance, defaults.distance),
            duration,
            invincibility_start: start,
            invincibility_end: end,
            recovery_vulnerable: non_negative(
                name,
                self.recovery_vulnerable,
                defaults.recovery_vulnerable,
            ),
            cooldown: non_negative(name, self.cooldown, defaults.cooldown),
            stamina_cost: non_negative(name, self.stamina_cost, defaults.stamina_cost),
        }
    }
}

/// Blocking and escape tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefenseConfig {
    /// Block charges available from a fresh reset
    pub max_charges: u8,
    /// Unblocked hits taken before one charge comes back
    pub hits_to_regen: u8,
    /// Fraction of a blocked hit that still lands as chip damage
    pub chip_damage_percent: f32,
    /// Pushback applied to a blocking fighter
    pub pushback: f32,
    /// Frame advantage reported after a block
    pub block_frame_advantage: i32,
    /// Continuous blocking beyond this many seconds scales pushback
    pub anti_turtle_threshold: f32,
    /// Pushback multiplier once the anti-turtle threshold is passed
    pub anti_turtle_pushback_multiplier: f32,
    /// How long escape effect records stay visible
    pub effect_duration: f32,
    /// Backdash tuning
    pub backdash: EscapeConfig,
    /// Roll tuning
    pub roll: EscapeConfig,
    /// Spot dodge tuning
    pub spot_dodge: EscapeConfig,
}

impl Default for DefenseConfig {
    fn default() -> Self {
        Self {
            max_charges: 3,
            hits_to_regen: 2,
            chip_damage_percent: 0.0,
            pushback: 3.0,
            block_frame_advantage: -4,
            anti_turtle_threshold: 3.0,
            anti_turtle_pushback_multiplier: 1.3,
            effect_duration: 0.3,
            backdash: EscapeConfig::BACKDASH,
            roll: EscapeConfig::ROLL,
            spot_dodge: EscapeConfig::SPOT_DODGE,
        }
    }
}

impl DefenseConfig {
    /// Parses defense tuning from RON and sanitizes it.
    pub fn from_ron(text: &str) -> ConfigResult<Self> {
        from_ron::<Self>(text).map(Self::sanitized)
    }

    /// Returns a copy with invalid values replaced by defaults.
    #[must_use]
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let hits_to_regen = if self.hits_to_regen == 0 {
            warn!("defense.hits_to_regen must be at least 1, using default");
            defaults.hits_to_regen
        } else {
            self.hits_to_regen
        };
        Self {
            max_charges: self.max_charges,
            hits_to_regen,
            chip_damage_percent: non_negative(
                "defense.chip_damage_percent",
                self.chip_damage_percent,
                defaults.chip_damage_percent,
            )
            .min(1.0),
            pushback: non_negative("defense.pushback", self.pushback, defaults.pushback),
            block_frame_advantage: self.block_frame_advantage,
            anti_turtle_threshold: non_negative(
                "defense.anti_turtle_threshold",
                self.anti_turtle_threshold,
                defaults.anti_turtle_threshold,
            ),
            anti_turtle_pushback_multiplier: positive(
                "defense.anti_turtle_pushback_multiplier",
                self.anti_turtle_pushback_multiplier,
                defaults.anti_turtle_pushback_multiplier,
            ),
            effect_duration: non_negative(
                "defense.effect_duration",
                self.effect_duration,
                defaults.effect_duration,
            ),
            backdash: self.backdash.sanitized("defense.backdash", defaults.backdash),
            roll: self.roll.sanitized("defense.roll", defaults.roll),
            spot_dodge: self
                .spot_dodge
                .sanitized("defense.spot_dodge", defaults.spot_dodge),
        }
    }
}

/// Stamina pool tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaminaConfig {
    /// Pool size
    pub max: f32,
    /// Points regained per second
    pub regen_rate: f32,
    /// Seconds after the last spend before regeneration starts
    pub regen_delay: f32,
    /// Cost of a backdash
    pub backdash_cost: f32,
    /// Cost of a roll (on top of the defense system's own roll cost)
    pub roll_cost: f32,
    /// Cost of a spot dodge
    pub dodge_cost: f32,
}

impl Default for StaminaConfig {
    fn default() -> Self {
        Self {
            max: 100.0,
            regen_rate: 15.0,
            regen_delay: 0.5,
            backdash_cost: 20.0,
            roll_cost: 25.0,
            dodge_cost: 15.0,
        }
    }
}

impl StaminaConfig {
    /// Returns a copy with invalid values replaced by defaults.
    #[must_use]
    pub fn sanitized(self) -> Self {
        let d = Self::default();
        Self {
            max: positive("stamina.max", self.max, d.max),
            regen_rate: non_negative("stamina.regen_rate", self.regen_rate, d.regen_rate),
            regen_delay: non_negative("stamina.regen_delay", self.regen_delay, d.regen_delay),
            backdash_cost: non_negative("stamina.backdash_cost", self.backdash_cost, d.backdash_cost),
            roll_cost: non_negative("stamina.roll_cost", self.roll_cost, d.roll_cost),
            dodge_cost: non_negative("stamina.dodge_cost", self.dodge_cost, d.dodge_cost),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ground_line() {
        let arena = ArenaConfig::default();
        assert_eq!(arena.ground_y(200.0), 320.0);
    }

    #[test]
    fn test_escape_speed() {
        assert!((EscapeConfig::BACKDASH.speed() - 500.0).abs() < 1e-3);
        assert!((EscapeConfig::ROLL.speed() - 400.0).abs() < 1e-3);
        assert_eq!(EscapeConfig::SPOT_DODGE.speed(), 0.0);
    }

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let config = DefenseConfig::from_ron("(max_charges: 5, pushback: 4.5)").expect("parse");
        assert_eq!(config.max_charges, 5);
        assert_eq!(config.pushback, 4.5);
        assert_eq!(config.hits_to_regen, 2);
        assert_eq!(config.roll, EscapeConfig::ROLL);
    }

    #[test]
    fn test_malformed_ron_is_an_error() {
        let err = DefenseConfig::from_ron("(max_charges: \"lots\")").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { format: "ron", .. }));
        let brawl: BrawlError = err.into();
        assert!(brawl.to_string().starts_with("Config error"));
    }

    #[test]
    fn test_sanitize_repairs_bad_values() {
        let mut config = DefenseConfig {
            hits_to_regen: 0,
            pushback: f32::NAN,
            chip_damage_percent: 4.0,
            ..DefenseConfig::default()
        };
        config.roll.duration = -1.0;
        config.roll.invincibility_end = 9.0;

        let fixed = config.sanitized();
        assert_eq!(fixed.hits_to_regen, 2);
        assert_eq!(fixed.pushback, 3.0);
        assert_eq!(fixed.chip_damage_percent, 1.0);
        assert_eq!(fixed.roll.duration, 0.5);
        assert_eq!(fixed.roll.invincibility_end, 0.5);
    }
}
