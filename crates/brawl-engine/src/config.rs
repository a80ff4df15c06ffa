//! Runner configuration.
//!
//! Read from `brawl.toml`. Every field has a default, so a missing or
//! partial file still yields a playable setup.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use brawl_combat::{
    AiStyle, AuditConfig, CombatStats, FighterVariant, KeyCode, MatchConfig, SpriteConfig,
};

/// Configuration file name.
pub const CONFIG_FILE: &str = "brawl.toml";

/// Errors raised while reading the config file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        /// File path
        path: String,
        /// Underlying error
        source: io::Error,
    },

    /// File is not valid TOML for this config
    #[error("failed to parse {path}: {reason}")]
    Parse {
        /// File path
        path: String,
        /// Parser message
        reason: String,
    },
}

/// What the runner plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Best-of match against one AI
    #[default]
    Versus,
    /// Back-to-back gauntlet
    Audit,
    /// Untimed session against a training dummy
    Training,
    /// Ten-floor ladder
    Tower,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// Body selection in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Body {
    /// Block figure
    #[default]
    Classic,
    /// Stock sprite
    Sprite,
}

impl Body {
    /// Fighter variant for this body.
    #[must_use]
    pub fn variant(self) -> FighterVariant {
        match self {
            Self::Classic => FighterVariant::Classic,
            Self::Sprite => FighterVariant::Sprite(SpriteConfig::default()),
        }
    }
}

/// Whether a scripted key goes down or up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAction {
    /// Key goes down
    Press,
    /// Key goes up
    Release,
}

/// One entry of the scripted key timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScriptedKey {
    /// Seconds since the run started
    pub at: f32,
    /// Key
    pub key: KeyCode,
    /// Press or release
    pub action: KeyAction,
}

/// Player fighter setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSetup {
    /// Display name
    pub name: String,
    /// Body
    pub body: Body,
    /// Stat override
    pub stats: Option<CombatStats>,
    /// Let an AI drive the player instead of the key timeline
    pub autopilot: bool,
    /// Autopilot difficulty label
    pub autopilot_difficulty: String,
}

impl Default for PlayerSetup {
    fn default() -> Self {
        Self {
            name: "Player".to_string(),
            body: Body::Classic,
            stats: None,
            autopilot: true,
            autopilot_difficulty: "normal".to_string(),
        }
    }
}

/// Versus enemy setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemySetup {
    /// Display name
    pub name: String,
    /// Body
    pub body: Body,
    /// Stat override
    pub stats: Option<CombatStats>,
    /// Difficulty label
    pub difficulty: String,
    /// Decision style
    pub style: AiStyle,
}

impl Default for EnemySetup {
    fn default() -> Self {
        Self {
            name: "Rival".to_string(),
            body: Body::Sprite,
            stats: None,
            difficulty: "normal".to_string(),
            style: AiStyle::Tactical,
        }
    }
}

/// Runner configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// What to play
    pub mode: Mode,
    /// Log output format
    pub log_format: LogFormat,
    /// Seed for every random choice
    pub seed: u64,
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Simulated seconds before the run gives up
    pub time_limit: f32,
    /// Log every presented frame at trace level
    pub trace_frames: bool,
    /// Draw hitboxes in presented frames
    pub debug_boxes: bool,
    /// Player setup
    pub player: PlayerSetup,
    /// Versus enemy setup
    pub enemy: EnemySetup,
    /// Key timeline for a human-controlled player
    pub script: Vec<ScriptedKey>,
    /// Round rules
    #[serde(rename = "match")]
    pub match_rules: MatchConfig,
    /// Gauntlet rules
    pub audit: AuditConfig,
    /// Highest tower floor to attempt
    pub tower_floors: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Versus,
            log_format: LogFormat::Pretty,
            seed: 7,
            tick_rate: 60,
            time_limit: 600.0,
            trace_frames: false,
            debug_boxes: false,
            player: PlayerSetup::default(),
            enemy: EnemySetup::default(),
            script: Vec::new(),
            match_rules: MatchConfig::default(),
            audit: AuditConfig::default(),
            tower_floors: brawl_combat::TOTAL_FLOORS,
        }
    }
}

impl EngineConfig {
    /// Reads a config file. `Ok(None)` when the file does not exist.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Option<Self>, ConfigFileError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: Self = toml::from_str(&contents).map_err(|e| ConfigFileError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        config.validate();
        Ok(Some(config))
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::read(path) {
            Ok(Some(config)) => {
                info!("Loaded config from {}", path.display());
                config
            },
            Ok(None) => {
                info!("Config file not found, using defaults");
                Self::default()
            },
            Err(e) => {
                warn!("{e}, using defaults");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents =
            toml::to_string_pretty(self).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.tick_rate = self.tick_rate.clamp(10, 240);
        if !self.time_limit.is_finite() || self.time_limit <= 0.0 {
            warn!(time_limit = self.time_limit, "Invalid time limit, using default");
            self.time_limit = Self::default().time_limit;
        }
        self.tower_floors = self.tower_floors.clamp(1, brawl_combat::TOTAL_FLOORS);
        self.script.retain(|k| k.at.is_finite() && k.at >= 0.0);
        self.match_rules = self.match_rules.clone().sanitized();
        self.audit = self.audit.clone().sanitized();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brawl_combat::{AiStyle, TieBreak};
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.mode, Mode::Versus);
        assert_eq!(config.tick_rate, 60);
        assert_eq!(config.match_rules.max_rounds, 3);
        assert_eq!(config.audit.total_audits, 3);
        assert!(config.player.autopilot);
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig {
            tick_rate: 1,
            time_limit: -3.0,
            tower_floors: 40,
            ..EngineConfig::default()
        };
        config.validate();
        assert_eq!(config.tick_rate, 10);
        assert_eq!(config.time_limit, 600.0);
        assert_eq!(config.tower_floors, 10);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("brawl.toml");

        let mut config = EngineConfig {
            mode: Mode::Tower,
            seed: 42,
            ..EngineConfig::default()
        };
        config.match_rules.tie_break = TieBreak::Draw;
        config.enemy.style = AiStyle::Reactive;
        config.save_to(&config_path).expect("Failed to save config");

        let loaded = EngineConfig::load_from(&config_path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("brawl.toml");
        let text = r#"
mode = "audit"
log_format = "json"

[player]
body = "sprite"
autopilot = false

[[script]]
at = 0.5
key = "KeyJ"
action = "press"

[match]
max_rounds = 5

[audit]
total_audits = 4
label = "YAMAN"
"#;
        fs::write(&config_path, text).expect("write config");

        let loaded = EngineConfig::load_from(&config_path);
        assert_eq!(loaded.mode, Mode::Audit);
        assert_eq!(loaded.log_format, LogFormat::Json);
        assert_eq!(loaded.player.body, Body::Sprite);
        assert!(!loaded.player.autopilot);
        assert_eq!(loaded.script.len(), 1);
        assert_eq!(loaded.script[0].key, KeyCode::KeyJ);
        assert_eq!(loaded.match_rules.max_rounds, 5);
        assert_eq!(loaded.match_rules.round_duration, 90.0);
        assert_eq!(loaded.audit.total_audits, 4);
        assert_eq!(loaded.audit.enemy_hp, 70);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = EngineConfig::load_from("/nonexistent/path/brawl.toml");
        assert_eq!(config, EngineConfig::default());
        assert!(matches!(EngineConfig::read("/nonexistent/path/brawl.toml"), Ok(None)));
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("brawl.toml");
        fs::write(&config_path, "mode = [").expect("write config");

        assert!(matches!(EngineConfig::read(&config_path), Err(ConfigFileError::Parse { .. })));
        assert_eq!(EngineConfig::load_from(&config_path), EngineConfig::default());
    }

    #[test]
    fn test_body_variant() {
        assert_eq!(Body::Classic.variant(), FighterVariant::Classic);
        assert!(matches!(Body::Sprite.variant(), FighterVariant::Sprite(_)));
    }
}
