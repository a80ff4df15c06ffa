//! Audit gauntlet: enemies fought back to back.
//!
//! The player fighter is never touched here; whatever health, stamina and
//! position it ends one fight with carries into the next. Each spawned
//! enemy gets the gauntlet's health pool regardless of its template.

use fastrand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use brawl_common::RosterId;

use crate::ai::{AiStyle, Difficulty, EnemyAi};
use crate::config::{self, ConfigResult};
use crate::controller::{Combatant, Controller};
use crate::fighter::{CombatStats, Fighter, FighterConfig, FighterVariant};
use crate::physics::Facing;
use crate::roster::Roster;

/// Spawn x of every gauntlet enemy.
pub const ENEMY_SPAWN_X: f32 = 650.0;

/// Aggressiveness given to block-figure gauntlet enemies.
const CLASSIC_AGGRESSIVENESS: f32 = 0.5;

/// Gauntlet tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Enemies to defeat
    pub total_audits: u32,
    /// Health of every spawned enemy
    pub enemy_hp: i32,
    /// Progress label prefix
    pub label: String,
    /// AI difficulty label; unknown labels mean normal
    pub difficulty: String,
    /// Enemy strength
    pub enemy_strength: u32,
    /// Enemy speed
    pub enemy_speed: u32,
    /// Enemy defense
    pub enemy_defense: u32,
    /// Seed for enemy picks and AI rolls
    pub seed: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            total_audits: 3,
            enemy_hp: 70,
            label: "AUDIT".to_string(),
            difficulty: "normal".to_string(),
            enemy_strength: 60,
            enemy_speed: 50,
            enemy_defense: 45,
            seed: 0x0a0d_17,
        }
    }
}

impl AuditConfig {
    /// Parses from RON text.
    pub fn from_ron(text: &str) -> ConfigResult<Self> {
        config::from_ron(text).map(Self::sanitized)
    }

    /// Returns a copy with zero counts replaced by defaults.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.total_audits == 0 {
            tracing::warn!("Gauntlet needs at least one audit, using default");
            self.total_audits = defaults.total_audits;
        }
        if self.enemy_hp <= 0 {
            tracing::warn!(enemy_hp = self.enemy_hp, "Enemy health must be positive, using default");
            self.enemy_hp = defaults.enemy_hp;
        }
        self
    }

    fn enemy_stats(&self) -> CombatStats {
        CombatStats::new(self.enemy_strength, self.enemy_speed, self.enemy_defense)
    }
}

/// Receives gauntlet progress. Every hook defaults to doing nothing.
pub trait AuditObserver {
    /// An enemy spawned; `index` is 1-based.
    fn on_audit_start(&mut self, _index: u32, _total: u32, _name: &str) {}

    /// The current enemy was defeated.
    fn on_audit_end(&mut self, _index: u32, _total: u32) {}

    /// The last enemy was defeated.
    fn on_all_complete(&mut self) {}

    /// The player fell.
    fn on_player_died(&mut self) {}
}

impl AuditObserver for () {}

/// Freshly spawned gauntlet enemy.
#[derive(Debug)]
pub struct AuditSpawn {
    /// 1-based index
    pub index: u32,
    /// Roster entry used
    pub character: RosterId,
    /// Enemy with its AI attached
    pub enemy: Combatant,
}

/// Drives one gauntlet run.
#[derive(Debug)]
pub struct AuditsManager<O: AuditObserver = ()> {
    config: AuditConfig,
    difficulty: Difficulty,
    roster: Roster,
    observer: O,
    rng: Rng,
    current: u32,
    active: bool,
    completed: bool,
    last_enemy: Option<RosterId>,
}

impl<O: AuditObserver> AuditsManager<O> {
    /// Creates a manager drawing enemies from the sprite entries of `roster`.
    pub fn new(config: AuditConfig, roster: &Roster, observer: O) -> Self {
        let config = config.sanitized();
        let difficulty = Difficulty::from_label(&config.difficulty);
        let rng = Rng::with_seed(config.seed);
        Self {
            config,
            difficulty,
            roster: roster.sprite_only(),
            observer,
            rng,
            current: 0,
            active: false,
            completed: false,
            last_enemy: None,
        }
    }

    /// Resets progress and spawns the first enemy.
    pub fn start(&mut self) -> Option<AuditSpawn> {
        self.current = 0;
        self.active = true;
        self.completed = false;
        self.last_enemy = None;
        info!(total = self.config.total_audits, label = %self.config.label, "Gauntlet started");
        self.spawn_next()
    }

    /// Spawns the next enemy, or reports completion and returns `None`.
    pub fn spawn_next(&mut self) -> Option<AuditSpawn> {
        if !self.active {
            return None;
        }
        if self.current >= self.config.total_audits {
            self.complete();
            return None;
        }

        self.current += 1;
        let entry = self.roster.pick_random(&mut self.rng, self.last_enemy.as_ref()).clone();
        self.last_enemy = Some(entry.id.clone());

        let (style, y) = match entry.variant {
            FighterVariant::Sprite(_) => (AiStyle::Tactical, 300.0),
            FighterVariant::Classic => (AiStyle::Reactive, 400.0),
        };
        let fighter_config = FighterConfig {
            y,
            seed: self.rng.u64(..),
            ..FighterConfig::new(entry.name.clone(), ENEMY_SPAWN_X)
                .with_character(entry.id.as_str())
                .with_variant(entry.variant.clone())
                .with_stats(self.config.enemy_stats())
                .with_facing(Facing::Left)
        };
        let mut fighter = Fighter::new(fighter_config);
        let mut ai = EnemyAi::new(style, self.difficulty, &mut fighter, self.rng.u64(..));
        if style == AiStyle::Reactive {
            ai = ai.with_aggressiveness(CLASSIC_AGGRESSIVENESS);
        }
        fighter.set_max_health(self.config.enemy_hp);

        debug!(index = self.current, enemy = %entry.name, "Audit enemy spawned");
        self.observer
            .on_audit_start(self.current, self.config.total_audits, &entry.name);

        Some(AuditSpawn {
            index: self.current,
            character: entry.id,
            enemy: Combatant::new(fighter, Controller::Ai(ai)),
        })
    }

    /// Records the current enemy's defeat and spawns the next one.
    pub fn enemy_defeated(&mut self) -> Option<AuditSpawn> {
        if !self.active {
            return None;
        }
        self.observer.on_audit_end(self.current, self.config.total_audits);
        if self.current >= self.config.total_audits {
            self.complete();
            return None;
        }
        self.spawn_next()
    }

    /// Aborts the run.
    pub fn player_died(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        info!(reached = self.current, "Gauntlet lost");
        self.observer.on_player_died();
    }

    fn complete(&mut self) {
        self.active = false;
        if !self.completed {
            self.completed = true;
            info!(total = self.config.total_audits, "Gauntlet complete");
            self.observer.on_all_complete();
        }
    }

    /// Whether enemies remain to be spawned.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.current < self.config.total_audits
    }

    /// Progress such as `AUDIT 2/3`.
    #[must_use]
    pub fn progress_text(&self) -> String {
        format!("{} {}/{}", self.config.label, self.current, self.config.total_audits)
    }

    /// Whether a run is in progress.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the last run was won.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.completed
    }

    /// 1-based index of the current enemy; 0 before the first spawn.
    #[must_use]
    pub const fn current(&self) -> u32 {
        self.current
    }

    /// Gauntlet tuning.
    #[must_use]
    pub const fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Difficulty applied to spawned enemies.
    #[must_use]
    pub const fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// The progress observer.
    #[must_use]
    pub const fn observer(&self) -> &O {
        &self.observer
    }

    /// Mutable access to the progress observer.
    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }
}
