//! Tower ladder: ten floors of increasingly strong enemies.
//!
//! A ladder is generated once per run and handed to whoever drives the
//! climb; nothing is kept at module scope.

use fastrand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use brawl_common::RosterId;

use crate::ai::Difficulty;
use crate::fighter::CombatStats;
use crate::roster::Roster;

/// Floors in a tower.
pub const TOTAL_FLOORS: u32 = 10;

/// Roster ids eligible as tower enemies.
pub const TOWER_CHARACTERS: [u32; 13] = [3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];

/// Title prefixes per floor tier.
pub const ENEMY_TITLES: [[&str; 4]; TOTAL_FLOORS as usize] = [
    ["Rookie", "Novice", "Trainee", "Apprentice"],
    ["Wandering", "Rogue", "Outcast", "Lone"],
    ["Skilled", "Veteran", "Battle-Hardened", "Seasoned"],
    ["Elite", "Shadow", "Deadly", "Fierce"],
    ["Master", "Legendary", "Fearsome", "Dreaded"],
    ["Demon", "Phantom", "Cursed", "Ancient"],
    ["SUPREME", "ULTIMATE", "TOWER LORD", "GRAND MASTER"],
    ["TOWER EMPEROR", "FINAL OVERLORD", "APEX TYRANT", "ABSOLUTE RULER"],
    ["VOID EMPEROR", "ENDLESS", "OBLIVION", "FINAL EXISTENCE"],
    ["COSMIC OVERLORD", "ETERNAL TYRANT", "INFINITE RULER", "OMNIPOTENT BEING"],
];

/// Base tuning of one floor before scaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloorSetting {
    /// AI difficulty
    pub difficulty: Difficulty,
    /// AI aggressiveness override
    pub aggressiveness: f32,
    /// Unscaled stats
    pub base: CombatStats,
    /// Final floor boss
    pub boss: bool,
}

const fn floor(difficulty: Difficulty, aggressiveness: f32, strength: u32, speed: u32, defense: u32) -> FloorSetting {
    FloorSetting {
        difficulty,
        aggressiveness,
        base: CombatStats::new(strength, speed, defense),
        boss: false,
    }
}

/// Base tuning for floors 1 through 10.
pub const FLOOR_SETTINGS: [FloorSetting; TOTAL_FLOORS as usize] = [
    floor(Difficulty::Easy, 0.3, 45, 40, 30),
    floor(Difficulty::Easy, 0.4, 55, 50, 35),
    floor(Difficulty::Normal, 0.5, 60, 55, 45),
    floor(Difficulty::Normal, 0.55, 65, 60, 55),
    floor(Difficulty::Hard, 0.65, 72, 65, 62),
    floor(Difficulty::Hard, 0.75, 80, 72, 70),
    floor(Difficulty::Expert, 0.85, 90, 78, 80),
    floor(Difficulty::Expert, 0.9, 100, 85, 90),
    floor(Difficulty::Boss, 0.95, 120, 90, 100),
    FloorSetting {
        boss: true,
        ..floor(Difficulty::Boss, 1.0, 150, 95, 120)
    },
];

/// A generated enemy on one floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TowerFloor {
    /// 1-based floor number
    pub floor: u32,
    /// Roster entry used
    pub character: RosterId,
    /// Title plus character name
    pub name: String,
    /// AI difficulty
    pub difficulty: Difficulty,
    /// AI aggressiveness
    pub aggressiveness: f32,
    /// Scaled stats
    pub stats: CombatStats,
    /// Final floor boss
    pub boss: bool,
}

/// A full climb.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TowerLadder {
    floors: Vec<TowerFloor>,
}

impl TowerLadder {
    /// Floor by 1-based number.
    #[must_use]
    pub fn floor(&self, number: u32) -> Option<&TowerFloor> {
        number.checked_sub(1).and_then(|i| self.floors.get(i as usize))
    }

    /// Every floor, bottom first.
    #[must_use]
    pub fn floors(&self) -> &[TowerFloor] {
        &self.floors
    }
}

/// Stats for a floor: `round(base * (1 + floor/4))` strength and speed,
/// `base + 2*floor` defense; the boss gets x1.5 strength and x1.3 defense.
#[must_use]
pub fn scale_stats(setting: &FloorSetting, floor: u32) -> CombatStats {
    let factor = 1.0 + floor as f32 * 0.25;
    let mut strength = (setting.base.strength as f32 * factor).round() as u32;
    let speed = (setting.base.speed as f32 * factor).round() as u32;
    let mut defense = setting.base.defense + floor * 2;
    if setting.boss {
        strength = (strength as f32 * 1.5).round() as u32;
        defense = (defense as f32 * 1.3).round() as u32;
    }
    CombatStats::new(strength, speed, defense)
}

/// Builds a ladder with shuffled characters and random titles.
#[must_use]
pub fn generate_tower(rng: &mut Rng, roster: &Roster) -> TowerLadder {
    let mut characters = TOWER_CHARACTERS;
    rng.shuffle(&mut characters);

    let floors = (1..=TOTAL_FLOORS)
        .zip(FLOOR_SETTINGS.iter())
        .map(|(number, setting)| {
            let index = (number - 1) as usize;
            let id = RosterId::new(characters[index % characters.len()].to_string());
            let entry = roster.get_or_fallback(&id);
            let titles = &ENEMY_TITLES[index];
            let title = titles[rng.usize(0..titles.len())];
            TowerFloor {
                floor: number,
                character: entry.id.clone(),
                name: format!("{title} {}", entry.name),
                difficulty: setting.difficulty,
                aggressiveness: setting.aggressiveness,
                stats: scale_stats(setting, number),
                boss: setting.boss,
            }
        })
        .collect::<Vec<_>>();

    info!(floors = floors.len(), boss = ?floors.last().map(|f| &f.name), "Tower generated");
    TowerLadder { floors }
}
