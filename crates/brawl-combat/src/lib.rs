//! # Brawl Combat
//!
//! Frame-driven combat simulation for a two-fighter brawler.
//!
//! This crate provides everything that decides who hits whom:
//! - Physics (gravity, ground contact, box overlap)
//! - Defense system (block charges, backdash/roll/dodge, invincibility)
//! - Fighters in classic and sprite bodies
//! - Player, AI, training dummy and scripted controllers
//! - Audit gauntlets and tower ladders
//! - The match loop with rounds, score and an event bus
//!
//! Rendering, audio and menus live elsewhere and talk to this crate
//! through [`presentation::DisplayHandle`], [`events::EventBus`] and
//! [`audits::AuditObserver`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod ai;
pub mod animation;
pub mod audits;
pub mod config;
pub mod controller;
pub mod defense;
pub mod events;
pub mod fighter;
pub mod input;
pub mod match_loop;
pub mod physics;
pub mod player;
pub mod presentation;
pub mod roster;
pub mod tower;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::ai::*;
    pub use crate::animation::*;
    pub use crate::audits::*;
    pub use crate::config::*;
    pub use crate::controller::*;
    pub use crate::defense::*;
    pub use crate::events::*;
    pub use crate::fighter::*;
    pub use crate::input::*;
    pub use crate::match_loop::*;
    pub use crate::physics::*;
    pub use crate::player::*;
    pub use crate::presentation::*;
    pub use crate::roster::*;
    pub use crate::tower::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_attack_damage_scenarios() {
        let classic = Fighter::new(FighterConfig::new("Classic", 100.0).with_stats(CombatStats::new(70, 70, 70)));
        assert_eq!(classic.attack_damage(), 17);

        let sprite = Fighter::new(
            FighterConfig::new("Sprite", 100.0)
                .with_variant(FighterVariant::Sprite(SpriteConfig::default()))
                .with_stats(CombatStats::new(70, 70, 70)),
        );
        assert_eq!(sprite.attack_damage(), 20);
    }

    #[test]
    fn test_ai_versus_ai_match_finishes() {
        let config = MatchConfig {
            max_rounds: 1,
            round_duration: 30.0,
            ..MatchConfig::default()
        };
        let mut state = MatchState::new(config);

        let mut hero = Fighter::new(FighterConfig::new("Hero", 150.0));
        let hero_ai = EnemyAi::new(AiStyle::Reactive, Difficulty::Hard, &mut hero, 1);
        let mut player = Combatant::new(hero, Controller::Ai(hero_ai));

        let mut rival = Fighter::new(FighterConfig::new("Rival", 680.0).with_facing(Facing::Left));
        let rival_ai = EnemyAi::new(AiStyle::Reactive, Difficulty::Normal, &mut rival, 2);
        let mut enemy = Combatant::new(rival, Controller::Ai(rival_ai));

        let mut result = None;
        for _ in 0..(31 * 60) {
            if let Some(round) = state.tick(DT, &mut NoInput, &mut player, &mut enemy).round {
                result = Some(round);
                break;
            }
            assert!(player.fighter.health() >= 0 && player.fighter.health() <= player.fighter.max_health());
            assert!(enemy.fighter.health() >= 0 && enemy.fighter.health() <= enemy.fighter.max_health());
        }
        let result = result.expect("match decided within the clock");
        assert!(result.match_winner.is_some());
        assert_eq!(state.phase(), MatchPhase::MatchOver);
    }

    #[test]
    fn test_audit_gauntlet_with_match_loop() {
        let mut audits = AuditsManager::new(
            AuditConfig {
                total_audits: 2,
                enemy_hp: 1,
                ..AuditConfig::default()
            },
            &Roster::default(),
            EventBus::default(),
        );
        let mut player = Combatant::new(
            Fighter::new(FighterConfig::new("Hero", 150.0)),
            Controller::Scripted(ScriptedController::new(Vec::new())),
        );

        let mut spawn = audits.start();
        while let Some(mut current) = spawn.take() {
            current.enemy.fighter.take_damage(50, Facing::Right, None);
            assert_eq!(current.enemy.fighter.health(), 0);
            player.update(DT, &NoInput, Some(&current.enemy.view()));
            spawn = audits.enemy_defeated();
        }
        assert!(audits.is_complete());
        assert_eq!(player.fighter.health(), player.fighter.max_health());
        let events = audits.observer().drain();
        assert_eq!(events.last(), Some(&MatchEvent::AuditsComplete));
    }
}
