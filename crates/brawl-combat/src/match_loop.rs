//! Round and match bookkeeping around the per-frame combat step.
//!
//! One [`MatchState::tick`] advances the player, then the enemy, then
//! resolves attack boxes against hitboxes in both directions. A hit is
//! counted once per attack window. Rounds end on a knockout or when the
//! clock runs out; the match ends when one side reaches the majority of
//! `max_rounds`.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{self, ConfigResult};
use crate::controller::Combatant;
use crate::defense::{Attack, BlockFeedback};
use crate::events::{EventBus, MatchEvent, Side};
use crate::fighter::DamageResult;
use crate::input::InputSource;

/// Points per point of damage the player deals.
pub const SCORE_PER_DAMAGE: u32 = 10;
/// Points for a player round win.
pub const SCORE_PER_ROUND: u32 = 500;

/// How a time-up with equal health is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TieBreak {
    /// Player takes the round
    #[default]
    PlayerWins,
    /// Nobody scores; the round counter still advances
    Draw,
}

/// Match rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Best-of count
    pub max_rounds: u32,
    /// Seconds per round
    pub round_duration: f32,
    /// Largest step a tick will simulate
    pub max_dt: f32,
    /// Equal-health time-up rule
    pub tie_break: TieBreak,
    /// No clock and no knockouts
    pub training: bool,
    /// Player x at round start
    pub player_start_x: f32,
    /// Enemy x at round start
    pub enemy_start_x: f32,
    /// Event bus capacity
    pub event_capacity: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            round_duration: 90.0,
            max_dt: 0.1,
            tie_break: TieBreak::PlayerWins,
            training: false,
            player_start_x: 150.0,
            enemy_start_x: 680.0,
            event_capacity: 1024,
        }
    }
}

impl MatchConfig {
    /// Parses from RON text.
    pub fn from_ron(text: &str) -> ConfigResult<Self> {
        config::from_ron(text).map(Self::sanitized)
    }

    /// Returns a copy with unusable values replaced by defaults.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.max_rounds == 0 {
            tracing::warn!("Match needs at least one round, using default");
            self.max_rounds = defaults.max_rounds;
        }
        self.round_duration = config::positive("match.round_duration", self.round_duration, defaults.round_duration);
        self.max_dt = config::positive("match.max_dt", self.max_dt, defaults.max_dt);
        if !self.player_start_x.is_finite() {
            self.player_start_x = defaults.player_start_x;
        }
        if !self.enemy_start_x.is_finite() {
            self.enemy_start_x = defaults.enemy_start_x;
        }
        self
    }

    /// Round wins needed to take the match.
    #[must_use]
    pub const fn wins_needed(&self) -> u32 {
        self.max_rounds.div_ceil(2)
    }
}

/// Where the match is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchPhase {
    /// Ticks run
    #[default]
    Playing,
    /// Ticks ignored until resumed
    Paused,
    /// Waiting for the next round to be started
    RoundOver,
    /// Decided
    MatchOver,
}

/// One landed attack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitReport {
    /// Side that attacked
    pub attacker: Side,
    /// What the defender took
    pub result: DamageResult,
}

/// How a round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResult {
    /// Round number, 1-based
    pub round: u32,
    /// `None` for a draw
    pub winner: Option<Side>,
    /// Ended by the clock
    pub time_up: bool,
    /// Set when this round decided the match
    pub match_winner: Option<Side>,
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Hits resolved this tick, player first
    pub hits: Vec<HitReport>,
    /// Set when the round ended this tick
    pub round: Option<RoundResult>,
}

/// Round, score and hit-registration state of one match.
#[derive(Debug)]
pub struct MatchState {
    config: MatchConfig,
    phase: MatchPhase,
    round: u32,
    player_wins: u32,
    enemy_wins: u32,
    time_remaining: f32,
    score: u32,
    player_hit_registered: bool,
    enemy_hit_registered: bool,
    winner: Option<Side>,
    events: EventBus,
}

impl MatchState {
    /// Starts round 1.
    #[must_use]
    pub fn new(config: MatchConfig) -> Self {
        let config = config.sanitized();
        let events = EventBus::new(config.event_capacity);
        info!(
            max_rounds = config.max_rounds,
            round_duration = config.round_duration,
            training = config.training,
            "Match started"
        );
        Self {
            time_remaining: config.round_duration,
            config,
            phase: MatchPhase::Playing,
            round: 1,
            player_wins: 0,
            enemy_wins: 0,
            score: 0,
            player_hit_registered: false,
            enemy_hit_registered: false,
            winner: None,
            events,
        }
    }

    /// Advances the match by one frame.
    ///
    /// `dt` is clamped to `[0, max_dt]`. Does nothing unless playing.
    pub fn tick(
        &mut self,
        dt: f32,
        input: &mut dyn InputSource,
        player: &mut Combatant,
        enemy: &mut Combatant,
    ) -> TickReport {
        let mut report = TickReport::default();
        if self.phase != MatchPhase::Playing {
            return report;
        }
        let dt = if dt.is_finite() {
            dt.clamp(0.0, self.config.max_dt)
        } else {
            0.0
        };

        if !self.config.training {
            self.time_remaining = (self.time_remaining - dt).max(0.0);
            if self.time_remaining <= 0.0 {
                report.round = Some(self.time_up(player, enemy));
                return report;
            }
        }

        let enemy_view = enemy.view();
        player.update(dt, &*input, Some(&enemy_view));
        let player_view = player.view();
        enemy.update(dt, &*input, Some(&player_view));

        input.update();

        if !player.fighter.attack_box().active {
            self.player_hit_registered = false;
        }
        if !enemy.fighter.attack_box().active {
            self.enemy_hit_registered = false;
        }

        if !self.player_hit_registered && player.fighter.is_attack_hitting(enemy.fighter.hitbox()) {
            self.player_hit_registered = true;
            report.hits.push(self.resolve_hit(Side::Player, player, enemy));
        }
        if !self.enemy_hit_registered && enemy.fighter.is_attack_hitting(player.fighter.hitbox()) {
            self.enemy_hit_registered = true;
            report.hits.push(self.resolve_hit(Side::Enemy, enemy, player));
        }

        if !self.config.training && (player.fighter.health() <= 0 || enemy.fighter.health() <= 0) {
            let winner = if player.fighter.health() > 0 {
                Side::Player
            } else {
                Side::Enemy
            };
            report.round = Some(self.end_round(Some(winner), false));
        }
        report
    }

    fn resolve_hit(&mut self, side: Side, attacker: &mut Combatant, defender: &mut Combatant) -> HitReport {
        let damage = attacker.fighter.attack_box().damage;
        let result = defender.take_damage(damage, attacker.fighter.facing(), Some(Attack::new(damage)));

        if result.damage > 0 {
            if side == Side::Player {
                self.score += result.damage.unsigned_abs() * SCORE_PER_DAMAGE;
            }
            if !result.blocked {
                attacker.fighter.defense_mut().register_hit();
            }
        }
        if result.feedback == Some(BlockFeedback::NoBlocks) {
            self.events.publish(MatchEvent::GuardBroken { side: side.opponent() });
        }
        debug!(attacker = ?side, damage = result.damage, blocked = result.blocked, "Hit resolved");
        self.events.publish(MatchEvent::Hit {
            attacker: side,
            damage: result.damage,
            blocked: result.blocked,
            invincible: result.invincible,
        });
        HitReport { attacker: side, result }
    }

    fn time_up(&mut self, player: &Combatant, enemy: &Combatant) -> RoundResult {
        let player_health = player.fighter.health().max(0);
        let enemy_health = enemy.fighter.health().max(0);
        let winner = match player_health.cmp(&enemy_health) {
            std::cmp::Ordering::Greater => Some(Side::Player),
            std::cmp::Ordering::Less => Some(Side::Enemy),
            std::cmp::Ordering::Equal => match self.config.tie_break {
                TieBreak::PlayerWins => Some(Side::Player),
                TieBreak::Draw => None,
            },
        };
        info!(player_health, enemy_health, ?winner, "Time up");
        self.end_round(winner, true)
    }

    fn end_round(&mut self, winner: Option<Side>, time_up: bool) -> RoundResult {
        let round = self.round;
        match winner {
            Some(Side::Player) => {
                self.player_wins += 1;
                self.score += SCORE_PER_ROUND;
            }
            Some(Side::Enemy) => self.enemy_wins += 1,
            None => {}
        }
        self.events.publish(MatchEvent::RoundEnd { round, winner });

        let needed = self.config.wins_needed();
        let match_winner = if self.player_wins >= needed {
            Some(Side::Player)
        } else if self.enemy_wins >= needed {
            Some(Side::Enemy)
        } else {
            None
        };

        if let Some(side) = match_winner {
            self.phase = MatchPhase::MatchOver;
            self.winner = Some(side);
            info!(winner = ?side, player_wins = self.player_wins, enemy_wins = self.enemy_wins, score = self.score, "Match over");
            self.events.publish(MatchEvent::MatchEnd { winner: side });
        } else {
            self.phase = MatchPhase::RoundOver;
            self.round += 1;
            info!(round, ?winner, player_wins = self.player_wins, enemy_wins = self.enemy_wins, "Round over");
        }

        RoundResult {
            round,
            winner,
            time_up,
            match_winner,
        }
    }

    /// Resets both fighters to their start positions and resumes play.
    /// Returns false unless a round just ended.
    pub fn start_next_round(&mut self, player: &mut Combatant, enemy: &mut Combatant) -> bool {
        if self.phase != MatchPhase::RoundOver {
            return false;
        }
        self.reset_fighters(player, enemy);
        self.phase = MatchPhase::Playing;
        self.events.publish(MatchEvent::RoundStart { round: self.round });
        true
    }

    /// Starts over from round 1 with zero score.
    pub fn restart(&mut self, player: &mut Combatant, enemy: &mut Combatant) {
        self.round = 1;
        self.player_wins = 0;
        self.enemy_wins = 0;
        self.score = 0;
        self.winner = None;
        self.reset_fighters(player, enemy);
        self.phase = MatchPhase::Playing;
        self.events.publish(MatchEvent::RoundStart { round: 1 });
    }

    fn reset_fighters(&mut self, player: &mut Combatant, enemy: &mut Combatant) {
        player.fighter.reset(Some(self.config.player_start_x));
        enemy.fighter.reset(Some(self.config.enemy_start_x));
        self.time_remaining = self.config.round_duration;
        self.player_hit_registered = false;
        self.enemy_hit_registered = false;
    }

    /// Suspends ticks. Returns false unless playing.
    pub fn pause(&mut self) -> bool {
        if self.phase != MatchPhase::Playing {
            return false;
        }
        self.phase = MatchPhase::Paused;
        self.events.publish(MatchEvent::Paused);
        true
    }

    /// Resumes ticks. Returns false unless paused.
    pub fn resume(&mut self) -> bool {
        if self.phase != MatchPhase::Paused {
            return false;
        }
        self.phase = MatchPhase::Playing;
        self.events.publish(MatchEvent::Resumed);
        true
    }

    /// Pauses when playing, resumes when paused.
    pub fn toggle_pause(&mut self) -> bool {
        match self.phase {
            MatchPhase::Playing => self.pause(),
            MatchPhase::Paused => self.resume(),
            _ => false,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Current round, 1-based.
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.round
    }

    /// Rounds won by the player.
    #[must_use]
    pub const fn player_wins(&self) -> u32 {
        self.player_wins
    }

    /// Rounds won by the enemy.
    #[must_use]
    pub const fn enemy_wins(&self) -> u32 {
        self.enemy_wins
    }

    /// Seconds left on the round clock.
    #[must_use]
    pub const fn time_remaining(&self) -> f32 {
        self.time_remaining
    }

    /// Player score.
    #[must_use]
    pub const fn score(&self) -> u32 {
        self.score
    }

    /// Match winner once decided.
    #[must_use]
    pub const fn winner(&self) -> Option<Side> {
        self.winner
    }

    /// Rules in use.
    #[must_use]
    pub const fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Event bus.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{Controller, ScriptStep, ScriptedAction, ScriptedController};
    use crate::fighter::{Fighter, FighterConfig};
    use crate::input::{KeyboardState, NoInput};
    use crate::physics::Facing;

    const DT: f32 = 1.0 / 60.0;

    fn idle(name: &str, x: f32, facing: Facing) -> Combatant {
        let fighter = Fighter::new(FighterConfig::new(name, x).with_facing(facing));
        Combatant::new(fighter, Controller::Idle)
    }

    fn scripted(name: &str, x: f32, facing: Facing, steps: Vec<ScriptStep>) -> Combatant {
        let fighter = Fighter::new(FighterConfig::new(name, x).with_facing(facing));
        Combatant::new(fighter, Controller::Scripted(ScriptedController::new(steps)))
    }

    fn attack_at_start() -> Vec<ScriptStep> {
        vec![ScriptStep {
            at: 0.0,
            action: ScriptedAction::Attack,
        }]
    }

    fn run(state: &mut MatchState, player: &mut Combatant, enemy: &mut Combatant, ticks: usize) -> Vec<TickReport> {
        (0..ticks)
            .map(|_| state.tick(DT, &mut NoInput, player, enemy))
            .collect()
    }

    fn run_until_round_end(state: &mut MatchState, player: &mut Combatant, enemy: &mut Combatant, dt: f32) -> RoundResult {
        for _ in 0..10_000 {
            if let Some(result) = state.tick(dt, &mut NoInput, player, enemy).round {
                return result;
            }
        }
        panic!("round never ended");
    }

    #[test]
    fn test_wins_needed() {
        let wins = |max_rounds| MatchConfig {
            max_rounds,
            ..MatchConfig::default()
        };
        assert_eq!(wins(1).wins_needed(), 1);
        assert_eq!(wins(3).wins_needed(), 2);
        assert_eq!(wins(4).wins_needed(), 2);
        assert_eq!(wins(5).wins_needed(), 3);
    }

    #[test]
    fn test_hit_counts_once_per_window() {
        let mut state = MatchState::new(MatchConfig::default());
        let mut player = scripted("Hero", 150.0, Facing::Right, attack_at_start());
        let mut enemy = idle("Target", 230.0, Facing::Left);

        let reports = run(&mut state, &mut player, &mut enemy, 40);
        let hits: Vec<_> = reports.iter().flat_map(|r| r.hits.iter()).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].attacker, Side::Player);
        // 17 raw against 70 defense
        assert_eq!(hits[0].result.damage, 11);
        assert_eq!(enemy.fighter.health(), 89);
        assert_eq!(state.score(), 110);
    }

    #[test]
    fn test_unblocked_hit_feeds_attacker_charge_regen() {
        let mut state = MatchState::new(MatchConfig::default());
        let mut player = scripted("Hero", 150.0, Facing::Right, attack_at_start());
        let mut enemy = idle("Target", 230.0, Facing::Left);
        let before = player.fighter.defense().hits_until_regen();
        run(&mut state, &mut player, &mut enemy, 40);
        assert_eq!(player.fighter.defense().hits_until_regen(), before - 1);
    }

    #[test]
    fn test_blocked_hit_scores_nothing() {
        let mut state = MatchState::new(MatchConfig::default());
        let mut player = scripted("Hero", 150.0, Facing::Right, attack_at_start());
        let mut enemy = scripted(
            "Turtle",
            230.0,
            Facing::Left,
            vec![ScriptStep {
                at: 0.0,
                action: ScriptedAction::Block(true),
            }],
        );

        let reports = run(&mut state, &mut player, &mut enemy, 40);
        let hits: Vec<_> = reports.iter().flat_map(|r| r.hits.iter()).collect();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].result.blocked);
        assert_eq!(enemy.fighter.health(), 100);
        assert_eq!(state.score(), 0);
        assert_eq!(enemy.fighter.defense().block_charges(), 2);
    }

    #[test]
    fn test_knockout_ends_round() {
        let mut state = MatchState::new(MatchConfig::default());
        let mut player = scripted("Hero", 150.0, Facing::Right, attack_at_start());
        let mut enemy = idle("Target", 230.0, Facing::Left);
        enemy.fighter.set_max_health(5);

        let result = run_until_round_end(&mut state, &mut player, &mut enemy, DT);
        assert_eq!(result.winner, Some(Side::Player));
        assert!(!result.time_up);
        assert_eq!(result.match_winner, None);
        assert_eq!(state.phase(), MatchPhase::RoundOver);
        assert_eq!(state.round(), 2);
        assert_eq!(state.player_wins(), 1);
        assert_eq!(state.score(), 5 * SCORE_PER_DAMAGE + SCORE_PER_ROUND);

        // Ticks are ignored until the next round starts.
        assert_eq!(state.tick(DT, &mut NoInput, &mut player, &mut enemy), TickReport::default());

        assert!(state.start_next_round(&mut player, &mut enemy));
        assert_eq!(player.fighter.position().x, 150.0);
        assert_eq!(enemy.fighter.position().x, 680.0);
        assert_eq!(enemy.fighter.health(), 5);
        assert_eq!(state.time_remaining(), 90.0);
        assert!(!state.start_next_round(&mut player, &mut enemy));
    }

    #[test]
    fn test_single_round_match() {
        let config = MatchConfig {
            max_rounds: 1,
            ..MatchConfig::default()
        };
        let mut state = MatchState::new(config);
        let mut player = idle("Hero", 150.0, Facing::Right);
        let mut enemy = scripted("Bully", 230.0, Facing::Left, attack_at_start());
        player.fighter.set_max_health(3);

        let result = run_until_round_end(&mut state, &mut player, &mut enemy, DT);
        assert_eq!(result.match_winner, Some(Side::Enemy));
        assert_eq!(state.phase(), MatchPhase::MatchOver);
        assert_eq!(state.winner(), Some(Side::Enemy));

        let events = state.events().drain();
        assert!(events.contains(&MatchEvent::MatchEnd { winner: Side::Enemy }));
        assert!(events.contains(&MatchEvent::RoundEnd {
            round: 1,
            winner: Some(Side::Enemy),
        }));
    }

    #[test]
    fn test_time_up_tie_goes_to_player() {
        let config = MatchConfig {
            round_duration: 1.0,
            ..MatchConfig::default()
        };
        let mut state = MatchState::new(config);
        let mut player = idle("Hero", 150.0, Facing::Right);
        let mut enemy = idle("Rival", 680.0, Facing::Left);

        let result = run_until_round_end(&mut state, &mut player, &mut enemy, 0.1);
        assert!(result.time_up);
        assert_eq!(result.winner, Some(Side::Player));
        assert_eq!(state.player_wins(), 1);
        assert_eq!(state.score(), SCORE_PER_ROUND);
    }

    #[test]
    fn test_time_up_tie_as_draw() {
        let config = MatchConfig {
            round_duration: 1.0,
            tie_break: TieBreak::Draw,
            ..MatchConfig::default()
        };
        let mut state = MatchState::new(config);
        let mut player = idle("Hero", 150.0, Facing::Right);
        let mut enemy = idle("Rival", 680.0, Facing::Left);

        let result = run_until_round_end(&mut state, &mut player, &mut enemy, 0.1);
        assert!(result.time_up);
        assert_eq!(result.winner, None);
        assert_eq!(state.player_wins(), 0);
        assert_eq!(state.enemy_wins(), 0);
        assert_eq!(state.round(), 2);
        assert_eq!(state.phase(), MatchPhase::RoundOver);
    }

    #[test]
    fn test_time_up_lower_health_loses() {
        let config = MatchConfig {
            round_duration: 1.0,
            ..MatchConfig::default()
        };
        let mut state = MatchState::new(config);
        let mut player = idle("Hero", 150.0, Facing::Right);
        let mut enemy = idle("Rival", 680.0, Facing::Left);
        player.fighter.take_damage(10, Facing::Left, None);

        let result = run_until_round_end(&mut state, &mut player, &mut enemy, 0.1);
        assert_eq!(result.winner, Some(Side::Enemy));
    }

    #[test]
    fn test_dt_is_clamped() {
        let mut state = MatchState::new(MatchConfig::default());
        let mut player = idle("Hero", 150.0, Facing::Right);
        let mut enemy = idle("Rival", 680.0, Facing::Left);
        state.tick(5.0, &mut NoInput, &mut player, &mut enemy);
        assert!((state.time_remaining() - 89.9).abs() < 1e-4);
        state.tick(f32::NAN, &mut NoInput, &mut player, &mut enemy);
        assert!((state.time_remaining() - 89.9).abs() < 1e-4);
    }

    #[test]
    fn test_pause_freezes_clock() {
        let mut state = MatchState::new(MatchConfig::default());
        let mut player = idle("Hero", 150.0, Facing::Right);
        let mut enemy = idle("Rival", 680.0, Facing::Left);

        assert!(state.pause());
        assert!(!state.pause());
        run(&mut state, &mut player, &mut enemy, 30);
        assert_eq!(state.time_remaining(), 90.0);

        assert!(state.toggle_pause());
        assert_eq!(state.phase(), MatchPhase::Playing);
        run(&mut state, &mut player, &mut enemy, 30);
        assert!(state.time_remaining() < 90.0);

        let events = state.events().drain();
        assert_eq!(events, vec![MatchEvent::Paused, MatchEvent::Resumed]);
    }

    #[test]
    fn test_training_mode_never_ends() {
        let config = MatchConfig {
            round_duration: 0.5,
            training: true,
            ..MatchConfig::default()
        };
        let mut state = MatchState::new(config);
        let mut player = scripted("Hero", 150.0, Facing::Right, attack_at_start());
        let mut enemy = idle("Target", 230.0, Facing::Left);
        enemy.fighter.set_max_health(5);

        let reports = run(&mut state, &mut player, &mut enemy, 120);
        assert!(reports.iter().all(|r| r.round.is_none()));
        assert_eq!(state.phase(), MatchPhase::Playing);
        assert_eq!(state.time_remaining(), 0.5);
    }

    #[test]
    fn test_input_rolls_forward_each_tick() {
        let mut state = MatchState::new(MatchConfig::default());
        let mut player = Combatant::human(Fighter::new(FighterConfig::new("Hero", 150.0)));
        let mut enemy = idle("Rival", 680.0, Facing::Left);
        let mut keys = KeyboardState::new();
        keys.press(crate::input::KeyCode::KeyR);

        state.tick(DT, &mut keys, &mut player, &mut enemy);
        assert!(!keys.just_pressed(crate::input::KeyCode::KeyR));
        assert_eq!(player.fighter.defense().stats().escapes_used, 1);
    }

    #[test]
    fn test_restart() {
        let config = MatchConfig {
            max_rounds: 1,
            ..MatchConfig::default()
        };
        let mut state = MatchState::new(config);
        let mut player = scripted("Hero", 150.0, Facing::Right, attack_at_start());
        let mut enemy = idle("Target", 230.0, Facing::Left);
        enemy.fighter.set_max_health(5);
        run_until_round_end(&mut state, &mut player, &mut enemy, DT);
        assert_eq!(state.phase(), MatchPhase::MatchOver);

        state.restart(&mut player, &mut enemy);
        assert_eq!(state.phase(), MatchPhase::Playing);
        assert_eq!(state.round(), 1);
        assert_eq!(state.score(), 0);
        assert_eq!(state.winner(), None);
        assert_eq!(enemy.fighter.health(), 5);
    }
}
