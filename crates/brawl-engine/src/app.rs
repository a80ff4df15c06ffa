//! Mode setup and the frame loop.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

use brawl_combat::{
    generate_tower, AiStyle, AuditsManager, Combatant, Controller, Difficulty, EnemyAi, EventBus,
    Facing, Fighter, FighterConfig, InputSource, KeyCode, KeyboardState, MatchConfig, MatchPhase,
    MatchState, Roster, Side, TowerFloor, TrainingDummy,
};

use crate::config::{EngineConfig, KeyAction, Mode, ScriptedKey};
use crate::display::TraceDisplay;
use crate::timing::FrameClock;

/// Seed offsets so each side draws from its own stream.
const PLAYER_SALT: u64 = 0x51de_0001;
const ENEMY_SALT: u64 = 0x51de_0002;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Player won the match, cleared the gauntlet or topped the tower
    Victory,
    /// Player lost
    Defeat,
    /// Training session ran its course
    Finished,
    /// The time limit ran out first
    TimedOut,
}

/// What a run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Mode played
    pub mode: Mode,
    /// How it ended
    pub outcome: Outcome,
    /// Player score summed over all matches
    pub score: u32,
    /// Rounds decided
    pub rounds: u32,
    /// Opponents beaten
    pub stages_cleared: u32,
    /// Opponents scheduled
    pub stages_total: u32,
    /// Player hits that connected
    pub hits_landed: u32,
    /// Enemy hits that connected
    pub hits_taken: u32,
    /// Simulation ticks run
    pub ticks: u64,
    /// Simulated seconds, excluding pauses
    pub simulated: f32,
    /// Events published on the buses
    pub events: usize,
}

/// Key presses and releases waiting for their time.
#[derive(Debug, Default)]
struct KeyTimeline {
    keys: VecDeque<ScriptedKey>,
}

impl KeyTimeline {
    fn new(mut keys: Vec<ScriptedKey>) -> Self {
        keys.sort_by(|a, b| a.at.total_cmp(&b.at));
        Self { keys: keys.into() }
    }

    /// Feeds every entry due at `now` into the keyboard.
    fn apply(&mut self, now: f32, keyboard: &mut KeyboardState) {
        while self.keys.front().is_some_and(|k| k.at <= now) {
            if let Some(entry) = self.keys.pop_front() {
                match entry.action {
                    KeyAction::Press => keyboard.press(entry.key),
                    KeyAction::Release => keyboard.release(entry.key),
                }
            }
        }
    }
}

/// Result of one match inside a run.
#[derive(Debug, Clone, Copy)]
struct MatchOutcome {
    winner: Option<Side>,
    timed_out: bool,
}

/// State shared by every match of a run.
#[derive(Debug)]
struct Session {
    clock: FrameClock,
    keyboard: KeyboardState,
    timeline: KeyTimeline,
    frame_dt: f32,
    /// Time fed to the clock, pauses included
    wall: f32,
    time_limit: f32,
    debug_boxes: bool,
    score: u32,
    rounds: u32,
    hits_landed: u32,
    hits_taken: u32,
    events: usize,
}

impl Session {
    fn new(config: &EngineConfig) -> Self {
        let clock = FrameClock::new(config.tick_rate);
        Self {
            frame_dt: clock.fixed_dt(),
            clock,
            keyboard: KeyboardState::new(),
            timeline: KeyTimeline::new(config.script.clone()),
            wall: 0.0,
            time_limit: config.time_limit,
            debug_boxes: config.debug_boxes,
            score: 0,
            rounds: 0,
            hits_landed: 0,
            hits_taken: 0,
            events: 0,
        }
    }

    /// Runs frames until the match is decided or `deadline` passes.
    fn play_match(
        &mut self,
        state: &mut MatchState,
        player: &mut Combatant,
        enemy: &mut Combatant,
        deadline: f32,
    ) -> MatchOutcome {
        let deadline = deadline.min(self.time_limit);
        let mut outcome = MatchOutcome {
            winner: None,
            timed_out: false,
        };

        loop {
            if self.wall >= deadline {
                outcome.timed_out = true;
                break;
            }
            self.wall += self.frame_dt;
            self.timeline.apply(self.wall, &mut self.keyboard);

            if self.keyboard.just_pressed(KeyCode::Escape) && state.toggle_pause() {
                if state.phase() == MatchPhase::Paused {
                    self.clock.pause();
                } else {
                    self.clock.resume();
                }
                info!(paused = self.clock.is_paused(), at = self.wall, "Pause toggled");
            }

            let steps = self.clock.advance(self.frame_dt);
            if steps == 0 {
                self.keyboard.update();
            }

            let mut decided = false;
            for _ in 0..steps {
                let report = state.tick(self.clock.fixed_dt(), &mut self.keyboard, player, enemy);
                for hit in &report.hits {
                    match hit.attacker {
                        Side::Player => self.hits_landed += 1,
                        Side::Enemy => self.hits_taken += 1,
                    }
                }
                if let Some(round) = report.round {
                    self.rounds += 1;
                    if round.match_winner.is_some() {
                        outcome.winner = round.match_winner;
                        decided = true;
                        break;
                    }
                    state.start_next_round(player, enemy);
                }
            }

            player.fighter.render(self.debug_boxes);
            enemy.fighter.render(self.debug_boxes);
            if decided {
                break;
            }
        }

        if state.phase() == MatchPhase::Paused {
            state.resume();
            self.clock.resume();
        }
        self.score += state.score();
        self.drain(state.events());
        outcome
    }

    fn drain(&mut self, bus: &EventBus) {
        for event in bus.drain() {
            debug!(?event, "Event");
            self.events += 1;
        }
    }

    fn summary(&self, mode: Mode, outcome: Outcome, stages_cleared: u32, stages_total: u32) -> RunSummary {
        RunSummary {
            mode,
            outcome,
            score: self.score,
            rounds: self.rounds,
            stages_cleared,
            stages_total,
            hits_landed: self.hits_landed,
            hits_taken: self.hits_taken,
            ticks: self.clock.steps(),
            simulated: self.clock.simulated(),
            events: self.events,
        }
    }
}

/// Builds the player from config, keyboard driven or on autopilot.
fn build_player(config: &EngineConfig) -> Combatant {
    let setup = &config.player;
    let mut fighter_config = FighterConfig::new(&setup.name, config.match_rules.player_start_x)
        .with_variant(setup.body.variant())
        .with_facing(Facing::Right);
    fighter_config.stats = setup.stats;
    fighter_config.seed = config.seed;
    let mut fighter = Fighter::new(fighter_config);

    if setup.autopilot {
        let difficulty = Difficulty::from_label(&setup.autopilot_difficulty);
        let ai = EnemyAi::new(AiStyle::Tactical, difficulty, &mut fighter, config.seed ^ PLAYER_SALT);
        Combatant::new(fighter, Controller::Ai(ai))
    } else {
        Combatant::human(fighter)
    }
}

fn build_versus_enemy(config: &EngineConfig) -> Combatant {
    let setup = &config.enemy;
    let mut fighter_config = FighterConfig::new(&setup.name, config.match_rules.enemy_start_x)
        .with_variant(setup.body.variant())
        .with_facing(Facing::Left);
    fighter_config.stats = setup.stats;
    fighter_config.seed = config.seed.wrapping_add(1);
    let mut fighter = Fighter::new(fighter_config);

    let difficulty = Difficulty::from_label(&setup.difficulty);
    let ai = EnemyAi::new(setup.style, difficulty, &mut fighter, config.seed ^ ENEMY_SALT);
    Combatant::new(fighter, Controller::Ai(ai))
}

/// Tower enemy: sprite bodies think tactically, classic ones react.
fn build_tower_enemy(floor: &TowerFloor, roster: &Roster, config: &EngineConfig) -> Combatant {
    let entry = roster.get_or_fallback(&floor.character);
    let style = if entry.is_sprite() {
        AiStyle::Tactical
    } else {
        AiStyle::Reactive
    };
    let fighter_config = FighterConfig::new(&floor.name, config.match_rules.enemy_start_x)
        .with_variant(entry.variant.clone())
        .with_character(floor.character.as_str())
        .with_stats(floor.stats)
        .with_facing(Facing::Left);
    let mut fighter = Fighter::new(fighter_config);

    let seed = (config.seed ^ ENEMY_SALT).wrapping_add(u64::from(floor.floor));
    let ai = EnemyAi::new(style, floor.difficulty, &mut fighter, seed).with_aggressiveness(floor.aggressiveness);
    Combatant::new(fighter, Controller::Ai(ai))
}

fn attach_display(combatant: &mut Combatant, label: &'static str, config: &EngineConfig) {
    combatant
        .fighter
        .attach(Box::new(TraceDisplay::new(label, config.trace_frames)));
}

fn outcome_of(result: MatchOutcome) -> Outcome {
    match result.winner {
        Some(Side::Player) => Outcome::Victory,
        Some(Side::Enemy) => Outcome::Defeat,
        None => Outcome::TimedOut,
    }
}

fn run_versus(config: &EngineConfig, session: &mut Session) -> RunSummary {
    let mut player = build_player(config);
    let mut enemy = build_versus_enemy(config);
    attach_display(&mut player, "player", config);
    attach_display(&mut enemy, "enemy", config);
    info!(
        player = player.fighter.name(),
        controller = player.controller.kind(),
        enemy = enemy.fighter.name(),
        "Versus match"
    );

    let mut state = MatchState::new(config.match_rules.clone());
    let result = session.play_match(&mut state, &mut player, &mut enemy, f32::INFINITY);

    player.fighter.destroy();
    enemy.fighter.destroy();
    let outcome = outcome_of(result);
    let cleared = u32::from(outcome == Outcome::Victory);
    session.summary(Mode::Versus, outcome, cleared, 1)
}

fn run_training(config: &EngineConfig, session: &mut Session) -> RunSummary {
    let mut player = build_player(config);
    let mut dummy = TrainingDummy::spawn(config.match_rules.enemy_start_x, Facing::Left);
    attach_display(&mut player, "player", config);
    attach_display(&mut dummy, "dummy", config);

    let rules = MatchConfig {
        training: true,
        ..config.match_rules.clone()
    };
    let length = rules.round_duration;
    info!(seconds = length, "Training session");

    let mut state = MatchState::new(rules);
    let deadline = session.wall + length;
    let cut_short = deadline > session.time_limit;
    let result = session.play_match(&mut state, &mut player, &mut dummy, deadline);

    player.fighter.destroy();
    dummy.fighter.destroy();
    let outcome = if result.timed_out && !cut_short {
        Outcome::Finished
    } else {
        outcome_of(result)
    };
    session.summary(Mode::Training, outcome, 0, 0)
}

fn run_audits(config: &EngineConfig, session: &mut Session) -> RunSummary {
    let mut player = build_player(config);
    attach_display(&mut player, "player", config);

    let bus = EventBus::new(config.match_rules.event_capacity);
    let mut audits = AuditsManager::new(config.audit.clone(), &Roster::default(), bus);
    let total = audits.config().total_audits;
    let rules = MatchConfig {
        max_rounds: 1,
        ..config.match_rules.clone()
    };

    let mut cleared = 0;
    let mut outcome = Outcome::Victory;
    let mut spawn = audits.start();
    while let Some(mut current) = spawn.take() {
        info!(progress = %audits.progress_text(), enemy = current.enemy.fighter.name(), "Audit");
        attach_display(&mut current.enemy, "enemy", config);

        let mut state = MatchState::new(rules.clone());
        let result = session.play_match(&mut state, &mut player, &mut current.enemy, f32::INFINITY);
        current.enemy.fighter.destroy();

        match outcome_of(result) {
            Outcome::Victory => {
                cleared += 1;
                spawn = audits.enemy_defeated();
            }
            Outcome::TimedOut => {
                outcome = Outcome::TimedOut;
            }
            other => {
                audits.player_died();
                outcome = other;
            }
        }
    }
    if outcome == Outcome::Victory && !audits.is_complete() {
        warn!(cleared, total, "Gauntlet stopped early");
        outcome = Outcome::Defeat;
    }

    player.fighter.destroy();
    session.drain(audits.observer());
    session.summary(Mode::Audit, outcome, cleared, total)
}

fn run_tower(config: &EngineConfig, session: &mut Session) -> Result<RunSummary> {
    let roster = Roster::default();
    let mut rng = fastrand::Rng::with_seed(config.seed);
    let ladder = generate_tower(&mut rng, &roster);

    let mut player = build_player(config);
    attach_display(&mut player, "player", config);

    let mut cleared = 0;
    let mut outcome = Outcome::Victory;
    for number in 1..=config.tower_floors {
        let floor = ladder
            .floor(number)
            .with_context(|| format!("tower has no floor {number}"))?;
        info!(floor = number, enemy = %floor.name, difficulty = %floor.difficulty, boss = floor.boss, "Tower floor");

        player.fighter.reset(Some(config.match_rules.player_start_x));
        let mut enemy = build_tower_enemy(floor, &roster, config);
        attach_display(&mut enemy, "enemy", config);

        let mut state = MatchState::new(config.match_rules.clone());
        let result = session.play_match(&mut state, &mut player, &mut enemy, f32::INFINITY);
        enemy.fighter.destroy();

        outcome = outcome_of(result);
        if outcome != Outcome::Victory {
            break;
        }
        cleared += 1;
    }

    player.fighter.destroy();
    Ok(session.summary(Mode::Tower, outcome, cleared, config.tower_floors))
}

/// Plays the configured mode to its end.
pub fn run(config: &EngineConfig) -> Result<RunSummary> {
    info!(
        mode = ?config.mode,
        seed = config.seed,
        tick_rate = config.tick_rate,
        max_rounds = config.match_rules.max_rounds,
        "Starting run"
    );

    let mut session = Session::new(config);
    let summary = match config.mode {
        Mode::Versus => run_versus(config, &mut session),
        Mode::Training => run_training(config, &mut session),
        Mode::Audit => run_audits(config, &mut session),
        Mode::Tower => run_tower(config, &mut session)?,
    };

    if summary.outcome == Outcome::TimedOut {
        warn!(limit = config.time_limit, "Run hit its time limit");
    }
    Ok(summary)
}
