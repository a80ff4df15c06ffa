//! Controllers: what decides a fighter's actions each frame.
//!
//! A [`Combatant`] pairs one [`Fighter`] with one [`Controller`]. The
//! controller runs before the fighter's own update and, for the training
//! dummy, again afterwards to pin it in place.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::ai::EnemyAi;
use crate::defense::{Attack, EscapeKind};
use crate::fighter::{CombatStats, DamageResult, Fighter, FighterConfig, FighterInput, OpponentView};
use crate::input::InputSource;
use crate::physics::Facing;
use crate::player::PlayerController;

// ============================================================================
// Training dummy
// ============================================================================

/// Target that never moves, never attacks and refills its health after
/// every hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingDummy {
    fixed_x: f32,
    fixed_facing: Facing,
}

impl TrainingDummy {
    /// Builds a dummy fighter at `x` together with its controller.
    #[must_use]
    pub fn spawn(x: f32, facing: Facing) -> Combatant {
        let config = FighterConfig::new("Training Dummy", x)
            .with_character("dummy")
            .with_stats(CombatStats::new(0, 0, 0))
            .with_facing(facing);
        let fighter = Fighter::new(config);
        let dummy = Self {
            fixed_x: fighter.position().x,
            fixed_facing: facing,
        };
        Combatant::new(fighter, Controller::Dummy(dummy))
    }

    /// Position the dummy is pinned to.
    #[must_use]
    pub const fn fixed_x(&self) -> f32 {
        self.fixed_x
    }

    fn before(&self, fighter: &mut Fighter) {
        fighter.set_moving(false);
        fighter.block(false);
    }

    fn after(&self, fighter: &mut Fighter) {
        fighter.pin(self.fixed_x, self.fixed_facing);
    }
}

// ============================================================================
// Scripted
// ============================================================================

/// One action a scripted controller can issue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ScriptedAction {
    /// Start an attack
    Attack,
    /// Raise or lower the guard
    Block(bool),
    /// Request an escape through the fighter's input
    Escape(EscapeKind),
    /// Jump
    Jump,
    /// Walk at this signed speed until the next action
    Walk(f32),
}

/// Timed step in a script.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    /// Seconds since the script started
    pub at: f32,
    /// What to do
    pub action: ScriptedAction,
}

/// Controller that replays a fixed timeline of actions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptedController {
    steps: VecDeque<ScriptStep>,
    elapsed: f32,
    walk_speed: f32,
}

impl ScriptedController {
    /// Creates a script; steps are ordered by time.
    #[must_use]
    pub fn new(mut steps: Vec<ScriptStep>) -> Self {
        steps.sort_by(|a, b| a.at.total_cmp(&b.at));
        Self {
            steps: steps.into(),
            elapsed: 0.0,
            walk_speed: 0.0,
        }
    }

    /// Whether every step has been issued.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.steps.is_empty()
    }

    /// Seconds since the script started.
    #[must_use]
    pub const fn elapsed(&self) -> f32 {
        self.elapsed
    }

    fn drive(&mut self, fighter: &mut Fighter, dt: f32) -> FighterInput {
        self.elapsed += dt;
        let mut input = FighterInput::default();

        while let Some(step) = self.steps.front().copied() {
            if step.at > self.elapsed {
                break;
            }
            self.steps.pop_front();
            trace!(at = step.at, action = ?step.action, "Script step");
            match step.action {
                ScriptedAction::Attack => {
                    fighter.attack();
                }
                ScriptedAction::Block(active) => fighter.block(active),
                ScriptedAction::Escape(kind) => input.escape = Some(kind),
                ScriptedAction::Jump => {
                    fighter.jump();
                }
                ScriptedAction::Walk(speed) => self.walk_speed = speed,
            }
        }

        fighter.set_moving(false);
        if self.walk_speed != 0.0 && !fighter.is_attacking() && !fighter.is_hurt() {
            fighter.walk(self.walk_speed * dt);
            fighter.set_facing(if self.walk_speed < 0.0 {
                Facing::Left
            } else {
                Facing::Right
            });
            fighter.set_moving(true);
        }
        input
    }
}

// ============================================================================
// Controller
// ============================================================================

/// What decides a fighter's actions.
#[derive(Debug, Clone)]
pub enum Controller {
    /// Keyboard driven
    Human(PlayerController),
    /// Enemy AI
    Ai(EnemyAi),
    /// Pinned training target
    Dummy(TrainingDummy),
    /// Fixed timeline
    Scripted(ScriptedController),
    /// Does nothing
    Idle,
}

impl Controller {
    /// Short label for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Human(_) => "human",
            Self::Ai(_) => "ai",
            Self::Dummy(_) => "dummy",
            Self::Scripted(_) => "scripted",
            Self::Idle => "idle",
        }
    }
}

/// A fighter together with its controller.
#[derive(Debug)]
pub struct Combatant {
    /// The fighter being driven
    pub fighter: Fighter,
    /// What drives it
    pub controller: Controller,
}

impl Combatant {
    /// Pairs a fighter with a controller.
    #[must_use]
    pub fn new(fighter: Fighter, controller: Controller) -> Self {
        Self { fighter, controller }
    }

    /// Fighter driven by the keyboard.
    #[must_use]
    pub fn human(fighter: Fighter) -> Self {
        let controller = PlayerController::new(&fighter);
        Self::new(fighter, Controller::Human(controller))
    }

    /// Runs the controller and then the fighter for one frame.
    pub fn update(&mut self, dt: f32, input: &dyn InputSource, opponent: Option<&OpponentView>) {
        let fighter_input = match &mut self.controller {
            Controller::Human(player) => {
                player.drive(&mut self.fighter, input, dt);
                FighterInput::default()
            }
            Controller::Ai(ai) => {
                ai.drive(&mut self.fighter, opponent, dt);
                FighterInput::default()
            }
            Controller::Dummy(dummy) => {
                dummy.before(&mut self.fighter);
                FighterInput::default()
            }
            Controller::Scripted(script) => script.drive(&mut self.fighter, dt),
            Controller::Idle => {
                self.fighter.set_moving(false);
                FighterInput::default()
            }
        };

        self.fighter.update(dt, fighter_input, opponent);

        if let Controller::Dummy(dummy) = &self.controller {
            dummy.after(&mut self.fighter);
        }
    }

    /// Applies a hit; the training dummy refills afterwards.
    pub fn take_damage(&mut self, amount: i32, attacker_facing: Facing, attack: Option<Attack>) -> DamageResult {
        let result = self.fighter.take_damage(amount, attacker_facing, attack);
        if matches!(self.controller, Controller::Dummy(_)) {
            self.fighter.heal_full();
        }
        result
    }

    /// Snapshot handed to the other side.
    #[must_use]
    pub fn view(&self) -> OpponentView {
        self.fighter.view()
    }

    /// Whether this combatant is an AI.
    #[must_use]
    pub const fn is_ai(&self) -> bool {
        matches!(self.controller, Controller::Ai(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AiStyle, Difficulty};
    use crate::input::NoInput;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_dummy_stays_pinned() {
        let mut dummy = TrainingDummy::spawn(500.0, Facing::Left);
        dummy.fighter.set_velocity_x(20.0);
        for _ in 0..120 {
            dummy.update(DT, &NoInput, None);
        }
        assert_eq!(dummy.fighter.position().x, 500.0);
        assert_eq!(dummy.fighter.facing(), Facing::Left);
        assert!(!dummy.fighter.is_attacking());
        assert_eq!(dummy.fighter.stats(), CombatStats::new(0, 0, 0));
    }

    #[test]
    fn test_dummy_heals_after_hit() {
        let mut dummy = TrainingDummy::spawn(500.0, Facing::Left);
        let result = dummy.take_damage(30, Facing::Right, None);
        assert_eq!(result.damage, 30);
        assert_eq!(dummy.fighter.health(), dummy.fighter.max_health());
    }

    #[test]
    fn test_dummy_never_attacks() {
        let mut dummy = TrainingDummy::spawn(500.0, Facing::Left);
        dummy.fighter.attack();
        dummy.update(DT, &NoInput, None);
        assert!(!dummy.fighter.is_attacking());
        assert!(!dummy.fighter.attack_box().active);
    }

    #[test]
    fn test_script_runs_in_order() {
        let script = ScriptedController::new(vec![
            ScriptStep {
                at: 0.5,
                action: ScriptedAction::Attack,
            },
            ScriptStep {
                at: 0.0,
                action: ScriptedAction::Walk(-200.0),
            },
        ]);
        let fighter = Fighter::new(FighterConfig::new("Scripted", 600.0));
        let mut combatant = Combatant::new(fighter, Controller::Scripted(script));

        for _ in 0..20 {
            combatant.update(DT, &NoInput, None);
        }
        assert!(combatant.fighter.position().x < 600.0);
        assert!(!combatant.fighter.is_attacking());

        for _ in 0..15 {
            combatant.update(DT, &NoInput, None);
        }
        assert!(combatant.fighter.is_attacking());
        match &combatant.controller {
            Controller::Scripted(script) => assert!(script.is_finished()),
            other => panic!("unexpected controller {}", other.kind()),
        }
    }

    #[test]
    fn test_scripted_escape_goes_through_input() {
        let script = ScriptedController::new(vec![ScriptStep {
            at: 0.0,
            action: ScriptedAction::Escape(EscapeKind::Backdash),
        }]);
        let fighter = Fighter::new(FighterConfig::new("Scripted", 600.0));
        let mut combatant = Combatant::new(fighter, Controller::Scripted(script));
        combatant.update(DT, &NoInput, None);
        assert!(combatant.fighter.defense().is_in_escape_state());
        assert!(combatant.fighter.stamina() < combatant.fighter.max_stamina());
    }

    #[test]
    fn test_ai_combatant_tolerates_missing_opponent() {
        let mut fighter = Fighter::new(FighterConfig::new("Bot", 600.0));
        let ai = EnemyAi::new(AiStyle::Reactive, Difficulty::Normal, &mut fighter, 9);
        let mut combatant = Combatant::new(fighter, Controller::Ai(ai));
        assert!(combatant.is_ai());
        for _ in 0..60 {
            combatant.update(DT, &NoInput, None);
        }
        assert_eq!(combatant.fighter.health(), combatant.fighter.max_health());
    }
}
