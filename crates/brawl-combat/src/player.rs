//! Human player controller: maps bound keys onto fighter actions.

use serde::{Deserialize, Serialize};

use crate::fighter::{Fighter, FighterVariant};
use crate::input::{Action, ControlBindings, InputSource};
use crate::physics::Facing;

/// Base walk speed of block-figure fighters.
pub const CLASSIC_BASE_SPEED: f32 = 250.0;
/// Base walk speed of sprite fighters.
pub const SPRITE_BASE_SPEED: f32 = 300.0;
/// Walk speed gained per point of the speed stat.
pub const SPEED_PER_STAT: f32 = 2.0;

/// Drives a fighter from keyboard state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerController {
    bindings: ControlBindings,
    move_speed: f32,
    attack_requires_ground: bool,
}

impl PlayerController {
    /// Creates a controller tuned to the fighter's variant and speed stat.
    #[must_use]
    pub fn new(fighter: &Fighter) -> Self {
        Self::with_bindings(fighter, ControlBindings::default())
    }

    /// Creates a controller with custom key bindings.
    #[must_use]
    pub fn with_bindings(fighter: &Fighter, bindings: ControlBindings) -> Self {
        let (base, attack_requires_ground) = match fighter.variant() {
            FighterVariant::Classic => (CLASSIC_BASE_SPEED, false),
            FighterVariant::Sprite(_) => (SPRITE_BASE_SPEED, true),
        };
        Self {
            bindings,
            move_speed: base + fighter.stats().speed as f32 * SPEED_PER_STAT,
            attack_requires_ground,
        }
    }

    /// Reads input and issues actions for this frame. Call before
    /// [`Fighter::update`].
    ///
    /// Nothing happens while hurt or mid-action. A held block key wins
    /// over everything else. Escapes fire on the key edge; walking,
    /// jumping and attacking need stamina left.
    pub fn drive(&self, fighter: &mut Fighter, input: &dyn InputSource, dt: f32) {
        fighter.set_moving(false);
        if fighter.is_hurt() || fighter.is_defeated() || fighter.is_attacking() {
            return;
        }
        if fighter.defense().is_in_escape_state() {
            return;
        }

        if self.bindings.is_down(input, Action::Block) {
            fighter.block(true);
            return;
        }
        if fighter.is_blocking() {
            fighter.block(false);
        }

        if self.bindings.just_pressed(input, Action::Backdash) && fighter.backdash() {
            return;
        }
        if self.bindings.just_pressed(input, Action::Roll) && fighter.roll() {
            return;
        }
        if self.bindings.just_pressed(input, Action::Dodge) && fighter.spot_dodge() {
            return;
        }

        if fighter.stamina() <= 0.0 {
            return;
        }

        if self.bindings.is_down(input, Action::MoveLeft) {
            fighter.walk(-self.move_speed * dt);
            fighter.set_facing(Facing::Left);
            fighter.set_moving(true);
        }
        if self.bindings.is_down(input, Action::MoveRight) {
            fighter.walk(self.move_speed * dt);
            fighter.set_facing(Facing::Right);
            fighter.set_moving(true);
        }
        if self.bindings.is_down(input, Action::Jump) {
            fighter.jump();
        }

        let wants_attack = self.bindings.just_pressed(input, Action::Attack)
            || self.bindings.just_pressed(input, Action::HeavyAttack);
        if wants_attack && (!self.attack_requires_ground || fighter.is_on_ground()) {
            fighter.attack();
        }
    }

    /// Walk speed in units per second.
    #[must_use]
    pub const fn move_speed(&self) -> f32 {
        self.move_speed
    }

    /// Key bindings.
    #[must_use]
    pub const fn bindings(&self) -> &ControlBindings {
        &self.bindings
    }

    /// Mutable key bindings, for rebinding.
    pub fn bindings_mut(&mut self) -> &mut ControlBindings {
        &mut self.bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fighter::{FighterConfig, FighterInput, SpriteConfig};
    use crate::input::{KeyCode, KeyboardState};

    const DT: f32 = 1.0 / 60.0;

    fn grounded(variant: FighterVariant) -> Fighter {
        let mut fighter = Fighter::new(FighterConfig::new("Hero", 400.0).with_variant(variant));
        for _ in 0..90 {
            fighter.update(DT, FighterInput::default(), None);
        }
        fighter
    }

    fn step(controller: &PlayerController, fighter: &mut Fighter, keys: &mut KeyboardState) {
        controller.drive(fighter, keys, DT);
        fighter.update(DT, FighterInput::default(), None);
        keys.update();
    }

    #[test]
    fn test_move_speed_from_variant() {
        let classic = grounded(FighterVariant::Classic);
        assert_eq!(PlayerController::new(&classic).move_speed(), 250.0 + 70.0 * 2.0);

        let sprite = grounded(FighterVariant::Sprite(SpriteConfig::default()));
        assert_eq!(PlayerController::new(&sprite).move_speed(), 300.0 + 80.0 * 2.0);
    }

    #[test]
    fn test_walk_left_turns_and_moves() {
        let mut fighter = grounded(FighterVariant::Classic);
        let controller = PlayerController::new(&fighter);
        let mut keys = KeyboardState::new();
        keys.press(KeyCode::KeyA);

        let x = fighter.position().x;
        step(&controller, &mut fighter, &mut keys);
        assert!(fighter.position().x < x);
        assert_eq!(fighter.facing(), Facing::Left);
    }

    #[test]
    fn test_block_short_circuits_movement() {
        let mut fighter = grounded(FighterVariant::Classic);
        let controller = PlayerController::new(&fighter);
        let mut keys = KeyboardState::new();
        keys.press(KeyCode::ShiftLeft);
        keys.press(KeyCode::ArrowRight);

        let x = fighter.position().x;
        step(&controller, &mut fighter, &mut keys);
        assert!(fighter.is_blocking());
        assert_eq!(fighter.position().x, x);

        keys.release(KeyCode::ShiftLeft);
        step(&controller, &mut fighter, &mut keys);
        assert!(!fighter.is_blocking());
        assert!(fighter.position().x > x);
    }

    #[test]
    fn test_escape_is_edge_triggered() {
        let mut fighter = grounded(FighterVariant::Classic);
        let controller = PlayerController::new(&fighter);
        let mut keys = KeyboardState::new();
        keys.press(KeyCode::KeyR);

        step(&controller, &mut fighter, &mut keys);
        assert!(fighter.defense().is_in_escape_state());
        assert_eq!(fighter.defense().stats().escapes_used, 1);

        // Holding the key does not re-trigger once the dodge ends.
        for _ in 0..120 {
            step(&controller, &mut fighter, &mut keys);
        }
        assert_eq!(fighter.defense().stats().escapes_used, 1);
    }

    #[test]
    fn test_attack_on_press_only() {
        let mut fighter = grounded(FighterVariant::Classic);
        let controller = PlayerController::new(&fighter);
        let mut keys = KeyboardState::new();
        keys.press(KeyCode::Space);
        step(&controller, &mut fighter, &mut keys);
        assert!(fighter.is_attacking());
    }

    #[test]
    fn test_sprite_attack_needs_ground() {
        let mut fighter = grounded(FighterVariant::Sprite(SpriteConfig::default()));
        let controller = PlayerController::new(&fighter);
        assert!(fighter.jump());
        let mut keys = KeyboardState::new();
        keys.press(KeyCode::KeyJ);
        controller.drive(&mut fighter, &keys, DT);
        assert!(!fighter.is_attacking());
    }

    #[test]
    fn test_no_stamina_blocks_movement() {
        let mut fighter = grounded(FighterVariant::Classic);
        let controller = PlayerController::new(&fighter);
        let max = fighter.max_stamina();
        assert!(fighter.consume_stamina(max));

        let mut keys = KeyboardState::new();
        keys.press(KeyCode::KeyD);
        let x = fighter.position().x;
        controller.drive(&mut fighter, &keys, DT);
        assert_eq!(fighter.position().x, x);
        assert!(!fighter.is_moving());
    }

    #[test]
    fn test_hurt_fighter_ignores_input() {
        let mut fighter = grounded(FighterVariant::Classic);
        let controller = PlayerController::new(&fighter);
        fighter.take_damage(10, Facing::Left, None);
        assert!(fighter.is_hurt());

        let mut keys = KeyboardState::new();
        keys.press(KeyCode::KeyJ);
        controller.drive(&mut fighter, &keys, DT);
        assert!(!fighter.is_attacking());
    }

    #[test]
    fn test_rebinding_changes_keys() {
        let mut fighter = grounded(FighterVariant::Classic);
        let mut controller = PlayerController::new(&fighter);
        assert!(controller
            .bindings_mut()
            .rebind(Action::Attack, vec![KeyCode::Enter])
            .is_ok());

        let mut keys = KeyboardState::new();
        keys.press(KeyCode::Space);
        step(&controller, &mut fighter, &mut keys);
        assert!(!fighter.is_attacking());

        keys.press(KeyCode::Enter);
        step(&controller, &mut fighter, &mut keys);
        assert!(fighter.is_attacking());
    }
}
