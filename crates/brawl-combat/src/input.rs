//! Input handling for fighter controls.
//!
//! The combat core only needs a key-state query: is a key down, was it
//! pressed or released this frame, and a per-tick roll forward. Logical
//! actions are mapped onto concrete keys by [`ControlBindings`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur in the input system.
#[derive(Debug, Clone, Error)]
pub enum InputError {
    /// A binding must name at least one key
    #[error("action {0:?} needs at least one key")]
    EmptyBinding(Action),
}

/// Result type for input operations.
pub type InputResult<T> = Result<T, InputError>;

/// 2D vector for positions and velocities (screen space, y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
}

impl Vec2 {
    /// Zero vector.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Creates a new vector.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Physical keys the default bindings use.
///
/// Variant names follow the browser `KeyboardEvent.code` strings so that
/// scripted input files read naturally (`"KeyJ"`, `"ShiftLeft"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    /// Left arrow
    ArrowLeft,
    /// Right arrow
    ArrowRight,
    /// Up arrow
    ArrowUp,
    /// Down arrow
    ArrowDown,
    /// A key
    KeyA,
    /// D key
    KeyD,
    /// E key
    KeyE,
    /// J key
    KeyJ,
    /// K key
    KeyK,
    /// Q key
    KeyQ,
    /// R key
    KeyR,
    /// S key
    KeyS,
    /// U key
    KeyU,
    /// W key
    KeyW,
    /// Space bar
    Space,
    /// Left shift
    ShiftLeft,
    /// Right shift
    ShiftRight,
    /// Enter
    Enter,
    /// Escape
    Escape,
}

/// State of a button (pressed, just pressed, released).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonState {
    /// Whether the button is currently held down
    pub pressed: bool,
    /// Whether the button was just pressed this frame
    pub just_pressed: bool,
    /// Whether the button was just released this frame
    pub just_released: bool,
}

impl ButtonState {
    /// Update the button state from a key event.
    ///
    /// Repeated events for a key that is already down do not re-trigger
    /// `just_pressed`.
    pub fn update(&mut self, is_pressed: bool) {
        if is_pressed && !self.pressed {
            self.just_pressed = true;
        }
        if !is_pressed && self.pressed {
            self.just_released = true;
        }
        self.pressed = is_pressed;
    }

    /// Clear the frame-specific state (just_pressed, just_released).
    pub fn clear_frame(&mut self) {
        self.just_pressed = false;
        self.just_released = false;
    }
}

/// Key-state capability consumed by the combat core.
pub trait InputSource {
    /// Whether the key is currently held.
    fn is_down(&self, key: KeyCode) -> bool;

    /// Whether the key went down since the last [`InputSource::update`].
    fn just_pressed(&self, key: KeyCode) -> bool;

    /// Whether the key went up since the last [`InputSource::update`].
    fn just_released(&self, key: KeyCode) -> bool;

    /// Rolls the edge-triggered state forward; called once per tick after
    /// both fighters have read it.
    fn update(&mut self);
}

/// Keyboard state fed by key events.
#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    keys: HashMap<KeyCode, ButtonState>,
}

impl KeyboardState {
    /// Creates an empty keyboard state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a key going down.
    pub fn press(&mut self, key: KeyCode) {
        self.keys.entry(key).or_default().update(true);
    }

    /// Records a key going up.
    pub fn release(&mut self, key: KeyCode) {
        self.keys.entry(key).or_default().update(false);
    }

    /// Releases every held key (focus loss).
    pub fn release_all(&mut self) {
        for state in self.keys.values_mut() {
            state.update(false);
        }
    }

    fn state(&self, key: KeyCode) -> ButtonState {
        self.keys.get(&key).copied().unwrap_or_default()
    }
}

impl InputSource for KeyboardState {
    fn is_down(&self, key: KeyCode) -> bool {
        self.state(key).pressed
    }

    fn just_pressed(&self, key: KeyCode) -> bool {
        self.state(key).just_pressed
    }

    fn just_released(&self, key: KeyCode) -> bool {
        self.state(key).just_released
    }

    fn update(&mut self) {
        for state in self.keys.values_mut() {
            state.clear_frame();
        }
    }
}

/// Input source with nothing pressed, for AI-only matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInput;

impl InputSource for NoInput {
    fn is_down(&self, _key: KeyCode) -> bool {
        false
    }

    fn just_pressed(&self, _key: KeyCode) -> bool {
        false
    }

    fn just_released(&self, _key: KeyCode) -> bool {
        false
    }

    fn update(&mut self) {}
}

/// Logical fighter actions that can be bound to keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Walk left
    MoveLeft,
    /// Walk right
    MoveRight,
    /// Jump
    Jump,
    /// Light attack
    Attack,
    /// Heavy attack (same attack, separate key)
    HeavyAttack,
    /// Hold to block
    Block,
    /// Backdash escape
    Backdash,
    /// Roll escape
    Roll,
    /// Spot dodge escape
    Dodge,
}

impl Action {
    /// Every bindable action.
    pub const ALL: [Self; 9] = [
        Self::MoveLeft,
        Self::MoveRight,
        Self::Jump,
        Self::Attack,
        Self::HeavyAttack,
        Self::Block,
        Self::Backdash,
        Self::Roll,
        Self::Dodge,
    ];
}

/// Mapping of logical actions onto keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlBindings {
    bindings: HashMap<Action, Vec<KeyCode>>,
}

impl Default for ControlBindings {
    fn default() -> Self {
        use KeyCode::{
            ArrowLeft, ArrowRight, ArrowUp, KeyA, KeyD, KeyE, KeyJ, KeyK, KeyQ, KeyR, KeyU, KeyW,
            ShiftLeft, ShiftRight, Space,
        };
        let bindings = HashMap::from([
            (Action::MoveLeft, vec![ArrowLeft, KeyA]),
            (Action::MoveRight, vec![ArrowRight, KeyD]),
            (Action::Jump, vec![ArrowUp, KeyW]),
            (Action::Attack, vec![Space, KeyJ]),
            (Action::HeavyAttack, vec![KeyU]),
            (Action::Block, vec![ShiftLeft, KeyK, ShiftRight]),
            (Action::Backdash, vec![KeyQ]),
            (Action::Roll, vec![KeyE]),
            (Action::Dodge, vec![KeyR]),
        ]);
        Self { bindings }
    }
}

impl ControlBindings {
    /// Replaces the keys bound to an action.
    pub fn rebind(&mut self, action: Action, keys: Vec<KeyCode>) -> InputResult<()> {
        if keys.is_empty() {
            return Err(InputError::EmptyBinding(action));
        }
        self.bindings.insert(action, keys);
        Ok(())
    }

    /// Keys bound to an action.
    #[must_use]
    pub fn keys(&self, action: Action) -> &[KeyCode] {
        self.bindings.get(&action).map_or(&[], Vec::as_slice)
    }

    /// Whether any key bound to the action is held.
    #[must_use]
    pub fn is_down(&self, input: &dyn InputSource, action: Action) -> bool {
        self.keys(action).iter().any(|&key| input.is_down(key))
    }

    /// Whether any key bound to the action was pressed this frame.
    #[must_use]
    pub fn just_pressed(&self, input: &dyn InputSource, action: Action) -> bool {
        self.keys(action).iter().any(|&key| input.just_pressed(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_state_edges() {
        let mut state = ButtonState::default();
        state.update(true);
        assert!(state.pressed);
        assert!(state.just_pressed);

        state.clear_frame();
        state.update(true);
        assert!(!state.just_pressed, "held key must not re-trigger");

        state.update(false);
        assert!(state.just_released);
        assert!(!state.pressed);
    }

    #[test]
    fn test_keyboard_rolls_forward() {
        let mut keyboard = KeyboardState::new();
        keyboard.press(KeyCode::KeyJ);
        assert!(keyboard.is_down(KeyCode::KeyJ));
        assert!(keyboard.just_pressed(KeyCode::KeyJ));

        keyboard.update();
        assert!(keyboard.is_down(KeyCode::KeyJ));
        assert!(!keyboard.just_pressed(KeyCode::KeyJ));

        keyboard.release(KeyCode::KeyJ);
        assert!(keyboard.just_released(KeyCode::KeyJ));
        keyboard.update();
        assert!(!keyboard.just_released(KeyCode::KeyJ));
    }

    #[test]
    fn test_press_and_release_in_one_frame_still_registers() {
        let mut keyboard = KeyboardState::new();
        keyboard.press(KeyCode::KeyQ);
        keyboard.release(KeyCode::KeyQ);
        assert!(keyboard.just_pressed(KeyCode::KeyQ));
        assert!(!keyboard.is_down(KeyCode::KeyQ));
    }

    #[test]
    fn test_default_bindings() {
        let bindings = ControlBindings::default();
        let mut keyboard = KeyboardState::new();
        keyboard.press(KeyCode::ShiftRight);
        assert!(bindings.is_down(&keyboard, Action::Block));
        assert!(!bindings.is_down(&keyboard, Action::Attack));

        for action in Action::ALL {
            assert!(!bindings.keys(action).is_empty(), "{action:?} unbound");
        }
    }

    #[test]
    fn test_rebind_rejects_empty() {
        let mut bindings = ControlBindings::default();
        assert!(bindings.rebind(Action::Roll, Vec::new()).is_err());
        bindings
            .rebind(Action::Roll, vec![KeyCode::KeyS])
            .expect("rebind");
        assert_eq!(bindings.keys(Action::Roll), &[KeyCode::KeyS]);
    }
}
