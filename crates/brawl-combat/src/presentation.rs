//! Attach point for display layers.
//!
//! The simulation only pushes data outward: after each tick a fighter can
//! hand its [`FighterFrame`] to whatever [`DisplayHandle`] is attached.
//! Nothing is ever read back.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

use crate::defense::DefenseState;
use crate::input::Vec2;
use crate::physics::{Facing, AABB};

/// Everything a display layer needs to draw one fighter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FighterFrame {
    /// Fighter name
    pub name: String,
    /// Opaque character reference from the fighter's config
    pub character: String,
    /// Top-left corner
    pub position: Vec2,
    /// Current velocity
    pub velocity: Vec2,
    /// Facing direction
    pub facing: Facing,
    /// Body size
    pub size: Vec2,
    /// State name (`"idle"`, `"attacking"`, ...)
    pub state: &'static str,
    /// Animation clip name
    pub animation: &'static str,
    /// Animation frame index
    pub frame: u32,
    /// Current health
    pub health: i32,
    /// Maximum health
    pub max_health: i32,
    /// Current stamina
    pub stamina: f32,
    /// Damageable region
    pub hitbox: AABB,
    /// Damage region, present only while active
    pub attack_box: Option<AABB>,
    /// Holding block
    pub blocking: bool,
    /// In hit stun
    pub hurt: bool,
    /// Ignoring hits
    pub invincible: bool,
    /// Defense state
    pub defense_state: DefenseState,
    /// Remaining block charges
    pub block_charges: u8,
    /// Whether hitboxes should be drawn
    pub debug: bool,
}

/// Opaque display binding for a fighter.
pub trait DisplayHandle: std::fmt::Debug + Send {
    /// Draws the latest frame.
    fn present(&mut self, frame: &FighterFrame);

    /// Releases display resources; called once from `destroy`.
    fn release(&mut self) {}
}

/// Shared record of what a [`RecordingDisplay`] was shown.
#[derive(Debug, Default)]
pub struct DisplayLog {
    /// Frames in arrival order
    pub frames: Vec<FighterFrame>,
    /// Whether `release` was called
    pub released: bool,
}

/// Display handle that records every frame into a shared [`DisplayLog`].
#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay {
    log: Arc<Mutex<DisplayLog>>,
}

impl RecordingDisplay {
    /// Creates a recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames presented so far.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.log.lock().frames.len()
    }

    /// Most recent frame, if any.
    #[must_use]
    pub fn last_frame(&self) -> Option<FighterFrame> {
        self.log.lock().frames.last().cloned()
    }

    /// Whether the handle was released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.log.lock().released
    }
}

impl DisplayHandle for RecordingDisplay {
    fn present(&mut self, frame: &FighterFrame) {
        self.log.lock().frames.push(frame.clone());
    }

    fn release(&mut self) {
        self.log.lock().released = true;
    }
}
