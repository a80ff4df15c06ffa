//! Frame bookkeeping for fighter animations.
//!
//! Rendering is out of scope, but frame timing is not: the sprite variant
//! opens its attack box on the middle frame of the attack clip and ends the
//! attack when the clip finishes.

use serde::{Deserialize, Serialize};

/// Identifies which clip is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimationKey {
    /// Standing still
    Idle,
    /// Walking
    Running,
    /// First attack clip
    Attacking,
    /// Alternate attack clip
    Attacking2,
    /// Second alternate attack clip
    Attacking3,
    /// Taking a hit
    Hurt,
    /// Holding block
    Blocking,
    /// Backdash escape
    Backdash,
    /// Roll escape
    Roll,
    /// Spot dodge escape
    Dodge,
    /// Knocked out
    Dead,
}

impl AnimationKey {
    /// Lower-case name handed to presentation layers.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Attacking => "attacking",
            Self::Attacking2 => "attacking2",
            Self::Attacking3 => "attacking3",
            Self::Hurt => "hurt",
            Self::Blocking => "blocking",
            Self::Backdash => "backdash",
            Self::Roll => "roll",
            Self::Dodge => "dodge",
            Self::Dead => "dead",
        }
    }
}

/// One animation strip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnimationClip {
    /// Number of frames
    pub frames: u32,
    /// Seconds per frame
    pub frame_duration: f32,
    /// Whether the clip wraps around
    pub looping: bool,
}

impl AnimationClip {
    /// Creates a looping clip.
    #[must_use]
    pub const fn looping(frames: u32, frame_duration: f32) -> Self {
        Self {
            frames,
            frame_duration,
            looping: true,
        }
    }

    /// Creates a clip that plays once.
    #[must_use]
    pub const fn once(frames: u32, frame_duration: f32) -> Self {
        Self {
            frames,
            frame_duration,
            looping: false,
        }
    }

    /// Frame at which an attack clip opens its hit window.
    #[must_use]
    pub const fn strike_frame(&self) -> u32 {
        self.frames / 2
    }
}

/// Clip table for one character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationSet {
    /// Idle clip
    pub idle: AnimationClip,
    /// Walk clip
    pub running: AnimationClip,
    /// Primary attack clip
    pub attacking: AnimationClip,
    /// Hurt clip
    pub hurt: AnimationClip,
    /// Block clip
    pub blocking: AnimationClip,
    /// Backdash clip
    pub backdash: AnimationClip,
    /// Roll clip
    pub roll: AnimationClip,
    /// Spot dodge clip
    pub dodge: AnimationClip,
    /// Knockout clip; without it a defeated fighter just stays hurt
    #[serde(default)]
    pub dead: Option<AnimationClip>,
    /// Alternate attack
    #[serde(default)]
    pub attacking2: Option<AnimationClip>,
    /// Second alternate attack
    #[serde(default)]
    pub attacking3: Option<AnimationClip>,
}

impl Default for AnimationSet {
    /// Sprite-sheet defaults.
    fn default() -> Self {
        Self {
            idle: AnimationClip::looping(10, 0.1),
            running: AnimationClip::looping(16, 0.05),
            attacking: AnimationClip::once(7, 0.06),
            hurt: AnimationClip::once(4, 0.1),
            blocking: AnimationClip::looping(1, 0.1),
            backdash: AnimationClip::looping(16, 0.05),
            roll: AnimationClip::looping(16, 0.03),
            dodge: AnimationClip::looping(10, 0.05),
            dead: None,
            attacking2: None,
            attacking3: None,
        }
    }
}

impl AnimationSet {
    /// Frame table for the classic block-figure fighter.
    #[must_use]
    pub fn classic() -> Self {
        const FRAME: f32 = 0.12;
        Self {
            idle: AnimationClip::looping(4, FRAME),
            running: AnimationClip::looping(4, FRAME),
            attacking: AnimationClip::looping(4, FRAME),
            hurt: AnimationClip::looping(2, FRAME),
            blocking: AnimationClip::looping(1, FRAME),
            backdash: AnimationClip::looping(3, FRAME),
            roll: AnimationClip::looping(4, FRAME),
            dodge: AnimationClip::looping(2, FRAME),
            dead: None,
            attacking2: None,
            attacking3: None,
        }
    }

    /// Adds the optional knockout and alternate attack clips.
    #[must_use]
    pub fn with_extras(mut self) -> Self {
        self.dead = Some(AnimationClip::once(3, 0.15));
        self.attacking2 = Some(AnimationClip::once(3, 0.1));
        self.attacking3 = Some(AnimationClip::once(4, 0.08));
        self
    }

    /// Looks up a clip.
    #[must_use]
    pub fn clip(&self, key: AnimationKey) -> Option<&AnimationClip> {
        match key {
            AnimationKey::Idle => Some(&self.idle),
            AnimationKey::Running => Some(&self.running),
            AnimationKey::Attacking => Some(&self.attacking),
            AnimationKey::Attacking2 => self.attacking2.as_ref(),
            AnimationKey::Attacking3 => self.attacking3.as_ref(),
            AnimationKey::Hurt => Some(&self.hurt),
            AnimationKey::Blocking => Some(&self.blocking),
            AnimationKey::Backdash => Some(&self.backdash),
            AnimationKey::Roll => Some(&self.roll),
            AnimationKey::Dodge => Some(&self.dodge),
            AnimationKey::Dead => self.dead.as_ref(),
        }
    }

    /// Whether alternate attack clips are available to pick from.
    #[must_use]
    pub fn has_attack_variety(&self) -> bool {
        self.attacking2.is_some() && self.attacking3.is_some()
    }
}

/// What happened during one [`Animator::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStep {
    /// New frame index if the frame changed
    pub entered_frame: Option<u32>,
    /// Set on the tick a one-shot clip finished
    pub completed: bool,
}

/// Playback cursor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Animator {
    frame: u32,
    frame_time: f32,
    complete: bool,
}

impl Animator {
    /// Restarts playback from frame zero.
    pub fn restart(&mut self) {
        *self = Self::default();
    }

    /// Current frame index.
    #[must_use]
    pub const fn frame(&self) -> u32 {
        self.frame
    }

    /// Whether a one-shot clip has finished.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.complete
    }

    /// Advances the cursor through `clip`.
    pub fn advance(&mut self, clip: &AnimationClip, dt: f32) -> FrameStep {
        let mut step = FrameStep::default();
        self.frame_time += dt;
        if self.frame_time < clip.frame_duration {
            return step;
        }
        self.frame_time = 0.0;

        if self.frame + 1 < clip.frames {
            self.frame += 1;
            step.entered_frame = Some(self.frame);
        } else if clip.looping {
            self.frame = 0;
            step.entered_frame = Some(0);
        } else if !self.complete {
            self.complete = true;
            step.completed = true;
        }
        step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looping_clip_wraps() {
        let clip = AnimationClip::looping(2, 0.1);
        let mut animator = Animator::default();
        assert_eq!(animator.advance(&clip, 0.05).entered_frame, None);
        assert_eq!(animator.advance(&clip, 0.05).entered_frame, Some(1));
        assert_eq!(animator.advance(&clip, 0.1).entered_frame, Some(0));
        assert!(!animator.is_complete());
    }

    #[test]
    fn test_one_shot_clip_completes_once() {
        let clip = AnimationClip::once(2, 0.1);
        let mut animator = Animator::default();
        animator.advance(&clip, 0.1);
        assert_eq!(animator.frame(), 1);

        let step = animator.advance(&clip, 0.1);
        assert!(step.completed);
        assert!(animator.is_complete());

        let step = animator.advance(&clip, 0.1);
        assert!(!step.completed, "completion is reported once");
        assert_eq!(animator.frame(), 1);
    }

    #[test]
    fn test_strike_frame_is_middle() {
        assert_eq!(AnimationSet::default().attacking.strike_frame(), 3);
        let extras = AnimationSet::default().with_extras();
        assert!(extras.has_attack_variety());
        assert!(extras.clip(AnimationKey::Dead).is_some());
        assert!(AnimationSet::classic().clip(AnimationKey::Dead).is_none());
    }
}
