//! Gravity integration and overlap tests.
//!
//! Screen coordinates are used throughout: `y` grows downward, so gravity
//! is positive and jumps have negative vertical velocity.

use serde::{Deserialize, Serialize};

use crate::input::Vec2;

/// Gravity in units per second squared.
pub const GRAVITY: f32 = 30.0;

/// Horizontal facing direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Facing {
    /// Facing toward negative x
    Left,
    /// Facing toward positive x
    #[default]
    Right,
}

impl Facing {
    /// Returns -1.0 or +1.0.
    #[must_use]
    pub const fn sign(self) -> f32 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }

    /// The opposite direction.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Direction pointing from `from` toward `to` along x.
    ///
    /// Equal coordinates resolve to [`Facing::Left`].
    #[must_use]
    pub fn toward(from: f32, to: f32) -> Self {
        if to > from {
            Self::Right
        } else {
            Self::Left
        }
    }
}

/// Position and velocity of a body.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Kinematics {
    /// Top-left corner
    pub position: Vec2,
    /// Velocity; `y` is applied as a per-frame displacement
    pub velocity: Vec2,
}

impl Kinematics {
    /// Creates a body at rest.
    #[must_use]
    pub const fn at(x: f32, y: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            velocity: Vec2::ZERO,
        }
    }
}

/// Accelerates the body downward and moves it by its vertical velocity.
///
/// `velocity.y` is added to the position as-is, not scaled by `dt` again.
/// Jump heights and fall speeds are tuned around this.
pub fn apply_gravity(body: &mut Kinematics, dt: f32) {
    body.velocity.y += GRAVITY * dt;
    body.position.y += body.velocity.y;
}

/// Snaps the body onto the ground line if it reached or passed it.
///
/// Returns whether the body is in contact with the ground.
pub fn check_ground_collision(body: &mut Kinematics, ground_level: f32) -> bool {
    if body.position.y >= ground_level {
        body.position.y = ground_level;
        body.velocity.y = 0.0;
        true
    } else {
        false
    }
}

/// Axis-aligned bounding box for hit detection.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AABB {
    /// Minimum X coordinate
    pub min_x: f32,
    /// Minimum Y coordinate
    pub min_y: f32,
    /// Maximum X coordinate
    pub max_x: f32,
    /// Maximum Y coordinate
    pub max_y: f32,
}

impl AABB {
    /// Creates a new AABB.
    #[must_use]
    pub const fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Creates an AABB from its top-left corner and size.
    #[must_use]
    pub fn from_rect(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Returns the width of the AABB.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    /// Returns the height of the AABB.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    /// Checks if this AABB overlaps with another.
    ///
    /// Boxes that only share an edge do not overlap.
    #[must_use]
    pub fn overlaps(&self, other: &AABB) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }
}

/// Whether two boxes overlap; touching edges do not collide.
#[must_use]
pub fn is_colliding(a: &AABB, b: &AABB) -> bool {
    a.overlaps(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gravity_adds_velocity_as_displacement() {
        let mut body = Kinematics::at(0.0, 100.0);
        apply_gravity(&mut body, 0.1);
        assert!((body.velocity.y - 3.0).abs() < 1e-5);
        assert!((body.position.y - 103.0).abs() < 1e-4);

        apply_gravity(&mut body, 0.1);
        assert!((body.velocity.y - 6.0).abs() < 1e-5);
        assert!((body.position.y - 109.0).abs() < 1e-4);
    }

    #[test]
    fn test_ground_collision() {
        let mut body = Kinematics::at(0.0, 350.0);
        body.velocity.y = 12.0;
        assert!(!check_ground_collision(&mut body, 400.0));
        assert_eq!(body.velocity.y, 12.0);

        body.position.y = 410.0;
        assert!(check_ground_collision(&mut body, 400.0));
        assert_eq!(body.position.y, 400.0);
        assert_eq!(body.velocity.y, 0.0);

        // Resting exactly on the line still counts as contact
        assert!(check_ground_collision(&mut body, 400.0));
    }

    #[test]
    fn test_touching_edges_do_not_collide() {
        let a = AABB::from_rect(0.0, 0.0, 10.0, 10.0);
        let right = AABB::from_rect(10.0, 0.0, 10.0, 10.0);
        let below = AABB::from_rect(0.0, 10.0, 10.0, 10.0);
        assert!(!is_colliding(&a, &right));
        assert!(!is_colliding(&a, &below));

        let inside = AABB::from_rect(9.0, 9.0, 10.0, 10.0);
        assert!(is_colliding(&a, &inside));
        assert!(is_colliding(&inside, &a));
    }

    #[test]
    fn test_facing() {
        assert_eq!(Facing::Left.sign(), -1.0);
        assert_eq!(Facing::Right.flipped(), Facing::Left);
        assert_eq!(Facing::toward(100.0, 200.0), Facing::Right);
        assert_eq!(Facing::toward(200.0, 100.0), Facing::Left);
    }
}
