//! Arrow projectile and its Verlet integrator
//!
//! Arrows carry no explicit velocity: motion is implied by the current and
//! previous positions. Forces accumulate over a tick and are cleared after
//! each integration step.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::tuning::ArrowTuning;

/// Displacements shorter than this leave the arrow's facing unchanged
const MIN_ORIENT_DISPLACEMENT: f32 = 1e-6;

/// Fire trigger from the input layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FireCommand {
    pub direction: Vec3,
    pub magnitude: f32,
}

impl FireCommand {
    pub fn new(direction: Vec3, magnitude: f32) -> Self {
        Self {
            direction,
            magnitude,
        }
    }

    /// Build a shot from how long the fire input was held.
    ///
    /// Charge grows linearly at `charge_rate` per tick and saturates at 1,
    /// spanning `[base_force, max_force]`.
    pub fn from_charge(direction: Vec3, held_ticks: u32, tuning: &ArrowTuning) -> Self {
        let factor = (held_ticks as f32 * tuning.charge_rate).min(1.0);
        let magnitude = tuning.base_force + factor * (tuning.max_force - tuning.base_force);
        Self::new(direction, magnitude)
    }

    /// Impulse vector, or None for a degenerate aim direction
    pub fn impulse(&self, tuning: &ArrowTuning) -> Option<Vec3> {
        let dir = self.direction.normalize_or_zero();
        if dir == Vec3::ZERO {
            return None;
        }
        let magnitude = self.magnitude.clamp(tuning.base_force, tuning.max_force);
        Some(dir * magnitude)
    }
}

/// An arrow entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arrow {
    pub id: u32,
    pub position: Vec3,
    /// Position one tick ago (Verlet history)
    pub prev_position: Vec3,
    /// Net force accumulated for the next integration step
    pub force: Vec3,
    pub mass: f32,
    /// Unit facing
    pub direction: Vec3,
    pub fired: bool,
    /// Once set, never cleared
    pub has_collided: bool,
    /// 0xRRGGBB, used for hit attribution and splatter colour
    pub color: u32,
}

impl Arrow {
    /// A nocked (unfired) arrow at rest
    pub fn nocked(id: u32, position: Vec3, direction: Vec3, mass: f32, color: u32) -> Self {
        Self {
            id,
            position,
            prev_position: position,
            force: Vec3::ZERO,
            mass,
            direction: direction.normalize_or(Vec3::Z),
            fired: false,
            has_collided: false,
            color,
        }
    }

    /// Arrow at the tuning's spawn pose relative to the camera
    pub fn spawn(id: u32, camera: Vec3, tuning: &ArrowTuning, color: u32) -> Self {
        Self::nocked(
            id,
            camera + tuning.spawn_offset,
            tuning.spawn_direction,
            tuning.mass,
            color,
        )
    }

    /// Whether the integrator and collision tests should touch this arrow
    #[inline]
    pub fn is_live(&self) -> bool {
        self.fired && !self.has_collided
    }

    #[inline]
    pub fn add_force(&mut self, force: Vec3) {
        self.force += force;
    }

    /// Apply the firing impulse; the arrow counts as fired from now on
    pub fn fire(&mut self, impulse: Vec3) {
        if self.has_collided {
            return;
        }
        self.add_force(impulse);
        let dir = impulse.normalize_or_zero();
        if dir != Vec3::ZERO {
            self.direction = dir;
        }
        self.fired = true;
    }

    /// Advance one fixed step.
    ///
    /// Gravity (as acceleration, applied as `gravity * mass`) and the wind
    /// force are added to the accumulator, then
    /// `next = P + (1 - damping)(P - P⁻) + (F / m) dt²`.
    /// Returns false when the arrow is not live.
    pub fn integrate(&mut self, gravity: Vec3, wind_force: Vec3, damping: f32, dt: f32) -> bool {
        if !self.is_live() {
            return false;
        }

        self.add_force(gravity * self.mass);
        self.add_force(wind_force);

        let acceleration = self.force / self.mass;
        let next = self.position
            + (1.0 - damping) * (self.position - self.prev_position)
            + acceleration * dt * dt;
        self.prev_position = self.position;
        self.position = next;
        self.force = Vec3::ZERO;

        self.orient_along_motion();
        true
    }

    /// Point along the last displacement; tiny steps keep the old facing
    fn orient_along_motion(&mut self) {
        let displacement = self.position - self.prev_position;
        let len = displacement.length();
        if len > MIN_ORIENT_DISPLACEMENT && len.is_finite() {
            self.direction = displacement / len;
        }
    }

    /// Tip of the arrow, `half_length` ahead of the centre
    #[inline]
    pub fn tip(&self, half_length: f32) -> Vec3 {
        self.position + self.direction * half_length
    }

    /// Implied velocity over the last step
    #[inline]
    pub fn velocity(&self, dt: f32) -> Vec3 {
        (self.position - self.prev_position) / dt
    }

    /// Stop the arrow where it is. Irreversible.
    pub fn freeze(&mut self) {
        self.has_collided = true;
        self.prev_position = self.position;
        self.force = Vec3::ZERO;
    }
}
