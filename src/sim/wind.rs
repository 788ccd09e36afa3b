//! Global wind field
//!
//! Wind is a single horizontal direction and speed shared by every arrow.
//! A new heading is drawn on a timer; the published wind eases toward it a
//! little each tick so the force on arrows in flight never jumps.

use std::f32::consts::TAU;

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::tuning::WindTuning;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindField {
    /// Unit heading of the current wind
    pub direction: Vec3,
    /// Current speed
    pub speed: f32,
    /// Wind velocity being eased toward
    pub target: Vec3,
}

impl Default for WindField {
    fn default() -> Self {
        Self::calm()
    }
}

impl WindField {
    /// No wind, heading +X
    pub fn calm() -> Self {
        Self {
            direction: Vec3::X,
            speed: 0.0,
            target: Vec3::ZERO,
        }
    }

    /// Wind already settled at `direction * speed`
    pub fn steady(direction: Vec3, speed: f32) -> Self {
        let direction = direction.normalize_or(Vec3::X);
        Self {
            direction,
            speed,
            target: direction * speed,
        }
    }

    /// Draw a new heading and speed to ease toward.
    ///
    /// Speeds are whole numbers, matching what the wind indicator shows.
    pub fn regenerate<R: Rng + ?Sized>(&mut self, rng: &mut R, tuning: &WindTuning) {
        let azimuth = rng.random_range(0.0..TAU);
        let speed = rng
            .random_range(tuning.min_speed..=tuning.max_speed)
            .round();
        self.target = Vec3::new(azimuth.cos(), 0.0, azimuth.sin()) * speed;
        log::debug!("Wind changing to {:?} at {}", self.target.normalize_or_zero(), speed);
    }

    /// Jump straight to the target (round start)
    pub fn settle(&mut self) {
        let speed = self.target.length();
        if speed > 1e-6 {
            self.direction = self.target / speed;
        }
        self.speed = speed;
    }

    /// Ease the published wind toward the target by `blend_rate`
    pub fn step(&mut self, blend_rate: f32) {
        let velocity = (self.direction * self.speed).lerp(self.target, blend_rate);
        let speed = velocity.length();
        if speed > 1e-6 {
            self.direction = velocity / speed;
        }
        self.speed = speed;
    }

    #[inline]
    pub fn velocity(&self) -> Vec3 {
        self.direction * self.speed
    }

    /// Force on an arrow, scaled by the shared wind force factor
    #[inline]
    pub fn force(&self, factor: f32) -> Vec3 {
        self.velocity() * factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_calm_has_no_force() {
        assert_eq!(WindField::calm().force(3.0), Vec3::ZERO);
    }

    #[test]
    fn test_regenerate_is_horizontal_and_whole() {
        let tuning = WindTuning::default();
        let mut rng = Pcg32::seed_from_u64(9);
        let mut wind = WindField::calm();
        for _ in 0..100 {
            wind.regenerate(&mut rng, &tuning);
            let speed = wind.target.length();
            assert!(wind.target.y.abs() < 1e-6);
            assert!((speed - speed.round()).abs() < 1e-3);
            assert!(speed <= tuning.max_speed + 1e-3);
        }
    }

    #[test]
    fn test_step_converges_without_jumps() {
        let mut wind = WindField::calm();
        wind.target = Vec3::new(0.0, 0.0, 4.0);
        let mut last = wind.velocity();
        for _ in 0..600 {
            wind.step(0.02);
            let v = wind.velocity();
            // Each tick moves at most 2% of the remaining gap
            assert!((v - last).length() <= 4.0 * 0.02 + 1e-4);
            last = v;
        }
        assert!((wind.velocity() - wind.target).length() < 0.01);
        assert!((wind.direction - Vec3::Z).length() < 1e-3);
    }

    #[test]
    fn test_direction_kept_when_wind_dies() {
        let mut wind = WindField::steady(Vec3::Z, 2.0);
        wind.target = Vec3::ZERO;
        wind.step(1.0);
        assert_eq!(wind.speed, 0.0);
        assert_eq!(wind.direction, Vec3::Z);
    }

    #[test]
    fn test_settle_jumps_to_target() {
        let mut wind = WindField::calm();
        wind.target = Vec3::new(0.0, 0.0, -3.0);
        wind.settle();
        assert_eq!(wind.speed, 3.0);
        assert!((wind.direction - Vec3::NEG_Z).length() < 1e-6);
    }

    #[test]
    fn test_force_scales() {
        let wind = WindField::steady(Vec3::new(3.0, 0.0, 0.0), 2.0);
        assert!((wind.force(0.5) - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-6);
    }
}
