//! Barrier panels drifting around the origin
//!
//! Each panel lives on its own radial band and wanders along the shell:
//! its azimuth drifts at a constant rate while its polar angle oscillates
//! with a sine of the simulated time, clamped to the spawn band.

use glam::{Affine3A, Quat, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::placement::place_barrier;
use super::spherical::{Spherical, panel_orientation};
use crate::tuning::{BarrierTuning, ShellRegion};
use crate::wrap_angle;

/// Per-barrier motion parameters, fixed for the barrier's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarrierMotion {
    /// Azimuth change per tick (radians, signed)
    pub theta_delta: f32,
    /// Angular frequency of the phi oscillation (per simulated ms)
    pub phi_period: f32,
    /// Amplitude of the per-tick phi change (radians, signed)
    pub phi_scale: f32,
}

impl BarrierMotion {
    /// Draw each parameter from [0.5, 1.5] × its base, with a random sign on
    /// the drift and the oscillation
    pub fn random<R: Rng + ?Sized>(rng: &mut R, tuning: &BarrierTuning) -> Self {
        let theta_sign = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
        let phi_sign = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
        Self {
            theta_delta: rng.random_range(tuning.base_theta * 0.5..=tuning.base_theta * 1.5)
                * theta_sign,
            phi_period: rng
                .random_range(tuning.base_phi_period * 0.5..=tuning.base_phi_period * 1.5),
            phi_scale: rng.random_range(tuning.base_phi_scale * 0.5..=tuning.base_phi_scale * 1.5)
                * phi_sign,
        }
    }
}

/// A barrier panel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Barrier {
    pub index: usize,
    /// Authoritative pose on the shell
    pub spherical: Spherical,
    /// Cached cartesian centre (derived from `spherical`)
    pub position: Vec3,
    /// Maps panel-local (width, height, normal) axes to world
    pub orientation: Quat,
    pub motion: BarrierMotion,
    /// Hidden panels still collide; revealing only affects rendering
    pub revealed: bool,
    pub hits: u32,
}

impl Barrier {
    pub fn new(index: usize, spherical: Spherical, motion: BarrierMotion) -> Self {
        let mut barrier = Self {
            index,
            spherical,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            motion,
            revealed: false,
            hits: 0,
        };
        barrier.sync_pose();
        barrier
    }

    /// Create barrier `index` at a random spot in its radial band
    pub fn spawn<R: Rng + ?Sized>(rng: &mut R, index: usize, tuning: &BarrierTuning) -> Self {
        let spherical = place_barrier(rng, &tuning.spawn, index, tuning.count);
        let motion = BarrierMotion::random(rng, tuning);
        Self::new(index, spherical, motion)
    }

    /// Recompute cartesian position and facing from the spherical pose.
    ///
    /// The panel normal is the radial direction, so a pure azimuth drift of
    /// `theta_delta` rotates the panel by the same angle about +Y.
    fn sync_pose(&mut self) {
        self.position = self.spherical.to_cartesian();
        self.orientation = panel_orientation(self.spherical.radial());
    }

    /// Advance one tick at simulated time `sim_time_ms`
    pub fn step(&mut self, sim_time_ms: f32, region: &ShellRegion) {
        let m = self.motion;
        self.spherical.theta = wrap_angle(self.spherical.theta + m.theta_delta);
        let phi = self.spherical.phi + (sim_time_ms * m.phi_period).sin() * m.phi_scale;
        self.spherical.phi = phi.clamp(region.min_phi, region.max_phi);
        self.sync_pose();
    }

    /// Outward facing normal (origin → panel centre)
    #[inline]
    pub fn normal(&self) -> Vec3 {
        self.orientation * Vec3::Z
    }

    /// Panel-local to world transform
    pub fn transform(&self) -> Affine3A {
        Affine3A::from_rotation_translation(self.orientation, self.position)
    }

    /// Record a hit; returns true on the 0 → 1 transition
    pub fn register_hit(&mut self) -> bool {
        self.hits += 1;
        let first = self.hits == 1;
        if first {
            self.revealed = true;
        }
        first
    }

    pub fn reveal(&mut self) {
        self.revealed = true;
    }

    pub fn conceal(&mut self) {
        self.revealed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn fixed_barrier(phi: f32) -> Barrier {
        Barrier::new(
            0,
            Spherical::new(25.0, phi, 0.0),
            BarrierMotion {
                theta_delta: 0.01,
                phi_period: 0.001,
                phi_scale: 0.001,
            },
        )
    }

    #[test]
    fn test_phi_unchanged_at_time_zero() {
        let region = BarrierTuning::default().spawn;
        let mut barrier = fixed_barrier(region.min_phi);
        barrier.step(0.0, &region);
        assert_eq!(barrier.spherical.phi, region.min_phi);
        assert!((barrier.spherical.theta - 0.01).abs() < 1e-6);
    }

    #[test]
    fn test_phi_clamped_at_min_when_sine_negative() {
        let region = BarrierTuning::default().spawn;
        let mut barrier = fixed_barrier(region.min_phi);
        // sin(4000 * 0.001) = sin(4) < 0
        assert!((4000.0f32 * 0.001).sin() < 0.0);
        for _ in 0..50 {
            barrier.step(4000.0, &region);
            assert!(barrier.spherical.phi >= region.min_phi);
        }
        assert_eq!(barrier.spherical.phi, region.min_phi);
    }

    #[test]
    fn test_phi_clamped_at_max() {
        let region = BarrierTuning::default().spawn;
        let mut barrier = fixed_barrier(region.max_phi);
        // sin(1500 * 0.001) ≈ 1
        barrier.step(1500.0, &region);
        assert_eq!(barrier.spherical.phi, region.max_phi);
    }

    #[test]
    fn test_theta_wraps() {
        let region = BarrierTuning::default().spawn;
        let mut barrier = Barrier::new(
            0,
            Spherical::new(25.0, 1.0, std::f32::consts::TAU - 0.005),
            BarrierMotion {
                theta_delta: 0.01,
                phi_period: 0.0,
                phi_scale: 0.0,
            },
        );
        barrier.step(0.0, &region);
        assert!(barrier.spherical.theta >= 0.0 && barrier.spherical.theta < 0.01);
    }

    #[test]
    fn test_faces_origin_after_step() {
        let region = BarrierTuning::default().spawn;
        let mut barrier = fixed_barrier(1.0);
        for tick in 0..100 {
            barrier.step(tick as f32 * 16.0, &region);
            let radial = barrier.position.normalize();
            assert!((barrier.normal() - radial).length() < 1e-4);
            assert!((barrier.position.length() - 25.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_register_hit_reveals_once() {
        let mut barrier = fixed_barrier(1.0);
        assert!(!barrier.revealed);
        assert!(barrier.register_hit());
        assert!(barrier.revealed);
        assert!(!barrier.register_hit());
        assert_eq!(barrier.hits, 2);
    }

    #[test]
    fn test_random_motion_ranges() {
        let tuning = BarrierTuning::default();
        let mut rng = Pcg32::seed_from_u64(5);
        for _ in 0..200 {
            let m = BarrierMotion::random(&mut rng, &tuning);
            assert!(m.theta_delta.abs() >= 0.005 - 1e-7 && m.theta_delta.abs() <= 0.015 + 1e-7);
            assert!(m.phi_period >= 0.0005 - 1e-7 && m.phi_period <= 0.0015 + 1e-7);
            assert!(m.phi_scale.abs() >= 0.0005 - 1e-7 && m.phi_scale.abs() <= 0.0015 + 1e-7);
        }
    }

    proptest! {
        #[test]
        fn prop_phi_stays_in_band(seed in any::<u64>(), ticks in 1usize..400) {
            let tuning = BarrierTuning::default();
            let mut rng = Pcg32::seed_from_u64(seed);
            let mut barrier = Barrier::spawn(&mut rng, (seed % 10) as usize, &tuning);
            for tick in 0..ticks {
                barrier.step(tick as f32 * 1000.0 / 60.0, &tuning.spawn);
                prop_assert!(barrier.spherical.phi >= tuning.spawn.min_phi);
                prop_assert!(barrier.spherical.phi <= tuning.spawn.max_phi);
            }
        }
    }
}
