//! Randomised placement on spherical shells
//!
//! Targets are rejection-sampled so every active pair stays at least
//! `min_dist_apart` apart. Barriers get a private radial band each, so they
//! never need rejection sampling.

use std::f32::consts::TAU;

use glam::Vec3;
use rand::Rng;

use super::spherical::Spherical;
use crate::tuning::ShellRegion;

/// Result of a target placement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Vec3,
    /// True when no candidate satisfied the separation constraint and the
    /// best-separated candidate was accepted instead
    pub relaxed: bool,
    /// Candidates drawn
    pub attempts: u32,
}

/// Uniform draw of (radius, phi, theta) inside a shell band
pub fn sample_shell<R: Rng + ?Sized>(rng: &mut R, region: &ShellRegion) -> Spherical {
    let radius = rng.random_range(region.inner_radius..=region.outer_radius);
    let phi = rng.random_range(region.min_phi..=region.max_phi);
    let theta = rng.random_range(0.0..TAU);
    Spherical::new(radius, phi, theta)
}

/// Smallest distance from `candidate` to any of `others` (infinite when empty)
fn clearance(candidate: Vec3, others: &[Vec3]) -> f32 {
    others
        .iter()
        .map(|p| p.distance(candidate))
        .fold(f32::INFINITY, f32::min)
}

/// Pick a target position at least `min_dist` from every active target.
///
/// Draws at most `max_attempts` candidates (at least one). If none clears
/// `min_dist`, the candidate with the greatest clearance is returned with
/// `relaxed = true` so a saturated shell never stalls the tick.
pub fn place_target<R: Rng + ?Sized>(
    rng: &mut R,
    region: &ShellRegion,
    active: &[Vec3],
    min_dist: f32,
    max_attempts: u32,
) -> Placement {
    let max_attempts = max_attempts.max(1);
    let mut best = Vec3::ZERO;
    let mut best_clearance = f32::NEG_INFINITY;

    for attempt in 1..=max_attempts {
        let candidate = sample_shell(rng, region).to_cartesian();
        let c = clearance(candidate, active);
        if c >= min_dist {
            return Placement {
                position: candidate,
                relaxed: false,
                attempts: attempt,
            };
        }
        if c > best_clearance {
            best = candidate;
            best_clearance = c;
        }
    }

    log::warn!(
        "Target placement relaxed after {} attempts (clearance {:.2} < {:.2})",
        max_attempts,
        best_clearance,
        min_dist
    );
    Placement {
        position: best,
        relaxed: true,
        attempts: max_attempts,
    }
}

/// Place barrier `index` of `count` inside its own radial band.
///
/// Band width is `(outer - inner) / count`, so radii of different barriers
/// are disjoint and no separation check is needed.
pub fn place_barrier<R: Rng + ?Sized>(
    rng: &mut R,
    region: &ShellRegion,
    index: usize,
    count: usize,
) -> Spherical {
    let count = count.max(1);
    let band = (region.outer_radius - region.inner_radius) / count as f32;
    let band_inner = region.inner_radius + band * index as f32;
    let radius = rng.random_range(band_inner..=band_inner + band);
    let phi = rng.random_range(region.min_phi..=region.max_phi);
    let theta = rng.random_range(0.0..TAU);
    Spherical::new(radius, phi, theta)
}
