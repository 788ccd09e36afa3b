//! Dome Archery - simulation core of a first-person archery game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (arrows, collisions, targets, barriers, wind)
//! - `tuning`: Data-driven game balance

pub mod sim;
pub mod tuning;

pub use tuning::{Tuning, TuningError};

use glam::Vec3;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz logical tick)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Longest frame the clock will accept before clamping (seconds)
    pub const MAX_FRAME_TIME: f32 = 0.1;

    /// Number of collided arrows kept around for rendering
    pub const MAX_SPENT_ARROWS: usize = 64;

    /// Arrow colours (0xRRGGBB), picked at random per arrow
    pub const ARROW_COLORS: [u32; 6] = [
        0xE63946, // red
        0xF4A261, // orange
        0x2A9D8F, // teal
        0x8338EC, // purple
        0x3A86FF, // blue
        0xFFBE0B, // yellow
    ];

    /// Target ring colours, outer to inner (each colour spans two rings)
    pub const RING_COLORS: [u32; 5] = [
        0xFFFFFF, // white
        0x221E20, // black
        0x62BDEC, // blue
        0xED242C, // red
        0xFFFF3D, // yellow
    ];
}

/// Wrap an azimuth into [0, 2π)
#[inline]
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(std::f32::consts::TAU);
    // rem_euclid can return TAU for tiny negative inputs
    if wrapped >= std::f32::consts::TAU {
        0.0
    } else {
        wrapped
    }
}

/// Convert spherical (radius, phi, theta) to cartesian.
///
/// `phi` is the polar angle measured down from +Y, `theta` the azimuth
/// around +Y measured from +Z toward +X.
#[inline]
pub fn spherical_to_cartesian(radius: f32, phi: f32, theta: f32) -> Vec3 {
    let sin_phi = phi.sin();
    Vec3::new(
        radius * sin_phi * theta.sin(),
        radius * phi.cos(),
        radius * sin_phi * theta.cos(),
    )
}

/// Convert cartesian to spherical (radius, phi, theta)
#[inline]
pub fn cartesian_to_spherical(pos: Vec3) -> (f32, f32, f32) {
    let radius = pos.length();
    if radius == 0.0 {
        return (0.0, 0.0, 0.0);
    }
    let theta = wrap_angle(pos.x.atan2(pos.z));
    let phi = (pos.y / radius).clamp(-1.0, 1.0).acos();
    (radius, phi, theta)
}
