//! Spherical coordinates for objects placed on shells around the origin
//!
//! A position is described by:
//! - radius: distance from the scene origin
//! - phi: polar angle measured down from +Y
//! - theta: azimuth around +Y, measured from +Z toward +X, kept in [0, 2π)

use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::{cartesian_to_spherical, spherical_to_cartesian, wrap_angle};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spherical {
    pub radius: f32,
    pub phi: f32,
    pub theta: f32,
}

impl Spherical {
    pub fn new(radius: f32, phi: f32, theta: f32) -> Self {
        Self {
            radius,
            phi,
            theta: wrap_angle(theta),
        }
    }

    pub fn from_cartesian(pos: Vec3) -> Self {
        let (radius, phi, theta) = cartesian_to_spherical(pos);
        Self { radius, phi, theta }
    }

    #[inline]
    pub fn to_cartesian(&self) -> Vec3 {
        spherical_to_cartesian(self.radius, self.phi, self.theta)
    }

    /// Unit vector from the origin toward this point
    #[inline]
    pub fn radial(&self) -> Vec3 {
        spherical_to_cartesian(1.0, self.phi, self.theta)
    }
}

/// Orthonormal frame for a flat panel whose normal is `normal`.
///
/// Returns `(right, up, normal)`: `right` is horizontal, `up` completes a
/// right-handed frame. Falls back to +X as `right` when the normal is
/// vertical.
pub fn panel_axes(normal: Vec3) -> (Vec3, Vec3, Vec3) {
    let n = normal.normalize_or_zero();
    let n = if n == Vec3::ZERO { Vec3::Z } else { n };
    let mut right = Vec3::Y.cross(n);
    if right.length_squared() < 1e-8 {
        right = Vec3::X;
    }
    let right = right.normalize();
    let up = n.cross(right);
    (right, up, n)
}

/// Rotation that maps local (X, Y, Z) onto the panel frame of `normal`
pub fn panel_orientation(normal: Vec3) -> Quat {
    let (right, up, n) = panel_axes(normal);
    Quat::from_mat3(&Mat3::from_cols(right, up, n))
}
