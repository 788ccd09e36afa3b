//! Splatter decals conformed to the surface they mark
//!
//! A decal is a `size³` projector box placed at the hit point. Every
//! triangle of the struck surface is moved into projector space, clipped
//! against the six faces of the box, and re-emitted in the surface's local
//! frame, so the patch follows the real shape of the ground slab, a barrier
//! panel or the inside of the dome instead of floating above it.

use std::f32::consts::{FRAC_PI_2, TAU};

use glam::{Affine3A, Quat, Vec2, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::spherical_to_cartesian;

/// Which surface a decal belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceKind {
    Ground,
    Barrier(usize),
    Dome,
}

/// Indexed triangle mesh in a surface's local frame (CCW = front)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceMesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl SurfaceMesh {
    /// Axis-aligned box centred on the origin with flat-shaded faces
    pub fn cuboid(half_extents: Vec3) -> Self {
        // (normal, u, v) with u × v = normal
        const FACES: [(Vec3, Vec3, Vec3); 6] = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];

        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (n, u, v) in FACES {
            let centre = n * n.abs().dot(half_extents);
            let hu = u * u.abs().dot(half_extents);
            let hv = v * v.abs().dot(half_extents);
            let base = positions.len() as u32;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                positions.push(centre + hu * su + hv * sv);
                normals.push(n);
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self {
            positions,
            normals,
            indices,
        }
    }

    /// Latitude/longitude sphere with outward normals
    pub fn uv_sphere(radius: f32, segments: u32) -> Self {
        let segments = segments.max(3);
        let stride = segments + 1;
        let mut positions = Vec::with_capacity((stride * stride) as usize);
        let mut normals = Vec::with_capacity((stride * stride) as usize);

        for row in 0..=segments {
            let phi = std::f32::consts::PI * row as f32 / segments as f32;
            for col in 0..=segments {
                let theta = TAU * col as f32 / segments as f32;
                let n = spherical_to_cartesian(1.0, phi, theta);
                positions.push(n * radius);
                normals.push(n);
            }
        }

        let mut indices = Vec::with_capacity((segments * segments * 6) as usize);
        for row in 0..segments {
            for col in 0..segments {
                let a = row * stride + col;
                let b = a + stride;
                indices.extend_from_slice(&[a, b, a + 1, b, b + 1, a + 1]);
            }
        }

        Self {
            positions,
            normals,
            indices,
        }
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// A decal-receiving surface: mesh plus its rigid placement in the world
#[derive(Debug, Clone, Copy)]
pub struct Surface<'a> {
    pub kind: SurfaceKind,
    pub mesh: &'a SurfaceMesh,
    pub rotation: Quat,
    pub translation: Vec3,
    /// Accept triangles facing away from the projector too
    pub double_sided: bool,
}

impl Surface<'_> {
    #[inline]
    pub fn transform(&self) -> Affine3A {
        Affine3A::from_rotation_translation(self.rotation, self.translation)
    }
}

/// One decal vertex, in the surface's local frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecalVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

/// A splatter patch attached to a surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decal {
    pub surface: SurfaceKind,
    /// Projector centre in the surface's local frame
    pub anchor: Vec3,
    /// Projector rotation in the surface's local frame (twist included)
    pub orientation: Quat,
    /// In-plane rotation applied on top of the requested orientation
    pub twist: f32,
    pub size: f32,
    pub color: u32,
    /// Triangle list
    pub vertices: Vec<DecalVertex>,
}

impl Decal {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }
}

/// Orientation for a decal lying flat on the ground (projector Z → +Y)
#[inline]
pub fn ground_orientation() -> Quat {
    Quat::from_rotation_x(-FRAC_PI_2)
}

/// Project a decal with a random in-plane twist.
///
/// `orientation` maps projector +Z onto the outward normal of the face
/// being marked (world space).
pub fn project<R: Rng + ?Sized>(
    rng: &mut R,
    surface: &Surface,
    hit_point: Vec3,
    orientation: Quat,
    size: f32,
    color: u32,
) -> Decal {
    let twist = rng.random_range(0.0..TAU);
    project_with_twist(surface, hit_point, orientation, twist, size, color)
}

/// Clip-space vertex carried through Sutherland–Hodgman
#[derive(Debug, Clone, Copy)]
struct ClipVertex {
    position: Vec3,
    normal: Vec3,
}

impl ClipVertex {
    fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            position: self.position.lerp(other.position, t),
            normal: self.normal.lerp(other.normal, t),
        }
    }
}

/// Keep the part of `polygon` where `sign * p[axis] <= limit`
fn clip_polygon(polygon: &[ClipVertex], axis: usize, sign: f32, limit: f32) -> Vec<ClipVertex> {
    let mut out = Vec::with_capacity(polygon.len() + 2);
    let Some(&last) = polygon.last() else {
        return out;
    };

    let dist = |v: &ClipVertex| sign * v.position[axis] - limit;
    let mut prev = last;
    let mut prev_d = dist(&prev);

    for &curr in polygon {
        let curr_d = dist(&curr);
        let curr_in = curr_d <= 0.0;
        let prev_in = prev_d <= 0.0;

        if curr_in != prev_in {
            let t = prev_d / (prev_d - curr_d);
            out.push(prev.lerp(curr, t));
        }
        if curr_in {
            out.push(curr);
        }
        prev = curr;
        prev_d = curr_d;
    }
    out
}

/// Deterministic core of `project`
pub fn project_with_twist(
    surface: &Surface,
    hit_point: Vec3,
    orientation: Quat,
    twist: f32,
    size: f32,
    color: u32,
) -> Decal {
    let to_local = surface.transform().inverse();
    let anchor = to_local.transform_point3(hit_point);
    let local_orientation =
        (surface.rotation.inverse() * orientation * Quat::from_rotation_z(twist)).normalize();

    let projector = Affine3A::from_rotation_translation(local_orientation, anchor);
    let to_projector = projector.inverse();
    let facing = local_orientation * Vec3::Z;
    let half = size * 0.5;

    let mesh = surface.mesh;
    let mut vertices = Vec::new();

    for tri in mesh.indices.chunks_exact(3) {
        let [ia, ib, ic] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let (a, b, c) = (mesh.positions[ia], mesh.positions[ib], mesh.positions[ic]);

        let face = (b - a).cross(c - a);
        if face.length_squared() < 1e-12 {
            continue;
        }
        if !surface.double_sided && face.dot(facing) <= 0.0 {
            continue;
        }

        let mut polygon: Vec<ClipVertex> = [ia, ib, ic]
            .iter()
            .map(|&i| ClipVertex {
                position: to_projector.transform_point3(mesh.positions[i]),
                normal: to_projector.transform_vector3(mesh.normals[i]),
            })
            .collect();

        for axis in 0..3 {
            for sign in [1.0, -1.0] {
                polygon = clip_polygon(&polygon, axis, sign, half);
                if polygon.len() < 3 {
                    break;
                }
            }
            if polygon.len() < 3 {
                break;
            }
        }
        if polygon.len() < 3 {
            continue;
        }

        let emit = |v: &ClipVertex| DecalVertex {
            position: projector.transform_point3(v.position),
            normal: (local_orientation * v.normal).normalize_or_zero(),
            uv: Vec2::new(v.position.x / size + 0.5, v.position.y / size + 0.5),
        };
        for i in 1..polygon.len() - 1 {
            vertices.push(emit(&polygon[0]));
            vertices.push(emit(&polygon[i]));
            vertices.push(emit(&polygon[i + 1]));
        }
    }

    Decal {
        surface: surface.kind,
        anchor,
        orientation: local_orientation,
        twist,
        size,
        color,
        vertices,
    }
}
