//! Arrow collision tests
//!
//! The tests form an ordered table evaluated until the first hit: floor,
//! target, barrier, dome. Each test only reads the world; `resolve` freezes
//! the arrow and the caller applies the world-side effects (consuming a
//! target, revealing a barrier) from the returned `Hit`.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::arrow::Arrow;
use super::barrier::Barrier;
use super::target::{RingHit, TargetId, TargetPool};
use crate::tuning::Tuning;

/// Read-only view of everything an arrow can strike
#[derive(Debug, Clone, Copy)]
pub struct CollisionWorld<'a> {
    pub camera: Vec3,
    pub tuning: &'a Tuning,
    pub targets: &'a TargetPool,
    pub barriers: &'a [Barrier],
}

impl<'a> CollisionWorld<'a> {
    pub fn new(tuning: &'a Tuning, targets: &'a TargetPool, barriers: &'a [Barrier]) -> Self {
        Self {
            camera: tuning.scene.camera_position,
            tuning,
            targets,
            barriers,
        }
    }
}

/// Identifies a row of the collision table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionTest {
    Floor,
    Target,
    Barrier,
    Dome,
}

/// What the arrow struck
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Contact {
    Ground,
    Target { id: TargetId, ring: RingHit },
    Barrier { index: usize },
    Dome,
}

/// A resolved hit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub contact: Contact,
    /// Where the arrow comes to rest
    pub rest: Vec3,
    /// Point on the struck surface (decal anchor)
    pub point: Vec3,
    /// Outward normal of the struck face, pointing back toward the arrow
    pub normal: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Collision {
    Miss,
    Hit(Hit),
}

pub type CollisionFn = fn(&Arrow, &CollisionWorld) -> Collision;

/// Collision tests in priority order. The first hit wins, so an arrow can
/// never register two kinds of hit in one tick.
pub const COLLISION_TESTS: [(CollisionTest, CollisionFn); 4] = [
    (CollisionTest::Floor, test_floor),
    (CollisionTest::Target, test_targets),
    (CollisionTest::Barrier, test_barriers),
    (CollisionTest::Dome, test_dome),
];

/// Run the collision table against a live arrow.
///
/// On a hit the arrow is moved to its rest position and frozen. Arrows
/// that are unfired or already collided are ignored.
pub fn resolve(arrow: &mut Arrow, world: &CollisionWorld) -> Option<Hit> {
    if !arrow.is_live() {
        return None;
    }

    for (test, run) in COLLISION_TESTS {
        if let Collision::Hit(hit) = run(arrow, world) {
            arrow.position = hit.rest;
            arrow.freeze();
            log::debug!("Arrow {} hit {:?} at {:?}", arrow.id, test, hit.point);
            return Some(hit);
        }
    }
    None
}

/// Arrow centre below `ground + ε`: clamp it onto the ground
fn test_floor(arrow: &Arrow, world: &CollisionWorld) -> Collision {
    let ground = world.tuning.scene.ground_level;
    let eps = world.tuning.scene.epsilon;
    if arrow.position.y >= ground + eps {
        return Collision::Miss;
    }

    let mut rest = arrow.position;
    rest.y = ground + eps;
    Collision::Hit(Hit {
        contact: Contact::Ground,
        rest,
        point: Vec3::new(rest.x, ground, rest.z),
        normal: Vec3::Y,
    })
}

/// Tip inside a target's bounding sphere scores by distance from the
/// camera→centre line
fn test_targets(arrow: &Arrow, world: &CollisionWorld) -> Collision {
    let t = &world.tuning.target;
    let eps = world.tuning.scene.epsilon;
    let tip = arrow.tip(world.tuning.arrow.half_length());

    // Skip the scan unless the tip is inside the (padded) spawn shell
    let reach = t.outer_radius() + eps;
    let r = tip.length();
    if r < t.spawn.inner_radius - reach || r > t.spawn.outer_radius + reach {
        return Collision::Miss;
    }

    for (id, target) in world.targets.active() {
        if let Some(ring) = target.score_tip(tip, world.camera, t) {
            return Collision::Hit(Hit {
                contact: Contact::Target { id, ring },
                rest: arrow.position,
                point: tip,
                normal: target.normal,
            });
        }
    }
    Collision::Miss
}

/// Upper bound on tip samples per barrier sweep
const MAX_SWEEP_STEPS: u32 = 256;

/// Tip within the slab of a barrier panel and inside its face extents.
///
/// The tip is swept over the last step in strides no longer than half the
/// slab window, so a fast arrow cannot step over a panel between ticks.
fn test_barriers(arrow: &Arrow, world: &CollisionWorld) -> Collision {
    let b = &world.tuning.barrier;
    let eps = world.tuning.scene.epsilon;
    let half_len = world.tuning.arrow.half_length();

    let half_w = b.width * 0.5;
    let half_h = b.height * 0.5;
    let half_t = b.thickness * 0.5;
    let reach = Vec3::new(half_w, half_h, half_t).length() + eps;

    let from = arrow.prev_position + arrow.direction * half_len;
    let to = arrow.tip(half_len);
    let travel = from.distance(to);

    // The segment never leaves the ball of its farther end, and stays
    // within `travel` of its nearer one
    let (r0, r1) = (from.length(), to.length());
    if r0.max(r1) < b.spawn.inner_radius - reach
        || r0.min(r1) - travel > b.spawn.outer_radius + reach
    {
        return Collision::Miss;
    }

    let stride = half_t + eps;
    let steps = if travel.is_finite() && stride > 0.0 {
        ((travel / stride).ceil() as u32).clamp(1, MAX_SWEEP_STEPS)
    } else {
        1
    };

    for step in 1..=steps {
        let s = step as f32 / steps as f32;
        let tip = from.lerp(to, s);
        for barrier in world.barriers {
            if (tip.length() - barrier.spherical.radius).abs() > reach {
                continue;
            }

            let normal = barrier.normal();
            let depth = (tip - barrier.position).dot(normal);
            if depth.abs() > half_t + eps {
                continue;
            }

            let on_plane = tip - normal * depth;
            let local = on_plane - barrier.position;
            let x = local.dot(barrier.orientation * Vec3::X);
            let y = local.dot(barrier.orientation * Vec3::Y);
            if x.abs() > half_w + eps || y.abs() > half_h + eps {
                continue;
            }

            // The face the arrow came through
            let face = if arrow.direction.dot(normal) > 0.0 {
                -normal
            } else {
                normal
            };
            return Collision::Hit(Hit {
                contact: Contact::Barrier {
                    index: barrier.index,
                },
                rest: arrow.prev_position.lerp(arrow.position, s),
                point: on_plane,
                normal: face,
            });
        }
    }
    Collision::Miss
}

/// Tip reached the sky dome
fn test_dome(arrow: &Arrow, world: &CollisionWorld) -> Collision {
    let radius = world.tuning.scene.dome_radius;
    let eps = world.tuning.scene.epsilon;
    let tip = arrow.tip(world.tuning.arrow.half_length());
    if tip.length() < radius - eps {
        return Collision::Miss;
    }

    let outward = tip.normalize_or(Vec3::Y);
    Collision::Hit(Hit {
        contact: Contact::Dome,
        rest: arrow.position,
        point: outward * radius,
        normal: -outward,
    })
}
