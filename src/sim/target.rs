//! Ring targets and the fixed-size target pool
//!
//! The pool is an arena of slots plus a free list. A slot's generation is
//! bumped every time it is released, so a `TargetId` held by a stale timer
//! can never touch the target that later reuses the slot.

use glam::{Quat, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::placement::{Placement, place_target};
use super::spherical::panel_orientation;
use crate::tuning::TargetTuning;

/// Identifies one occupancy of a pool slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetId {
    pub slot: usize,
    pub generation: u32,
}

/// A ring target facing the camera
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub position: Vec3,
    /// Unit normal pointing from the target face toward the camera
    pub normal: Vec3,
    /// Maps local (X, Y, face normal) onto world
    pub orientation: Quat,
    /// Tick the target appeared on
    pub spawned_tick: u64,
}

impl Target {
    pub fn facing(position: Vec3, camera: Vec3, spawned_tick: u64) -> Self {
        let normal = (camera - position).normalize_or(Vec3::Z);
        Self {
            position,
            normal,
            orientation: panel_orientation(normal),
            spawned_tick,
        }
    }

    /// Ring and score for a tip inside this target's bounding sphere.
    ///
    /// The score depends on the tip's distance from the camera→centre line
    /// segment. Returns None outside the bounding sphere or outside the
    /// outermost ring.
    pub fn score_tip(&self, tip: Vec3, camera: Vec3, tuning: &TargetTuning) -> Option<RingHit> {
        if tip.distance(self.position) > tuning.outer_radius() {
            return None;
        }
        let offset = point_segment_distance(tip, camera, self.position);
        ring_for_distance(offset, tuning.ring_width, tuning.ring_count)
    }
}

/// Where a tip landed on the ring face
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RingHit {
    /// 0 = innermost ring
    pub ring: u32,
    pub score: u32,
    /// Distance from the centre line
    pub offset: f32,
}

/// Map a centre-line distance to a ring.
///
/// Ring `i` covers `[i·w, (i+1)·w)`, so a distance exactly on a boundary
/// belongs to the outer ring. The innermost ring scores `ring_count`, each
/// ring outward one less.
pub fn ring_for_distance(offset: f32, ring_width: f32, ring_count: u32) -> Option<RingHit> {
    if offset.is_nan() || offset < 0.0 || ring_width <= 0.0 {
        return None;
    }
    let ring = (offset / ring_width).floor();
    if ring >= ring_count as f32 {
        return None;
    }
    let ring = ring as u32;
    Some(RingHit {
        ring,
        score: ring_count - ring,
        offset,
    })
}

/// Score only (0 outside the target)
#[inline]
pub fn score_for_distance(offset: f32, ring_width: f32, ring_count: u32) -> u32 {
    ring_for_distance(offset, ring_width, ring_count).map_or(0, |hit| hit.score)
}

/// Distance from `point` to the segment `a`–`b`
pub fn point_segment_distance(point: Vec3, a: Vec3, b: Vec3) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < 1e-12 {
        return point.distance(a);
    }
    let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    point.distance(a + ab * t)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TargetSlot {
    generation: u32,
    target: Option<Target>,
}

/// Fixed-capacity arena of targets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetPool {
    slots: Vec<TargetSlot>,
    /// Available slot indices (popped from the back)
    free: Vec<usize>,
}

impl TargetPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity)
                .map(|_| TargetSlot {
                    generation: 0,
                    target: None,
                })
                .collect(),
            // Reverse so slot 0 is handed out first
            free: (0..capacity).rev().collect(),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn in_use(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.free.is_empty()
    }

    /// Active targets in slot order
    pub fn active(&self) -> impl Iterator<Item = (TargetId, &Target)> {
        self.slots.iter().enumerate().filter_map(|(slot, s)| {
            s.target.as_ref().map(|t| {
                (
                    TargetId {
                        slot,
                        generation: s.generation,
                    },
                    t,
                )
            })
        })
    }

    pub fn active_positions(&self) -> Vec<Vec3> {
        self.active().map(|(_, t)| t.position).collect()
    }

    pub fn get(&self, id: TargetId) -> Option<&Target> {
        self.slots
            .get(id.slot)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.target.as_ref())
    }

    #[inline]
    pub fn contains(&self, id: TargetId) -> bool {
        self.get(id).is_some()
    }

    /// Spawn at a sampled position that keeps the separation invariant.
    ///
    /// Returns None (and places nothing) when every slot is in use.
    pub fn spawn<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        tuning: &TargetTuning,
        camera: Vec3,
        tick: u64,
    ) -> Option<(TargetId, Placement)> {
        if self.is_full() {
            log::debug!("Target pool full ({}), spawn dropped", self.capacity());
            return None;
        }
        let active = self.active_positions();
        let placement = place_target(
            rng,
            &tuning.spawn,
            &active,
            tuning.min_dist_apart,
            tuning.max_placement_attempts,
        );
        let id = self.spawn_at(placement.position, camera, tick)?;
        Some((id, placement))
    }

    /// Spawn at an explicit position (no separation check)
    pub fn spawn_at(&mut self, position: Vec3, camera: Vec3, tick: u64) -> Option<TargetId> {
        let slot = self.free.pop()?;
        let entry = &mut self.slots[slot];
        entry.target = Some(Target::facing(position, camera, tick));
        Some(TargetId {
            slot,
            generation: entry.generation,
        })
    }

    /// Return a target's slot to the pool. Stale ids are ignored.
    pub fn release(&mut self, id: TargetId) -> Option<Target> {
        let entry = self.slots.get_mut(id.slot)?;
        if entry.generation != id.generation {
            return None;
        }
        let target = entry.target.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(id.slot);
        Some(target)
    }

    /// Release every target
    pub fn clear(&mut self) {
        let ids: Vec<TargetId> = self.active().map(|(id, _)| id).collect();
        for id in ids {
            self.release(id);
        }
    }
}
