//! Round state and the events it emits
//!
//! Everything a round needs to replay deterministically lives here: the
//! seeded RNG, tuning, entity lists, the wind and the job scheduler.

use std::collections::VecDeque;

use glam::{Quat, Vec3};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::arrow::{Arrow, FireCommand};
use super::barrier::Barrier;
use super::collision::{Contact, Hit};
use super::decal::{self, Decal, Surface, SurfaceKind, SurfaceMesh};
use super::schedule::{Job, Scheduler};
use super::target::{TargetId, TargetPool};
use super::wind::WindField;
use crate::consts::*;
use crate::tuning::Tuning;

/// Current phase of the round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    /// Firing allowed, timers running
    Playing,
    /// Time is up; in-flight arrows still resolve
    Ended,
}

/// What a hit struck, as reported to the score layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HitKind {
    Ground,
    Target { id: TargetId, ring: u32 },
    Barrier { index: usize, first_hit: bool },
    Dome,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitEvent {
    /// Arrow id
    pub arrow: u32,
    pub kind: HitKind,
    pub score: i32,
    pub position: Vec3,
    /// Colour of the arrow that scored
    pub color: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovalReason {
    Hit,
    Expired,
}

/// Everything observable that happened during a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    Hit(HitEvent),
    Decal(Decal),
    TargetSpawned {
        id: TargetId,
        position: Vec3,
        relaxed: bool,
    },
    TargetRemoved {
        id: TargetId,
        reason: RemovalReason,
    },
    WindChanged {
        direction: Vec3,
        speed: f32,
    },
    ArrowSpawned {
        id: u32,
        color: u32,
    },
    RoundEnded {
        score: i32,
    },
}

/// Running totals for the round
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundStats {
    pub arrows_fired: u32,
    pub target_hits: u32,
    pub barrier_hits: u32,
    pub barriers_revealed: u32,
    pub ground_hits: u32,
    pub dome_hits: u32,
    pub targets_spawned: u32,
    pub targets_expired: u32,
}

/// Decal-receiving geometry, built once from tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneMeshes {
    pub ground: SurfaceMesh,
    pub barrier: SurfaceMesh,
    pub dome: SurfaceMesh,
}

impl SceneMeshes {
    pub fn from_tuning(tuning: &Tuning) -> Self {
        let s = &tuning.scene;
        let b = &tuning.barrier;
        Self {
            ground: SurfaceMesh::cuboid(Vec3::new(
                s.ground_size * 0.5,
                s.ground_thickness * 0.5,
                s.ground_size * 0.5,
            )),
            barrier: SurfaceMesh::cuboid(Vec3::new(b.width * 0.5, b.height * 0.5, b.thickness * 0.5)),
            dome: SurfaceMesh::uv_sphere(s.dome_radius, s.dome_segments),
        }
    }
}

/// Complete round state (deterministic from seed and inputs)
#[derive(Debug, Clone)]
pub struct GameState {
    /// Round seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    pub tuning: Tuning,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub phase: RoundPhase,
    pub score: i32,
    pub stats: RoundStats,
    /// The arrow waiting to be fired
    pub nocked: Arrow,
    /// Fired arrows still in flight (sorted by id)
    pub arrows: Vec<Arrow>,
    /// Collided arrows, oldest first, capped at `MAX_SPENT_ARROWS`
    pub spent: VecDeque<Arrow>,
    pub targets: TargetPool,
    /// Indexed by `Barrier::index`
    pub barriers: Vec<Barrier>,
    pub wind: WindField,
    pub scheduler: Scheduler,
    pub meshes: SceneMeshes,
    /// Events raised outside `tick` (round setup), flushed by the next tick
    pub(crate) events: Vec<SimEvent>,
    next_id: u32,
}

impl GameState {
    /// Set up a round: barriers (hidden), the nocked arrow, the first
    /// target and wind, and the round timers.
    ///
    /// A tuning that fails validation is replaced by the defaults.
    pub fn new(seed: u64, tuning: Tuning) -> Self {
        let tuning = match tuning.validate() {
            Ok(()) => tuning,
            Err(e) => {
                log::warn!("Using default tuning: {}", e);
                Tuning::default()
            }
        };
        let mut rng = Pcg32::seed_from_u64(seed);

        let barriers: Vec<Barrier> = (0..tuning.barrier.count)
            .map(|index| Barrier::spawn(&mut rng, index, &tuning.barrier))
            .collect();
        for b in &barriers {
            log::debug!(
                "Barrier {} at r={:.2} phi={:.3} theta={:.3}",
                b.index,
                b.spherical.radius,
                b.spherical.phi,
                b.spherical.theta
            );
        }

        let camera = tuning.scene.camera_position;
        let placeholder = Arrow::spawn(0, camera, &tuning.arrow, 0);

        let mut state = Self {
            seed,
            rng,
            targets: TargetPool::new(tuning.target.pool_size),
            meshes: SceneMeshes::from_tuning(&tuning),
            tuning,
            time_ticks: 0,
            phase: RoundPhase::Playing,
            score: 0,
            stats: RoundStats::default(),
            nocked: placeholder,
            arrows: Vec::new(),
            spent: VecDeque::new(),
            barriers,
            wind: WindField::calm(),
            scheduler: Scheduler::new(),
            events: Vec::new(),
            next_id: 1,
        };

        state.nock_arrow();
        state.spawn_target();
        state.change_wind();
        state.wind.settle();

        let t = &state.tuning;
        let (spawn_every, wind_every, limit) =
            (t.target.spawn_interval, t.wind.change_interval, t.scene.time_limit);
        state.scheduler.schedule_in(0, spawn_every, Job::SpawnTarget);
        state.scheduler.schedule_in(0, wind_every, Job::ChangeWind);
        if limit > 0.0 {
            state.scheduler.schedule_in(0, limit, Job::EndRound);
        }

        log::info!(
            "Round started (seed {}, {} barriers, {} target slots)",
            seed,
            state.barriers.len(),
            state.targets.capacity()
        );
        state
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Simulated time in milliseconds (drives barrier oscillation)
    #[inline]
    pub fn sim_time_ms(&self) -> f32 {
        self.time_ticks as f32 * SIM_DT * 1000.0
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.phase == RoundPhase::Playing
    }

    /// Replace the nocked arrow with a fresh one in a random colour
    fn nock_arrow(&mut self) {
        let id = self.next_entity_id();
        let color = ARROW_COLORS[self.rng.random_range(0..ARROW_COLORS.len())];
        self.nocked = Arrow::spawn(id, self.tuning.scene.camera_position, &self.tuning.arrow, color);
        self.events.push(SimEvent::ArrowSpawned { id, color });
    }

    /// Loose the nocked arrow. Returns false if the shot was ignored
    /// (round over, or no usable direction).
    pub fn fire(&mut self, command: FireCommand) -> bool {
        if !self.is_playing() {
            return false;
        }
        let Some(impulse) = command.impulse(&self.tuning.arrow) else {
            log::debug!("Ignoring fire command with zero direction");
            return false;
        };

        let mut arrow = self.nocked.clone();
        arrow.fire(impulse);
        log::debug!("Arrow {} fired with {:.0}", arrow.id, impulse.length());
        self.arrows.push(arrow);
        self.stats.arrows_fired += 1;
        self.nock_arrow();
        true
    }

    /// Put a new target on the shell if a slot is free
    pub fn spawn_target(&mut self) -> Option<TargetId> {
        let camera = self.tuning.scene.camera_position;
        let (id, placement) =
            self.targets
                .spawn(&mut self.rng, &self.tuning.target, camera, self.time_ticks)?;

        self.stats.targets_spawned += 1;
        self.events.push(SimEvent::TargetSpawned {
            id,
            position: placement.position,
            relaxed: placement.relaxed,
        });
        if let Some(lifetime) = self.tuning.target.lifetime {
            self.scheduler
                .schedule_in(self.time_ticks, lifetime, Job::ExpireTarget(id));
        }
        Some(id)
    }

    fn change_wind(&mut self) {
        self.wind.regenerate(&mut self.rng, &self.tuning.wind);
        let speed = self.wind.target.length();
        self.events.push(SimEvent::WindChanged {
            direction: self.wind.target.normalize_or(self.wind.direction),
            speed,
        });
    }

    /// Execute one scheduled job
    pub fn run_job(&mut self, job: Job) {
        let now = self.time_ticks;
        match job {
            Job::SpawnTarget => {
                self.spawn_target();
                let every = self.tuning.target.spawn_interval;
                self.scheduler.schedule_in(now, every, Job::SpawnTarget);
            }
            Job::RespawnTarget => {
                self.spawn_target();
            }
            Job::ExpireTarget(id) => {
                // A stale generation means the target was already consumed
                if self.targets.release(id).is_some() {
                    self.stats.targets_expired += 1;
                    self.events.push(SimEvent::TargetRemoved {
                        id,
                        reason: RemovalReason::Expired,
                    });
                }
            }
            Job::ChangeWind => {
                self.change_wind();
                let every = self.tuning.wind.change_interval;
                self.scheduler.schedule_in(now, every, Job::ChangeWind);
            }
            Job::EndRound => self.end_round(),
        }
    }

    /// Finish the round: reveal every barrier, stop firing, cancel timers.
    /// Idempotent.
    pub fn end_round(&mut self) {
        if !self.is_playing() {
            return;
        }
        self.phase = RoundPhase::Ended;
        for barrier in &mut self.barriers {
            barrier.reveal();
        }
        self.scheduler.cancel_all();
        self.events.push(SimEvent::RoundEnded { score: self.score });
        log::info!(
            "Round ended: score {} ({} arrows, {} target hits)",
            self.score,
            self.stats.arrows_fired,
            self.stats.target_hits
        );
    }

    /// Apply the world-side effects of a resolved hit and emit its events
    pub fn apply_hit(&mut self, arrow: &Arrow, hit: &Hit) {
        let (kind, score) = match hit.contact {
            Contact::Ground => {
                self.stats.ground_hits += 1;
                (HitKind::Ground, 0)
            }
            Contact::Target { id, ring } => {
                if self.targets.release(id).is_some() {
                    self.events.push(SimEvent::TargetRemoved {
                        id,
                        reason: RemovalReason::Hit,
                    });
                    if self.is_playing() {
                        let delay = self.tuning.target.respawn_delay;
                        self.scheduler
                            .schedule_in(self.time_ticks, delay, Job::RespawnTarget);
                    }
                }
                self.stats.target_hits += 1;
                (
                    HitKind::Target {
                        id,
                        ring: ring.ring,
                    },
                    ring.score as i32,
                )
            }
            Contact::Barrier { index } => {
                let first_hit = self
                    .barriers
                    .get_mut(index)
                    .is_some_and(|b| b.register_hit());
                self.stats.barrier_hits += 1;
                let score = if first_hit {
                    self.stats.barriers_revealed += 1;
                    self.tuning.barrier.reveal_score
                } else {
                    0
                };
                (HitKind::Barrier { index, first_hit }, score)
            }
            Contact::Dome => {
                self.stats.dome_hits += 1;
                (HitKind::Dome, 0)
            }
        };

        self.score += score;
        log::debug!(
            "Arrow {} scored {} on {:?} (total {})",
            arrow.id,
            score,
            kind,
            self.score
        );
        self.events.push(SimEvent::Hit(HitEvent {
            arrow: arrow.id,
            kind,
            score,
            position: arrow.position,
            color: arrow.color,
        }));

        if let Some(decal) = self.splat(hit, arrow.color) {
            self.events.push(SimEvent::Decal(decal));
        }
    }

    /// Build the splatter for a hit on the ground, a barrier or the dome
    fn splat(&mut self, hit: &Hit, color: u32) -> Option<Decal> {
        let size = self.tuning.decal.size;
        let s = &self.tuning.scene;
        let surface = match hit.contact {
            Contact::Ground => Surface {
                kind: SurfaceKind::Ground,
                mesh: &self.meshes.ground,
                rotation: Quat::IDENTITY,
                translation: Vec3::new(0.0, s.ground_level - s.ground_thickness * 0.5, 0.0),
                double_sided: false,
            },
            Contact::Barrier { index } => {
                let barrier = self.barriers.get(index)?;
                Surface {
                    kind: SurfaceKind::Barrier(index),
                    mesh: &self.meshes.barrier,
                    rotation: barrier.orientation,
                    translation: barrier.position,
                    double_sided: false,
                }
            }
            Contact::Dome => Surface {
                kind: SurfaceKind::Dome,
                mesh: &self.meshes.dome,
                rotation: Quat::IDENTITY,
                translation: Vec3::ZERO,
                double_sided: true,
            },
            // The target is consumed with the hit
            Contact::Target { .. } => return None,
        };

        let orientation = match hit.contact {
            Contact::Ground => decal::ground_orientation(),
            _ => Quat::from_rotation_arc(Vec3::Z, hit.normal),
        };
        let decal = decal::project(&mut self.rng, &surface, hit.point, orientation, size, color);
        (!decal.is_empty()).then_some(decal)
    }

    /// Move collided arrows from the in-flight list to the spent list
    pub fn retire_arrows(&mut self) {
        let (spent, live): (Vec<Arrow>, Vec<Arrow>) =
            self.arrows.drain(..).partition(|a| a.has_collided);
        self.arrows = live;
        for arrow in spent {
            self.spent.push_back(arrow);
            if self.spent.len() > MAX_SPENT_ARROWS {
                self.spent.pop_front();
            }
        }
    }

    /// Take the events buffered since the last call
    pub fn take_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::barrier::BarrierMotion;
    use crate::sim::spherical::Spherical;
    use crate::tuning::WindTuning;

    #[test]
    fn test_invalid_tuning_falls_back_to_defaults() {
        let mut tuning = Tuning::default();
        tuning.wind.min_speed = 10.0;
        tuning.wind.max_speed = 2.0;
        let state = GameState::new(3, tuning);
        assert_eq!(state.tuning.wind.min_speed, WindTuning::default().min_speed);
        assert_eq!(state.tuning.wind.max_speed, WindTuning::default().max_speed);
        assert!(state.wind.speed <= state.tuning.wind.max_speed);
    }

    #[test]
    fn test_new_round_setup() {
        let mut state = GameState::new(42, Tuning::default());
        assert_eq!(state.phase, RoundPhase::Playing);
        assert_eq!(state.barriers.len(), 10);
        assert!(state.barriers.iter().all(|b| !b.revealed));
        assert_eq!(state.targets.in_use(), 1);
        assert!(!state.nocked.fired);
        assert!(ARROW_COLORS.contains(&state.nocked.color));
        assert_eq!(state.scheduler.len(), 3);

        let events = state.take_events();
        assert!(events.iter().any(|e| matches!(e, SimEvent::ArrowSpawned { .. })));
        assert!(events.iter().any(|e| matches!(e, SimEvent::TargetSpawned { .. })));
        assert!(events.iter().any(|e| matches!(e, SimEvent::WindChanged { .. })));
        assert!(state.take_events().is_empty());
    }

    #[test]
    fn test_barriers_in_disjoint_bands() {
        let state = GameState::new(3, Tuning::default());
        let band = state.tuning.barrier.band_width();
        let inner = state.tuning.barrier.spawn.inner_radius;
        for b in &state.barriers {
            let lo = inner + band * b.index as f32;
            assert!(b.spherical.radius >= lo - 1e-4 && b.spherical.radius <= lo + band + 1e-4);
        }
    }

    #[test]
    fn test_same_seed_same_layout() {
        let a = GameState::new(11, Tuning::default());
        let b = GameState::new(11, Tuning::default());
        for (x, y) in a.barriers.iter().zip(&b.barriers) {
            assert_eq!(x.position, y.position);
            assert_eq!(x.motion, y.motion);
        }
        assert_eq!(a.targets.active_positions(), b.targets.active_positions());
        assert_eq!(a.wind.target, b.wind.target);
    }

    #[test]
    fn test_fire_swaps_in_new_arrow() {
        let mut state = GameState::new(1, Tuning::default());
        state.take_events();
        let first = state.nocked.id;
        assert!(state.fire(FireCommand::new(Vec3::new(0.0, 0.3, 1.0), 2000.0)));
        assert_eq!(state.arrows.len(), 1);
        assert_eq!(state.arrows[0].id, first);
        assert!(state.arrows[0].fired);
        assert_ne!(state.nocked.id, first);
        assert!(!state.nocked.fired);
        assert_eq!(state.stats.arrows_fired, 1);
        let events = state.take_events();
        assert!(matches!(events.as_slice(), [SimEvent::ArrowSpawned { .. }]));
    }

    #[test]
    fn test_fire_zero_direction_ignored() {
        let mut state = GameState::new(1, Tuning::default());
        let nocked = state.nocked.id;
        assert!(!state.fire(FireCommand::new(Vec3::ZERO, 2000.0)));
        assert!(state.arrows.is_empty());
        assert_eq!(state.nocked.id, nocked);
    }

    #[test]
    fn test_end_round_is_idempotent() {
        let mut state = GameState::new(5, Tuning::default());
        state.take_events();
        state.end_round();
        state.end_round();
        assert_eq!(state.phase, RoundPhase::Ended);
        assert!(state.barriers.iter().all(|b| b.revealed));
        assert!(state.scheduler.is_empty());
        let ended = state
            .take_events()
            .into_iter()
            .filter(|e| matches!(e, SimEvent::RoundEnded { .. }))
            .count();
        assert_eq!(ended, 1);
        assert!(!state.fire(FireCommand::new(Vec3::Z, 2000.0)));
    }

    #[test]
    fn test_barrier_hit_scores_once() {
        let mut state = GameState::new(9, Tuning::default());
        state.barriers = vec![Barrier::new(
            0,
            Spherical::new(25.0, 1.2, 0.0),
            BarrierMotion {
                theta_delta: 0.0,
                phi_period: 0.0,
                phi_scale: 0.0,
            },
        )];
        let n = state.barriers[0].normal();
        let hit = Hit {
            contact: Contact::Barrier { index: 0 },
            rest: state.barriers[0].position - n,
            point: state.barriers[0].position,
            normal: -n,
        };
        let arrow = state.nocked.clone();
        state.take_events();

        state.apply_hit(&arrow, &hit);
        state.apply_hit(&arrow, &hit);
        assert_eq!(state.score, state.tuning.barrier.reveal_score);
        assert_eq!(state.barriers[0].hits, 2);
        assert!(state.barriers[0].revealed);

        let events = state.take_events();
        let firsts: Vec<bool> = events
            .iter()
            .filter_map(|e| match e {
                SimEvent::Hit(HitEvent {
                    kind: HitKind::Barrier { first_hit, .. },
                    ..
                }) => Some(*first_hit),
                _ => None,
            })
            .collect();
        assert_eq!(firsts, vec![true, false]);
        let decals: Vec<&Decal> = events
            .iter()
            .filter_map(|e| match e {
                SimEvent::Decal(d) => Some(d),
                _ => None,
            })
            .collect();
        assert_eq!(decals.len(), 2);
        assert!(decals.iter().all(|d| d.surface == SurfaceKind::Barrier(0)));
    }

    #[test]
    fn test_spent_arrows_capped() {
        let mut state = GameState::new(2, Tuning::default());
        for i in 0..(MAX_SPENT_ARROWS + 10) {
            let mut arrow = Arrow::nocked(i as u32, Vec3::ZERO, Vec3::Z, 1.0, 0);
            arrow.fired = true;
            arrow.freeze();
            state.arrows.push(arrow);
            state.retire_arrows();
        }
        assert!(state.arrows.is_empty());
        assert_eq!(state.spent.len(), MAX_SPENT_ARROWS);
        assert_eq!(state.spent.front().map(|a| a.id), Some(10));
    }
}
