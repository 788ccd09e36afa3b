//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by slot index / entity ID)
//! - No rendering or platform dependencies

pub mod arrow;
pub mod barrier;
pub mod clock;
pub mod collision;
pub mod decal;
pub mod placement;
pub mod schedule;
pub mod spherical;
pub mod state;
pub mod target;
pub mod tick;
pub mod wind;

pub use arrow::{Arrow, FireCommand};
pub use barrier::{Barrier, BarrierMotion};
pub use clock::SimClock;
pub use collision::{COLLISION_TESTS, Collision, CollisionTest, CollisionWorld, Contact, Hit, resolve};
pub use decal::{Decal, DecalVertex, Surface, SurfaceKind, SurfaceMesh};
pub use placement::{Placement, place_barrier, place_target};
pub use schedule::{Job, Scheduler};
pub use spherical::Spherical;
pub use state::{GameState, HitEvent, HitKind, RemovalReason, RoundPhase, RoundStats, SimEvent};
pub use target::{RingHit, Target, TargetId, TargetPool};
pub use tick::{TickInput, tick};
pub use wind::WindField;
