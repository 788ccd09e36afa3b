//! Data-driven game balance
//!
//! Every gameplay constant the simulation reads lives here, grouped by the
//! component that consumes it. Defaults reproduce the shipped game; a JSON
//! file can override any subset of fields.

use std::f32::consts::{FRAC_PI_4, PI};
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors (never fatal to the game loop)
#[derive(Error, Debug)]
pub enum TuningError {
    /// JSON could not be parsed into a `Tuning`
    #[error("failed to parse tuning: {0}")]
    Parse(#[from] serde_json::Error),

    /// Tuning file could not be read
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),

    /// A value is out of its legal range
    #[error("invalid tuning value `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending field
        field: &'static str,
        /// What is wrong with it
        reason: &'static str,
    },
}

/// A spherical shell band around the scene origin.
///
/// `phi` is measured down from +Y, so `[min_phi, max_phi]` is a band that
/// never reaches straight overhead nor the horizon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShellRegion {
    pub inner_radius: f32,
    pub outer_radius: f32,
    pub min_phi: f32,
    pub max_phi: f32,
}

impl ShellRegion {
    fn validate(&self, field: &'static str) -> Result<(), TuningError> {
        if !(self.inner_radius > 0.0 && self.inner_radius <= self.outer_radius) {
            return Err(TuningError::Invalid {
                field,
                reason: "radii must satisfy 0 < inner <= outer",
            });
        }
        if !(self.min_phi >= 0.0 && self.min_phi <= self.max_phi && self.max_phi <= PI) {
            return Err(TuningError::Invalid {
                field,
                reason: "phi band must satisfy 0 <= min <= max <= π",
            });
        }
        Ok(())
    }
}

/// Arrow physics and firing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrowTuning {
    pub mass: f32,
    /// Full arrow length; the tip sits half of this ahead of the centre
    pub length: f32,
    /// Air resistance in (0, 1)
    pub damping: f32,
    /// Gravitational acceleration
    pub gravity: Vec3,
    /// Scale applied to the wind force before it reaches the arrow
    pub wind_force_factor: f32,
    /// Nocked arrow position relative to the camera
    pub spawn_offset: Vec3,
    /// Facing of a nocked arrow before it is fired
    pub spawn_direction: Vec3,
    pub base_force: f32,
    pub max_force: f32,
    /// Charge gained per tick while the fire input is held
    pub charge_rate: f32,
}

impl Default for ArrowTuning {
    fn default() -> Self {
        Self {
            mass: 1.0,
            length: 1.0,
            damping: 0.01,
            gravity: Vec3::new(0.0, -9.8, 0.0),
            wind_force_factor: 1.0,
            spawn_offset: Vec3::new(0.0, 0.25, 0.0),
            spawn_direction: Vec3::Z,
            base_force: 1200.0,
            max_force: 3600.0,
            charge_rate: 0.02,
        }
    }
}

impl ArrowTuning {
    #[inline]
    pub fn half_length(&self) -> f32 {
        self.length * 0.5
    }
}

/// Ring targets and their spawn pool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetTuning {
    pub spawn: ShellRegion,
    /// Number of concentric rings (innermost scores `ring_count`)
    pub ring_count: u32,
    /// Radial width of each ring
    pub ring_width: f32,
    pub min_dist_apart: f32,
    pub pool_size: usize,
    /// Seconds between spawn-loop ticks
    pub spawn_interval: f32,
    /// Seconds before a consumed slot is refilled
    pub respawn_delay: f32,
    /// Seconds a target stays up before disappearing (None = forever)
    pub lifetime: Option<f32>,
    /// Rejection-sampling attempts before falling back to the best candidate
    pub max_placement_attempts: u32,
}

impl Default for TargetTuning {
    fn default() -> Self {
        Self {
            spawn: ShellRegion {
                inner_radius: 30.0,
                outer_radius: 40.0,
                min_phi: FRAC_PI_4,
                max_phi: 11.0 * PI / 24.0,
            },
            ring_count: 10,
            ring_width: 0.5,
            min_dist_apart: 15.0,
            pool_size: 10,
            spawn_interval: 5.0,
            respawn_delay: 1.0,
            lifetime: None,
            max_placement_attempts: 256,
        }
    }
}

impl TargetTuning {
    /// Radius of the outermost ring
    #[inline]
    pub fn outer_radius(&self) -> f32 {
        self.ring_count as f32 * self.ring_width
    }
}

/// Barrier panels and their procedural motion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BarrierTuning {
    pub count: usize,
    pub width: f32,
    pub height: f32,
    pub thickness: f32,
    pub spawn: ShellRegion,
    pub base_theta: f32,
    pub base_phi_period: f32,
    pub base_phi_scale: f32,
    /// Score reported the first time a barrier is hit
    pub reveal_score: i32,
}

impl Default for BarrierTuning {
    fn default() -> Self {
        Self {
            count: 10,
            width: 3.0,
            height: 3.0,
            thickness: 0.5,
            spawn: ShellRegion {
                inner_radius: 20.0,
                outer_radius: 30.0,
                min_phi: FRAC_PI_4,
                max_phi: 11.0 * PI / 24.0,
            },
            base_theta: 0.01,
            base_phi_period: 0.001,
            base_phi_scale: 0.001,
            reveal_score: 1,
        }
    }
}

impl BarrierTuning {
    /// Radial band width reserved for each barrier
    #[inline]
    pub fn band_width(&self) -> f32 {
        (self.spawn.outer_radius - self.spawn.inner_radius) / self.count.max(1) as f32
    }
}

/// Global wind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindTuning {
    pub min_speed: f32,
    pub max_speed: f32,
    /// Seconds between wind changes
    pub change_interval: f32,
    /// Fraction of the remaining gap closed per tick
    pub blend_rate: f32,
}

impl Default for WindTuning {
    fn default() -> Self {
        Self {
            min_speed: 0.0,
            max_speed: 6.0,
            change_interval: 8.0,
            blend_rate: 0.02,
        }
    }
}

/// Scene geometry and round rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneTuning {
    pub camera_position: Vec3,
    pub ground_level: f32,
    /// Ground slab extent along X/Z and thickness
    pub ground_size: f32,
    pub ground_thickness: f32,
    pub dome_radius: f32,
    pub dome_segments: u32,
    /// Shared geometric tolerance for every collision test
    pub epsilon: f32,
    /// Round length in seconds
    pub time_limit: f32,
}

impl Default for SceneTuning {
    fn default() -> Self {
        Self {
            camera_position: Vec3::new(0.0, 2.0, 0.0),
            ground_level: 0.0,
            ground_size: 200.0,
            ground_thickness: 1.0,
            dome_radius: 60.0,
            dome_segments: 32,
            epsilon: 0.05,
            time_limit: 60.0,
        }
    }
}

/// Hit splatter decals
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecalTuning {
    pub size: f32,
}

impl Default for DecalTuning {
    fn default() -> Self {
        Self { size: 1.0 }
    }
}

/// Complete tuning set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub arrow: ArrowTuning,
    pub target: TargetTuning,
    pub barrier: BarrierTuning,
    pub wind: WindTuning,
    pub scene: SceneTuning,
    pub decal: DecalTuning,
}

impl Tuning {
    /// Parse and validate a JSON tuning document
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, TuningError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load from a file, falling back to defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let result = std::fs::read_to_string(path)
            .map_err(TuningError::from)
            .and_then(|json| Self::from_json(&json));

        match result {
            Ok(tuning) => {
                log::info!("Loaded tuning from {}", path.display());
                tuning
            }
            Err(e) => {
                log::warn!("Using default tuning ({}): {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), TuningError> {
        let a = &self.arrow;
        if !(a.damping > 0.0 && a.damping < 1.0) {
            return Err(TuningError::Invalid {
                field: "arrow.damping",
                reason: "must lie in (0, 1)",
            });
        }
        if a.mass <= 0.0 {
            return Err(TuningError::Invalid {
                field: "arrow.mass",
                reason: "must be positive",
            });
        }
        if a.length <= 0.0 {
            return Err(TuningError::Invalid {
                field: "arrow.length",
                reason: "must be positive",
            });
        }
        if !(a.base_force >= 0.0 && a.base_force <= a.max_force) {
            return Err(TuningError::Invalid {
                field: "arrow.base_force",
                reason: "must satisfy 0 <= base_force <= max_force",
            });
        }

        let t = &self.target;
        t.spawn.validate("target.spawn")?;
        if t.pool_size == 0 {
            return Err(TuningError::Invalid {
                field: "target.pool_size",
                reason: "must hold at least one target",
            });
        }
        if t.ring_count == 0 || t.ring_width <= 0.0 {
            return Err(TuningError::Invalid {
                field: "target.ring_width",
                reason: "rings must have positive count and width",
            });
        }
        if t.min_dist_apart < 0.0 {
            return Err(TuningError::Invalid {
                field: "target.min_dist_apart",
                reason: "must not be negative",
            });
        }

        let b = &self.barrier;
        b.spawn.validate("barrier.spawn")?;
        if b.width <= 0.0 || b.height <= 0.0 || b.thickness <= 0.0 {
            return Err(TuningError::Invalid {
                field: "barrier.width",
                reason: "panel dimensions must be positive",
            });
        }

        let w = &self.wind;
        if !(w.min_speed >= 0.0 && w.min_speed <= w.max_speed) {
            return Err(TuningError::Invalid {
                field: "wind.min_speed",
                reason: "must satisfy 0 <= min_speed <= max_speed",
            });
        }
        if !(w.blend_rate > 0.0 && w.blend_rate <= 1.0) {
            return Err(TuningError::Invalid {
                field: "wind.blend_rate",
                reason: "must lie in (0, 1]",
            });
        }

        let s = &self.scene;
        if s.epsilon <= 0.0 {
            return Err(TuningError::Invalid {
                field: "scene.epsilon",
                reason: "must be positive",
            });
        }
        if s.dome_radius <= t.spawn.outer_radius + t.outer_radius() {
            return Err(TuningError::Invalid {
                field: "scene.dome_radius",
                reason: "dome must enclose the target shell",
            });
        }

        if self.decal.size <= 0.0 {
            return Err(TuningError::Invalid {
                field: "decal.size",
                reason: "must be positive",
            });
        }

        Ok(())
    }
}
