//! Fixed-timestep accumulator
//!
//! Real frame time goes in, a whole number of `SIM_DT` ticks comes out.
//! Simulated time is always `ticks * SIM_DT`, whatever the frame rate.

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_FRAME_TIME, MAX_SUBSTEPS, SIM_DT};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimClock {
    /// Unspent real time (seconds), always < SIM_DT after a full drain
    pub accumulator: f32,
    /// Ticks handed out so far
    pub ticks: u64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one frame's elapsed time; returns how many ticks to run now.
    ///
    /// Frames longer than `MAX_FRAME_TIME` are clamped (a stalled tab must
    /// not replay seconds of physics) and at most `MAX_SUBSTEPS` ticks are
    /// released per frame. Anything left over carries to the next frame.
    pub fn advance(&mut self, frame_secs: f32) -> u32 {
        let frame_secs = if frame_secs.is_finite() {
            frame_secs.clamp(0.0, MAX_FRAME_TIME)
        } else {
            0.0
        };
        self.accumulator += frame_secs;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
        self.ticks += substeps as u64;
        substeps
    }

    /// Fraction of a tick waiting in the accumulator (for render interpolation)
    #[inline]
    pub fn alpha(&self) -> f32 {
        (self.accumulator / SIM_DT).clamp(0.0, 1.0)
    }

    /// Simulated seconds elapsed
    #[inline]
    pub fn sim_time(&self) -> f32 {
        self.ticks as f32 * SIM_DT
    }

    /// Drop any pending time (after a pause or a round restart)
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}
