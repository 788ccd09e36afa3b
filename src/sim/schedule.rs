//! Deferred jobs keyed by simulation tick
//!
//! Timers (target spawn loop, respawn after a hit, target expiry, wind
//! changes, the round time limit) never fire on their own. The tick drains
//! the due jobs at its start, before any arrow moves, so nothing mutates
//! the target pool while collision tests are walking it.

use serde::{Deserialize, Serialize};

use super::target::TargetId;
use crate::consts::SIM_DT;

/// Work a timer can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Job {
    /// Periodic spawn loop; reschedules itself
    SpawnTarget,
    /// One-off refill after a target was consumed
    RespawnTarget,
    /// Remove a specific target occupancy if it is still up
    ExpireTarget(TargetId),
    /// Draw a new wind heading; reschedules itself
    ChangeWind,
    /// Round time limit
    EndRound,
}

/// A job released by `drain_due`, tagged with the epoch it was queued in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueJob {
    pub epoch: u32,
    pub job: Job,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Pending {
    due: u64,
    /// Insertion order, breaks ties between jobs due on the same tick
    seq: u64,
    epoch: u32,
    job: Job,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scheduler {
    pending: Vec<Pending>,
    epoch: u32,
    next_seq: u64,
}

/// Whole ticks covering `secs` (at least one)
pub fn secs_to_ticks(secs: f32) -> u64 {
    if !secs.is_finite() || secs <= 0.0 {
        return 1;
    }
    ((secs / SIM_DT).round() as u64).max(1)
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Whether a job drained in `epoch` may still run
    #[inline]
    pub fn is_current(&self, epoch: u32) -> bool {
        epoch == self.epoch
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Queue `job` to run on tick `due`
    pub fn schedule_at(&mut self, due: u64, job: Job) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(Pending {
            due,
            seq,
            epoch: self.epoch,
            job,
        });
    }

    /// Queue `job` to run `secs` of simulated time after tick `now`
    pub fn schedule_in(&mut self, now: u64, secs: f32, job: Job) {
        self.schedule_at(now + secs_to_ticks(secs), job);
    }

    /// Remove and return every job due at or before `now`, in due order.
    ///
    /// Jobs queued under an older epoch are discarded here.
    pub fn drain_due(&mut self, now: u64) -> Vec<DueJob> {
        let epoch = self.epoch;
        let mut due: Vec<Pending> = Vec::new();
        self.pending.retain(|p| {
            if p.epoch != epoch {
                return false;
            }
            if p.due <= now {
                due.push(p.clone());
                return false;
            }
            true
        });
        due.sort_by_key(|p| (p.due, p.seq));
        due.into_iter()
            .map(|p| DueJob {
                epoch: p.epoch,
                job: p.job,
            })
            .collect()
    }

    /// Invalidate everything queued so far, including jobs already drained
    /// but not yet run
    pub fn cancel_all(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        self.pending.clear();
    }

    /// Tick the next job falls due, if any
    pub fn next_due(&self) -> Option<u64> {
        self.pending.iter().map(|p| p.due).min()
    }
}
