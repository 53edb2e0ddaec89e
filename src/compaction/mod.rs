//! Compaction Module
//!
//! Collapses log history into a minimal snapshot of live keys.
//!
//! ## Triggers
//! - Interval: the scheduler thread ticks every `compaction_interval`
//! - Threshold: a mutation that brings the counter to
//!   `compaction_threshold` posts a request to the scheduler without waiting
//! - Manual: `Engine::compact()` from the caller's thread
//!
//! All three converge on the engine's compaction gate; a run that finds the
//! gate held is `Skipped`, never queued.

mod scheduler;

pub use scheduler::CompactionScheduler;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;

/// Something the scheduler can compact
pub trait Compactor: Send + Sync + 'static {
    fn compact(&self) -> Result<CompactionOutcome>;
}

/// What a compaction call did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompactionOutcome {
    /// The snapshot was rewritten and the log reset
    Completed(CompactionStats),

    /// Another compaction was in flight; nothing was done
    Skipped,
}

impl CompactionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, CompactionOutcome::Completed(_))
    }

    pub fn stats(&self) -> Option<&CompactionStats> {
        match self {
            CompactionOutcome::Completed(stats) => Some(stats),
            CompactionOutcome::Skipped => None,
        }
    }
}

/// Statistics of a completed compaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactionStats {
    /// Records written to the new snapshot
    pub live_keys: u64,

    /// Tombstones removed from the index
    pub tombstones_dropped: u64,

    /// Size of the new snapshot
    pub snapshot_bytes: u64,

    /// Where the replaced snapshot was archived, if anywhere
    pub archive: Option<PathBuf>,

    /// Wall time spent inside the critical section
    pub duration: Duration,
}

/// Why a background compaction ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Interval,
    Threshold,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Interval => f.write_str("interval"),
            Trigger::Threshold => f.write_str("threshold"),
        }
    }
}

/// Report of one background compaction run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactionEvent {
    pub trigger: Trigger,

    /// The outcome, or the error message of a failed run
    pub result: std::result::Result<CompactionOutcome, String>,
}
