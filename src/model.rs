use std::path::PathBuf;
use std::time::SystemTime;

/// A file the scanner found old enough to delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub path: PathBuf,
    pub modified: SystemTime,
    pub size: u64,
}

/// Result of handing one batch to the evictor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionTally {
    pub deleted: usize,
    pub bytes: u64,
    /// Removal attempted and refused by the filesystem.
    pub failed: usize,
    /// Already gone by the time we got to it.
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    BelowTrigger,
    TargetReached,
    DirectoriesExhausted,
    ProbeLost,
}

impl StopReason {
    pub fn name(&self) -> &str {
        match self {
            Self::BelowTrigger => "usage below trigger",
            Self::TargetReached => "target reached",
            Self::DirectoriesExhausted => "directories exhausted",
            Self::ProbeLost => "usage readings lost",
        }
    }
}

/// Totals for a whole run. Threaded through the controller by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupOutcome {
    pub files_considered: usize,
    pub files_deleted: usize,
    pub bytes_deleted: u64,
    pub files_failed: usize,
    pub files_skipped: usize,
    pub initial_usage: Option<u8>,
    pub final_usage: Option<u8>,
    pub stop_reason: StopReason,
}

impl CleanupOutcome {
    pub fn new(initial_usage: u8) -> Self {
        Self {
            files_considered: 0,
            files_deleted: 0,
            bytes_deleted: 0,
            files_failed: 0,
            files_skipped: 0,
            initial_usage: Some(initial_usage),
            final_usage: None,
            stop_reason: StopReason::DirectoriesExhausted,
        }
    }

    /// Folds one scan/evict cycle into the running totals.
    #[must_use]
    pub fn absorb(mut self, considered: usize, tally: EvictionTally) -> Self {
        self.files_considered += considered;
        self.files_deleted += tally.deleted;
        self.bytes_deleted += tally.bytes;
        self.files_failed += tally.failed;
        self.files_skipped += tally.skipped;
        self
    }

    #[must_use]
    pub fn stopped(mut self, reason: StopReason) -> Self {
        self.stop_reason = reason;
        self
    }
}
