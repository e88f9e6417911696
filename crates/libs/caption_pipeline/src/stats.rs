use crate::scheduler::ItemOutcome;
use std::fmt;
use std::ops::AddAssign;
use std::time::Duration;

/// Counters for a folder or a whole run.
/// `seen` is always `skipped + written + failed + cancelled`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub seen: usize,
    pub skipped: usize,
    pub written: usize,
    pub failed: usize,
    /// Written items whose caption came from the template fallback.
    pub fallback: usize,
    pub cancelled: usize,
}

impl RunStats {
    pub fn record(&mut self, outcome: &ItemOutcome) {
        self.seen += 1;
        match outcome {
            ItemOutcome::Written { fallback, .. } => {
                self.written += 1;
                if *fallback {
                    self.fallback += 1;
                }
            }
            ItemOutcome::Skipped { .. } => self.skipped += 1,
            ItemOutcome::Failed { .. } => self.failed += 1,
            ItemOutcome::Cancelled { .. } => self.cancelled += 1,
        }
    }
}

impl AddAssign for RunStats {
    fn add_assign(&mut self, other: Self) {
        self.seen += other.seen;
        self.skipped += other.skipped;
        self.written += other.written;
        self.failed += other.failed;
        self.fallback += other.fallback;
        self.cancelled += other.cancelled;
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "seen {}, skipped {}, written {} ({} fallback), failed {}, cancelled {}",
            self.seen, self.skipped, self.written, self.fallback, self.failed, self.cancelled
        )
    }
}

/// Totals of a finished run together with how long it took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub stats: RunStats,
    pub elapsed: Duration,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {:.1?}", self.stats, self.elapsed)
    }
}
