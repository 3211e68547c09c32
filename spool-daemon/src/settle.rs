//! Settle detection: wait until a new file has stopped changing.
//!
//! A close-after-write notification is trusted as-is. Otherwise the file's
//! size and modification time are sampled one quiescence interval apart and
//! the file counts as settled once two consecutive samples agree.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use tokio::time::Instant;

use spool_core::{CandidateFile, Readiness};

/// One `(len, mtime)` observation of a regular file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSample {
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl FileSample {
    /// `None` if the path is gone or is not a regular file.
    pub fn take(path: &Path) -> Option<Self> {
        let meta = fs::metadata(path).ok()?;
        if !meta.is_file() {
            return None;
        }
        Some(Self {
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    Settled,
    /// The file disappeared while settling; not an error.
    Vanished,
    /// Still changing when the settle timeout ran out.
    Unsettled,
}

#[derive(Debug, Clone, Copy)]
pub struct SettleDetector {
    interval: Duration,
    timeout: Duration,
}

impl SettleDetector {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    pub async fn settle(&self, candidate: &CandidateFile) -> SettleOutcome {
        self.settle_with(candidate, FileSample::take).await
    }

    async fn settle_with<F>(&self, candidate: &CandidateFile, mut sample: F) -> SettleOutcome
    where
        F: FnMut(&Path) -> Option<FileSample>,
    {
        let path = candidate.path.as_path();
        let Some(mut previous) = sample(path) else {
            return SettleOutcome::Vanished;
        };
        if candidate.readiness == Readiness::Closed {
            return SettleOutcome::Settled;
        }

        // A timeout too large to represent means no deadline.
        let deadline = Instant::now().checked_add(self.timeout);
        loop {
            tokio::time::sleep(self.interval).await;
            let Some(current) = sample(path) else {
                return SettleOutcome::Vanished;
            };
            if current == previous {
                return SettleOutcome::Settled;
            }
            tracing::debug!(
                path = %path.display(),
                len = current.len,
                "file still changing",
            );
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return SettleOutcome::Unsettled;
            }
            previous = current;
        }
    }
}
