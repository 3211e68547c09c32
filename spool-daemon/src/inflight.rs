//! Set of paths currently being processed.
//!
//! Membership is held by an [`InFlightGuard`]; dropping the guard releases
//! the path, so release happens on every exit path including task abort.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Default)]
pub struct InFlightSet {
    paths: Arc<Mutex<HashSet<PathBuf>>>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert-if-absent. `None` means the path is already in flight.
    pub fn try_acquire(&self, path: &Path) -> Option<InFlightGuard> {
        if !self.lock().insert(path.to_path_buf()) {
            return None;
        }
        Some(InFlightGuard {
            set: self.clone(),
            path: path.to_path_buf(),
        })
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.lock().contains(path)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the set half-updated.
    fn lock(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        self.paths
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Proof of in-flight membership for one path.
#[derive(Debug)]
pub struct InFlightGuard {
    set: InFlightSet,
    path: PathBuf,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.lock().remove(&self.path);
    }
}
