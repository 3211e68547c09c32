//! Candidate intake: OS filesystem events or periodic directory polling.
//!
//! Both variants expose the same lazy, never-ending `next()` that suspends
//! until a candidate is available. Only direct children of the watched
//! directory are considered; subdirectories are not monitored. Transient
//! errors are logged and skipped.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::event::{AccessKind, AccessMode, CreateKind, ModifyKind, RenameMode};
use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use spool_core::{CandidateFile, Readiness};

use crate::error::DaemonError;

/// Bursts of events for one path inside this window collapse to one candidate.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Debounce entries older than this are dropped.
const DEBOUNCE_RETENTION: Duration = Duration::from_secs(30);

pub enum IntakeWatcher {
    Events(EventIntake),
    Poll(PollIntake),
}

impl IntakeWatcher {
    /// Subscribe to OS notifications for `dir` (non-recursive).
    pub fn events(dir: &Path, process_existing: bool) -> Result<Self, DaemonError> {
        EventIntake::new(dir, process_existing).map(IntakeWatcher::Events)
    }

    /// List `dir` every `interval`; the first pass runs immediately.
    pub fn poll(dir: &Path, interval: Duration) -> Self {
        IntakeWatcher::Poll(PollIntake::new(dir, interval))
    }

    /// Next candidate. `None` only if the underlying source shut down.
    pub async fn next(&mut self) -> Option<CandidateFile> {
        match self {
            IntakeWatcher::Events(intake) => intake.next().await,
            IntakeWatcher::Poll(intake) => intake.next().await,
        }
    }

    pub fn dir(&self) -> &Path {
        match self {
            IntakeWatcher::Events(intake) => &intake.dir,
            IntakeWatcher::Poll(intake) => &intake.dir,
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            IntakeWatcher::Events(_) => "events",
            IntakeWatcher::Poll(_) => "poll",
        }
    }
}

// ---------------------------------------------------------------------------
// Event subscription
// ---------------------------------------------------------------------------

pub struct EventIntake {
    dir: PathBuf,
    // Dropping the watcher unregisters the OS subscription.
    _watcher: RecommendedWatcher,
    events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    pending: VecDeque<CandidateFile>,
    debounce: HashMap<PathBuf, Instant>,
}

impl EventIntake {
    fn new(dir: &Path, process_existing: bool) -> Result<Self, DaemonError> {
        let (event_tx, events) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher: RecommendedWatcher = recommended_watcher(move |event| {
            let _ = event_tx.send(event);
        })?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        tracing::debug!(path = %dir.display(), "watching directory for events");

        let mut pending = VecDeque::new();
        if process_existing {
            match list_files(dir) {
                Ok(existing) => {
                    tracing::info!(count = existing.len(), "queueing files already present");
                    pending.extend(
                        existing
                            .into_iter()
                            .map(|path| CandidateFile::new(path, Readiness::Appeared)),
                    );
                }
                Err(err) => {
                    tracing::warn!(path = %dir.display(), error = %err, "initial listing failed");
                }
            }
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            _watcher: watcher,
            events,
            pending,
            debounce: HashMap::new(),
        })
    }

    async fn next(&mut self) -> Option<CandidateFile> {
        loop {
            if let Some(candidate) = self.pending.pop_front() {
                return Some(candidate);
            }
            let event = match self.events.recv().await? {
                Ok(event) => event,
                Err(err) => {
                    tracing::warn!(error = %err, "watcher event error");
                    continue;
                }
            };
            self.accept(event, Instant::now());
        }
    }

    fn accept(&mut self, event: Event, now: Instant) {
        let Some(readiness) = readiness_for(&event.kind) else {
            return;
        };
        for path in event.paths {
            if !is_direct_child(&path, &self.dir) || path.is_dir() {
                continue;
            }
            // A close-write is the definitive ready signal; never swallow it.
            let fresh = should_process_event(&mut self.debounce, &path, now);
            if !fresh && readiness != Readiness::Closed {
                continue;
            }
            self.pending.push_back(CandidateFile::new(path, readiness));
        }
    }
}

fn readiness_for(kind: &EventKind) -> Option<Readiness> {
    match kind {
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => Some(Readiness::Closed),
        EventKind::Create(CreateKind::File | CreateKind::Any | CreateKind::Other) => {
            Some(Readiness::Appeared)
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Both | RenameMode::Any)) => {
            Some(Readiness::Appeared)
        }
        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => Some(Readiness::Appeared),
        _ => None,
    }
}

fn is_direct_child(path: &Path, dir: &Path) -> bool {
    path.parent() == Some(dir)
}

fn should_process_event(
    debounce: &mut HashMap<PathBuf, Instant>,
    path: &Path,
    now: Instant,
) -> bool {
    should_process_event_with_threshold(debounce, path, now, DEBOUNCE_WINDOW)
}

fn should_process_event_with_threshold(
    debounce: &mut HashMap<PathBuf, Instant>,
    path: &Path,
    now: Instant,
    threshold: Duration,
) -> bool {
    debounce.retain(|_, seen_at| now.duration_since(*seen_at) <= DEBOUNCE_RETENTION);
    match debounce.get(path) {
        Some(last_seen) if now.duration_since(*last_seen) < threshold => false,
        _ => {
            debounce.insert(path.to_path_buf(), now);
            true
        }
    }
}

// ---------------------------------------------------------------------------
// Directory polling
// ---------------------------------------------------------------------------

pub struct PollIntake {
    dir: PathBuf,
    ticker: Interval,
    seen: HashSet<PathBuf>,
    pending: VecDeque<CandidateFile>,
}

impl PollIntake {
    fn new(dir: &Path, interval: Duration) -> Self {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            dir: dir.to_path_buf(),
            ticker,
            seen: HashSet::new(),
            pending: VecDeque::new(),
        }
    }

    async fn next(&mut self) -> Option<CandidateFile> {
        loop {
            if let Some(candidate) = self.pending.pop_front() {
                return Some(candidate);
            }
            self.ticker.tick().await;
            self.scan();
        }
    }

    /// Queue files not seen on an earlier pass. Files that vanished are
    /// forgotten so a re-created file with the same name is picked up again;
    /// files still present (e.g. after a failed print) are not re-queued.
    fn scan(&mut self) {
        let present = match list_files(&self.dir) {
            Ok(present) => present,
            Err(err) => {
                tracing::warn!(path = %self.dir.display(), error = %err, "poll listing failed");
                return;
            }
        };

        for path in &present {
            if self.seen.insert(path.clone()) {
                self.pending
                    .push_back(CandidateFile::new(path.clone(), Readiness::Appeared));
            }
        }
        let present: HashSet<PathBuf> = present.into_iter().collect();
        self.seen.retain(|path| present.contains(path));
    }
}

/// Regular files directly inside `dir`, sorted by path.
fn list_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let Ok(entry) = entry else { continue };
        match entry.file_type() {
            Ok(ty) if ty.is_file() => files.push(entry.path()),
            _ => {}
        }
    }
    files.sort();
    Ok(files)
}
