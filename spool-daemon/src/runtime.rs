use std::path::Path;
use std::sync::Arc;

use tokio::sync::{broadcast, watch, Semaphore};
use tokio::task::JoinSet;

use spool_core::{CandidateFile, IntakeMode, KeywordSet, PrinterTarget};

use crate::config::{DaemonConfig, RetryPolicy};
use crate::dispatch::{DispatchResult, FsRemover, PrintDispatcher, Remover};
use crate::error::{io_err, DaemonError};
use crate::inflight::{InFlightGuard, InFlightSet};
use crate::intake::IntakeWatcher;
use crate::settle::{SettleDetector, SettleOutcome};
use crate::validate::{validate_startup, AssumeAvailable, CommandProbe, PrinterProbe};

/// Lifecycle of an [`Orchestrator`]. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// Requests an orderly shutdown of a running orchestrator.
#[derive(Debug, Clone)]
pub struct ShutdownHandle(broadcast::Sender<()>);

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.0.send(());
    }
}

/// Start the daemon and block the current thread until it exits.
///
/// Ctrl-C (and SIGTERM on unix) trigger an orderly drain.
pub fn start_blocking(config: DaemonConfig, log_json: bool) -> Result<(), DaemonError> {
    init_tracing(log_json);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run_until_signal(Orchestrator::new(config)))
}

/// Run `orchestrator` until it stops or a termination signal arrives.
pub async fn run_until_signal(orchestrator: Orchestrator) -> Result<(), DaemonError> {
    let shutdown = orchestrator.shutdown_handle();
    let signal_handle = tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(name) => {
                tracing::info!(signal = name, "received signal, shutting down");
                shutdown.shutdown();
            }
            Err(err) => tracing::error!(error = %err, "signal handler failed"),
        }
    });

    let result = orchestrator.run().await;
    signal_handle.abort();
    result
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|()| "ctrl-c"),
        _ = terminate.recv() => Ok("sigterm"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "ctrl-c")
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Wires intake → keyword match → settle → dispatch and owns the run loop.
pub struct Orchestrator {
    config: Arc<DaemonConfig>,
    probe: Arc<dyn PrinterProbe>,
    remover: Arc<dyn Remover>,
    state_tx: watch::Sender<RunState>,
    shutdown_tx: broadcast::Sender<()>,
    // Subscribed at construction so a shutdown sent before `run` is not lost.
    shutdown_rx: broadcast::Receiver<()>,
}

impl Orchestrator {
    pub fn new(config: DaemonConfig) -> Self {
        let probe: Arc<dyn PrinterProbe> = if config.skip_printer_check {
            Arc::new(AssumeAvailable)
        } else {
            Arc::new(CommandProbe::new(config.probe_command.clone()))
        };
        let (state_tx, _) = watch::channel(RunState::Starting);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(4);
        Self {
            config: Arc::new(config),
            probe,
            remover: Arc::new(FsRemover),
            state_tx,
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn PrinterProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_remover(mut self, remover: Arc<dyn Remover>) -> Self {
        self.remover = remover;
        self
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(self.shutdown_tx.clone())
    }

    pub fn subscribe_state(&self) -> watch::Receiver<RunState> {
        self.state_tx.subscribe()
    }

    /// Run until shutdown. Returns an error only if startup validation or
    /// watcher registration fails; per-file failures are logged and contained.
    pub async fn run(mut self) -> Result<(), DaemonError> {
        self.transition(RunState::Starting);

        let mut intake = match Self::start(self.config.clone(), self.probe.clone()).await {
            Ok(intake) => intake,
            Err(err) => {
                tracing::error!(error = %err, "startup failed");
                self.transition(RunState::Stopped);
                return Err(err);
            }
        };

        let handler = Arc::new(CandidateHandler::new(&self.config, self.remover.clone()));
        let permits = Arc::new(Semaphore::new(self.config.workers));
        let mut tasks = JoinSet::new();

        tracing::info!(
            dir = %intake.dir().display(),
            printer = %self.config.printer,
            keywords = %self.config.keywords,
            intake = intake.mode(),
            workers = self.config.workers,
            "watching for files to print",
        );
        self.transition(RunState::Running);

        loop {
            tokio::select! {
                _ = self.shutdown_rx.recv() => break,
                candidate = intake.next() => {
                    let Some(candidate) = candidate else {
                        tracing::warn!("intake source closed");
                        break;
                    };
                    while let Some(joined) = tasks.try_join_next() {
                        log_join(joined);
                    }
                    let Some(admitted) = handler.admit(candidate) else { continue };
                    let handler = handler.clone();
                    let permits = permits.clone();
                    let state = self.state_tx.subscribe();
                    tasks.spawn(async move {
                        let Ok(_permit) = permits.acquire_owned().await else { return };
                        // Queued behind the semaphore when shutdown began: leave the file.
                        if *state.borrow() != RunState::Running {
                            tracing::debug!(
                                path = %admitted.candidate.path.display(),
                                "shutting down, leaving queued file in place",
                            );
                            return;
                        }
                        handler.process(admitted).await;
                    });
                }
            }
        }

        self.transition(RunState::Stopping);
        tracing::info!(pending = tasks.len(), "draining in-flight dispatches");
        let drained = tokio::time::timeout(self.config.grace_period, async {
            while let Some(joined) = tasks.join_next().await {
                log_join(joined);
            }
        })
        .await;
        if drained.is_err() {
            tracing::warn!(
                remaining = tasks.len(),
                grace_secs = self.config.grace_period.as_secs(),
                "grace period elapsed, aborting remaining dispatches",
            );
            tasks.shutdown().await;
        }
        drop(intake);

        self.transition(RunState::Stopped);
        tracing::info!("daemon stopped");
        Ok(())
    }

    /// Validate on a blocking thread (the printer probe runs a child process),
    /// then register the intake.
    async fn start(
        config: Arc<DaemonConfig>,
        probe: Arc<dyn PrinterProbe>,
    ) -> Result<IntakeWatcher, DaemonError> {
        let checked = config.clone();
        let dir = tokio::task::spawn_blocking(move || {
            validate_startup(&checked.watched_dir, &checked.printer, probe.as_ref())
        })
        .await
        .map_err(|err| DaemonError::Runtime(format!("startup validation join error: {err}")))??;
        match config.intake {
            IntakeMode::Events => IntakeWatcher::events(&dir, config.process_existing),
            IntakeMode::Poll => Ok(IntakeWatcher::poll(&dir, config.poll_interval)),
        }
    }

    fn transition(&self, state: RunState) {
        tracing::debug!(state = ?state, "daemon state");
        self.state_tx.send_replace(state);
    }
}

fn log_join(result: Result<(), tokio::task::JoinError>) {
    if let Err(err) = result {
        if err.is_panic() {
            tracing::error!(error = %err, "dispatch task panicked");
        }
    }
}

// ---------------------------------------------------------------------------
// Candidate handling
// ---------------------------------------------------------------------------

/// A matched candidate holding in-flight membership for its path.
pub struct Admitted {
    candidate: CandidateFile,
    _guard: InFlightGuard,
}

/// Per-candidate pipeline with immutable configuration, built once and shared.
pub struct CandidateHandler {
    keywords: KeywordSet,
    printer: PrinterTarget,
    in_flight: InFlightSet,
    settle: SettleDetector,
    dispatcher: PrintDispatcher,
    retry: RetryPolicy,
}

impl CandidateHandler {
    pub fn new(config: &DaemonConfig, remover: Arc<dyn Remover>) -> Self {
        Self {
            keywords: config.keywords.clone(),
            printer: config.printer.clone(),
            in_flight: InFlightSet::new(),
            settle: SettleDetector::new(config.settle_interval, config.settle_timeout),
            dispatcher: PrintDispatcher::new(config.print_command.clone(), config.print_timeout)
                .with_remover(remover),
            retry: config.retry,
        }
    }

    pub fn in_flight(&self) -> &InFlightSet {
        &self.in_flight
    }

    /// Keyword match, then claim the path. `None` for non-matching files and
    /// for paths already in flight.
    pub fn admit(&self, candidate: CandidateFile) -> Option<Admitted> {
        if !self.keywords.matches_path(&candidate.path) {
            tracing::debug!(path = %candidate.path.display(), "no keyword match, ignoring");
            return None;
        }
        let Some(guard) = self.in_flight.try_acquire(&candidate.path) else {
            tracing::debug!(path = %candidate.path.display(), "already in flight, dropping duplicate");
            return None;
        };
        Some(Admitted {
            candidate,
            _guard: guard,
        })
    }

    /// Settle, dispatch (with optional retries), and log the outcome.
    /// Returns `None` when the file was never dispatched.
    pub async fn process(&self, admitted: Admitted) -> Option<DispatchResult> {
        let path = admitted.candidate.path.as_path();
        match self.settle.settle(&admitted.candidate).await {
            SettleOutcome::Settled => {}
            SettleOutcome::Vanished => {
                tracing::debug!(path = %path.display(), "file disappeared before it settled");
                return None;
            }
            SettleOutcome::Unsettled => {
                tracing::warn!(path = %path.display(), "file never stopped changing, skipping");
                return None;
            }
        }

        let mut attempt = 0u32;
        loop {
            let result = self.dispatcher.dispatch(path, &self.printer).await;
            log_outcome(path, &self.printer, &result);
            let retry = matches!(result, DispatchResult::PrintFailed(_))
                && attempt < self.retry.max_retries
                && path.exists();
            if !retry {
                return Some(result);
            }
            let delay = self.retry.delay_for(attempt);
            attempt += 1;
            tracing::info!(
                path = %path.display(),
                attempt,
                max_retries = self.retry.max_retries,
                delay_secs = delay.as_secs_f64(),
                "retrying print",
            );
            tokio::time::sleep(delay).await;
        }
    }
}

fn log_outcome(path: &Path, printer: &PrinterTarget, result: &DispatchResult) {
    match result {
        DispatchResult::Success => {
            tracing::info!(path = %path.display(), printer = %printer, "printed and deleted");
        }
        DispatchResult::PrintFailed(failure) => {
            tracing::error!(
                path = %path.display(),
                printer = %printer,
                error = %failure,
                "could not print, file left in place",
            );
        }
        DispatchResult::DeleteFailed(err) => {
            tracing::warn!(
                path = %path.display(),
                printer = %printer,
                error = %err,
                "printed but could not delete",
            );
        }
    }
}

fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = if json {
        fmt().json().with_env_filter(filter).with_target(false).try_init()
    } else {
        fmt().with_env_filter(filter).with_target(false).try_init()
    };
}
