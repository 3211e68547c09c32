//! spool daemon runtime: intake watcher + settle detection + print dispatch.

pub mod command;
pub mod config;
pub mod dispatch;
mod error;
pub mod inflight;
pub mod intake;
mod runtime;
pub mod settle;
pub mod validate;

pub use command::CommandTemplate;
pub use config::{DaemonConfig, RetryPolicy};
pub use dispatch::{DispatchResult, FsRemover, PrintDispatcher, PrintFailure, Remover};
pub use error::DaemonError;
pub use inflight::{InFlightGuard, InFlightSet};
pub use intake::IntakeWatcher;
pub use runtime::{
    run_until_signal, start_blocking, Admitted, CandidateHandler, Orchestrator, RunState,
    ShutdownHandle,
};
pub use settle::{SettleDetector, SettleOutcome};
pub use validate::{
    run_checks, validate_startup, AssumeAvailable, CheckResult, CommandProbe, PrinterProbe,
    StartupFailure,
};
