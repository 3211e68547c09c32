//! Print dispatch: run the print command, delete the file on success.

use std::fs;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;

use spool_core::PrinterTarget;

use crate::command::CommandTemplate;

/// Filesystem deletion primitive used after a successful print.
pub trait Remover: Send + Sync {
    fn remove(&self, path: &Path) -> io::Result<()>;
}

/// Deletes with `std::fs::remove_file`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsRemover;

impl Remover for FsRemover {
    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// Why a print invocation did not succeed.
#[derive(Debug, Error)]
pub enum PrintFailure {
    #[error("print command exited with {status}: {stderr}")]
    Exit { status: ExitStatus, stderr: String },

    #[error("print command could not be run: {0}")]
    Spawn(#[source] io::Error),

    #[error("print command did not finish within {0:?}")]
    TimedOut(Duration),
}

/// Outcome of one dispatch.
#[derive(Debug)]
pub enum DispatchResult {
    /// Printed and removed.
    Success,
    /// Not printed; the file was left in place.
    PrintFailed(PrintFailure),
    /// Printed, but the file could not be removed. Never re-printed.
    DeleteFailed(io::Error),
}

impl DispatchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, DispatchResult::Success)
    }

    pub fn printed(&self) -> bool {
        !matches!(self, DispatchResult::PrintFailed(_))
    }
}

/// Runs the configured print command for a path and removes the file only
/// after the command reports success. No retries happen here.
#[derive(Clone)]
pub struct PrintDispatcher {
    command: CommandTemplate,
    remover: Arc<dyn Remover>,
    timeout: Duration,
}

impl PrintDispatcher {
    pub fn new(command: CommandTemplate, timeout: Duration) -> Self {
        Self {
            command,
            remover: Arc::new(FsRemover),
            timeout,
        }
    }

    pub fn with_remover(mut self, remover: Arc<dyn Remover>) -> Self {
        self.remover = remover;
        self
    }

    /// Exactly one process invocation and at most one deletion.
    pub async fn dispatch(&self, path: &Path, printer: &PrinterTarget) -> DispatchResult {
        if let Err(failure) = self.print(path, printer).await {
            return DispatchResult::PrintFailed(failure);
        }
        match self.remover.remove(path) {
            Ok(()) => DispatchResult::Success,
            Err(err) => DispatchResult::DeleteFailed(err),
        }
    }

    async fn print(&self, path: &Path, printer: &PrinterTarget) -> Result<(), PrintFailure> {
        let (program, args) = self.command.render(printer, Some(path));
        let child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(PrintFailure::Spawn)?;

        // Dropping the timed-out future drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(PrintFailure::Spawn)?,
            Err(_) => return Err(PrintFailure::TimedOut(self.timeout)),
        };

        if !output.status.success() {
            return Err(PrintFailure::Exit {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let job = stdout.trim();
        if !job.is_empty() {
            tracing::debug!(path = %path.display(), job = %job, "print command output");
        }
        Ok(())
    }
}
