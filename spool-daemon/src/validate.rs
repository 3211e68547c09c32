//! Startup validation: watched directory and printer availability.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Serialize;
use thiserror::Error;

use spool_core::PrinterTarget;

use crate::command::CommandTemplate;

/// Why the daemon refused to enter the running state.
#[derive(Debug, Error)]
pub enum StartupFailure {
    #[error("watched directory {} does not exist", .0.display())]
    DirectoryMissing(PathBuf),

    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("no permission to read watched directory {}: {source}", .path.display())]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("printer {0} is not available")]
    PrinterUnavailable(PrinterTarget),
}

/// Answers whether a printer can accept jobs. Queried once at startup.
pub trait PrinterProbe: Send + Sync {
    fn is_available(&self, printer: &PrinterTarget) -> bool;
}

/// Probe that runs an external status command (`lpstat -p {printer}` by
/// default); exit status 0 means available.
#[derive(Debug, Clone)]
pub struct CommandProbe {
    command: CommandTemplate,
}

impl CommandProbe {
    pub fn new(command: CommandTemplate) -> Self {
        Self { command }
    }
}

impl PrinterProbe for CommandProbe {
    fn is_available(&self, printer: &PrinterTarget) -> bool {
        let (program, args) = self.command.render(printer, None);
        match Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
        {
            Ok(output) if output.status.success() => true,
            Ok(output) => {
                tracing::debug!(
                    printer = %printer,
                    status = %output.status,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "printer probe reported unavailable",
                );
                false
            }
            Err(err) => {
                tracing::warn!(
                    printer = %printer,
                    program = %self.command.program(),
                    error = %err,
                    "printer probe could not be run",
                );
                false
            }
        }
    }
}

/// Probe that trusts the configuration (`--skip-printer-check`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeAvailable;

impl PrinterProbe for AssumeAvailable {
    fn is_available(&self, _printer: &PrinterTarget) -> bool {
        true
    }
}

pub fn exists(path: &Path) -> bool {
    path.exists()
}

/// A directory is readable when it can be listed.
pub fn readable(path: &Path) -> bool {
    check_readable(path).is_ok()
}

fn check_readable(path: &Path) -> Result<(), StartupFailure> {
    if !path.is_dir() {
        return Err(StartupFailure::NotADirectory(path.to_path_buf()));
    }
    fs::read_dir(path)
        .map(|_| ())
        .map_err(|source| StartupFailure::DirectoryUnreadable {
            path: path.to_path_buf(),
            source,
        })
}

/// Run the startup checks in order, stopping at the first failure. The
/// printer is only probed once the directory has passed.
///
/// Returns the canonical directory path so event paths compare equal.
pub fn validate_startup(
    dir: &Path,
    printer: &PrinterTarget,
    probe: &dyn PrinterProbe,
) -> Result<PathBuf, StartupFailure> {
    if !exists(dir) {
        return Err(StartupFailure::DirectoryMissing(dir.to_path_buf()));
    }
    check_readable(dir)?;
    if !probe.is_available(printer) {
        return Err(StartupFailure::PrinterUnavailable(printer.clone()));
    }
    Ok(fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf()))
}

/// One row of a `spool check` report.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub check: &'static str,
    pub ok: bool,
    pub detail: String,
}

/// Run every startup check without short-circuiting, for reporting.
pub fn run_checks(
    dir: &Path,
    printer: &PrinterTarget,
    probe: &dyn PrinterProbe,
) -> Vec<CheckResult> {
    let dir_exists = exists(dir);
    let mut results = vec![CheckResult {
        check: "directory exists",
        ok: dir_exists,
        detail: dir.display().to_string(),
    }];

    let readable = if dir_exists {
        check_readable(dir)
    } else {
        Err(StartupFailure::DirectoryMissing(dir.to_path_buf()))
    };
    results.push(CheckResult {
        check: "directory readable",
        ok: readable.is_ok(),
        detail: match readable {
            Ok(()) => "ok".to_string(),
            Err(err) => err.to_string(),
        },
    });

    let available = probe.is_available(printer);
    results.push(CheckResult {
        check: "printer available",
        ok: available,
        detail: printer.to_string(),
    });
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingProbe {
        available: bool,
        calls: AtomicUsize,
    }

    impl CountingProbe {
        fn new(available: bool) -> Self {
            Self {
                available,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl PrinterProbe for CountingProbe {
        fn is_available(&self, _printer: &PrinterTarget) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.available
        }
    }

    fn printer() -> PrinterTarget {
        PrinterTarget::from("Office")
    }

    #[test]
    fn missing_directory_fails_before_probing_printer() {
        let tmp = TempDir::new().expect("tmp");
        let probe = CountingProbe::new(true);
        let err = validate_startup(&tmp.path().join("nope"), &printer(), &probe)
            .expect_err("missing dir");
        assert!(matches!(err, StartupFailure::DirectoryMissing(_)));
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn file_is_not_a_watchable_directory() {
        let tmp = TempDir::new().expect("tmp");
        let file = tmp.path().join("plain.txt");
        fs::write(&file, "x").expect("write");
        let err = validate_startup(&file, &printer(), &AssumeAvailable).expect_err("file");
        assert!(matches!(err, StartupFailure::NotADirectory(_)));
        assert!(!readable(&file));
    }

    #[test]
    fn unavailable_printer_is_reported() {
        let tmp = TempDir::new().expect("tmp");
        let probe = CountingProbe::new(false);
        let err = validate_startup(tmp.path(), &printer(), &probe).expect_err("printer");
        assert!(matches!(err, StartupFailure::PrinterUnavailable(_)));
        assert!(err.to_string().contains("Office"));
    }

    #[test]
    fn valid_setup_returns_canonical_directory() {
        let tmp = TempDir::new().expect("tmp");
        let dir = validate_startup(tmp.path(), &printer(), &AssumeAvailable).expect("valid");
        assert_eq!(dir, fs::canonicalize(tmp.path()).expect("canonical"));
    }

    #[test]
    fn report_lists_every_check() {
        let tmp = TempDir::new().expect("tmp");
        let probe = CountingProbe::new(true);
        let results = run_checks(&tmp.path().join("nope"), &printer(), &probe);
        let flags: Vec<bool> = results.iter().map(|r| r.ok).collect();
        assert_eq!(flags, vec![false, false, true]);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[cfg(unix)]
    #[test]
    fn command_probe_uses_exit_status() {
        let ok = CommandProbe::new(
            CommandTemplate::new(&["true".to_string()]).expect("template"),
        );
        let failing = CommandProbe::new(
            CommandTemplate::new(&["false".to_string()]).expect("template"),
        );
        let missing = CommandProbe::new(
            CommandTemplate::new(&["spool-no-such-probe-binary".to_string()])
                .expect("template"),
        );
        assert!(ok.is_available(&printer()));
        assert!(!failing.is_available(&printer()));
        assert!(!missing.is_available(&printer()));
    }
}
