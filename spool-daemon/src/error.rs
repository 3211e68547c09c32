use std::path::PathBuf;

use thiserror::Error;

use crate::validate::StartupFailure;

/// Error surface for daemon startup and runtime.
///
/// Only startup and configuration problems reach this type; failures while
/// handling a single candidate file are logged and contained.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("config error: {0}")]
    Config(#[from] spool_core::ConfigError),

    #[error("startup validation failed: {0}")]
    StartupValidation(#[from] StartupFailure),

    #[error("daemon runtime error: {0}")]
    Runtime(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
