//! YAML daemon configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.spool/
//!   config.yaml   (mode 0600, written by `spool config init`)
//! ```
//!
//! A missing config file is not an error: every field falls back to the
//! built-in default, and any field may be omitted from the file.
//!
//! # API pattern
//!
//! Every function touching the home directory has two forms:
//! - `fn_at(home: &Path, …)` — explicit home; used in tests with `TempDir`
//! - `fn(…)` — derives home from `dirs::home_dir()`, delegates to `_at`

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{invalid, io_err, ConfigError};
use crate::types::{IntakeMode, KeywordSet, PrinterTarget};

pub const CONFIG_DIR: &str = ".spool";
pub const CONFIG_FILE: &str = "config.yaml";

/// Placeholder replaced by the printer identifier in command templates.
pub const PRINTER_PLACEHOLDER: &str = "{printer}";
/// Placeholder replaced by the candidate path in command templates.
pub const PATH_PLACEHOLDER: &str = "{path}";

pub const DEFAULT_WATCHED_DIR: &str = "~/Downloads";
pub const DEFAULT_PRINTER: &str = "HP_LaserJet_M402dw__031836_";
/// Longest accepted `settle_timeout_secs` (one day).
pub const MAX_SETTLE_TIMEOUT_SECS: u64 = 86_400;

pub const DEFAULT_KEYWORDS: [&str; 4] = ["WorkConfirmation", "label_", "_shipper", "PackingList"];

// ---------------------------------------------------------------------------
// 1. Config struct
// ---------------------------------------------------------------------------

/// Complete daemon configuration. Immutable once the daemon starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpoolConfig {
    /// Directory to watch (non-recursive). A leading `~` expands to home.
    pub watched_dir: PathBuf,
    pub printer: PrinterTarget,
    pub keywords: KeywordSet,
    pub intake: IntakeMode,
    pub poll_interval_secs: u64,
    /// Quiescence interval between the two size/mtime samples.
    pub settle_interval_ms: u64,
    /// Give up on a file that is still changing after this long.
    pub settle_timeout_secs: u64,
    /// Kill the print command and report failure after this long.
    pub print_timeout_secs: u64,
    /// How long shutdown waits for in-flight dispatches.
    pub grace_period_secs: u64,
    pub workers: usize,
    /// Extra attempts after a failed print; 0 disables retries.
    pub max_retries: u32,
    /// Initial retry delay; doubled for each further attempt.
    pub retry_backoff_secs: u64,
    /// With event intake, also queue files already present at startup.
    pub process_existing: bool,
    /// Program and arguments for printing; `{printer}` and `{path}` are substituted.
    pub print_command: Vec<String>,
    /// Program and arguments for the startup availability probe.
    pub probe_command: Vec<String>,
}

impl Default for SpoolConfig {
    fn default() -> Self {
        Self {
            watched_dir: PathBuf::from(DEFAULT_WATCHED_DIR),
            printer: PrinterTarget::from(DEFAULT_PRINTER),
            keywords: KeywordSet::new(DEFAULT_KEYWORDS),
            intake: IntakeMode::Events,
            poll_interval_secs: 2,
            settle_interval_ms: 1_000,
            settle_timeout_secs: 300,
            print_timeout_secs: 60,
            grace_period_secs: 30,
            workers: 1,
            max_retries: 0,
            retry_backoff_secs: 5,
            process_existing: false,
            print_command: vec![
                "lp".to_string(),
                "-d".to_string(),
                PRINTER_PLACEHOLDER.to_string(),
                PATH_PLACEHOLDER.to_string(),
            ],
            probe_command: vec![
                "lpstat".to_string(),
                "-p".to_string(),
                PRINTER_PLACEHOLDER.to_string(),
            ],
        }
    }
}

impl SpoolConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn settle_interval(&self) -> Duration {
        Duration::from_millis(self.settle_interval_ms)
    }

    pub fn settle_timeout(&self) -> Duration {
        Duration::from_secs(self.settle_timeout_secs)
    }

    pub fn print_timeout(&self) -> Duration {
        Duration::from_secs(self.print_timeout_secs)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }

    /// `watched_dir` with a leading `~` replaced by `home`. No filesystem access.
    pub fn watched_dir_at(&self, home: &Path) -> PathBuf {
        expand_home(&self.watched_dir, home)
    }

    /// Reject values the daemon cannot run with. Does not touch the filesystem;
    /// directory and printer checks happen at daemon startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watched_dir.as_os_str().is_empty() {
            return Err(invalid("watched_dir", "must not be empty"));
        }
        if self.printer.0.trim().is_empty() {
            return Err(invalid("printer", "must not be empty"));
        }
        if self.keywords.is_empty() {
            return Err(invalid("keywords", "at least one keyword is required"));
        }
        if self.keywords.as_slice().iter().any(String::is_empty) {
            return Err(invalid("keywords", "empty keyword would match every file"));
        }
        if self.workers == 0 {
            return Err(invalid("workers", "must be at least 1"));
        }
        if self.poll_interval_secs == 0 {
            return Err(invalid("poll_interval_secs", "must be greater than 0"));
        }
        if self.settle_interval_ms == 0 {
            return Err(invalid("settle_interval_ms", "must be greater than 0"));
        }
        if self.settle_timeout_secs == 0 || self.settle_timeout_secs > MAX_SETTLE_TIMEOUT_SECS {
            return Err(invalid(
                "settle_timeout_secs",
                format!("must be between 1 and {MAX_SETTLE_TIMEOUT_SECS}"),
            ));
        }
        if self.print_timeout_secs == 0 {
            return Err(invalid("print_timeout_secs", "must be greater than 0"));
        }
        if self.print_command.is_empty() {
            return Err(invalid("print_command", "program is required"));
        }
        if !self
            .print_command
            .iter()
            .any(|arg| arg.contains(PATH_PLACEHOLDER))
        {
            return Err(invalid(
                "print_command",
                format!("must reference the file via {PATH_PLACEHOLDER}"),
            ));
        }
        if self.probe_command.is_empty() {
            return Err(invalid("probe_command", "program is required"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// 2. Paths
// ---------------------------------------------------------------------------

/// `<home>/.spool/config.yaml` — pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(CONFIG_DIR).join(CONFIG_FILE)
}

/// `config_path_at` convenience wrapper.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_path_at(&home()?))
}

/// Replace a leading `~` component with `home`.
pub fn expand_home(path: &Path, home: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => home.join(components.as_path()),
        _ => path.to_path_buf(),
    }
}

// ---------------------------------------------------------------------------
// 3. Load / save
// ---------------------------------------------------------------------------

/// Load `<home>/.spool/config.yaml`, or the defaults if the file is absent.
pub fn load_at(home: &Path) -> Result<SpoolConfig, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(SpoolConfig::default());
    }
    load_file(&path)
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<SpoolConfig, ConfigError> {
    load_at(&home()?)
}

/// Load an explicitly named config file. Unlike [`load_at`], a missing file
/// is an error.
pub fn load_file(path: &Path) -> Result<SpoolConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    if contents.trim().is_empty() {
        return Ok(SpoolConfig::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Atomically write `config` to `<home>/.spool/config.yaml` (mode 0600).
pub fn save_at(home: &Path, config: &SpoolConfig) -> Result<PathBuf, ConfigError> {
    let dir = home.join(CONFIG_DIR);
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        set_dir_permissions(&dir)?;
    }
    let path = config_path_at(home);
    let tmp_path = path.with_file_name(format!("{CONFIG_FILE}.tmp"));

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml).map_err(|e| io_err(&tmp_path, e))?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path).map_err(|e| io_err(&path, e))?;
    Ok(path)
}

/// Write a default config file. Refuses to overwrite unless `force` is set.
pub fn init_at(home: &Path, force: bool) -> Result<PathBuf, ConfigError> {
    let path = config_path_at(home);
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists { path });
    }
    save_at(home, &SpoolConfig::default())
}

/// `init_at` convenience wrapper.
pub fn init(force: bool) -> Result<PathBuf, ConfigError> {
    init_at(&home()?, force)
}

// ---------------------------------------------------------------------------
// 4. Helpers
// ---------------------------------------------------------------------------

pub fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
