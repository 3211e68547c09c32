pub mod check;
pub mod config;
pub mod watch;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use spool_core::{config as spool_config, KeywordSet, PrinterTarget, SpoolConfig};
use spool_daemon::DaemonConfig;

use crate::IntakeModeArg;

/// Config file selection plus per-field overrides shared by `watch` and `check`.
///
/// Precedence: flags, then the config file, then built-in defaults.
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// Read configuration from this file instead of ~/.spool/config.yaml.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory to watch (non-recursive).
    #[arg(long, short = 'd', value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Printer (CUPS queue) name.
    #[arg(long, short = 'p')]
    pub printer: Option<String>,

    /// File name keyword; repeat for several. Replaces the configured list.
    #[arg(long = "keyword", short = 'k', value_name = "TEXT")]
    pub keywords: Vec<String>,

    /// Intake source: events | poll.
    #[arg(long, value_name = "MODE")]
    pub intake: Option<IntakeModeArg>,

    /// Shorthand for `--intake poll`.
    #[arg(long, conflicts_with = "intake")]
    pub poll: bool,

    /// Seconds between directory listings in poll mode.
    #[arg(long, value_name = "SECS")]
    pub poll_interval: Option<u64>,

    /// Number of files dispatched concurrently.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Retry a failed print this many times.
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Seconds before a print command is killed and counted as failed.
    #[arg(long, value_name = "SECS")]
    pub print_timeout: Option<u64>,

    /// Also print matching files already in the directory at startup.
    #[arg(long)]
    pub process_existing: bool,
}

impl ConfigArgs {
    /// Load the config file (if any) and apply flag overrides.
    pub fn load(&self) -> Result<SpoolConfig> {
        let mut config = match &self.config {
            Some(path) => spool_config::load_file(path)
                .with_context(|| format!("failed to load config '{}'", path.display()))?,
            None => spool_config::load().context("failed to load ~/.spool/config.yaml")?,
        };

        if let Some(dir) = &self.dir {
            config.watched_dir = dir.clone();
        }
        if let Some(printer) = &self.printer {
            config.printer = PrinterTarget::from(printer.as_str());
        }
        if !self.keywords.is_empty() {
            config.keywords = KeywordSet::new(self.keywords.iter().cloned());
        }
        if let Some(intake) = self.intake {
            config.intake = intake.into();
        }
        if self.poll {
            config.intake = spool_core::IntakeMode::Poll;
        }
        if let Some(secs) = self.poll_interval {
            config.poll_interval_secs = secs;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(retries) = self.max_retries {
            config.max_retries = retries;
        }
        if let Some(secs) = self.print_timeout {
            config.print_timeout_secs = secs;
        }
        if self.process_existing {
            config.process_existing = true;
        }
        Ok(config)
    }

    /// Effective, validated daemon settings with `~` expanded.
    pub fn resolve(&self) -> Result<DaemonConfig> {
        let config = self.load()?;
        let home = spool_config::home().context("could not determine home directory")?;
        DaemonConfig::from_spool(&config, &home).context("invalid configuration")
    }
}
