//! Resolved, immutable daemon settings built from a [`SpoolConfig`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use spool_core::config::SpoolConfig;
use spool_core::{ConfigError, IntakeMode, KeywordSet, PrinterTarget};

use crate::command::CommandTemplate;
use crate::error::DaemonError;

/// Bounded retry for failed prints. `max_retries == 0` disables retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based): backoff × 2^attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(attempt))
    }
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub watched_dir: PathBuf,
    pub printer: PrinterTarget,
    pub keywords: KeywordSet,
    pub intake: IntakeMode,
    pub poll_interval: Duration,
    pub settle_interval: Duration,
    pub settle_timeout: Duration,
    pub print_timeout: Duration,
    pub grace_period: Duration,
    pub workers: usize,
    pub retry: RetryPolicy,
    pub process_existing: bool,
    pub print_command: CommandTemplate,
    pub probe_command: CommandTemplate,
    pub skip_printer_check: bool,
}

impl DaemonConfig {
    /// Validate `config` and expand `~` in the watched directory against `home`.
    pub fn from_spool(config: &SpoolConfig, home: &Path) -> Result<Self, DaemonError> {
        config.validate()?;
        let print_command = CommandTemplate::new(&config.print_command).ok_or(
            ConfigError::Invalid {
                field: "print_command",
                reason: "program is required".to_string(),
            },
        )?;
        let probe_command = CommandTemplate::new(&config.probe_command).ok_or(
            ConfigError::Invalid {
                field: "probe_command",
                reason: "program is required".to_string(),
            },
        )?;

        Ok(Self {
            watched_dir: config.watched_dir_at(home),
            printer: config.printer.clone(),
            keywords: config.keywords.clone(),
            intake: config.intake,
            poll_interval: config.poll_interval(),
            settle_interval: config.settle_interval(),
            settle_timeout: config.settle_timeout(),
            print_timeout: config.print_timeout(),
            grace_period: config.grace_period(),
            workers: config.workers,
            retry: RetryPolicy {
                max_retries: config.max_retries,
                backoff: config.retry_backoff(),
            },
            process_existing: config.process_existing,
            print_command,
            probe_command,
            skip_printer_check: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tilde_is_expanded_against_home() {
        let home = Path::new("/home/tester");
        let config = DaemonConfig::from_spool(&SpoolConfig::default(), home).expect("config");
        assert_eq!(config.watched_dir, PathBuf::from("/home/tester/Downloads"));
        assert_eq!(config.print_command.program(), "lp");
        assert_eq!(config.retry, RetryPolicy { max_retries: 0, backoff: Duration::from_secs(5) });
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SpoolConfig {
            keywords: KeywordSet::default(),
            ..SpoolConfig::default()
        };
        let err = DaemonConfig::from_spool(&config, Path::new("/home/tester")).expect_err("invalid");
        assert!(matches!(err, DaemonError::Config(_)));
    }

    #[test]
    fn retry_backoff_doubles() {
        let policy = RetryPolicy {
            max_retries: 3,
            backoff: Duration::from_secs(5),
        };
        assert_eq!(policy.delay_for(0), Duration::from_secs(5));
        assert_eq!(policy.delay_for(1), Duration::from_secs(10));
        assert_eq!(policy.delay_for(2), Duration::from_secs(20));
    }
}
