//! `spool watch` — run the print daemon in the foreground.

use anyhow::{Context, Result};
use clap::Args;

use spool_daemon::start_blocking;

use super::ConfigArgs;

#[derive(Args, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Do not query the printer status command at startup.
    #[arg(long)]
    pub skip_printer_check: bool,

    /// Emit log lines as JSON.
    #[arg(long)]
    pub log_json: bool,
}

impl WatchArgs {
    pub fn run(self) -> Result<()> {
        let mut config = self.config.resolve()?;
        config.skip_printer_check = self.skip_printer_check;
        start_blocking(config, self.log_json).context("daemon exited with error")
    }
}
