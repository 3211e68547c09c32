//! `spool check` — run the startup checks and report, without watching.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use spool_daemon::{run_checks, AssumeAvailable, CheckResult, CommandProbe, PrinterProbe};

use super::ConfigArgs;

/// Arguments for `spool check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,

    /// Report the printer as available without running the probe command.
    #[arg(long)]
    pub skip_printer_check: bool,
}

#[derive(Serialize)]
struct CheckReportJson<'a> {
    ok: bool,
    watched_dir: String,
    printer: String,
    checks: &'a [CheckResult],
}

#[derive(Tabled)]
struct CheckTableRow {
    #[tabled(rename = "check")]
    check: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "detail")]
    detail: String,
}

impl CheckArgs {
    pub fn run(self) -> Result<()> {
        let config = self.config.resolve()?;
        let command_probe = CommandProbe::new(config.probe_command.clone());
        let probe: &dyn PrinterProbe = if self.skip_printer_check {
            &AssumeAvailable
        } else {
            &command_probe
        };
        let results = run_checks(&config.watched_dir, &config.printer, probe);
        let failed = results.iter().filter(|r| !r.ok).count();

        if self.json {
            let report = CheckReportJson {
                ok: failed == 0,
                watched_dir: config.watched_dir.display().to_string(),
                printer: config.printer.to_string(),
                checks: &results,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to render check JSON")?
            );
        } else {
            print_table(&results);
        }

        if failed > 0 {
            bail!("{failed} startup check(s) failed");
        }
        Ok(())
    }
}

fn print_table(results: &[CheckResult]) {
    let rows: Vec<CheckTableRow> = results
        .iter()
        .map(|r| CheckTableRow {
            check: r.check.to_string(),
            status: status_marker(r.ok),
            detail: r.detail.clone(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn status_marker(ok: bool) -> String {
    if ok {
        "ok".green().bold().to_string()
    } else {
        "fail".red().bold().to_string()
    }
}
