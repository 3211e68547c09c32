//! spool — print files dropped into a directory, then remove them.
//!
//! # Usage
//!
//! ```text
//! spool watch [--dir <path>] [--printer <name>] [--keyword <text>]... [--intake events|poll]
//! spool check [--json] [...same overrides as watch]
//! spool config path|show|init [--force]
//! ```

mod commands;

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{check::CheckArgs, config::ConfigCommand, watch::WatchArgs};
use spool_core::IntakeMode;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "spool",
    version,
    about = "Watch a directory and print files whose names match keywords",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the watcher in the foreground until interrupted.
    Watch(WatchArgs),

    /// Validate the watched directory and printer without starting.
    Check(CheckArgs),

    /// Inspect or create the config file.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

// ---------------------------------------------------------------------------
// Shared IntakeMode argument
// ---------------------------------------------------------------------------

/// Thin wrapper so clap can parse `IntakeMode` from CLI args.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntakeModeArg(pub IntakeMode);

impl FromStr for IntakeModeArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "events" => Ok(Self(IntakeMode::Events)),
            "poll" => Ok(Self(IntakeMode::Poll)),
            other => Err(format!("unknown intake mode '{other}'; expected: events, poll")),
        }
    }
}

impl fmt::Display for IntakeModeArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<IntakeModeArg> for IntakeMode {
    fn from(m: IntakeModeArg) -> Self {
        m.0
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Watch(args) => args.run(),
        Commands::Check(args) => args.run(),
        Commands::Config { command } => commands::config::run(command),
    }
}
