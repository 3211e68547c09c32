//! `spool config` — locate, show, or create the config file.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use spool_core::config;

use super::ConfigArgs;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the config file location.
    Path,
    /// Print the effective configuration (file plus overrides) as YAML.
    Show(ShowArgs),
    /// Write a config file populated with the defaults.
    Init(InitArgs),
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config file.
    #[arg(long)]
    pub force: bool,
}

pub fn run(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Path => {
            let path = config::config_path().context("could not determine home directory")?;
            println!("{}", path.display());
        }
        ConfigCommand::Show(args) => {
            let effective = args.config.load()?;
            effective.validate().context("invalid configuration")?;
            let yaml =
                serde_yaml::to_string(&effective).context("failed to render config YAML")?;
            print!("{yaml}");
        }
        ConfigCommand::Init(args) => {
            let path = config::init(args.force).context("failed to write config")?;
            println!("✓ Wrote default config to {}", path.display());
        }
    }
    Ok(())
}
