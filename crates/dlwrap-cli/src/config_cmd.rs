//! `dlwrap config` subcommands.

use anyhow::Result;
use clap::Subcommand;
use dlwrap_config::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Print the config file locations
    Path,
}

pub fn run(config: &Config, action: ConfigCommands) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            print!("{}", config.to_toml()?);
        }
        ConfigCommands::Path => {
            match Config::global_config_path() {
                Some(global) => println!("Global:  {}", global.display()),
                None => println!("Global:  (no home directory)"),
            }
            println!("Project: {}", Config::project_config_path().display());
        }
    }
    Ok(())
}
