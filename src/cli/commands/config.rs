//! Config command implementation.

use anyhow::Result;
use clap::Subcommand;

use crate::models::Config;

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the resolved configuration
    Show,

    /// Print the configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle_config(cmd: ConfigCommand, _verbose: bool) -> Result<()> {
    match cmd {
        ConfigCommand::Show => {
            let config = Config::load()?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigCommand::Path => match Config::config_path() {
            Some(path) => println!("{}", path.display()),
            None => println!("Could not determine config directory."),
        },
        ConfigCommand::Init { force } => {
            if let Some(path) = Config::config_path()
                && path.exists()
                && !force
            {
                anyhow::bail!(
                    "config already exists at {} (use --force to overwrite)",
                    path.display()
                );
            }
            let config = Config::default();
            config.save()?;
            if let Some(path) = Config::config_path() {
                println!("Wrote default config to {}", path.display());
            }
        }
    }

    Ok(())
}
