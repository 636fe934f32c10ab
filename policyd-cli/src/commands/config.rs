use crate::config::{CONFIG_ENV, ConfigLoader, Overrides};
use anyhow::Result;
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration (merged)
    Show,
    /// Show configuration file paths
    Path,
}

pub fn run(overrides: &Overrides, args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(overrides),
        ConfigCommands::Path => show_paths(),
    }
}

fn show_config(overrides: &Overrides) -> Result<()> {
    let config = ConfigLoader::load(overrides)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{}", toml_str);
    Ok(())
}

fn show_paths() -> Result<()> {
    println!("User config: {:?}", ConfigLoader::user_config_path());
    println!("{}: {:?}", CONFIG_ENV, ConfigLoader::env_config_path());
    Ok(())
}
