use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

use config::Overrides;

#[derive(Parser)]
#[command(name = "policyd", about = "Aggregate and enforce device policies from several administrators")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Policy database (overrides config)
    #[arg(long, global = true, value_name = "PATH")]
    database: Option<PathBuf>,

    /// Provider module directory (overrides config)
    #[arg(long, global = true, value_name = "DIR")]
    providers: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List loaded providers and their policies
    Providers,
    /// List enrolled administrators
    Admins,
    /// Enroll an administrator
    Enroll(commands::admin::AdminArgs),
    /// Disenroll an administrator and drop its values
    Disenroll(commands::admin::AdminArgs),
    /// Activate or deactivate an administrator
    Activate(commands::admin::ActivateArgs),
    /// Submit an administrator's value for a policy
    Set(commands::policy::SetArgs),
    /// Show the effective value of a policy
    Get(commands::policy::GetArgs),
    /// Show the effective value of every policy
    GetAll(commands::policy::GetAllArgs),
    /// Manage configuration
    Config(commands::config::ConfigArgs),
    /// Serve policy requests
    Serve(commands::serve::ServeArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries command output and the serve protocol
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let overrides = Overrides {
        database: cli.database,
        provider_dir: cli.providers,
    };

    match cli.command {
        Commands::Providers => commands::providers::run(&overrides),
        Commands::Admins => commands::admin::list(&overrides),
        Commands::Enroll(args) => commands::admin::enroll(&overrides, args),
        Commands::Disenroll(args) => commands::admin::disenroll(&overrides, args),
        Commands::Activate(args) => commands::admin::activate(&overrides, args),
        Commands::Set(args) => commands::policy::set(&overrides, args),
        Commands::Get(args) => commands::policy::get(&overrides, args),
        Commands::GetAll(args) => commands::policy::get_all(&overrides, args),
        Commands::Config(args) => commands::config::run(&overrides, args),
        Commands::Serve(args) => commands::serve::run(&overrides, args).await,
    }
}
