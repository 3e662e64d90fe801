mod commands;
mod progress;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "leap-prep",
    about = "Remove the background from a video and save it as a LEAP training stack"
)]
#[command(version, args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    prep: commands::prep::PrepArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Show video metadata
    Info(commands::info::InfoArgs),
    /// Print or save the default configuration as TOML
    Config(commands::config::ConfigArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("info")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Info(args)) => {
            init_tracing(false);
            commands::info::run(args)
        }
        Some(Commands::Config(args)) => {
            init_tracing(false);
            commands::config::run(args)
        }
        None => {
            let config = commands::prep::resolve_config(&cli.prep)?;
            init_tracing(config.verbose);
            commands::prep::run(&config)
        }
    }
}
