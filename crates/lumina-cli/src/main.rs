mod commands;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lumina", about = "Live detector frame viewer pipeline")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show image file dimensions, pixel type and statistics
    Info(commands::info::InfoArgs),
    /// Print or save a default pipeline config
    Config(commands::config::ConfigArgs),
    /// Poll image sources and run the live pipeline
    Run(commands::run::RunArgs),
    /// Process image files as consecutive frames
    Replay(commands::replay::ReplayArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Info(args) => commands::info::run(args),
        Commands::Config(args) => commands::config::run(args),
        Commands::Run(args) => commands::run::run(args),
        Commands::Replay(args) => commands::replay::run(args),
    }
}
