//! Rostersnap CLI - Command-line interface for the player photo sync
//!
//! Provides commands for:
//! - Synchronizing the local photo directory with the storage bucket
//! - Capturing a new photo for a player
//! - Viewing local and pending-upload status
//! - Inspecting configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rostersnap_core::config::Config;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    capture::CaptureCommand, completions::CompletionsCommand, config::ConfigCommand,
    status::StatusCommand, sync::SyncCommand, Context,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "rostersnap",
    version,
    about = "Player photo sync for tournament rosters"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Download missing photos and upload pending captures
    Sync(SyncCommand),
    /// Show local photo and upload queue status
    Status(StatusCommand),
    /// Store a new photo for a player and queue it for upload
    Capture(CaptureCommand),
    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

/// Picks the log filter: `RUST_LOG`, then `-v` flags, then the config level
fn env_filter(verbose: u8, config_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match verbose {
            0 => config_level,
            1 => "debug",
            _ => "trace",
        };
        EnvFilter::new(level)
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = commands::load_config(&config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(cli.verbose, &config.logging.level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let ctx = Context {
        format,
        quiet: cli.quiet,
        config_path,
        config,
    };

    match cli.command {
        Commands::Sync(cmd) => cmd.execute(&ctx).await,
        Commands::Status(cmd) => cmd.execute(&ctx).await,
        Commands::Capture(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
        Commands::Completions(cmd) => cmd.execute(&ctx).await,
    }
}
