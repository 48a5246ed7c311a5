//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand};

/// Deckhand - zero-downtime releases and schema patches over ssh/rsync
#[derive(Parser, Debug)]
#[command(name = "dh")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Answer yes to every confirmation and use configured credentials only
    #[arg(short, long, global = true)]
    pub yes: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Release the project to every host and apply pending schema patches
    Deploy(DeployArgs),

    /// Return every host to its previous release and revert schema patches
    Rollback(RollbackArgs),

    /// Remove old releases from every host
    Cleanup(CleanupArgs),
}

/// Arguments for the deploy command
#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Synchronize files to all hosts concurrently
    #[arg(long)]
    pub parallel: bool,
}

/// Arguments for the rollback command
#[derive(Args, Debug)]
pub struct RollbackArgs {}

/// Arguments for the cleanup command
#[derive(Args, Debug)]
pub struct CleanupArgs {
    /// Number of releases to keep per host (overrides keep_releases)
    #[arg(long)]
    pub keep: Option<usize>,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
