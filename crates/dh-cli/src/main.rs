//! Deckhand CLI - zero-downtime releases and schema patches over ssh/rsync

use clap::Parser;
use std::process::ExitCode;

mod cli;
mod commands;
mod prompt;

use cli::{Cli, Commands};
use commands::{cleanup, deploy, rollback};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.global.verbose);

    let result = match &cli.command {
        Commands::Deploy(args) => deploy::execute(args, &cli.global).await,
        Commands::Rollback(args) => rollback::execute(args, &cli.global).await,
        Commands::Cleanup(args) => cleanup::execute(args, &cli.global).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

/// `info` by default, `debug` with `-v`; `RUST_LOG` wins over both.
fn init_logger(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}
