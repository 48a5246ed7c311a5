//! Shared utilities for CLI commands

use anyhow::Result;
use dh_core::config::CONFIG_FILE_NAME;
use dh_core::Config;
use dh_deploy::{
    AutoConfirm, Confirmer, ConfiguredCredentials, CredentialProvider, Orchestrator, RunOutcome,
};
use dh_remote::SshGateway;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::GlobalArgs;
use crate::prompt::{TerminalConfirmer, TerminalCredentials};

/// `--config`, or `deckhand.yml` in the project directory.
pub(crate) fn config_path(global: &GlobalArgs) -> PathBuf {
    match &global.config {
        Some(path) => PathBuf::from(path),
        None => Path::new(&global.project_dir).join(CONFIG_FILE_NAME),
    }
}

/// Load the configuration and the project root it is relative to.
pub(crate) fn load_config(global: &GlobalArgs) -> Result<(Config, PathBuf)> {
    let path = config_path(global);
    let config = Config::load(&path)?;
    let root = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    log::debug!("Loaded {} (project root {})", path.display(), root.display());
    Ok((config, root))
}

/// Orchestrator talking ssh/rsync, prompting unless `--yes` was given.
pub(crate) fn build_orchestrator(
    config: Config,
    root: &Path,
    global: &GlobalArgs,
) -> Result<Orchestrator> {
    let gateway = SshGateway::new(config.ssh_path.clone(), config.rsync_path.clone())
        .with_user(config.remote_user.clone())
        .with_port(config.remote_port);

    let (confirmer, credentials): (Arc<dyn Confirmer>, Arc<dyn CredentialProvider>) =
        if global.yes {
            (Arc::new(AutoConfirm), Arc::new(ConfiguredCredentials))
        } else {
            (Arc::new(TerminalConfirmer), Arc::new(TerminalCredentials))
        };

    Ok(Orchestrator::new(
        config,
        root,
        Arc::new(gateway),
        confirmer,
        credentials,
    )?)
}

/// Print how a run ended. Declining and having nothing to roll back are
/// normal outcomes and exit with success.
pub(crate) fn report(outcome: RunOutcome, verb: &str) -> Result<()> {
    match outcome {
        RunOutcome::Completed => {
            println!("{verb} finished");
            Ok(())
        }
        RunOutcome::Declined => {
            println!("{verb} aborted, nothing was changed");
            Ok(())
        }
        RunOutcome::RollbackUnavailable => {
            println!("Nothing to roll back: every host needs a previous release");
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
