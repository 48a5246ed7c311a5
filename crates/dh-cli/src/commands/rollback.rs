//! Rollback command implementation

use anyhow::Result;
use dh_deploy::Orchestrator;

use crate::cli::{GlobalArgs, RollbackArgs};
use crate::commands::common;

/// Execute the rollback command
pub async fn execute(_args: &RollbackArgs, global: &GlobalArgs) -> Result<()> {
    let (config, root) = common::load_config(global)?;
    let orchestrator = common::build_orchestrator(config, &root, global)?;
    run(&orchestrator).await
}

pub(crate) async fn run(orchestrator: &Orchestrator) -> Result<()> {
    let outcome = orchestrator.rollback().await?;
    common::report(outcome, "Rollback")
}
