//! Deploy command implementation

use anyhow::Result;
use dh_deploy::Orchestrator;

use crate::cli::{DeployArgs, GlobalArgs};
use crate::commands::common;

/// Execute the deploy command
pub async fn execute(args: &DeployArgs, global: &GlobalArgs) -> Result<()> {
    let (mut config, root) = common::load_config(global)?;
    if args.parallel {
        config.parallel_sync = true;
    }
    let orchestrator = common::build_orchestrator(config, &root, global)?;
    run(&orchestrator).await
}

pub(crate) async fn run(orchestrator: &Orchestrator) -> Result<()> {
    let outcome = orchestrator.deploy().await?;
    common::report(outcome, "Deploy")
}
