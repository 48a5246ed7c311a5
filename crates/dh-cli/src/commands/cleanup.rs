//! Cleanup command implementation

use anyhow::Result;

use crate::cli::{CleanupArgs, GlobalArgs};
use crate::commands::common;

/// Execute the cleanup command
pub async fn execute(args: &CleanupArgs, global: &GlobalArgs) -> Result<()> {
    let (mut config, root) = common::load_config(global)?;
    if let Some(keep) = args.keep {
        config.keep_releases = keep;
    }
    let orchestrator = common::build_orchestrator(config, &root, global)?;
    let outcome = orchestrator.cleanup().await?;
    common::report(outcome, "Cleanup")
}
