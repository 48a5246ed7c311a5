//! Operator-defined remote hooks

use crate::error::DeployResult;
use crate::steps;
use dh_core::HostName;
use dh_remote::RemoteGateway;

/// Run the commands of one hook in `dir`, stopping at the first failure.
pub async fn run_hooks(
    gateway: &dyn RemoteGateway,
    host: &HostName,
    dir: &str,
    hook: &str,
    commands: &[String],
) -> DeployResult<()> {
    if commands.is_empty() {
        return Ok(());
    }
    log::info!("{host}: running {} {hook} hook(s)", commands.len());
    for command in commands {
        steps::run_in(gateway, host, dir, command).await?;
    }
    Ok(())
}
