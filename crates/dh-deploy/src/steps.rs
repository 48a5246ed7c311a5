//! Remote operations performed on a single host

use crate::error::DeployResult;
use dh_core::{HostName, HostTarget, Release, RenamePlan};
use dh_remote::{shell_quote, CommandOutput, RemoteCommand, RemoteGateway, SyncOptions};
use std::path::Path;

/// Directory below the remote directory that holds shared data dirs.
pub const DATA_ROOT: &str = "data";

/// Run a command, echo its output and fail on a non-zero status.
pub async fn exec(
    gateway: &dyn RemoteGateway,
    host: &HostName,
    command: RemoteCommand,
) -> DeployResult<CommandOutput> {
    log::info!("{host}$ {command}");
    let output = gateway.run_command(host, &command).await?;
    for line in &output.lines {
        log::info!("{host}: {}", command.mask(line));
    }
    Ok(output.ensure_success(host, &command)?)
}

fn trim_data_dir(dir: &str) -> &str {
    dir.trim_matches('/')
}

/// Path a shared data dir is stored at on `target`.
pub fn data_dir_path(target: &HostTarget, dir: &str) -> String {
    target.path(&format!("{DATA_ROOT}/{}", trim_data_dir(dir)))
}

/// rsync exclude pattern that keeps a data dir out of every release.
pub fn data_dir_exclude(dir: &str) -> String {
    format!("/{}", trim_data_dir(dir))
}

/// Create the remote directory and the shared data dirs.
pub async fn prepare_directory(
    gateway: &dyn RemoteGateway,
    target: &HostTarget,
    data_dirs: &[String],
) -> DeployResult<()> {
    let mut paths = vec![shell_quote(&target.remote_dir)];
    paths.extend(
        data_dirs
            .iter()
            .map(|d| shell_quote(&data_dir_path(target, d))),
    );
    exec(
        gateway,
        &target.host,
        RemoteCommand::new(format!("mkdir -p {}", paths.join(" "))),
    )
    .await?;
    Ok(())
}

/// Transfer the local tree into a new release directory.
///
/// Files unchanged since `base` are hard-linked from it instead of copied.
pub async fn sync_release(
    gateway: &dyn RemoteGateway,
    local: &Path,
    target: &HostTarget,
    release: &Release,
    base: Option<&Release>,
    options: &SyncOptions,
) -> DeployResult<()> {
    let remote = target.path(&release.directory_name);
    let options = SyncOptions {
        link_dest: base.map(|b| target.path(&b.directory_name)),
        dry_run: false,
        delete: true,
        ..options.clone()
    };
    log::info!("{}: syncing {} to {remote}", target.host, local.display());
    let output = gateway
        .sync_tree(local, &target.host, &remote, &options)
        .await?;
    for line in &output.lines {
        log::debug!("{}: {line}", target.host);
    }
    let command = RemoteCommand::new(format!("rsync {} {remote}", local.display()));
    output.ensure_success(&target.host, &command)?;
    Ok(())
}

/// Lines rsync reports when comparing the local tree with `base`.
pub async fn preview_sync(
    gateway: &dyn RemoteGateway,
    local: &Path,
    target: &HostTarget,
    base: &Release,
    options: &SyncOptions,
) -> DeployResult<Vec<String>> {
    let remote = target.path(&base.directory_name);
    let options = SyncOptions {
        link_dest: None,
        dry_run: true,
        delete: true,
        ..options.clone()
    };
    let output = gateway
        .sync_tree(local, &target.host, &remote, &options)
        .await?;
    let command = RemoteCommand::new(format!("rsync --dry-run {} {remote}", local.display()));
    Ok(output.ensure_success(&target.host, &command)?.lines)
}

/// Point each data dir of the release at its shared location.
pub async fn link_data_dirs(
    gateway: &dyn RemoteGateway,
    target: &HostTarget,
    release: &Release,
    data_dirs: &[String],
) -> DeployResult<()> {
    let release_dir = target.path(&release.directory_name);
    for dir in data_dirs {
        let relative = trim_data_dir(dir);
        let link = format!("{release_dir}/{relative}");
        let mut line = format!("rm -rf {}", shell_quote(&link));
        if let Some((parent, _)) = relative.rsplit_once('/') {
            line.push_str(&format!(
                " && mkdir -p {}",
                shell_quote(&format!("{release_dir}/{parent}"))
            ));
        }
        line.push_str(&format!(
            " && ln -s {} {}",
            shell_quote(&data_dir_path(target, dir)),
            shell_quote(&link)
        ));
        exec(gateway, &target.host, RemoteCommand::new(line)).await?;
    }
    Ok(())
}

/// Move every planned variant over its canonical file inside the release.
pub async fn apply_renames(
    gateway: &dyn RemoteGateway,
    target: &HostTarget,
    release: &Release,
    plan: &RenamePlan,
) -> DeployResult<()> {
    let release_dir = target.path(&release.directory_name);
    for entry in plan.entries() {
        let line = format!(
            "mv -f {} {}",
            shell_quote(&format!("{release_dir}/{}", entry.variant)),
            shell_quote(&format!("{release_dir}/{}", entry.canonical))
        );
        exec(gateway, &target.host, RemoteCommand::new(line)).await?;
    }
    Ok(())
}

/// Atomically point the activation link at `release`.
pub async fn activate(
    gateway: &dyn RemoteGateway,
    target: &HostTarget,
    release: &Release,
    link_name: &str,
) -> DeployResult<()> {
    let link = target.path(link_name);
    let staging = format!("{link}.tmp");
    let line = format!(
        "ln -sfn {release} {staging} && mv -Tf {staging} {link}",
        release = shell_quote(&target.path(&release.directory_name)),
        staging = shell_quote(&staging),
        link = shell_quote(&link),
    );
    exec(gateway, &target.host, RemoteCommand::new(line)).await?;
    Ok(())
}

/// Delete a release directory.
pub async fn remove_release(
    gateway: &dyn RemoteGateway,
    target: &HostTarget,
    release: &Release,
) -> DeployResult<()> {
    let line = format!(
        "rm -rf {}",
        shell_quote(&target.path(&release.directory_name))
    );
    exec(gateway, &target.host, RemoteCommand::new(line)).await?;
    Ok(())
}

/// Run `command` with `dir` as the working directory.
pub async fn run_in(
    gateway: &dyn RemoteGateway,
    host: &HostName,
    dir: &str,
    command: &str,
) -> DeployResult<()> {
    let line = format!("cd {} && {command}", shell_quote(dir));
    exec(gateway, host, RemoteCommand::new(line)).await?;
    Ok(())
}

#[cfg(test)]
#[path = "steps_test.rs"]
mod tests;
