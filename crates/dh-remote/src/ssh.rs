//! ssh/rsync gateway implementation

use crate::command::{shell_quote, RemoteCommand};
use crate::error::{RemoteError, RemoteResult};
use crate::gateway::{CommandOutput, RemoteGateway, SyncOptions};
use async_trait::async_trait;
use dh_core::HostName;
use std::path::Path;
use tokio::process::Command;

/// Gateway that drives hosts through the `ssh` and `rsync` binaries.
///
/// Hosts named `localhost` are handled without ssh: commands run through
/// `sh -c` and rsync writes to a local path.
#[derive(Debug, Clone)]
pub struct SshGateway {
    ssh_path: String,
    rsync_path: String,
    user: Option<String>,
    port: u16,
}

/// A program with its arguments, ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl SshGateway {
    pub fn new(ssh_path: impl Into<String>, rsync_path: impl Into<String>) -> Self {
        Self {
            ssh_path: ssh_path.into(),
            rsync_path: rsync_path.into(),
            user: None,
            port: 22,
        }
    }

    pub fn with_user(mut self, user: Option<String>) -> Self {
        self.user = user;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// `user@host`, or just the host when no user is configured
    fn destination(&self, host: &HostName) -> String {
        match &self.user {
            Some(user) => format!("{user}@{host}"),
            None => host.to_string(),
        }
    }

    /// Program and arguments that run `command` on `host`.
    pub fn command_invocation(&self, host: &HostName, command: &RemoteCommand) -> Invocation {
        if host.is_local() {
            return Invocation {
                program: "sh".to_string(),
                args: vec!["-c".to_string(), command.line().to_string()],
            };
        }

        let mut args = Vec::new();
        if self.port != 22 {
            args.push("-p".to_string());
            args.push(self.port.to_string());
        }
        args.push(self.destination(host));
        args.push(command.line().to_string());
        Invocation {
            program: self.ssh_path.clone(),
            args,
        }
    }

    /// Program and arguments that transfer `local` into `remote` on `host`.
    pub fn sync_invocation(
        &self,
        local: &Path,
        host: &HostName,
        remote: &str,
        options: &SyncOptions,
    ) -> RemoteResult<Invocation> {
        let local = local.to_str().ok_or_else(|| RemoteError::InvalidPath {
            path: local.display().to_string(),
            reason: "path is not valid UTF-8".to_string(),
        })?;

        let mut args = vec!["-vazcO".to_string(), "--force".to_string()];
        if options.delete {
            args.push("--delete".to_string());
        }
        if options.dry_run {
            args.push("--dry-run".to_string());
        }
        for file in &options.exclude_files {
            if !file.is_file() {
                return Err(RemoteError::InvalidPath {
                    path: file.display().to_string(),
                    reason: "rsync exclude file not found".to_string(),
                });
            }
            args.push(format!("--exclude-from={}", file.display()));
        }
        for path in &options.exclude_paths {
            args.push("--exclude".to_string());
            args.push(path.clone());
        }
        if let Some(link_dest) = &options.link_dest {
            args.push(format!("--link-dest={link_dest}"));
        }

        let source = format!("{}/", local.trim_end_matches('/'));
        let target = remote.trim_end_matches('/');
        if host.is_local() {
            args.push(source);
            args.push(format!("{target}/"));
        } else {
            let ssh = if self.port != 22 {
                format!("{} -p {}", self.ssh_path, self.port)
            } else {
                self.ssh_path.clone()
            };
            args.push("-e".to_string());
            args.push(ssh);
            args.push(source);
            args.push(format!("{}:{}/", self.destination(host), target));
        }

        Ok(Invocation {
            program: self.rsync_path.clone(),
            args,
        })
    }

    async fn spawn(&self, invocation: &Invocation) -> RemoteResult<CommandOutput> {
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(std::process::Stdio::null())
            .output()
            .await
            .map_err(|e| RemoteError::Spawn {
                program: invocation.program.clone(),
                source: e,
            })?;

        Ok(CommandOutput {
            lines: String::from_utf8_lossy(&output.stdout)
                .lines()
                .map(str::to_string)
                .collect(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            status: output.status.code().unwrap_or(-1),
        })
    }
}

impl Default for SshGateway {
    fn default() -> Self {
        Self::new("ssh", "rsync")
    }
}

#[async_trait]
impl RemoteGateway for SshGateway {
    async fn list_directory(&self, host: &HostName, path: &str) -> RemoteResult<Vec<String>> {
        let quoted = shell_quote(path);
        let command = RemoteCommand::new(format!("if [ -d {quoted} ]; then ls -1 {quoted}; fi"));
        let output = self.run_command(host, &command).await?;
        let output = output.ensure_success(host, &command)?;
        Ok(output
            .lines
            .into_iter()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect())
    }

    async fn run_command(
        &self,
        host: &HostName,
        command: &RemoteCommand,
    ) -> RemoteResult<CommandOutput> {
        log::debug!("{host}: {command}");
        let invocation = self.command_invocation(host, command);
        self.spawn(&invocation).await
    }

    async fn sync_tree(
        &self,
        local: &Path,
        host: &HostName,
        remote: &str,
        options: &SyncOptions,
    ) -> RemoteResult<CommandOutput> {
        let invocation = self.sync_invocation(local, host, remote, options)?;
        log::debug!("{host}: {} {}", invocation.program, invocation.args.join(" "));
        self.spawn(&invocation).await
    }

    fn gateway_type(&self) -> &'static str {
        "ssh"
    }
}

#[cfg(test)]
#[path = "ssh_test.rs"]
mod tests;
