//! Remote execution gateway trait definition

use crate::command::RemoteCommand;
use crate::error::{RemoteError, RemoteResult};
use async_trait::async_trait;
use dh_core::HostName;
use std::path::{Path, PathBuf};

/// Captured result of a remote command or transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// stdout, one entry per line
    pub lines: Vec<String>,

    /// stderr as produced
    pub stderr: String,

    /// Exit status, -1 when killed by a signal
    pub status: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Turn a non-zero status into [`RemoteError::OperationFailed`].
    pub fn ensure_success(self, host: &HostName, command: &RemoteCommand) -> RemoteResult<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(RemoteError::OperationFailed {
                host: host.to_string(),
                command: command.masked(),
                status: self.status,
                stderr: command.mask(&self.stderr),
            })
        }
    }
}

/// How a local tree is transferred into a remote directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Files handed to `--exclude-from`
    pub exclude_files: Vec<PathBuf>,

    /// Paths excluded relative to the transfer root, e.g. `/web/uploads`
    pub exclude_paths: Vec<String>,

    /// Remote directory unchanged files are hard-linked from
    pub link_dest: Option<String>,

    /// Report what would change without transferring
    pub dry_run: bool,

    /// Remove remote files missing locally
    pub delete: bool,
}

/// Remote execution abstraction
///
/// Every remote mutation of a deployment goes through this trait.
/// Implementations must be Send + Sync for async operation.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Entry names directly below `path` on `host`
    async fn list_directory(&self, host: &HostName, path: &str) -> RemoteResult<Vec<String>>;

    /// Run a shell command on `host`; the status is returned, not checked
    async fn run_command(&self, host: &HostName, command: &RemoteCommand)
        -> RemoteResult<CommandOutput>;

    /// Transfer the contents of `local` into `remote` on `host`
    async fn sync_tree(
        &self,
        local: &Path,
        host: &HostName,
        remote: &str,
        options: &SyncOptions,
    ) -> RemoteResult<CommandOutput>;

    /// Gateway identifier for logging
    fn gateway_type(&self) -> &'static str;
}
