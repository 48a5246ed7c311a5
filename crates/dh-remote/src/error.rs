//! Error types for dh-remote

use thiserror::Error;

/// Remote execution errors
#[derive(Error, Debug)]
pub enum RemoteError {
    /// R001: The ssh/rsync/sh process could not be started
    #[error("[R001] Failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// R002: A remote operation exited with a non-zero status
    #[error("[R002] {host}: `{command}` failed with status {status}{}", format_stderr(.stderr))]
    OperationFailed {
        host: String,
        command: String,
        status: i32,
        stderr: String,
    },

    /// R003: A local path handed to the transfer is unusable
    #[error("[R003] Invalid local path {path}: {reason}")]
    InvalidPath { path: String, reason: String },
}

fn format_stderr(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

/// Result type alias for RemoteError
pub type RemoteResult<T> = Result<T, RemoteError>;
