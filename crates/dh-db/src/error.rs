//! Error types for dh-db

use dh_remote::RemoteError;
use thiserror::Error;

/// Schema operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Statement execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// A patch script failed; the remaining patches were not run (D003)
    #[error("[D003] Failed to {action} patch '{patch}': {message}")]
    PatchFailed {
        patch: String,
        action: &'static str,
        message: String,
    },

    /// A tracking record could not be read back (D004)
    #[error("[D004] Malformed tracking record: {0}")]
    InvalidRecord(String),

    /// Mutex poisoned (D005)
    #[error("[D005] Database mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// The remote client invocation failed (D006)
    #[error("[D006] {0}")]
    Remote(#[from] RemoteError),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        DbError::ExecutionError(err.to_string())
    }
}
