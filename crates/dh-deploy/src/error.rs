//! Error types for dh-deploy

use dh_core::CoreError;
use dh_db::DbError;
use dh_remote::RemoteError;
use thiserror::Error;

/// Orchestration errors
#[derive(Error, Debug)]
pub enum DeployError {
    /// O001: Configuration, history, rename or patch validation failed
    #[error("[O001] {0}")]
    Core(#[from] CoreError),

    /// O002: A remote command or transfer failed
    #[error("[O002] {0}")]
    Remote(#[from] RemoteError),

    /// O003: Schema execution failed
    #[error("[O003] {0}")]
    Db(#[from] DbError),

    /// O004: The phase tracker was asked to skip or repeat a phase
    #[error("[O004] Invalid phase transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// O005: Every credential attempt was refused by the database
    #[error("[O005] Database credentials rejected after {attempts} attempt(s): {message}")]
    CredentialsRejected { attempts: u32, message: String },

    /// O006: Reading operator input failed
    #[error("[O006] Prompt failed: {0}")]
    Prompt(String),

    /// O007: The new release would not sort after the existing ones
    #[error("[O007] Release {release} is not newer than {last} on {host}; check the local clock")]
    ClockBehind {
        host: String,
        release: String,
        last: String,
    },

    /// O008: A backend that needs credentials was connected without them
    #[error("[O008] The {backend} backend requires database credentials")]
    MissingCredentials { backend: String },

    /// O009: The schema was about to change before the operator confirmed
    #[error("[O009] Refusing to change the schema of an unconfirmed run")]
    NotConfirmed,
}

/// Result type alias for DeployError
pub type DeployResult<T> = Result<T, DeployError>;
