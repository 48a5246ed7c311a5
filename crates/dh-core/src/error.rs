//! Error types for dh-core

use thiserror::Error;

/// Core error type for Deckhand
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Configuration file not found
    #[error("[C001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C002: Failed to parse configuration file
    #[error("[C002] Failed to parse config {path}: {message}")]
    ConfigParseError { path: String, message: String },

    /// C003: Invalid configuration value
    #[error("[C003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C004: Listing the release directory on a host failed
    #[error("[C004] Could not discover deployment history on {host}: {message}")]
    HistoryDiscovery { host: String, message: String },

    /// C005: A declared rename source does not exist locally
    #[error("[C005] Rename source {path} does not exist (declared as {declared})")]
    MissingRenameSource { path: String, declared: String },

    /// C006: Circular dependency between patches
    #[error("[C006] Circular patch dependency detected: {cycle}")]
    DependencyCycle { cycle: String },

    /// C007: Patch depends on something outside the selection that is not applied
    #[error("[C007] Patch '{patch}' depends on '{dependency}', which is neither selected nor applied")]
    UnsatisfiedDependency { patch: String, dependency: String },

    /// C008: up/down script is malformed
    #[error("[C008] Patch '{patch}': {script} script contains code but does not end with ';'")]
    PatchSyntax { patch: String, script: &'static str },

    /// C009: Two candidate patches share a name
    #[error("[C009] Duplicate patch name '{name}' in {path1} and {path2}")]
    DuplicatePatch {
        name: String,
        path1: String,
        path2: String,
    },

    /// C010: Patch file could not be read or deserialized
    #[error("[C010] Invalid patch file {path}: {reason}")]
    InvalidPatchFile { path: String, reason: String },

    /// C011: IO error
    #[error("[C011] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// C012: IO error with file path context
    #[error("[C012] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
