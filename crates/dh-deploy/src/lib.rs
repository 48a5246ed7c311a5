//! dh-deploy - Deployment orchestration for Deckhand
//!
//! This crate sequences deploy, rollback and cleanup runs across every
//! configured host: the phase state machines, the per-run context, the remote
//! steps performed on each host, and the prompts that gate a run.

pub mod cleanup;
pub mod context;
pub mod error;
pub mod hooks;
pub mod orchestrator;
pub mod phase;
pub mod prompt;
pub mod schema;
pub mod steps;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use context::RunContext;
pub use error::{DeployError, DeployResult};
pub use orchestrator::{Orchestrator, RunOutcome, MAX_CREDENTIAL_ATTEMPTS};
pub use phase::{DeployPhase, Phase, PhaseTracker, RollbackPhase};
pub use prompt::{
    AutoConfirm, Confirmer, ConfiguredCredentials, CredentialDefaults, CredentialProvider,
    DatabaseCredentials,
};
pub use schema::{ConfiguredConnector, SchemaConnector};
