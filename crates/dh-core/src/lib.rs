//! dh-core - Core library for Deckhand
//!
//! This crate provides the configuration model, release naming and history
//! discovery, rename planning for cluster roles and target environments, and
//! loading, validation and ordering of schema patches.

pub mod config;
pub mod dag;
pub mod error;
pub mod history;
pub mod host_name;
mod newtype_string;
pub mod patch;
pub mod patch_name;
pub mod release;
pub mod rename;
pub mod resolver;
pub(crate) mod serde_helpers;
pub mod topology;

pub use config::{Config, DatabaseConfig, DbType, HooksConfig};
pub use dag::{Direction, PatchDag};
pub use error::{CoreError, CoreResult};
pub use history::{discover, DeploymentHistory};
pub use host_name::HostName;
pub use patch::{discover_patches, PatchKind, SizeClass, SqlPatch, BOOTSTRAP_PATCH_NAME};
pub use patch_name::PatchName;
pub use release::{Release, ReleaseNaming};
pub use rename::{RenameEntry, RenamePlan, RenameRequest};
pub use resolver::{select, Window};
pub use topology::{ClusterRole, HostTarget, Topology};
