//! dh-remote - Remote execution layer for Deckhand
//!
//! This crate provides the `RemoteGateway` trait through which every remote
//! operation of a deployment runs, and an implementation on top of the `ssh`
//! and `rsync` binaries.

pub mod command;
pub mod error;
pub mod gateway;
pub mod ssh;

pub use command::{shell_quote, RemoteCommand, MASK};
pub use error::{RemoteError, RemoteResult};
pub use gateway::{CommandOutput, RemoteGateway, SyncOptions};
pub use ssh::SshGateway;
