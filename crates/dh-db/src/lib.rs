//! dh-db - Schema execution layer for Deckhand
//!
//! This crate provides the `SchemaExecutor` trait, the migration-tracking
//! store, the `PatchApplier`, and backends for DuckDB (local) and MySQL
//! (through the `mysql` client on a remote host).

pub mod applier;
pub mod duckdb;
pub mod error;
pub mod mysql;
pub mod tracking;
pub mod traits;

pub use applier::PatchApplier;
pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use mysql::{MySqlBackend, MySqlCredentials};
pub use tracking::{AppliedPatchRecord, Dialect, TRACKING_TABLE};
pub use traits::SchemaExecutor;
