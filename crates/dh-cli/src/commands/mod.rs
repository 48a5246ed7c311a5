//! Command implementations

pub mod cleanup;
pub mod common;
pub mod deploy;
pub mod rollback;
