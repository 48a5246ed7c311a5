//! Operator interaction: confirmation and database credentials

use crate::error::{DeployError, DeployResult};
use dh_core::DatabaseConfig;
use dh_db::MySqlCredentials;
use std::fmt;

/// User offered when neither the configuration nor the operator names one.
pub const DEFAULT_DATABASE_USER: &str = "root";

/// Database name, user and password for one run.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseCredentials {
    pub database: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for DatabaseCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseCredentials")
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &dh_remote::MASK)
            .finish()
    }
}

impl From<DatabaseCredentials> for MySqlCredentials {
    fn from(creds: DatabaseCredentials) -> Self {
        MySqlCredentials {
            database: creds.database,
            user: creds.user,
            password: creds.password,
        }
    }
}

/// Values offered to the operator when asking for credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialDefaults {
    pub database: Option<String>,
    pub user: String,
    pub password: Option<String>,
}

impl CredentialDefaults {
    pub fn from_config(config: Option<&DatabaseConfig>) -> Self {
        Self {
            database: config.and_then(|db| db.name.clone()),
            user: config
                .and_then(|db| db.user.clone())
                .unwrap_or_else(|| DEFAULT_DATABASE_USER.to_string()),
            password: config.and_then(|db| db.password.clone()),
        }
    }

    /// The configured credentials, when nothing needs to be asked.
    pub fn complete(&self) -> Option<DatabaseCredentials> {
        Some(DatabaseCredentials {
            database: self.database.clone()?,
            user: self.user.clone(),
            password: self.password.clone()?,
        })
    }
}

impl Default for CredentialDefaults {
    fn default() -> Self {
        Self::from_config(None)
    }
}

impl fmt::Debug for CredentialDefaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialDefaults")
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| dh_remote::MASK))
            .finish()
    }
}

/// Yes/no gate in front of every mutating run.
pub trait Confirmer: Send + Sync {
    fn confirm(&self, question: &str) -> DeployResult<bool>;
}

/// Source of database credentials.
///
/// Asked only once a migration is actually pending; `attempt` starts at 1 and
/// grows each time the database refuses the previous answer.
pub trait CredentialProvider: Send + Sync {
    fn credentials(
        &self,
        defaults: &CredentialDefaults,
        attempt: u32,
    ) -> DeployResult<DatabaseCredentials>;
}

/// Answers yes to every question (`--yes`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

impl Confirmer for AutoConfirm {
    fn confirm(&self, question: &str) -> DeployResult<bool> {
        log::info!("{question} yes (auto-confirmed)");
        Ok(true)
    }
}

/// Uses the configured credentials and never asks.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfiguredCredentials;

impl CredentialProvider for ConfiguredCredentials {
    fn credentials(
        &self,
        defaults: &CredentialDefaults,
        _attempt: u32,
    ) -> DeployResult<DatabaseCredentials> {
        defaults.complete().ok_or_else(|| {
            DeployError::Prompt(
                "database.name and database.password must be configured when not prompting"
                    .to_string(),
            )
        })
    }
}

#[cfg(test)]
#[path = "prompt_test.rs"]
mod tests;
