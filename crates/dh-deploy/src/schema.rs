//! Opening the schema that migrations run against

use crate::error::{DeployError, DeployResult};
use crate::prompt::DatabaseCredentials;
use async_trait::async_trait;
use dh_core::{DatabaseConfig, DbType, HostName};
use dh_db::{DuckDbBackend, MySqlBackend, SchemaExecutor};
use dh_remote::RemoteGateway;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Opens a [`SchemaExecutor`] for a run.
#[async_trait]
pub trait SchemaConnector: Send + Sync {
    /// Whether `connect` needs operator-supplied credentials
    fn requires_credentials(&self) -> bool;

    /// Open the schema; credentials are `None` when not required
    async fn connect(
        &self,
        credentials: Option<&DatabaseCredentials>,
    ) -> DeployResult<Arc<dyn SchemaExecutor>>;
}

/// Connector built from the `database` section of the configuration.
pub struct ConfiguredConnector {
    config: DatabaseConfig,
    host: HostName,
    root: PathBuf,
    gateway: Arc<dyn RemoteGateway>,
}

impl ConfiguredConnector {
    pub fn new(
        config: DatabaseConfig,
        host: HostName,
        root: &Path,
        gateway: Arc<dyn RemoteGateway>,
    ) -> Self {
        Self {
            config,
            host,
            root: root.to_path_buf(),
            gateway,
        }
    }

    /// DuckDB file location; relative paths start at the project root
    fn duckdb_path(&self) -> String {
        match self.config.path.as_deref() {
            None | Some(":memory:") => ":memory:".to_string(),
            Some(path) => self.root.join(path).display().to_string(),
        }
    }
}

#[async_trait]
impl SchemaConnector for ConfiguredConnector {
    fn requires_credentials(&self) -> bool {
        self.config.db_type == DbType::MySql
    }

    async fn connect(
        &self,
        credentials: Option<&DatabaseCredentials>,
    ) -> DeployResult<Arc<dyn SchemaExecutor>> {
        match self.config.db_type {
            DbType::DuckDb => {
                let path = self.duckdb_path();
                log::debug!("Opening DuckDB schema at {path}");
                Ok(Arc::new(DuckDbBackend::new(&path)?))
            }
            DbType::MySql => {
                let credentials =
                    credentials
                        .cloned()
                        .ok_or_else(|| DeployError::MissingCredentials {
                            backend: self.config.db_type.to_string(),
                        })?;
                log::debug!(
                    "Using mysql on {} as {} for schema {}",
                    self.host,
                    credentials.user,
                    credentials.database
                );
                let backend =
                    MySqlBackend::new(self.gateway.clone(), self.host.clone(), credentials.into())
                        .with_lock_timeouts(
                            self.config.small_lock_timeout,
                            self.config.large_lock_timeout,
                        );
                Ok(Arc::new(backend))
            }
        }
    }
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod tests;
