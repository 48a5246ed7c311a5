//! MySQL schema backend driven through the `mysql` client on a remote host
//!
//! Statements are fed to `mysql -N -B` through a quoted heredoc, so the
//! database only has to be reachable from the database host.

use crate::error::{DbError, DbResult};
use crate::tracking::Dialect;
use crate::traits::SchemaExecutor;
use async_trait::async_trait;
use dh_core::{HostName, SizeClass};
use dh_remote::{shell_quote, RemoteCommand, RemoteGateway};
use std::sync::Arc;

const HEREDOC_MARKER: &str = "DECKHAND_SQL";

/// Default lock wait timeout for small patches, in seconds
pub const DEFAULT_SMALL_LOCK_TIMEOUT: u32 = 30;

/// Default lock wait timeout for large patches, in seconds
pub const DEFAULT_LARGE_LOCK_TIMEOUT: u32 = 600;

/// Login for the `mysql` client.
#[derive(Clone, PartialEq, Eq)]
pub struct MySqlCredentials {
    pub database: String,
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for MySqlCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlCredentials")
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &dh_remote::MASK)
            .finish()
    }
}

/// MySQL backend running the client on `host` through the gateway
pub struct MySqlBackend {
    gateway: Arc<dyn RemoteGateway>,
    host: HostName,
    credentials: MySqlCredentials,
    small_lock_timeout: u32,
    large_lock_timeout: u32,
}

impl MySqlBackend {
    pub fn new(
        gateway: Arc<dyn RemoteGateway>,
        host: HostName,
        credentials: MySqlCredentials,
    ) -> Self {
        Self {
            gateway,
            host,
            credentials,
            small_lock_timeout: DEFAULT_SMALL_LOCK_TIMEOUT,
            large_lock_timeout: DEFAULT_LARGE_LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeouts(mut self, small: u32, large: u32) -> Self {
        self.small_lock_timeout = small;
        self.large_lock_timeout = large;
        self
    }

    /// Lock wait timeout applied to scripts of the given size class
    pub fn lock_timeout(&self, size: SizeClass) -> u32 {
        match size {
            SizeClass::Small => self.small_lock_timeout,
            SizeClass::Large => self.large_lock_timeout,
        }
    }

    /// The client invocation feeding `sql` to the configured database.
    pub fn command(&self, sql: &str) -> RemoteCommand {
        let sql = sql.trim_end();
        let terminator = if sql.ends_with(';') { "" } else { ";" };
        let quoted_password = shell_quote(&self.credentials.password);
        let line = format!(
            "mysql -N -B -u{} -p{} {} <<'{HEREDOC_MARKER}'\n{sql}{terminator}\n{HEREDOC_MARKER}",
            shell_quote(&self.credentials.user),
            quoted_password,
            shell_quote(&self.credentials.database),
        );
        RemoteCommand::new(line)
            .with_secret(quoted_password)
            .with_secret(self.credentials.password.clone())
    }

    async fn run(&self, sql: &str) -> DbResult<Vec<String>> {
        let command = self.command(sql);
        let output = self.gateway.run_command(&self.host, &command).await?;
        let output = output.ensure_success(&self.host, &command)?;
        Ok(output.lines)
    }
}

/// Undo the escaping `mysql -B` applies to field values.
fn unescape_field(field: &str) -> Option<String> {
    if field == "NULL" {
        return None;
    }

    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    Some(out)
}

/// Split batch-mode output into rows of `columns` fields.
fn parse_batch_output(lines: &[String], columns: usize) -> DbResult<Vec<Vec<Option<String>>>> {
    lines
        .iter()
        .filter(|line| !line.is_empty())
        .map(|line| {
            let fields: Vec<Option<String>> = line.split('\t').map(unescape_field).collect();
            if fields.len() == columns {
                Ok(fields)
            } else {
                Err(DbError::InvalidRecord(format!(
                    "expected {columns} columns, got {}",
                    fields.len()
                )))
            }
        })
        .collect()
}

#[async_trait]
impl SchemaExecutor for MySqlBackend {
    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.run(sql).await.map(|_| ())
    }

    async fn query_rows(&self, sql: &str, columns: usize) -> DbResult<Vec<Vec<Option<String>>>> {
        let lines = self.run(sql).await?;
        parse_batch_output(&lines, columns)
    }

    async fn execute_script(&self, sql: &str, size: SizeClass) -> DbResult<()> {
        let timeout = self.lock_timeout(size);
        log::debug!("Running {size} patch with lock_wait_timeout {timeout}s");
        self.execute_batch(&format!("SET SESSION lock_wait_timeout = {timeout};\n{sql}"))
            .await
    }

    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    fn db_type(&self) -> &'static str {
        "mysql"
    }
}

#[cfg(test)]
#[path = "mysql_test.rs"]
mod tests;
