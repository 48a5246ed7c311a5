//! In-memory collaborators for exercising the orchestrator without hosts.
//!
//! Everything that reaches a host or the schema is written to a shared
//! [`Journal`] so tests can assert on the order of side effects:
//!
//! - `list <host> <path>`
//! - `run <host> <command line>`
//! - `sync <host> <remote dir>` and `dry-run <host> <remote dir>`
//! - `sql <script>` for every batch sent to the schema

use crate::error::{DeployError, DeployResult};
use crate::prompt::{Confirmer, CredentialDefaults, CredentialProvider, DatabaseCredentials};
use crate::schema::SchemaConnector;
use async_trait::async_trait;
use dh_core::HostName;
use dh_db::{DbError, DbResult, Dialect, DuckDbBackend, SchemaExecutor};
use dh_remote::{CommandOutput, RemoteCommand, RemoteGateway, RemoteResult, SyncOptions};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Ordered record of every side effect.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    /// Index of the first entry containing `needle`.
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.entries().iter().position(|e| e.contains(needle))
    }

    /// Indexes of every entry containing `needle`.
    pub fn positions(&self, needle: &str) -> Vec<usize> {
        self.entries()
            .iter()
            .enumerate()
            .filter(|(_, e)| e.contains(needle))
            .map(|(i, _)| i)
            .collect()
    }

    /// Entries that change a host or the schema.
    pub fn mutations(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.starts_with("run ") || e.starts_with("sync ") || e.starts_with("sql "))
            .collect()
    }
}

/// Gateway answering listings from a table and recording everything else.
#[derive(Debug, Default)]
pub struct FakeGateway {
    journal: Journal,
    listings: Mutex<HashMap<(String, String), Vec<String>>>,
    failing: Mutex<Vec<String>>,
    diff: Mutex<Vec<String>>,
}

impl FakeGateway {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            ..Default::default()
        }
    }

    /// Entries returned when `path` is listed on `host`.
    pub fn set_listing(&self, host: &str, path: &str, entries: &[&str]) {
        self.listings.lock().unwrap().insert(
            (host.to_string(), path.to_string()),
            entries.iter().map(|e| e.to_string()).collect(),
        );
    }

    /// Every command line containing `needle` exits with status 1.
    pub fn fail_commands_containing(&self, needle: &str) {
        self.failing.lock().unwrap().push(needle.to_string());
    }

    /// Lines a dry-run transfer reports.
    pub fn set_diff(&self, lines: &[&str]) {
        *self.diff.lock().unwrap() = lines.iter().map(|l| l.to_string()).collect();
    }

    fn fails(&self, line: &str) -> bool {
        self.failing
            .lock()
            .unwrap()
            .iter()
            .any(|needle| line.contains(needle.as_str()))
    }
}

#[async_trait]
impl RemoteGateway for FakeGateway {
    async fn list_directory(&self, host: &HostName, path: &str) -> RemoteResult<Vec<String>> {
        self.journal.record(format!("list {host} {path}"));
        Ok(self
            .listings
            .lock()
            .unwrap()
            .get(&(host.to_string(), path.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn run_command(
        &self,
        host: &HostName,
        command: &RemoteCommand,
    ) -> RemoteResult<CommandOutput> {
        self.journal.record(format!("run {host} {}", command.masked()));
        let status = if self.fails(command.line()) { 1 } else { 0 };
        Ok(CommandOutput {
            status,
            ..Default::default()
        })
    }

    async fn sync_tree(
        &self,
        _local: &Path,
        host: &HostName,
        remote: &str,
        options: &SyncOptions,
    ) -> RemoteResult<CommandOutput> {
        if options.dry_run {
            self.journal.record(format!("dry-run {host} {remote}"));
            return Ok(CommandOutput {
                lines: self.diff.lock().unwrap().clone(),
                ..Default::default()
            });
        }
        let mut entry = format!("sync {host} {remote}");
        if let Some(base) = &options.link_dest {
            entry.push_str(&format!(" link-dest={base}"));
        }
        self.journal.record(entry);
        let status = if self.fails(remote) { 1 } else { 0 };
        Ok(CommandOutput {
            status,
            ..Default::default()
        })
    }

    fn gateway_type(&self) -> &'static str {
        "fake"
    }
}

/// In-memory DuckDB schema that journals every batch it runs.
pub struct JournalSchema {
    inner: DuckDbBackend,
    journal: Journal,
}

impl JournalSchema {
    pub fn new(journal: Journal) -> DbResult<Self> {
        Ok(Self {
            inner: DuckDbBackend::in_memory()?,
            journal,
        })
    }
}

#[async_trait]
impl SchemaExecutor for JournalSchema {
    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.journal.record(format!("sql {}", sql.trim()));
        self.inner.execute_batch(sql).await
    }

    async fn query_rows(&self, sql: &str, columns: usize) -> DbResult<Vec<Vec<Option<String>>>> {
        self.inner.query_rows(sql, columns).await
    }

    fn dialect(&self) -> Dialect {
        self.inner.dialect()
    }

    fn db_type(&self) -> &'static str {
        "journal"
    }
}

/// Connector handing out one shared [`JournalSchema`].
///
/// With a password set, connections offering any other password are refused.
pub struct FakeConnector {
    schema: Arc<JournalSchema>,
    password: Option<String>,
    connects: AtomicU32,
}

impl FakeConnector {
    pub fn new(schema: Arc<JournalSchema>) -> Self {
        Self {
            schema,
            password: None,
            connects: AtomicU32::new(0),
        }
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    /// Number of connection attempts so far.
    pub fn connects(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SchemaConnector for FakeConnector {
    fn requires_credentials(&self) -> bool {
        self.password.is_some()
    }

    async fn connect(
        &self,
        credentials: Option<&DatabaseCredentials>,
    ) -> DeployResult<Arc<dyn SchemaExecutor>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(expected) = &self.password {
            let offered = credentials.map(|c| c.password.as_str());
            if offered != Some(expected.as_str()) {
                return Err(DbError::ConnectionError("Access denied".to_string()).into());
            }
        }
        Ok(self.schema.clone())
    }
}

/// Confirmer answering from a queue; an empty queue answers no.
#[derive(Debug, Default)]
pub struct ScriptedConfirmer {
    answers: Mutex<VecDeque<bool>>,
    questions: Mutex<Vec<String>>,
}

impl ScriptedConfirmer {
    pub fn answering(answers: &[bool]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().copied().collect()),
            questions: Mutex::default(),
        }
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().unwrap().clone()
    }
}

impl Confirmer for ScriptedConfirmer {
    fn confirm(&self, question: &str) -> DeployResult<bool> {
        self.questions.lock().unwrap().push(question.to_string());
        Ok(self.answers.lock().unwrap().pop_front().unwrap_or(false))
    }
}

/// Credential provider answering from a queue; an empty queue is an error.
#[derive(Debug, Default)]
pub struct ScriptedCredentials {
    answers: Mutex<VecDeque<DatabaseCredentials>>,
    attempts: Mutex<Vec<u32>>,
}

impl ScriptedCredentials {
    /// One answer per password, for schema `shop` and user `root`.
    pub fn with_passwords(passwords: &[&str]) -> Self {
        let answers = passwords
            .iter()
            .map(|p| DatabaseCredentials {
                database: "shop".to_string(),
                user: "root".to_string(),
                password: p.to_string(),
            })
            .collect();
        Self {
            answers: Mutex::new(answers),
            attempts: Mutex::default(),
        }
    }

    /// The `attempt` argument of every call.
    pub fn attempts(&self) -> Vec<u32> {
        self.attempts.lock().unwrap().clone()
    }
}

impl CredentialProvider for ScriptedCredentials {
    fn credentials(
        &self,
        _defaults: &CredentialDefaults,
        attempt: u32,
    ) -> DeployResult<DatabaseCredentials> {
        self.attempts.lock().unwrap().push(attempt);
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| DeployError::Prompt("no credentials left".to_string()))
    }
}
