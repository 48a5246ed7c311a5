//! Schema executor trait definition

use crate::error::{DbError, DbResult};
use crate::tracking::{AppliedPatchRecord, Dialect, RECORD_COLUMNS};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use dh_core::{PatchName, SizeClass, SqlPatch};
use std::collections::HashSet;

/// Access to the schema that patches are applied to.
///
/// Backends implement raw execution and text queries; the tracking-store
/// operations are built on top of them.
/// Implementations must be Send + Sync for async operation.
#[async_trait]
pub trait SchemaExecutor: Send + Sync {
    /// Execute one or more statements
    async fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Run a query whose `columns` columns are all read as nullable text
    async fn query_rows(&self, sql: &str, columns: usize) -> DbResult<Vec<Vec<Option<String>>>>;

    /// SQL dialect of the backend
    fn dialect(&self) -> Dialect;

    /// Backend identifier for logging
    fn db_type(&self) -> &'static str;

    /// Execute a patch script; backends may tune execution by size class
    async fn execute_script(&self, sql: &str, _size: SizeClass) -> DbResult<()> {
        self.execute_batch(sql).await
    }

    /// The bootstrap patch creating this backend's tracking store
    fn bootstrap_patch(&self) -> SqlPatch {
        self.dialect().bootstrap_patch()
    }

    /// Whether the tracking table exists
    async fn tracking_store_exists(&self) -> DbResult<bool> {
        let rows = self.query_rows(&self.dialect().exists_query(), 1).await?;
        let count = rows
            .first()
            .and_then(|row| row.first())
            .and_then(|value| value.as_deref())
            .unwrap_or("0");
        count
            .trim()
            .parse::<i64>()
            .map(|n| n > 0)
            .map_err(|e| DbError::InvalidRecord(format!("bad table count '{count}': {e}")))
    }

    /// Every tracking record, applied or reverted
    async fn applied_records(&self) -> DbResult<Vec<AppliedPatchRecord>> {
        self.query_rows(&self.dialect().select_records(), RECORD_COLUMNS)
            .await?
            .into_iter()
            .map(AppliedPatchRecord::from_columns)
            .collect()
    }

    /// Names of the patches currently applied; empty when there is no tracking store
    async fn applied_names(&self) -> DbResult<HashSet<PatchName>> {
        if !self.tracking_store_exists().await? {
            return Ok(HashSet::new());
        }
        Ok(self
            .applied_records()
            .await?
            .into_iter()
            .filter(AppliedPatchRecord::is_applied)
            .map(|record| record.patch_name)
            .collect())
    }

    /// Store a record, replacing an earlier one of the same patch
    async fn record_applied(&self, record: &AppliedPatchRecord) -> DbResult<()> {
        self.execute_batch(&self.dialect().upsert_record(record)).await
    }

    /// Set `reverted_at` on the record of `patch`
    async fn record_reverted(&self, patch: &PatchName, at: NaiveDateTime) -> DbResult<()> {
        self.execute_batch(&self.dialect().mark_reverted(patch, at))
            .await
    }

    /// Prove the connection may alter the schema by creating and dropping a table
    async fn probe(&self, scratch_table: &str) -> DbResult<()> {
        self.execute_batch(&self.dialect().probe(scratch_table))
            .await
            .map_err(|e| DbError::ConnectionError(e.to_string()))
    }
}
