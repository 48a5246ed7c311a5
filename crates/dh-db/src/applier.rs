//! Execution of ordered patch lists

use crate::error::{DbError, DbResult};
use crate::tracking::{record_time, AppliedPatchRecord};
use crate::traits::SchemaExecutor;
use dh_core::{PatchName, SqlPatch};
use std::collections::HashMap;

/// Runs patches against a schema and keeps the tracking store current.
///
/// The list handed in is already ordered. The first failing script aborts
/// the rest of the list; nothing already run is compensated.
pub struct PatchApplier<'a> {
    executor: &'a dyn SchemaExecutor,
}

impl<'a> PatchApplier<'a> {
    pub fn new(executor: &'a dyn SchemaExecutor) -> Self {
        Self { executor }
    }

    /// Run the `up` script of every patch not yet applied and record it.
    pub async fn apply(&self, ordered: &[SqlPatch]) -> DbResult<Vec<AppliedPatchRecord>> {
        let applied = self.executor.applied_names().await?;
        let mut records = Vec::with_capacity(ordered.len());

        for patch in ordered {
            if applied.contains(&patch.name) {
                log::info!("{} is already applied, skipping", patch.name);
                continue;
            }

            log::info!("Applying {}", patch.name);
            if patch.up.trim().is_empty() {
                log::info!("{} has an empty up script", patch.name);
            } else {
                log_script(&patch.up);
                self.executor
                    .execute_script(&patch.up, patch.size)
                    .await
                    .map_err(|e| patch_failed(&patch.name, "apply", e))?;
            }

            let record = AppliedPatchRecord::applied(patch, record_time());
            self.executor.record_applied(&record).await?;
            records.push(record);
        }

        log::info!(
            "Applied {} patch(es) on {}",
            records.len(),
            self.executor.db_type()
        );
        Ok(records)
    }

    /// Run the captured revert script of every applied patch and record it.
    ///
    /// Only patches with an applied tracking record are reverted. The
    /// bootstrap patch is never reverted. Without a tracking store nothing
    /// has been applied, so nothing is reverted.
    pub async fn revert(&self, ordered: &[SqlPatch]) -> DbResult<Vec<AppliedPatchRecord>> {
        if !self.executor.tracking_store_exists().await? {
            log::info!("No tracking store on {}, nothing to revert", self.executor.db_type());
            return Ok(Vec::new());
        }
        let known: HashMap<PatchName, AppliedPatchRecord> = self
            .executor
            .applied_records()
            .await?
            .into_iter()
            .map(|record| (record.patch_name.clone(), record))
            .collect();

        let mut records = Vec::with_capacity(ordered.len());
        for patch in ordered {
            if patch.is_bootstrap() {
                log::debug!("Never reverting {}", patch.name);
                continue;
            }

            let Some(existing) = known.get(&patch.name).filter(|r| r.is_applied()) else {
                log::info!("{} is not applied, skipping", patch.name);
                continue;
            };

            let down = existing.down_sql.as_str();
            log::info!("Reverting {}", patch.name);
            if down.trim().is_empty() {
                log::info!("{} has an empty down script", patch.name);
            } else {
                log_script(down);
                self.executor
                    .execute_script(down, patch.size)
                    .await
                    .map_err(|e| patch_failed(&patch.name, "revert", e))?;
            }

            let at = record_time();
            self.executor.record_reverted(&patch.name, at).await?;
            let mut record = existing.clone();
            record.reverted_at = Some(at);
            records.push(record);
        }

        log::info!(
            "Reverted {} patch(es) on {}",
            records.len(),
            self.executor.db_type()
        );
        Ok(records)
    }
}

fn log_script(sql: &str) {
    for line in sql.lines() {
        log::info!("    {line}");
    }
}

fn patch_failed(patch: &PatchName, action: &'static str, err: DbError) -> DbError {
    DbError::PatchFailed {
        patch: patch.to_string(),
        action,
        message: err.to_string(),
    }
}

#[cfg(test)]
#[path = "applier_test.rs"]
mod tests;
