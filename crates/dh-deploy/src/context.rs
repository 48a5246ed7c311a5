//! State gathered during a single deploy, rollback or cleanup run

use crate::prompt::DatabaseCredentials;
use dh_core::{
    rename, CoreResult, DeploymentHistory, HostName, HostTarget, RenamePlan, RenameRequest,
};
use dh_db::SchemaExecutor;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Per-run memory. Nothing in here outlives the invocation.
#[derive(Default)]
pub struct RunContext {
    histories: HashMap<HostName, DeploymentHistory>,
    rename_plans: HashMap<(HostName, String), RenamePlan>,
    credentials: Option<DatabaseCredentials>,
    schema: Option<Arc<dyn SchemaExecutor>>,
    confirmed: bool,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_history(&mut self, host: &HostName, history: DeploymentHistory) {
        self.histories.insert(host.clone(), history);
    }

    /// History of `host`; empty when it was never discovered.
    pub fn history(&self, host: &HostName) -> DeploymentHistory {
        self.histories.get(host).copied().unwrap_or_default()
    }

    /// Rename plan for a host directory, computed on first use.
    pub fn rename_plan(
        &mut self,
        target: &HostTarget,
        target_environment: &str,
        cluster_files: &[String],
        target_files: &[String],
        local_root: &Path,
    ) -> CoreResult<&RenamePlan> {
        let key = (target.host.clone(), target.remote_dir.clone());
        if !self.rename_plans.contains_key(&key) {
            let plan = rename::plan(RenameRequest {
                remote_dir: &target.remote_dir,
                target_environment,
                cluster_files,
                target_files,
                local_root,
            })?;
            log::debug!("{target}: {} rename(s) planned", plan.entries().len());
            self.rename_plans.insert(key.clone(), plan);
        }
        Ok(&self.rename_plans[&key])
    }

    /// A previously computed plan.
    pub fn planned_renames(&self, target: &HostTarget) -> Option<&RenamePlan> {
        self.rename_plans
            .get(&(target.host.clone(), target.remote_dir.clone()))
    }

    pub fn credentials(&self) -> Option<&DatabaseCredentials> {
        self.credentials.as_ref()
    }

    pub fn set_credentials(&mut self, credentials: DatabaseCredentials) {
        self.credentials = Some(credentials);
    }

    pub fn schema(&self) -> Option<Arc<dyn SchemaExecutor>> {
        self.schema.clone()
    }

    pub fn set_schema(&mut self, schema: Arc<dyn SchemaExecutor>) {
        self.schema = Some(schema);
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    pub fn set_confirmed(&mut self, confirmed: bool) {
        self.confirmed = confirmed;
    }
}

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;
