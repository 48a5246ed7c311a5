//! Deploy, rollback and cleanup across every configured host
//!
//! A run first gathers everything it needs without touching a host: the
//! release history of every host, the rename plans, and the patches between
//! the master's last release and the new one. Only after the operator has
//! confirmed does it start mutating, phase by phase. Each per-host phase runs
//! on every host before the next phase begins, so the schema is migrated
//! once, after all hosts hold the new files and before any host switches to
//! them.

use crate::cleanup::releases_to_remove;
use crate::context::RunContext;
use crate::error::{DeployError, DeployResult};
use crate::hooks::run_hooks;
use crate::phase::{DeployPhase, PhaseTracker, RollbackPhase};
use crate::prompt::{Confirmer, CredentialDefaults, CredentialProvider};
use crate::schema::{ConfiguredConnector, SchemaConnector};
use crate::steps;
use chrono::{Local, NaiveDateTime};
use dh_core::history::release_timestamps;
use dh_core::resolver::in_window;
use dh_core::{
    discover, discover_patches, select, Config, CoreError, DeploymentHistory, HostTarget,
    Release, ReleaseNaming, RenamePlan, SqlPatch, Topology, Window,
};
use dh_db::{DbError, PatchApplier, SchemaExecutor};
use dh_remote::{RemoteGateway, SyncOptions};
use futures::future::try_join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// How often the database may refuse credentials before the run gives up.
pub const MAX_CREDENTIAL_ATTEMPTS: u32 = 3;

/// How a run ended, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every phase ran
    Completed,
    /// The operator answered no; nothing was changed
    Declined,
    /// A host has no earlier release to return to
    RollbackUnavailable,
}

/// Drives deploy, rollback and cleanup runs.
pub struct Orchestrator {
    config: Config,
    root: PathBuf,
    naming: ReleaseNaming,
    topology: Topology,
    gateway: Arc<dyn RemoteGateway>,
    confirmer: Arc<dyn Confirmer>,
    credentials: Arc<dyn CredentialProvider>,
    connector: Option<Arc<dyn SchemaConnector>>,
}

impl Orchestrator {
    /// `root` is the directory the configuration file lives in.
    pub fn new(
        config: Config,
        root: &Path,
        gateway: Arc<dyn RemoteGateway>,
        confirmer: Arc<dyn Confirmer>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> DeployResult<Self> {
        config.validate()?;
        let naming = config.naming()?;
        let topology = Topology::from_config(&config);
        let connector = config.database.as_ref().map(|db| {
            Arc::new(ConfiguredConnector::new(
                db.clone(),
                config.database_host().clone(),
                root,
                gateway.clone(),
            )) as Arc<dyn SchemaConnector>
        });

        Ok(Self {
            config,
            root: root.to_path_buf(),
            naming,
            topology,
            gateway,
            confirmer,
            credentials,
            connector,
        })
    }

    /// Replace the schema connector derived from the configuration.
    pub fn with_schema_connector(mut self, connector: Arc<dyn SchemaConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Deploy a release stamped with the current local time.
    pub async fn deploy(&self) -> DeployResult<RunOutcome> {
        self.deploy_at(Local::now().naive_local()).await
    }

    /// Deploy a release stamped with `timestamp`.
    pub async fn deploy_at(&self, timestamp: NaiveDateTime) -> DeployResult<RunOutcome> {
        let mut phases = PhaseTracker::<DeployPhase>::new();
        let mut ctx = RunContext::new();
        let release = Release::new(&self.naming, &self.config.project_name, timestamp);
        log::info!(
            "Deploying {release} to {} host(s) ({}) over {}",
            self.topology.targets().len(),
            self.config.target,
            self.gateway.gateway_type()
        );

        self.plan_renames(&mut ctx)?;
        self.discover_histories(&mut ctx).await?;
        self.check_clock(&ctx, &release)?;

        let master = self.master()?;
        let master_history = ctx.history(&master.host);
        let window = Window::new(master_history.last_timestamp, Some(release.timestamp));
        let pending = self
            .pending_patches(&mut ctx, window, &scratch_table(release.timestamp))
            .await?;
        self.show_diff(master, self.last_release(&master_history))
            .await?;
        show_patches("apply", &pending);

        let question = format!("Deploy {release} to {}?", self.host_list());
        if !self.confirm(&mut ctx, &question)? {
            return Ok(RunOutcome::Declined);
        }
        phases.advance(DeployPhase::Checked)?;

        let gateway = self.gateway.as_ref();
        for target in self.topology.targets() {
            steps::prepare_directory(gateway, target, &self.config.data_dirs).await?;
            run_hooks(
                gateway,
                &target.host,
                &target.remote_dir,
                "pre_deploy",
                &self.config.hooks.pre_deploy,
            )
            .await?;
        }
        phases.advance(DeployPhase::PreDeployed)?;

        self.sync_all(&ctx, &release).await?;
        phases.advance(DeployPhase::FilesSynced)?;

        if pending.is_empty() {
            log::info!("No schema changes to apply");
        } else {
            let schema = connected(&ctx)?;
            PatchApplier::new(schema.as_ref()).apply(&pending).await?;
        }
        phases.advance(DeployPhase::DbMigrated)?;

        for target in self.topology.targets() {
            steps::activate(gateway, target, &release, &self.config.current_link).await?;
        }
        phases.advance(DeployPhase::Activated)?;

        for target in self.topology.targets() {
            run_hooks(
                gateway,
                &target.host,
                &target.path(&release.directory_name),
                "post_deploy",
                &self.config.hooks.post_deploy,
            )
            .await?;
        }
        phases.advance(DeployPhase::PostDeployed)?;

        for target in self.topology.targets() {
            self.clear_cache(target, &release).await?;
        }
        phases.advance(DeployPhase::CacheCleared)?;

        phases.advance(DeployPhase::Done)?;
        log::info!("{release} is live on {}", self.host_list());
        Ok(RunOutcome::Completed)
    }

    /// Return every host to its previous release and revert the patches
    /// applied since.
    pub async fn rollback(&self) -> DeployResult<RunOutcome> {
        let mut phases = PhaseTracker::<RollbackPhase>::new();
        let mut ctx = RunContext::new();
        log::info!(
            "Rolling back {} host(s) ({}) over {}",
            self.topology.targets().len(),
            self.config.target,
            self.gateway.gateway_type()
        );

        self.discover_histories(&mut ctx).await?;

        let mut plan: Vec<(&HostTarget, Release, Release)> = Vec::new();
        for target in self.topology.targets() {
            let history = ctx.history(&target.host);
            match (
                self.last_release(&history),
                self.previous_release(&history),
            ) {
                (Some(last), Some(previous)) => plan.push((target, last, previous)),
                _ => {
                    log::warn!("{target}: there is no earlier release to roll back to");
                    return Ok(RunOutcome::RollbackUnavailable);
                }
            }
        }

        let master = self.master()?;
        let master_history = ctx.history(&master.host);
        let window = Window::new(
            master_history.last_timestamp,
            master_history.previous_timestamp,
        );
        let pending = self
            .pending_patches(
                &mut ctx,
                window,
                &scratch_table(Local::now().naive_local()),
            )
            .await?;
        show_patches("revert", &pending);

        let (_, last, previous) = &plan[0];
        let question = format!(
            "Roll back from {last} to {previous} on {}?",
            self.host_list()
        );
        if !self.confirm(&mut ctx, &question)? {
            return Ok(RunOutcome::Declined);
        }
        phases.advance(RollbackPhase::Checked)?;

        let gateway = self.gateway.as_ref();
        for (target, last, _) in &plan {
            run_hooks(
                gateway,
                &target.host,
                &target.path(&last.directory_name),
                "pre_rollback",
                &self.config.hooks.pre_rollback,
            )
            .await?;
        }
        phases.advance(RollbackPhase::PreRolledBack)?;

        for (target, _, previous) in &plan {
            steps::activate(gateway, target, previous, &self.config.current_link).await?;
        }
        phases.advance(RollbackPhase::SymlinkReverted)?;

        if pending.is_empty() {
            log::info!("No schema changes to revert");
        } else {
            let schema = connected(&ctx)?;
            PatchApplier::new(schema.as_ref()).revert(&pending).await?;
        }
        phases.advance(RollbackPhase::DbReverted)?;

        for (target, last, _) in &plan {
            steps::remove_release(gateway, target, last).await?;
        }
        phases.advance(RollbackPhase::ReleaseRemoved)?;

        for (target, _, previous) in &plan {
            run_hooks(
                gateway,
                &target.host,
                &target.path(&previous.directory_name),
                "post_rollback",
                &self.config.hooks.post_rollback,
            )
            .await?;
        }
        phases.advance(RollbackPhase::PostRolledBack)?;

        for (target, _, previous) in &plan {
            self.clear_cache(target, previous).await?;
        }
        phases.advance(RollbackPhase::CacheCleared)?;

        phases.advance(RollbackPhase::Done)?;
        log::info!("Rolled back to {previous} on {}", self.host_list());
        Ok(RunOutcome::Completed)
    }

    /// Delete releases beyond the newest `keep_releases` on every host.
    pub async fn cleanup(&self) -> DeployResult<RunOutcome> {
        let keep = self.config.keep_releases;
        let mut doomed: Vec<(&HostTarget, Release)> = Vec::new();

        for target in self.topology.targets() {
            let listing = self.list_releases(target).await?;
            let timestamps = release_timestamps(&listing, &self.naming, &self.config.project_name);
            for timestamp in releases_to_remove(&timestamps, keep) {
                doomed.push((
                    target,
                    Release::new(&self.naming, &self.config.project_name, timestamp),
                ));
            }
        }

        if doomed.is_empty() {
            log::info!("Nothing to clean up, every host keeps at most {keep} release(s)");
            return Ok(RunOutcome::Completed);
        }
        for (target, release) in &doomed {
            log::info!("{target}: {release} will be removed");
        }

        let mut ctx = RunContext::new();
        let question = format!("Remove {} old release(s)?", doomed.len());
        if !self.confirm(&mut ctx, &question)? {
            return Ok(RunOutcome::Declined);
        }

        for (target, release) in &doomed {
            steps::remove_release(self.gateway.as_ref(), target, release).await?;
        }
        log::info!("Removed {} old release(s)", doomed.len());
        Ok(RunOutcome::Completed)
    }

    fn master(&self) -> DeployResult<&HostTarget> {
        self.topology.master().ok_or_else(|| {
            DeployError::Core(CoreError::ConfigInvalid {
                message: "at least one host is required".to_string(),
            })
        })
    }

    fn host_list(&self) -> String {
        self.topology
            .targets()
            .iter()
            .map(|t| t.host.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn last_release(&self, history: &DeploymentHistory) -> Option<Release> {
        history.last_release(&self.naming, &self.config.project_name)
    }

    fn previous_release(&self, history: &DeploymentHistory) -> Option<Release> {
        history.previous_release(&self.naming, &self.config.project_name)
    }

    fn source_dir(&self) -> PathBuf {
        self.config.source_dir_absolute(&self.root)
    }

    fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            exclude_files: self.config.rsync_excludes_absolute(&self.root),
            exclude_paths: self
                .config
                .data_dirs
                .iter()
                .map(|d| steps::data_dir_exclude(d))
                .collect(),
            ..Default::default()
        }
    }

    async fn list_releases(&self, target: &HostTarget) -> DeployResult<Vec<String>> {
        self.gateway
            .list_directory(&target.host, &target.remote_dir)
            .await
            .map_err(|e| {
                DeployError::Core(CoreError::HistoryDiscovery {
                    host: target.host.to_string(),
                    message: e.to_string(),
                })
            })
    }

    async fn discover_histories(&self, ctx: &mut RunContext) -> DeployResult<()> {
        for target in self.topology.targets() {
            let listing = self.list_releases(target).await?;
            let history = discover(&listing, &self.naming, &self.config.project_name);
            log::info!(
                "{target}: last release {}, previous {}",
                describe(self.last_release(&history)),
                describe(self.previous_release(&history))
            );
            ctx.set_history(&target.host, history);
        }
        Ok(())
    }

    /// A release that does not sort after every existing one would be
    /// mistaken for an old release by the next run.
    fn check_clock(&self, ctx: &RunContext, release: &Release) -> DeployResult<()> {
        for target in self.topology.targets() {
            let history = ctx.history(&target.host);
            if let Some(last) = self.last_release(&history) {
                if release.timestamp <= last.timestamp {
                    return Err(DeployError::ClockBehind {
                        host: target.host.to_string(),
                        release: release.to_string(),
                        last: last.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn plan_renames(&self, ctx: &mut RunContext) -> DeployResult<()> {
        let local = self.source_dir();
        for target in self.topology.targets() {
            let plan = ctx.rename_plan(
                target,
                &self.config.target,
                &self.config.cluster_specific_files,
                &self.config.target_specific_files,
                &local,
            )?;
            for entry in plan.entries() {
                log::info!("{target}: {entry}");
            }
        }
        Ok(())
    }

    /// Patches between the two points of `window`, ordered for execution.
    ///
    /// The schema is only opened when a patch file falls inside the window.
    async fn pending_patches(
        &self,
        ctx: &mut RunContext,
        window: Window,
        scratch_table: &str,
    ) -> DeployResult<Vec<SqlPatch>> {
        let Some(connector) = self.connector.clone() else {
            log::info!("No database configured, skipping schema patches");
            return Ok(Vec::new());
        };

        let discovered = discover_patches(&self.config.migration_dirs_absolute(&self.root))?;
        if in_window(&discovered, window).is_empty() {
            return Ok(Vec::new());
        }

        let schema = self
            .connect_schema(ctx, connector.as_ref(), scratch_table)
            .await?;
        let applied = schema.applied_names().await?;

        let mut candidates = Vec::with_capacity(discovered.len() + 1);
        candidates.push(schema.bootstrap_patch());
        candidates.extend(discovered);
        Ok(select(&candidates, window, &applied)?)
    }

    /// Open the schema and prove the connection may alter it.
    ///
    /// Configured credentials are tried first; after that the provider is
    /// asked, up to [`MAX_CREDENTIAL_ATTEMPTS`] attempts in total.
    async fn connect_schema(
        &self,
        ctx: &mut RunContext,
        connector: &dyn SchemaConnector,
        scratch_table: &str,
    ) -> DeployResult<Arc<dyn SchemaExecutor>> {
        if let Some(schema) = ctx.schema() {
            return Ok(schema);
        }

        if !connector.requires_credentials() {
            let schema = connector.connect(None).await?;
            schema.probe(scratch_table).await?;
            ctx.set_schema(schema.clone());
            return Ok(schema);
        }

        let defaults = CredentialDefaults::from_config(self.config.database.as_ref());
        let mut last_error = String::new();
        for attempt in 1..=MAX_CREDENTIAL_ATTEMPTS {
            let credentials = match defaults.complete() {
                Some(configured) if attempt == 1 => configured,
                _ => self.credentials.credentials(&defaults, attempt)?,
            };

            let connected = match connector.connect(Some(&credentials)).await {
                Ok(schema) => match schema.probe(scratch_table).await {
                    Ok(()) => Ok(schema),
                    Err(e) => Err(DeployError::from(e)),
                },
                Err(e) => Err(e),
            };

            match connected {
                Ok(schema) => {
                    log::info!(
                        "Connected to {} as {}",
                        credentials.database,
                        credentials.user
                    );
                    ctx.set_credentials(credentials);
                    ctx.set_schema(schema.clone());
                    return Ok(schema);
                }
                Err(e) => {
                    log::warn!(
                        "Credentials refused (attempt {attempt} of {MAX_CREDENTIAL_ATTEMPTS}): {e}"
                    );
                    last_error = e.to_string();
                }
            }
        }

        Err(DeployError::CredentialsRejected {
            attempts: MAX_CREDENTIAL_ATTEMPTS,
            message: last_error,
        })
    }

    /// Show what the transfer would change on `target` compared to `base`.
    async fn show_diff(&self, target: &HostTarget, base: Option<Release>) -> DeployResult<()> {
        let Some(base) = base else {
            log::info!("{target}: first deployment, every file is new");
            return Ok(());
        };
        let lines = steps::preview_sync(
            self.gateway.as_ref(),
            &self.source_dir(),
            target,
            &base,
            &self.sync_options(),
        )
        .await?;
        log::info!("{target}: {} change(s) since {base}", lines.len());
        for line in lines {
            log::info!("    {line}");
        }
        Ok(())
    }

    fn confirm(&self, ctx: &mut RunContext, question: &str) -> DeployResult<bool> {
        let confirmed = self.confirmer.confirm(question)?;
        ctx.set_confirmed(confirmed);
        if !confirmed {
            log::info!("Aborted, nothing was changed");
        }
        Ok(confirmed)
    }

    /// Transfer the release to every host, in parallel when configured.
    async fn sync_all(&self, ctx: &RunContext, release: &Release) -> DeployResult<()> {
        let local = self.source_dir();
        let options = self.sync_options();

        let jobs = self.topology.targets().iter().map(|target| {
            let base = self.last_release(&ctx.history(&target.host));
            let plan = ctx.planned_renames(target).cloned().unwrap_or_default();
            let (local, options) = (&local, &options);
            async move {
                self.sync_host(target, local, release, base.as_ref(), &plan, options)
                    .await
            }
        });

        if self.config.parallel_sync {
            log::info!(
                "Syncing {} host(s) in parallel",
                self.topology.targets().len()
            );
            try_join_all(jobs).await?;
        } else {
            for job in jobs {
                job.await?;
            }
        }
        Ok(())
    }

    async fn sync_host(
        &self,
        target: &HostTarget,
        local: &Path,
        release: &Release,
        base: Option<&Release>,
        plan: &RenamePlan,
        options: &SyncOptions,
    ) -> DeployResult<()> {
        let gateway = self.gateway.as_ref();
        steps::sync_release(gateway, local, target, release, base, options).await?;
        steps::link_data_dirs(gateway, target, release, &self.config.data_dirs).await?;
        steps::apply_renames(gateway, target, release, plan).await
    }

    async fn clear_cache(&self, target: &HostTarget, release: &Release) -> DeployResult<()> {
        match &self.config.clear_cache_command {
            Some(command) => {
                steps::run_in(
                    self.gateway.as_ref(),
                    &target.host,
                    &target.path(&release.directory_name),
                    command,
                )
                .await
            }
            None => {
                log::debug!("{target}: no cache clearing configured");
                Ok(())
            }
        }
    }
}

/// Scratch table used to prove write access, named after the run's timestamp.
pub fn scratch_table(timestamp: NaiveDateTime) -> String {
    format!("temp_{}", timestamp.format("%Y%m%d%H%M%S"))
}

/// The schema opened during the check phase, once the run is confirmed.
fn connected(ctx: &RunContext) -> DeployResult<Arc<dyn SchemaExecutor>> {
    if !ctx.is_confirmed() {
        return Err(DeployError::NotConfirmed);
    }
    let schema = ctx.schema().ok_or_else(|| {
        DeployError::Db(DbError::ConnectionError(
            "schema was not opened during the check phase".to_string(),
        ))
    })?;
    match ctx.credentials() {
        Some(credentials) => log::info!(
            "Changing schema {} on {} as {}",
            credentials.database,
            schema.db_type(),
            credentials.user
        ),
        None => log::info!("Changing schema on {}", schema.db_type()),
    }
    Ok(schema)
}

fn describe(release: Option<Release>) -> String {
    release.map_or_else(|| "none".to_string(), |r| r.to_string())
}

fn show_patches(action: &str, patches: &[SqlPatch]) {
    if patches.is_empty() {
        return;
    }
    log::info!("{} patch(es) to {action}:", patches.len());
    for patch in patches {
        log::info!("    {}", patch.name);
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
