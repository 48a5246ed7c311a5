//! Deploy and rollback phase state machines

use crate::error::{DeployError, DeployResult};
use std::fmt;

/// A phase of a strictly sequential run.
pub trait Phase: Copy + Eq + fmt::Display + 'static {
    /// Every phase in execution order; the first is the initial phase
    const ORDER: &'static [Self];

    /// Name of the run the phases belong to, used in log lines
    const RUN: &'static str;

    fn initial() -> Self {
        Self::ORDER[0]
    }

    /// The only phase that may follow this one.
    fn next(self) -> Option<Self> {
        let index = Self::ORDER.iter().position(|p| *p == self)?;
        Self::ORDER.get(index + 1).copied()
    }
}

/// Phases of a deploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeployPhase {
    Initialized,
    Checked,
    PreDeployed,
    FilesSynced,
    DbMigrated,
    Activated,
    PostDeployed,
    CacheCleared,
    Done,
}

impl Phase for DeployPhase {
    const ORDER: &'static [Self] = &[
        DeployPhase::Initialized,
        DeployPhase::Checked,
        DeployPhase::PreDeployed,
        DeployPhase::FilesSynced,
        DeployPhase::DbMigrated,
        DeployPhase::Activated,
        DeployPhase::PostDeployed,
        DeployPhase::CacheCleared,
        DeployPhase::Done,
    ];
    const RUN: &'static str = "deploy";
}

impl fmt::Display for DeployPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeployPhase::Initialized => "initialized",
            DeployPhase::Checked => "checked",
            DeployPhase::PreDeployed => "pre_deployed",
            DeployPhase::FilesSynced => "files_synced",
            DeployPhase::DbMigrated => "db_migrated",
            DeployPhase::Activated => "activated",
            DeployPhase::PostDeployed => "post_deployed",
            DeployPhase::CacheCleared => "cache_cleared",
            DeployPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Phases of a rollback, the mirror image of a deploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RollbackPhase {
    Initialized,
    Checked,
    PreRolledBack,
    SymlinkReverted,
    DbReverted,
    ReleaseRemoved,
    PostRolledBack,
    CacheCleared,
    Done,
}

impl Phase for RollbackPhase {
    const ORDER: &'static [Self] = &[
        RollbackPhase::Initialized,
        RollbackPhase::Checked,
        RollbackPhase::PreRolledBack,
        RollbackPhase::SymlinkReverted,
        RollbackPhase::DbReverted,
        RollbackPhase::ReleaseRemoved,
        RollbackPhase::PostRolledBack,
        RollbackPhase::CacheCleared,
        RollbackPhase::Done,
    ];
    const RUN: &'static str = "rollback";
}

impl fmt::Display for RollbackPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RollbackPhase::Initialized => "initialized",
            RollbackPhase::Checked => "checked",
            RollbackPhase::PreRolledBack => "pre_rolled_back",
            RollbackPhase::SymlinkReverted => "symlink_reverted",
            RollbackPhase::DbReverted => "db_reverted",
            RollbackPhase::ReleaseRemoved => "release_removed",
            RollbackPhase::PostRolledBack => "post_rolled_back",
            RollbackPhase::CacheCleared => "cache_cleared",
            RollbackPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Tracks the current phase and only lets a run move one step forward.
#[derive(Debug, Clone)]
pub struct PhaseTracker<P: Phase> {
    current: P,
    visited: Vec<P>,
}

impl<P: Phase> PhaseTracker<P> {
    pub fn new() -> Self {
        Self {
            current: P::initial(),
            visited: vec![P::initial()],
        }
    }

    pub fn current(&self) -> P {
        self.current
    }

    /// Every phase entered so far, the initial one included.
    pub fn visited(&self) -> &[P] {
        &self.visited
    }

    pub fn is_done(&self) -> bool {
        self.current.next().is_none()
    }

    /// Enter `to`, which must directly follow the current phase.
    pub fn advance(&mut self, to: P) -> DeployResult<()> {
        if self.current.next() != Some(to) {
            return Err(DeployError::InvalidTransition {
                from: self.current.to_string(),
                to: to.to_string(),
            });
        }
        log::info!("[{}] {} -> {}", P::RUN, self.current, to);
        self.current = to;
        self.visited.push(to);
        Ok(())
    }
}

impl<P: Phase> Default for PhaseTracker<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "phase_test.rs"]
mod tests;
