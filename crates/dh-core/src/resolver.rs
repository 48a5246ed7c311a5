//! Selection and ordering of the patches between two points in history

use crate::dag::{Direction, PatchDag};
use crate::error::{CoreError, CoreResult};
use crate::patch::{SqlPatch, BOOTSTRAP_PATCH_NAME};
use crate::patch_name::PatchName;
use chrono::NaiveDateTime;
use std::collections::{HashMap, HashSet};

/// Two points in deployment history. An absent bound is the beginning of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub lower: Option<NaiveDateTime>,
    pub upper: Option<NaiveDateTime>,
}

impl Window {
    pub fn new(lower: Option<NaiveDateTime>, upper: Option<NaiveDateTime>) -> Self {
        Self { lower, upper }
    }

    /// A window whose lower bound lies after its upper bound runs backwards.
    pub fn direction(&self) -> Direction {
        if self.lower > self.upper {
            Direction::Reverse
        } else {
            Direction::Forward
        }
    }

    /// Whether `timestamp` lies strictly between both bounds.
    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        let (start, end) = if self.lower > self.upper {
            (self.upper, self.lower)
        } else {
            (self.lower, self.upper)
        };
        start.map_or(true, |s| s < timestamp) && end.is_some_and(|e| timestamp < e)
    }
}

/// Regular patches inside the window, unordered.
///
/// Cheap pre-check used to decide whether a schema connection is needed at all.
pub fn in_window<'a>(candidates: &'a [SqlPatch], window: Window) -> Vec<&'a SqlPatch> {
    candidates
        .iter()
        .filter(|p| !p.is_bootstrap() && window.contains(p.timestamp))
        .collect()
}

/// Select the patches to run between `window.lower` and `window.upper`.
///
/// Patches strictly inside the window qualify. A forward selection runs
/// dependencies first and oldest first, preceded by the bootstrap patch unless
/// it is already applied; a reverse selection runs dependents first and newest
/// first and never includes the bootstrap patch. A dependency outside the
/// selection must already be applied.
pub fn select(
    candidates: &[SqlPatch],
    window: Window,
    applied: &HashSet<PatchName>,
) -> CoreResult<Vec<SqlPatch>> {
    check_unique(candidates)?;

    let direction = window.direction();
    let mut selected = in_window(candidates, window);
    if selected.is_empty() {
        return Ok(Vec::new());
    }

    let bootstrap_applied = applied.contains(BOOTSTRAP_PATCH_NAME);
    if direction == Direction::Forward && !bootstrap_applied {
        match candidates.iter().find(|p| p.is_bootstrap()) {
            Some(bootstrap) => selected.push(bootstrap),
            None => {
                return Err(CoreError::UnsatisfiedDependency {
                    patch: selected[0].name.to_string(),
                    dependency: BOOTSTRAP_PATCH_NAME.to_string(),
                })
            }
        }
    }

    let members: HashSet<&PatchName> = selected.iter().map(|p| &p.name).collect();
    for patch in &selected {
        for dep in &patch.dependencies {
            if !members.contains(dep) && !applied.contains(dep) {
                return Err(CoreError::UnsatisfiedDependency {
                    patch: patch.name.to_string(),
                    dependency: dep.to_string(),
                });
            }
        }
    }

    let dag = PatchDag::build(&selected)?;
    let by_name: HashMap<&PatchName, &SqlPatch> = selected.iter().map(|p| (&p.name, *p)).collect();
    let ordered = dag
        .ordered(direction)
        .iter()
        .filter_map(|name| by_name.get(name).map(|p| (*p).clone()))
        .collect::<Vec<_>>();

    log::debug!(
        "Selected {} patch(es) {:?} between {:?} and {:?}",
        ordered.len(),
        direction,
        window.lower,
        window.upper
    );
    Ok(ordered)
}

fn check_unique(candidates: &[SqlPatch]) -> CoreResult<()> {
    let mut seen: HashMap<&PatchName, &SqlPatch> = HashMap::new();
    for patch in candidates {
        if let Some(existing) = seen.insert(&patch.name, patch) {
            let location = |p: &SqlPatch| {
                p.path
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "<built-in>".to_string())
            };
            return Err(CoreError::DuplicatePatch {
                name: patch.name.to_string(),
                path1: location(existing),
                path2: location(patch),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "resolver_test.rs"]
mod tests;
