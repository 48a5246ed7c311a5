//! Planning of role- and environment-specific file renames
//!
//! A repository keeps variants such as `config/db.master.prod.php` next to the
//! canonical `config/db.php`. After files are synchronized the variant that
//! matches the host's cluster role and the target environment is moved onto
//! the canonical path.

use crate::error::{CoreError, CoreResult};
use crate::topology::ClusterRole;
use std::fmt;
use std::path::Path;

/// One planned rename inside a release directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameEntry {
    /// Path the application reads, relative to the release root
    pub canonical: String,

    /// Variant moved onto `canonical`
    pub variant: String,
}

impl fmt::Display for RenameEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.variant, self.canonical)
    }
}

/// Ordered mapping from canonical path to variant path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenamePlan {
    entries: Vec<RenameEntry>,
}

impl RenamePlan {
    pub fn entries(&self) -> &[RenameEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Variant planned for a canonical path.
    pub fn variant_of(&self, canonical: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.canonical == canonical)
            .map(|e| e.variant.as_str())
    }

    fn upsert(&mut self, canonical: &str, variant: String) {
        match self.entries.iter_mut().find(|e| e.canonical == canonical) {
            Some(entry) => entry.variant = variant,
            None => self.entries.push(RenameEntry {
                canonical: canonical.to_string(),
                variant,
            }),
        }
    }
}

/// Insert `.tag` before the extension of the file name: `a/db.php` -> `a/db.tag.php`.
///
/// Only the final extension counts, directories are never touched, and a
/// name without extension gets the tag appended.
pub fn insert_suffix(path: &str, tag: &str) -> String {
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    match path[name_start..].rfind('.') {
        Some(dot) => {
            let at = name_start + dot;
            format!("{}.{}{}", &path[..at], tag, &path[at..])
        }
        None => format!("{path}.{tag}"),
    }
}

/// Everything the planner needs to know about one host.
#[derive(Debug, Clone, Copy)]
pub struct RenameRequest<'a> {
    /// Remote directory of the host, which encodes its cluster role
    pub remote_dir: &'a str,
    pub target_environment: &'a str,
    pub cluster_files: &'a [String],
    pub target_files: &'a [String],
    /// Local tree the variants are synchronized from
    pub local_root: &'a Path,
}

/// Compute the renames for one host.
///
/// Cluster suffixes are applied first and target suffixes compose onto them,
/// giving `name.master.prod.ext`. Every variant must exist locally; the check
/// runs before anything is sent to a host.
pub fn plan(request: RenameRequest<'_>) -> CoreResult<RenamePlan> {
    let role = ClusterRole::from_remote_dir(request.remote_dir);
    let mut plan = RenamePlan::default();

    match role.tag() {
        Some(tag) => {
            for file in request.cluster_files {
                plan.upsert(file, insert_suffix(file, tag));
            }
        }
        None if !request.cluster_files.is_empty() => {
            log::debug!(
                "{} is not a cluster directory, leaving {} cluster-specific file(s) alone",
                request.remote_dir,
                request.cluster_files.len()
            );
        }
        None => {}
    }

    for file in request.target_files {
        let base = plan.variant_of(file).unwrap_or(file).to_string();
        plan.upsert(file, insert_suffix(&base, request.target_environment));
    }

    for entry in plan.entries() {
        if !request.local_root.join(&entry.variant).is_file() {
            return Err(CoreError::MissingRenameSource {
                path: request.local_root.join(&entry.variant).display().to_string(),
                declared: entry.canonical.clone(),
            });
        }
    }

    Ok(plan)
}

#[cfg(test)]
#[path = "rename_test.rs"]
mod tests;
