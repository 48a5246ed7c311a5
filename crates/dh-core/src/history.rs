//! Deployment history discovery from a remote directory listing

use crate::release::{Release, ReleaseNaming};
use chrono::NaiveDateTime;

/// The two most recent releases present on a host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeploymentHistory {
    /// Second most recent release
    pub previous_timestamp: Option<NaiveDateTime>,

    /// Most recent release
    pub last_timestamp: Option<NaiveDateTime>,
}

impl DeploymentHistory {
    /// Whether a rollback target exists.
    pub fn can_roll_back(&self) -> bool {
        self.previous_timestamp.is_some()
    }

    /// The most recent release, if any.
    pub fn last_release(&self, naming: &ReleaseNaming, project: &str) -> Option<Release> {
        self.last_timestamp
            .map(|ts| Release::new(naming, project, ts))
    }

    /// The second most recent release, if any.
    pub fn previous_release(&self, naming: &ReleaseNaming, project: &str) -> Option<Release> {
        self.previous_timestamp
            .map(|ts| Release::new(naming, project, ts))
    }
}

/// All release timestamps of `project` in `listing`, ascending.
///
/// Entries that are not releases of the project are skipped silently.
pub fn release_timestamps<S: AsRef<str>>(
    listing: &[S],
    naming: &ReleaseNaming,
    project: &str,
) -> Vec<NaiveDateTime> {
    let mut timestamps: Vec<NaiveDateTime> = listing
        .iter()
        .filter_map(|entry| naming.parse(project, entry.as_ref().trim()))
        .collect();
    timestamps.sort();
    timestamps.dedup();
    timestamps
}

/// Derive the deployment history from a directory listing.
pub fn discover<S: AsRef<str>>(
    listing: &[S],
    naming: &ReleaseNaming,
    project: &str,
) -> DeploymentHistory {
    let timestamps = release_timestamps(listing, naming, project);
    log::debug!(
        "Found {} release(s) of {} in {} entries",
        timestamps.len(),
        project,
        listing.len()
    );

    match timestamps.as_slice() {
        [] => DeploymentHistory::default(),
        [only] => DeploymentHistory {
            previous_timestamp: None,
            last_timestamp: Some(*only),
        },
        [.., previous, last] => DeploymentHistory {
            previous_timestamp: Some(*previous),
            last_timestamp: Some(*last),
        },
    }
}

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;
