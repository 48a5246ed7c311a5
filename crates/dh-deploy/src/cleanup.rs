//! Retention of old releases

use chrono::NaiveDateTime;

/// The two most recent releases are the active one and its rollback target.
pub const MIN_KEPT_RELEASES: usize = 2;

/// Releases to delete so that the newest `keep` remain.
///
/// `timestamps` must be ascending. Never returns either of the two most
/// recent releases, whatever `keep` says.
pub fn releases_to_remove(timestamps: &[NaiveDateTime], keep: usize) -> Vec<NaiveDateTime> {
    let keep = keep.max(MIN_KEPT_RELEASES);
    let excess = timestamps.len().saturating_sub(keep);
    timestamps[..excess].to_vec()
}

#[cfg(test)]
#[path = "cleanup_test.rs"]
mod tests;
