//! Release identity and directory naming

use crate::error::{CoreError, CoreResult};
use chrono::format::{Item, StrftimeItems};
use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use std::fmt;

const PROJECT_PLACEHOLDER: &str = "{project}";
const TIMESTAMP_PLACEHOLDER: &str = "{timestamp}";

/// Formats and parses release directory names.
///
/// The name format contains `{project}` and exactly one `{timestamp}`; the
/// timestamp is rendered with a chrono format string of second precision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseNaming {
    name_format: String,
    timestamp_format: String,
}

impl ReleaseNaming {
    /// Build a naming scheme, rejecting formats that cannot round-trip.
    pub fn new(name_format: &str, timestamp_format: &str) -> CoreResult<Self> {
        if name_format.matches(TIMESTAMP_PLACEHOLDER).count() != 1 {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "release_name_format '{name_format}' must contain {TIMESTAMP_PLACEHOLDER} exactly once"
                ),
            });
        }
        if StrftimeItems::new(timestamp_format).any(|item| matches!(item, Item::Error)) {
            return Err(CoreError::ConfigInvalid {
                message: format!("timestamp_format '{timestamp_format}' is not a valid chrono format"),
            });
        }

        let naming = Self {
            name_format: name_format.to_string(),
            timestamp_format: timestamp_format.to_string(),
        };

        let probe = NaiveDate::from_ymd_opt(2001, 2, 3)
            .and_then(|d| d.and_hms_opt(4, 5, 6))
            .ok_or_else(|| CoreError::ConfigInvalid {
                message: "invalid probe timestamp".to_string(),
            })?;
        if naming.parse_timestamp(&probe.format(timestamp_format).to_string()) != Some(probe) {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "timestamp_format '{timestamp_format}' must encode date and time to the second"
                ),
            });
        }

        Ok(naming)
    }

    /// Directory name of the release of `project` created at `timestamp`.
    pub fn directory_name(&self, project: &str, timestamp: NaiveDateTime) -> String {
        self.name_format
            .replace(PROJECT_PLACEHOLDER, project)
            .replace(
                TIMESTAMP_PLACEHOLDER,
                &timestamp.format(&self.timestamp_format).to_string(),
            )
    }

    /// Parse a directory name back to its timestamp.
    ///
    /// Returns `None` for anything that is not a release of `project`.
    pub fn parse(&self, project: &str, name: &str) -> Option<NaiveDateTime> {
        let (before, after) = self.name_format.split_once(TIMESTAMP_PLACEHOLDER)?;
        let prefix = before.replace(PROJECT_PLACEHOLDER, project);
        let suffix = after.replace(PROJECT_PLACEHOLDER, project);
        let middle = name.strip_prefix(&prefix)?.strip_suffix(&suffix)?;
        self.parse_timestamp(middle)
    }

    fn parse_timestamp(&self, text: &str) -> Option<NaiveDateTime> {
        let parsed = NaiveDateTime::parse_from_str(text, &self.timestamp_format).ok()?;
        // Reject lenient parses such as unpadded fields
        (parsed.format(&self.timestamp_format).to_string() == text).then_some(parsed)
    }
}

impl Default for ReleaseNaming {
    fn default() -> Self {
        Self {
            name_format: "{project}_{timestamp}".to_string(),
            timestamp_format: "%Y-%m-%d_%H%M%S".to_string(),
        }
    }
}

/// One deployed snapshot of the project on a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// Creation instant, second precision
    pub timestamp: NaiveDateTime,

    /// Directory name below the remote directory
    pub directory_name: String,
}

impl Release {
    /// Identify the release of `project` created at `timestamp`.
    pub fn new(naming: &ReleaseNaming, project: &str, timestamp: NaiveDateTime) -> Self {
        let timestamp = truncate_to_second(timestamp);
        Self {
            timestamp,
            directory_name: naming.directory_name(project, timestamp),
        }
    }

    /// A new release stamped with the current local time.
    pub fn now(naming: &ReleaseNaming, project: &str) -> Self {
        Self::new(naming, project, Local::now().naive_local())
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.directory_name)
    }
}

fn truncate_to_second(timestamp: NaiveDateTime) -> NaiveDateTime {
    timestamp.with_nanosecond(0).unwrap_or(timestamp)
}

#[cfg(test)]
#[path = "release_test.rs"]
mod tests;
