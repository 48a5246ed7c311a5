//! Schema patches: loading, validation and the bootstrap patch
//!
//! A patch lives in a YAML file named `sql_YYYYMMDD_HHMMSS[_label].yml`. The
//! file stem is the patch name and the embedded instant is its timestamp.

use crate::error::{CoreError, CoreResult};
use crate::patch_name::PatchName;
use crate::serde_helpers::default_true;
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Name of the built-in patch that creates the tracking store.
pub const BOOTSTRAP_PATCH_NAME: &str = "sql_19700101_000000_dbpatcher";

/// Timestamp format used in patch file names and tracking records.
pub const PATCH_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

fn patch_file_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^sql_(\d{8})_(\d{6})(?:_[A-Za-z0-9_-]+)?$").expect("static regex is valid")
    })
}

/// Execution strategy hint. Does not influence ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeClass {
    /// Quick change, short lock wait
    #[default]
    Small,
    /// Long-running change such as a table rebuild
    Large,
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeClass::Small => write!(f, "small"),
            SizeClass::Large => write!(f, "large"),
        }
    }
}

/// Whether a patch is the graph root or an ordinary migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchKind {
    /// Creates the tracking store; every other patch depends on it
    Bootstrap,
    /// Loaded from a migration directory
    Regular,
}

/// On-disk representation of a patch file
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PatchFile {
    #[serde(default)]
    up: String,

    #[serde(default)]
    down: String,

    #[serde(default)]
    dependencies: Vec<PatchName>,

    #[serde(default = "default_true")]
    active: bool,

    #[serde(default)]
    size: SizeClass,
}

/// One schema-migration unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlPatch {
    pub name: PatchName,
    pub timestamp: NaiveDateTime,
    pub up: String,
    pub down: String,
    /// Declared dependencies; the bootstrap edge is implicit
    pub dependencies: BTreeSet<PatchName>,
    pub active: bool,
    pub size: SizeClass,
    pub kind: PatchKind,
    /// Source file, `None` for the built-in bootstrap patch
    pub path: Option<PathBuf>,
}

impl SqlPatch {
    /// The bootstrap patch with the dialect-specific DDL of the tracking store.
    pub fn bootstrap(up: impl Into<String>) -> Self {
        Self {
            name: PatchName::try_new(BOOTSTRAP_PATCH_NAME).expect("constant is non-empty"),
            timestamp: bootstrap_timestamp(),
            up: up.into(),
            down: String::new(),
            dependencies: BTreeSet::new(),
            active: true,
            size: SizeClass::Small,
            kind: PatchKind::Bootstrap,
            path: None,
        }
    }

    /// Build a regular patch in memory; the name must carry a timestamp.
    pub fn new(name: &str, up: &str, down: &str) -> CoreResult<Self> {
        let timestamp = timestamp_from_name(name).ok_or_else(|| CoreError::InvalidPatchFile {
            path: name.to_string(),
            reason: "name does not match sql_YYYYMMDD_HHMMSS".to_string(),
        })?;
        let patch = Self {
            name: PatchName::try_new(name).ok_or_else(|| CoreError::InvalidPatchFile {
                path: name.to_string(),
                reason: "empty name".to_string(),
            })?,
            timestamp,
            up: up.to_string(),
            down: down.to_string(),
            dependencies: BTreeSet::new(),
            active: true,
            size: SizeClass::Small,
            kind: PatchKind::Regular,
            path: None,
        };
        patch.check_syntax()?;
        Ok(patch)
    }

    /// Add a declared dependency.
    pub fn depends_on(mut self, name: &str) -> Self {
        if let Some(dep) = PatchName::try_new(name) {
            self.dependencies.insert(dep);
        }
        self
    }

    /// Change the size class.
    pub fn with_size(mut self, size: SizeClass) -> Self {
        self.size = size;
        self
    }

    pub fn is_bootstrap(&self) -> bool {
        self.kind == PatchKind::Bootstrap
    }

    /// Timestamp rendered the way tracking records store it.
    pub fn timestamp_key(&self) -> String {
        self.timestamp.format(PATCH_TIMESTAMP_FORMAT).to_string()
    }

    /// Load and validate a patch file.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| CoreError::InvalidPatchFile {
                path: path.display().to_string(),
                reason: "file name is not valid UTF-8".to_string(),
            })?;

        if stem == BOOTSTRAP_PATCH_NAME {
            return Err(CoreError::InvalidPatchFile {
                path: path.display().to_string(),
                reason: format!("{BOOTSTRAP_PATCH_NAME} is reserved for the built-in bootstrap patch"),
            });
        }

        let timestamp = timestamp_from_name(stem).ok_or_else(|| CoreError::InvalidPatchFile {
            path: path.display().to_string(),
            reason: "cannot convert file name to a timestamp".to_string(),
        })?;

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let file: PatchFile =
            serde_yaml::from_str(&content).map_err(|e| CoreError::InvalidPatchFile {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let patch = Self {
            name: PatchName::try_new(stem).ok_or_else(|| CoreError::InvalidPatchFile {
                path: path.display().to_string(),
                reason: "empty file name".to_string(),
            })?,
            timestamp,
            up: file.up.trim().to_string(),
            down: file.down.trim().to_string(),
            dependencies: file.dependencies.into_iter().collect(),
            active: file.active,
            size: file.size,
            kind: PatchKind::Regular,
            path: Some(path.to_path_buf()),
        };
        patch.check_syntax()?;
        Ok(patch)
    }

    /// Non-empty scripts must be terminated with `;`.
    pub fn check_syntax(&self) -> CoreResult<()> {
        for (script, sql) in [("up", &self.up), ("down", &self.down)] {
            let sql = sql.trim();
            if !sql.is_empty() && !sql.ends_with(';') {
                return Err(CoreError::PatchSyntax {
                    patch: self.name.to_string(),
                    script,
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for SqlPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The instant of the bootstrap patch: the epoch.
pub fn bootstrap_timestamp() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1970, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("epoch is a valid date")
}

/// Extract the timestamp embedded in a patch name.
pub fn timestamp_from_name(name: &str) -> Option<NaiveDateTime> {
    let caps = patch_file_regex().captures(name)?;
    let digits = format!("{}{}", &caps[1], &caps[2]);
    NaiveDateTime::parse_from_str(&digits, PATCH_TIMESTAMP_FORMAT).ok()
}

fn is_patch_file(path: &Path) -> bool {
    path.is_file()
        && path.extension().is_some_and(|e| e == "yml" || e == "yaml")
        && path
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|s| s.starts_with("sql_"))
}

/// Load every active patch from the migration directories.
///
/// All files are validated, active or not, so a malformed patch fails the
/// run before anything is mutated.
pub fn discover_patches(dirs: &[PathBuf]) -> CoreResult<Vec<SqlPatch>> {
    let mut seen: HashMap<PatchName, PathBuf> = HashMap::new();
    let mut patches = Vec::new();

    for dir in dirs {
        let entries = std::fs::read_dir(dir).map_err(|e| CoreError::IoWithPath {
            path: dir.display().to_string(),
            source: e,
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CoreError::IoWithPath {
                path: dir.display().to_string(),
                source: e,
            })?;
            let path = entry.path();
            if is_patch_file(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            let patch = SqlPatch::load(&path)?;
            if let Some(existing) = seen.get(&patch.name) {
                return Err(CoreError::DuplicatePatch {
                    name: patch.name.to_string(),
                    path1: existing.display().to_string(),
                    path2: path.display().to_string(),
                });
            }
            seen.insert(patch.name.clone(), path);

            if patch.active {
                patches.push(patch);
            } else {
                log::debug!("Skipping inactive patch {}", patch.name);
            }
        }
    }

    patches.sort_by(|a, b| (a.timestamp, &a.name).cmp(&(b.timestamp, &b.name)));
    Ok(patches)
}

#[cfg(test)]
#[path = "patch_test.rs"]
mod tests;
