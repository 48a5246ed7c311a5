//! Configuration types and parsing for deckhand.yml

use crate::error::{CoreError, CoreResult};
use crate::host_name::HostName;
use crate::release::ReleaseNaming;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name looked up in the project root.
pub const CONFIG_FILE_NAME: &str = "deckhand.yml";

/// Main project configuration from deckhand.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Project name, used as the release directory prefix
    pub project_name: String,

    /// Remote hosts. The first one is the cluster master.
    pub hosts: Vec<HostName>,

    /// Base directory on the remote hosts
    pub remote_dir: String,

    /// Target environment (e.g. stage, prod)
    pub target: String,

    /// User for ssh/rsync connections
    #[serde(default)]
    pub remote_user: Option<String>,

    /// ssh port
    #[serde(default = "default_remote_port")]
    pub remote_port: u16,

    /// Local directory that is synchronized, relative to the project root
    #[serde(default = "default_source_dir")]
    pub source_dir: String,

    /// Files passed to rsync as `--exclude-from`
    #[serde(default)]
    pub rsync_excludes: Vec<String>,

    /// Directories with user-generated content, shared between releases
    #[serde(default)]
    pub data_dirs: Vec<String>,

    /// Files with a variant per target environment
    #[serde(default)]
    pub target_specific_files: Vec<String>,

    /// Files with a variant per cluster role
    #[serde(default)]
    pub cluster_specific_files: Vec<String>,

    /// Directories scanned for patch files
    #[serde(default)]
    pub migration_dirs: Vec<String>,

    /// Database settings; without them the migration phases are skipped
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Release directory name format, must contain `{timestamp}`
    #[serde(default = "default_release_name_format")]
    pub release_name_format: String,

    /// chrono format of the timestamp inside release directory names
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,

    /// Name of the symlink pointing at the active release
    #[serde(default = "default_current_link")]
    pub current_link: String,

    /// Remote shell hooks around deploy and rollback
    #[serde(default)]
    pub hooks: HooksConfig,

    /// Remote command that clears application caches after activation
    #[serde(default)]
    pub clear_cache_command: Option<String>,

    /// Number of releases kept by `cleanup`
    #[serde(default = "default_keep_releases")]
    pub keep_releases: usize,

    /// Synchronize files to all hosts concurrently
    #[serde(default)]
    pub parallel_sync: bool,

    /// ssh binary
    #[serde(default = "default_ssh_path")]
    pub ssh_path: String,

    /// rsync binary
    #[serde(default = "default_rsync_path")]
    pub rsync_path: String,
}

/// Database backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    /// MySQL, driven through the `mysql` client on the database host
    #[default]
    MySql,
    /// DuckDB file opened locally
    DuckDb,
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbType::MySql => write!(f, "mysql"),
            DbType::DuckDb => write!(f, "duckdb"),
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Backend type
    #[serde(rename = "type", default)]
    pub db_type: DbType,

    /// Host the `mysql` client runs on (default: the cluster master)
    #[serde(default)]
    pub host: Option<HostName>,

    /// Schema name; prompted for when absent
    #[serde(default)]
    pub name: Option<String>,

    /// User; prompted for when absent
    #[serde(default)]
    pub user: Option<String>,

    /// Password; prompted for when absent
    #[serde(default)]
    pub password: Option<String>,

    /// DuckDB database file
    #[serde(default)]
    pub path: Option<String>,

    /// Lock wait timeout in seconds for small patches
    #[serde(default = "default_small_lock_timeout")]
    pub small_lock_timeout: u32,

    /// Lock wait timeout in seconds for large patches
    #[serde(default = "default_large_lock_timeout")]
    pub large_lock_timeout: u32,
}

/// Remote shell commands run inside the release directory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HooksConfig {
    /// Run on every host before files are synchronized
    #[serde(default)]
    pub pre_deploy: Vec<String>,

    /// Run on every host after activation
    #[serde(default)]
    pub post_deploy: Vec<String>,

    /// Run on every host before the symlink is reverted
    #[serde(default)]
    pub pre_rollback: Vec<String>,

    /// Run on every host after the release is removed
    #[serde(default)]
    pub post_rollback: Vec<String>,
}

fn default_remote_port() -> u16 {
    22
}

fn default_source_dir() -> String {
    ".".to_string()
}

fn default_release_name_format() -> String {
    "{project}_{timestamp}".to_string()
}

fn default_timestamp_format() -> String {
    "%Y-%m-%d_%H%M%S".to_string()
}

fn default_current_link() -> String {
    "production".to_string()
}

fn default_keep_releases() -> usize {
    5
}

fn default_ssh_path() -> String {
    "ssh".to_string()
}

fn default_rsync_path() -> String {
    "rsync".to_string()
}

fn default_small_lock_timeout() -> u32 {
    30
}

fn default_large_lock_timeout() -> u32 {
    600
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| CoreError::ConfigParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        Self::load(&dir.join(CONFIG_FILE_NAME))
    }

    /// Check invariants serde cannot express
    pub fn validate(&self) -> CoreResult<()> {
        if self.project_name.trim().is_empty() {
            return Err(invalid("project_name must not be empty"));
        }
        if self.hosts.is_empty() {
            return Err(invalid("at least one host is required"));
        }
        if self.target.trim().is_empty() {
            return Err(invalid("target must not be empty"));
        }
        if self.remote_dir.trim().is_empty() {
            return Err(invalid("remote_dir must not be empty"));
        }
        if self.current_link.is_empty() || self.current_link.contains('/') {
            return Err(invalid("current_link must be a plain file name"));
        }
        if self.keep_releases < 2 {
            return Err(invalid("keep_releases must be at least 2"));
        }
        self.naming()?;

        if let Some(db) = &self.database {
            if db.db_type == DbType::DuckDb && db.path.is_none() {
                return Err(invalid("database.path is required for duckdb"));
            }
        }
        Ok(())
    }

    /// Release directory naming derived from the configured formats
    pub fn naming(&self) -> CoreResult<ReleaseNaming> {
        ReleaseNaming::new(&self.release_name_format, &self.timestamp_format)
    }

    /// The remote directory of the cluster master: `<remote_dir>/<target>`
    pub fn target_remote_dir(&self) -> String {
        format!("{}/{}", self.remote_dir.trim_end_matches('/'), self.target)
    }

    /// The cluster master, which is also the default database host
    pub fn master_host(&self) -> &HostName {
        // validate() guarantees at least one host
        &self.hosts[0]
    }

    /// Host the schema migrations are executed on
    pub fn database_host(&self) -> &HostName {
        self.database
            .as_ref()
            .and_then(|db| db.host.as_ref())
            .unwrap_or_else(|| self.master_host())
    }

    /// Absolute local source directory given the project root
    pub fn source_dir_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.source_dir)
    }

    /// Absolute migration directories given the project root
    pub fn migration_dirs_absolute(&self, root: &Path) -> Vec<PathBuf> {
        self.migration_dirs.iter().map(|d| root.join(d)).collect()
    }

    /// Absolute rsync exclude files given the project root
    pub fn rsync_excludes_absolute(&self, root: &Path) -> Vec<PathBuf> {
        self.rsync_excludes.iter().map(|f| root.join(f)).collect()
    }
}

fn invalid(message: &str) -> CoreError {
    CoreError::ConfigInvalid {
        message: message.to_string(),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
