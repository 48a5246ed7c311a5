//! Migration-tracking store: record type and dialect-specific statements
//!
//! The store is a single table, `db_patches`, with one row per patch name.
//! A patch counts as applied while its row has `applied_at` set and
//! `reverted_at` null. Applying a reverted patch again rewrites its row.

use crate::error::{DbError, DbResult};
use chrono::{Local, NaiveDateTime, Timelike};
use dh_core::{PatchName, SqlPatch};

/// Name of the tracking table.
pub const TRACKING_TABLE: &str = "db_patches";

/// Number of columns returned by [`Dialect::select_records`].
pub const RECORD_COLUMNS: usize = 6;

const RECORD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const RECORD_TIME_PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const MYSQL_BOOTSTRAP_DDL: &str = "CREATE TABLE IF NOT EXISTS db_patches (
  id INT UNSIGNED NOT NULL AUTO_INCREMENT,
  patch_name VARCHAR(255) NOT NULL,
  patch_timestamp CHAR(14) NOT NULL,
  down_sql LONGTEXT NOT NULL,
  dependencies TEXT NOT NULL,
  applied_at DATETIME NULL,
  reverted_at DATETIME NULL,
  PRIMARY KEY (id),
  UNIQUE KEY patch_name (patch_name)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;";

const DUCKDB_BOOTSTRAP_DDL: &str = "CREATE SEQUENCE IF NOT EXISTS db_patches_id_seq;
CREATE TABLE IF NOT EXISTS db_patches (
  id INTEGER PRIMARY KEY DEFAULT nextval('db_patches_id_seq'),
  patch_name VARCHAR NOT NULL UNIQUE,
  patch_timestamp VARCHAR NOT NULL,
  down_sql VARCHAR NOT NULL,
  dependencies VARCHAR NOT NULL,
  applied_at TIMESTAMP,
  reverted_at TIMESTAMP
);";

/// SQL dialect of a schema backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
    DuckDb,
}

/// One row of the tracking table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedPatchRecord {
    pub patch_name: PatchName,

    /// `YYYYMMDDHHMMSS`
    pub patch_timestamp: String,

    /// Revert script captured when the patch was applied
    pub down_sql: String,

    /// Dependencies captured when the patch was applied
    pub dependencies: Vec<PatchName>,

    pub applied_at: Option<NaiveDateTime>,
    pub reverted_at: Option<NaiveDateTime>,
}

impl AppliedPatchRecord {
    /// The record written when `patch` is applied at `at`.
    pub fn applied(patch: &SqlPatch, at: NaiveDateTime) -> Self {
        Self {
            patch_name: patch.name.clone(),
            patch_timestamp: patch.timestamp_key(),
            down_sql: patch.down.clone(),
            dependencies: patch.dependencies.iter().cloned().collect(),
            applied_at: Some(at),
            reverted_at: None,
        }
    }

    pub fn is_applied(&self) -> bool {
        self.applied_at.is_some() && self.reverted_at.is_none()
    }

    /// Build a record from the columns of [`Dialect::select_records`].
    pub fn from_columns(columns: Vec<Option<String>>) -> DbResult<Self> {
        let columns: [Option<String>; RECORD_COLUMNS] =
            columns.try_into().map_err(|cols: Vec<Option<String>>| {
                DbError::InvalidRecord(format!(
                    "expected {RECORD_COLUMNS} columns, got {}",
                    cols.len()
                ))
            })?;
        let [name, timestamp, down_sql, dependencies, applied_at, reverted_at] = columns;

        let patch_name = name
            .and_then(PatchName::try_new)
            .ok_or_else(|| DbError::InvalidRecord("empty patch_name".to_string()))?;

        Ok(Self {
            patch_name,
            patch_timestamp: timestamp.unwrap_or_default(),
            down_sql: down_sql.unwrap_or_default(),
            dependencies: dependencies
                .unwrap_or_default()
                .split(',')
                .filter_map(|d| PatchName::try_new(d.trim()))
                .collect(),
            applied_at: parse_time(applied_at.as_deref())?,
            reverted_at: parse_time(reverted_at.as_deref())?,
        })
    }
}

fn parse_time(value: Option<&str>) -> DbResult<Option<NaiveDateTime>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => NaiveDateTime::parse_from_str(v, RECORD_TIME_PARSE_FORMAT)
            .map(Some)
            .map_err(|e| DbError::InvalidRecord(format!("bad timestamp '{v}': {e}"))),
    }
}

/// Current local time at second precision, as stored in the tracking table.
pub fn record_time() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

impl Dialect {
    /// DDL of the bootstrap patch.
    pub fn bootstrap_ddl(&self) -> &'static str {
        match self {
            Dialect::MySql => MYSQL_BOOTSTRAP_DDL,
            Dialect::DuckDb => DUCKDB_BOOTSTRAP_DDL,
        }
    }

    /// The built-in bootstrap patch for this dialect.
    pub fn bootstrap_patch(&self) -> SqlPatch {
        SqlPatch::bootstrap(self.bootstrap_ddl())
    }

    /// Quote a value as a SQL string literal.
    pub fn quote(&self, value: &str) -> String {
        let escaped = match self {
            Dialect::MySql => value.replace('\\', "\\\\").replace('\'', "''"),
            Dialect::DuckDb => value.replace('\'', "''"),
        };
        format!("'{escaped}'")
    }

    fn time_literal(&self, at: Option<NaiveDateTime>) -> String {
        match at {
            Some(at) => self.quote(&at.format(RECORD_TIME_FORMAT).to_string()),
            None => "NULL".to_string(),
        }
    }

    /// Single-column, single-row query: number of tracking tables present.
    pub fn exists_query(&self) -> String {
        match self {
            Dialect::MySql => format!(
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE table_schema = DATABASE() AND table_name = '{TRACKING_TABLE}'"
            ),
            Dialect::DuckDb => format!(
                "SELECT CAST(COUNT(*) AS VARCHAR) FROM information_schema.tables \
                 WHERE table_name = '{TRACKING_TABLE}'"
            ),
        }
    }

    /// All tracking records in insertion order, [`RECORD_COLUMNS`] text columns.
    pub fn select_records(&self) -> String {
        match self {
            Dialect::MySql => format!(
                "SELECT patch_name, patch_timestamp, down_sql, dependencies, \
                 applied_at, reverted_at FROM {TRACKING_TABLE} ORDER BY id"
            ),
            Dialect::DuckDb => format!(
                "SELECT patch_name, patch_timestamp, down_sql, dependencies, \
                 CAST(applied_at AS VARCHAR), CAST(reverted_at AS VARCHAR) \
                 FROM {TRACKING_TABLE} ORDER BY id"
            ),
        }
    }

    /// Insert a record, or overwrite the existing row of the same patch.
    pub fn upsert_record(&self, record: &AppliedPatchRecord) -> String {
        let dependencies = record
            .dependencies
            .iter()
            .map(PatchName::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let values = format!(
            "({}, {}, {}, {}, {}, {})",
            self.quote(&record.patch_name),
            self.quote(&record.patch_timestamp),
            self.quote(&record.down_sql),
            self.quote(&dependencies),
            self.time_literal(record.applied_at),
            self.time_literal(record.reverted_at),
        );
        let insert = format!(
            "INSERT INTO {TRACKING_TABLE} \
             (patch_name, patch_timestamp, down_sql, dependencies, applied_at, reverted_at) \
             VALUES {values}"
        );

        match self {
            Dialect::MySql => format!(
                "{insert} ON DUPLICATE KEY UPDATE \
                 patch_timestamp = VALUES(patch_timestamp), down_sql = VALUES(down_sql), \
                 dependencies = VALUES(dependencies), applied_at = VALUES(applied_at), \
                 reverted_at = VALUES(reverted_at);"
            ),
            Dialect::DuckDb => format!(
                "{insert} ON CONFLICT (patch_name) DO UPDATE SET \
                 patch_timestamp = excluded.patch_timestamp, down_sql = excluded.down_sql, \
                 dependencies = excluded.dependencies, applied_at = excluded.applied_at, \
                 reverted_at = excluded.reverted_at;"
            ),
        }
    }

    /// Mark a patch as reverted.
    pub fn mark_reverted(&self, patch: &PatchName, at: NaiveDateTime) -> String {
        format!(
            "UPDATE {TRACKING_TABLE} SET reverted_at = {} WHERE patch_name = {};",
            self.time_literal(Some(at)),
            self.quote(patch)
        )
    }

    /// Create and drop a scratch table, proving the credentials can alter the schema.
    pub fn probe(&self, scratch_table: &str) -> String {
        format!("CREATE TABLE {scratch_table} (id INTEGER); DROP TABLE {scratch_table};")
    }
}

#[cfg(test)]
#[path = "tracking_test.rs"]
mod tests;
