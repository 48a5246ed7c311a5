//! Release history to patch window scenario tests

use chrono::NaiveDateTime;
use dh_core::{discover, discover_patches, select, ReleaseNaming, SqlPatch, Window};
use dh_core::{CoreError, PatchName};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const BOOTSTRAP_DDL: &str = "CREATE TABLE IF NOT EXISTS db_patches (id INTEGER);";

fn naming() -> ReleaseNaming {
    ReleaseNaming::new("{project}_{timestamp}", "%Y-%m-%d_%H%M%S").unwrap()
}

fn ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

fn write_patch(dir: &Path, name: &str, body: &str) {
    fs::write(dir.join(format!("{name}.yml")), body).unwrap();
}

fn names(patches: &[SqlPatch]) -> Vec<String> {
    patches.iter().map(|p| p.name.to_string()).collect()
}

fn applied(names: &[&str]) -> HashSet<PatchName> {
    names.iter().filter_map(|n| PatchName::try_new(*n)).collect()
}

/// Three patches between four releases, plus one unrelated directory entry.
struct Project {
    _dir: TempDir,
    candidates: Vec<SqlPatch>,
}

impl Project {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let sql = dir.path().join("sql");
        fs::create_dir(&sql).unwrap();
        write_patch(
            &sql,
            "sql_20240110_090000_customers",
            "up: CREATE TABLE customers (id INTEGER);\ndown: DROP TABLE customers;\n",
        );
        write_patch(
            &sql,
            "sql_20240120_090000_email",
            "up: ALTER TABLE customers ADD COLUMN email TEXT;\n\
             down: ALTER TABLE customers DROP COLUMN email;\n\
             dependencies: [sql_20240110_090000_customers]\n",
        );
        write_patch(
            &sql,
            "sql_20240130_090000_orders",
            "up: CREATE TABLE orders (id INTEGER);\ndown: DROP TABLE orders;\nsize: large\n",
        );
        fs::write(sql.join("README.md"), "not a patch").unwrap();

        let mut candidates = discover_patches(&[sql]).unwrap();
        candidates.push(SqlPatch::bootstrap(BOOTSTRAP_DDL));
        Self {
            _dir: dir,
            candidates,
        }
    }
}

#[test]
fn test_first_deploy_runs_everything_before_the_release() {
    let project = Project::new();
    let history = discover(&["shared", "logs"], &naming(), "shop");
    assert_eq!(history.last_timestamp, None);

    let window = Window::new(history.last_timestamp, Some(ts("2024-02-01 00:00:00")));
    let selected = select(&project.candidates, window, &HashSet::new()).unwrap();
    assert_eq!(
        names(&selected),
        vec![
            "sql_19700101_000000_dbpatcher",
            "sql_20240110_090000_customers",
            "sql_20240120_090000_email",
            "sql_20240130_090000_orders",
        ]
    );
}

#[test]
fn test_deploy_runs_only_patches_newer_than_last_release() {
    let project = Project::new();
    let listing = ["shop_2024-01-15_120000", "production", "shop_2024-01-05_120000"];
    let history = discover(&listing, &naming(), "shop");
    assert_eq!(history.last_timestamp, Some(ts("2024-01-15 12:00:00")));
    assert_eq!(history.previous_timestamp, Some(ts("2024-01-05 12:00:00")));

    let window = Window::new(history.last_timestamp, Some(ts("2024-02-01 00:00:00")));
    let done = applied(&["sql_19700101_000000_dbpatcher", "sql_20240110_090000_customers"]);
    let selected = select(&project.candidates, window, &done).unwrap();
    assert_eq!(
        names(&selected),
        vec!["sql_20240120_090000_email", "sql_20240130_090000_orders"]
    );
}

#[test]
fn test_rollback_reverts_newest_first_without_bootstrap() {
    let project = Project::new();
    let listing = ["shop_2024-01-01_000000", "shop_2024-02-01_000000"];
    let history = discover(&listing, &naming(), "shop");
    assert!(history.can_roll_back());

    let window = Window::new(history.last_timestamp, history.previous_timestamp);
    let done = applied(&[
        "sql_19700101_000000_dbpatcher",
        "sql_20240110_090000_customers",
        "sql_20240120_090000_email",
        "sql_20240130_090000_orders",
    ]);
    let selected = select(&project.candidates, window, &done).unwrap();
    assert_eq!(
        names(&selected),
        vec![
            "sql_20240130_090000_orders",
            "sql_20240120_090000_email",
            "sql_20240110_090000_customers",
        ]
    );
}

#[test]
fn test_release_boundary_patch_is_not_selected() {
    let project = Project::new();
    let window = Window::new(Some(ts("2024-01-20 09:00:00")), Some(ts("2024-02-01 00:00:00")));
    let done = applied(&[
        "sql_19700101_000000_dbpatcher",
        "sql_20240110_090000_customers",
        "sql_20240120_090000_email",
    ]);
    let selected = select(&project.candidates, window, &done).unwrap();
    assert_eq!(names(&selected), vec!["sql_20240130_090000_orders"]);
}

#[test]
fn test_dependency_before_window_must_be_applied() {
    let project = Project::new();
    let window = Window::new(Some(ts("2024-01-15 00:00:00")), Some(ts("2024-01-25 00:00:00")));
    let err = select(
        &project.candidates,
        window,
        &applied(&["sql_19700101_000000_dbpatcher"]),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        CoreError::UnsatisfiedDependency { ref dependency, .. }
            if dependency == "sql_20240110_090000_customers"
    ));
}

#[test]
fn test_malformed_patch_fails_discovery() {
    let dir = TempDir::new().unwrap();
    write_patch(
        dir.path(),
        "sql_20240301_000000_broken",
        "up: CREATE TABLE broken (id INTEGER)\n",
    );
    let err = discover_patches(&[dir.path().to_path_buf()]).unwrap_err();
    assert!(err.to_string().contains("[C008]"));
}
