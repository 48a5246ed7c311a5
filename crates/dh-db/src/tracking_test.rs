use super::*;
use chrono::NaiveDate;

fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 2, 1)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

fn cols(values: [Option<&str>; 6]) -> Vec<Option<String>> {
    values.iter().map(|v| v.map(str::to_string)).collect()
}

#[test]
fn test_quote_per_dialect() {
    assert_eq!(Dialect::DuckDb.quote("it's"), "'it''s'");
    assert_eq!(Dialect::MySql.quote("it's"), "'it''s'");
    assert_eq!(Dialect::MySql.quote(r"a\b"), r"'a\\b'");
    assert_eq!(Dialect::DuckDb.quote(r"a\b"), r"'a\b'");
}

#[test]
fn test_record_from_patch() {
    let patch = SqlPatch::new(
        "sql_20240115_103000_users",
        "CREATE TABLE users (id INT);",
        "DROP TABLE users;",
    )
    .unwrap()
    .depends_on("sql_20240101_000000_init");

    let record = AppliedPatchRecord::applied(&patch, at(9, 0, 0));
    assert_eq!(record.patch_timestamp, "20240115103000");
    assert_eq!(record.down_sql, "DROP TABLE users;");
    assert_eq!(record.dependencies, vec![PatchName::try_new("sql_20240101_000000_init").unwrap()]);
    assert!(record.is_applied());
}

#[test]
fn test_record_from_columns() {
    let record = AppliedPatchRecord::from_columns(cols([
        Some("sql_20240115_103000_users"),
        Some("20240115103000"),
        Some("DROP TABLE users;"),
        Some("sql_20240101_000000_a,sql_20240102_000000_b"),
        Some("2024-02-01 09:00:00"),
        None,
    ]))
    .unwrap();

    assert_eq!(record.patch_name, "sql_20240115_103000_users");
    assert_eq!(record.dependencies.len(), 2);
    assert_eq!(record.applied_at, Some(at(9, 0, 0)));
    assert!(record.is_applied());
}

#[test]
fn test_reverted_record_is_not_applied() {
    let record = AppliedPatchRecord::from_columns(cols([
        Some("sql_20240115_103000_users"),
        Some("20240115103000"),
        Some(""),
        Some(""),
        Some("2024-02-01 09:00:00"),
        Some("2024-02-01 10:30:00"),
    ]))
    .unwrap();

    assert!(record.dependencies.is_empty());
    assert_eq!(record.reverted_at, Some(at(10, 30, 0)));
    assert!(!record.is_applied());
}

#[test]
fn test_record_from_columns_rejects_bad_rows() {
    let short = vec![Some("sql_20240115_103000".to_string())];
    assert!(matches!(
        AppliedPatchRecord::from_columns(short),
        Err(DbError::InvalidRecord(_))
    ));

    let bad_time = cols([
        Some("sql_20240115_103000"),
        Some("20240115103000"),
        None,
        None,
        Some("yesterday"),
        None,
    ]);
    assert!(AppliedPatchRecord::from_columns(bad_time).is_err());
}

#[test]
fn test_upsert_statements() {
    let patch = SqlPatch::new("sql_20240115_103000", "SELECT 1;", "SELECT 'x';").unwrap();
    let record = AppliedPatchRecord::applied(&patch, at(9, 0, 0));

    let duck = Dialect::DuckDb.upsert_record(&record);
    assert!(duck.starts_with("INSERT INTO db_patches"));
    assert!(duck.contains("'SELECT ''x'';'"));
    assert!(duck.contains("'2024-02-01 09:00:00', NULL)"));
    assert!(duck.contains("ON CONFLICT (patch_name) DO UPDATE"));

    let my = Dialect::MySql.upsert_record(&record);
    assert!(my.contains("ON DUPLICATE KEY UPDATE"));
    assert!(my.ends_with(';'));
}

#[test]
fn test_mark_reverted_statement() {
    let name = PatchName::try_new("sql_20240115_103000").unwrap();
    assert_eq!(
        Dialect::DuckDb.mark_reverted(&name, at(10, 0, 0)),
        "UPDATE db_patches SET reverted_at = '2024-02-01 10:00:00' \
         WHERE patch_name = 'sql_20240115_103000';"
    );
}

#[test]
fn test_bootstrap_patch_per_dialect() {
    let mysql = Dialect::MySql.bootstrap_patch();
    assert!(mysql.is_bootstrap());
    assert!(mysql.up.contains("AUTO_INCREMENT"));
    assert!(mysql.check_syntax().is_ok());

    let duck = Dialect::DuckDb.bootstrap_patch();
    assert!(duck.up.contains("CREATE TABLE IF NOT EXISTS db_patches"));
    assert!(duck.check_syntax().is_ok());
}

#[test]
fn test_record_time_has_second_precision() {
    assert_eq!(record_time().nanosecond(), 0);
}
