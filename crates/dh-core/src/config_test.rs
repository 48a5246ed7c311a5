use super::*;
use tempfile::tempdir;

const MINIMAL: &str = r#"
project_name: shop
hosts: [www.example.com]
remote_dir: /home/deploy/shop
target: prod
"#;

#[test]
fn test_parse_minimal_config() {
    let config: Config = serde_yaml::from_str(MINIMAL).unwrap();
    config.validate().unwrap();

    assert_eq!(config.project_name, "shop");
    assert_eq!(config.remote_port, 22);
    assert_eq!(config.current_link, "production");
    assert_eq!(config.keep_releases, 5);
    assert!(!config.parallel_sync);
    assert!(config.database.is_none());
    assert_eq!(config.target_remote_dir(), "/home/deploy/shop/prod");
    assert_eq!(config.database_host(), "www.example.com");
}

#[test]
fn test_parse_full_config() {
    let yaml = r#"
project_name: shop
hosts:
  - web1.example.com
  - web2.example.com
remote_dir: /srv/clustermaster/
target: stage
remote_user: deploy
remote_port: 2222
rsync_excludes: [config/rsync_exclude.txt]
data_dirs: [web/uploads, logs]
target_specific_files: [config/database.php]
cluster_specific_files: [config/database.php]
migration_dirs: [data/sql-updates]
database:
  type: mysql
  host: db.example.com
  name: shop
  user: root
hooks:
  post_deploy:
    - php bin/warmup.php
clear_cache_command: "curl -s localhost/clear_cache.php"
parallel_sync: true
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    config.validate().unwrap();

    assert_eq!(config.hosts.len(), 2);
    assert_eq!(config.remote_port, 2222);
    assert_eq!(config.target_remote_dir(), "/srv/clustermaster/stage");
    assert_eq!(config.database_host(), "db.example.com");
    assert_eq!(config.hooks.post_deploy, vec!["php bin/warmup.php"]);
    assert!(config.hooks.pre_deploy.is_empty());

    let db = config.database.as_ref().unwrap();
    assert_eq!(db.db_type, DbType::MySql);
    assert_eq!(db.small_lock_timeout, 30);
    assert_eq!(db.large_lock_timeout, 600);
    assert!(db.password.is_none());
}

#[test]
fn test_unknown_field_rejected() {
    let yaml = format!("{MINIMAL}\nremote_hosts: [a]\n");
    assert!(serde_yaml::from_str::<Config>(&yaml).is_err());
}

#[test]
fn test_validate_requires_hosts() {
    let yaml = r#"
project_name: shop
hosts: []
remote_dir: /srv
target: prod
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert!(matches!(
        config.validate(),
        Err(CoreError::ConfigInvalid { .. })
    ));
}

#[test]
fn test_validate_keep_releases_minimum() {
    let yaml = format!("{MINIMAL}\nkeep_releases: 1\n");
    let config: Config = serde_yaml::from_str(&yaml).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_release_name_format_needs_timestamp() {
    let yaml = format!("{MINIMAL}\nrelease_name_format: \"{{project}}_release\"\n");
    let config: Config = serde_yaml::from_str(&yaml).unwrap();
    assert!(matches!(
        config.validate(),
        Err(CoreError::ConfigInvalid { .. })
    ));
}

#[test]
fn test_duckdb_requires_path() {
    let yaml = format!("{MINIMAL}\ndatabase:\n  type: duckdb\n");
    let config: Config = serde_yaml::from_str(&yaml).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_load_from_dir() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join(CONFIG_FILE_NAME), MINIMAL).unwrap();

    let config = Config::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.project_name, "shop");
    assert_eq!(
        config.migration_dirs_absolute(dir.path()),
        Vec::<PathBuf>::new()
    );
}

#[test]
fn test_load_missing_file() {
    let dir = tempdir().unwrap();
    let err = Config::load_from_dir(dir.path()).unwrap_err();
    assert!(matches!(err, CoreError::ConfigNotFound { .. }));
}

#[test]
fn test_load_invalid_yaml_reports_path() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join(CONFIG_FILE_NAME), "project_name: [").unwrap();

    let err = Config::load_from_dir(dir.path()).unwrap_err();
    match err {
        CoreError::ConfigParseError { path, .. } => assert!(path.ends_with(CONFIG_FILE_NAME)),
        other => panic!("unexpected error: {other}"),
    }
}
