use super::*;
use std::fs;
use tempfile::tempdir;

fn touch(root: &Path, rel: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "").unwrap();
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_insert_suffix() {
    assert_eq!(insert_suffix("config/db.php", "prod"), "config/db.prod.php");
    assert_eq!(insert_suffix("config/db.master.php", "prod"), "config/db.master.prod.php");
    assert_eq!(insert_suffix("conf.d/app", "node"), "conf.d/app.node");
    assert_eq!(insert_suffix("web/.htaccess", "prod"), "web/.prod.htaccess");
    assert_eq!(insert_suffix("Makefile", "stage"), "Makefile.stage");
}

#[test]
fn test_cluster_then_target_composition() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "config/db.master.prod.php");

    let cluster = strings(&["config/db.php"]);
    let target = strings(&["config/db.php"]);
    let plan = plan(RenameRequest {
        remote_dir: "/srv/clustermaster/prod",
        target_environment: "prod",
        cluster_files: &cluster,
        target_files: &target,
        local_root: dir.path(),
    })
    .unwrap();

    assert_eq!(plan.entries().len(), 1);
    assert_eq!(plan.variant_of("config/db.php"), Some("config/db.master.prod.php"));
    assert_ne!(plan.variant_of("config/db.php"), Some("config/db.prod.master.php"));
}

#[test]
fn test_node_role_and_separate_files() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "config/cache.node.yml");
    touch(dir.path(), "web/.stage.htaccess");

    let cluster = strings(&["config/cache.yml"]);
    let target = strings(&["web/.htaccess"]);
    let plan = plan(RenameRequest {
        remote_dir: "/srv/clusternode/stage",
        target_environment: "stage",
        cluster_files: &cluster,
        target_files: &target,
        local_root: dir.path(),
    })
    .unwrap();

    assert_eq!(
        plan.entries(),
        &[
            RenameEntry {
                canonical: "config/cache.yml".to_string(),
                variant: "config/cache.node.yml".to_string(),
            },
            RenameEntry {
                canonical: "web/.htaccess".to_string(),
                variant: "web/.stage.htaccess".to_string(),
            },
        ]
    );
    assert_eq!(
        plan.entries()[0].to_string(),
        "config/cache.node.yml => config/cache.yml"
    );
}

#[test]
fn test_no_cluster_role_skips_cluster_files() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "config/db.prod.php");

    let cluster = strings(&["config/db.php"]);
    let target = strings(&["config/db.php"]);
    let plan = plan(RenameRequest {
        remote_dir: "/srv/shop/prod",
        target_environment: "prod",
        cluster_files: &cluster,
        target_files: &target,
        local_root: dir.path(),
    })
    .unwrap();

    assert_eq!(plan.variant_of("config/db.php"), Some("config/db.prod.php"));
}

#[test]
fn test_missing_variant_is_an_error() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "config/db.master.php");

    let cluster = strings(&["config/db.php"]);
    let target = strings(&["config/db.php"]);
    let err = plan(RenameRequest {
        remote_dir: "/srv/clustermaster/prod",
        target_environment: "prod",
        cluster_files: &cluster,
        target_files: &target,
        local_root: dir.path(),
    })
    .unwrap_err();

    match err {
        CoreError::MissingRenameSource { path, declared } => {
            assert!(path.ends_with("config/db.master.prod.php"));
            assert_eq!(declared, "config/db.php");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_empty_declarations_give_empty_plan() {
    let dir = tempdir().unwrap();
    let plan = plan(RenameRequest {
        remote_dir: "/srv/shop/prod",
        target_environment: "prod",
        cluster_files: &[],
        target_files: &[],
        local_root: dir.path(),
    })
    .unwrap();
    assert!(plan.is_empty());
}
