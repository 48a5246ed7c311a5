use super::*;
use crate::testing::{FakeGateway, Journal};
use chrono::NaiveDate;
use dh_core::{rename, RenameRequest, ReleaseNaming};
use std::fs;
use tempfile::tempdir;

fn target() -> HostTarget {
    HostTarget {
        host: HostName::try_new("web1").unwrap(),
        remote_dir: "/srv/clustermaster/prod".to_string(),
    }
}

fn release(day: u32) -> Release {
    let ts = NaiveDate::from_ymd_opt(2024, 2, day)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    Release::new(&ReleaseNaming::default(), "shop", ts)
}

#[tokio::test]
async fn test_prepare_directory_creates_data_dirs() {
    let journal = Journal::new();
    let gateway = FakeGateway::new(journal.clone());
    prepare_directory(&gateway, &target(), &["web/uploads/".to_string()])
        .await
        .unwrap();
    assert_eq!(
        journal.entries(),
        vec!["run web1 mkdir -p /srv/clustermaster/prod /srv/clustermaster/prod/data/web/uploads"]
    );
}

#[tokio::test]
async fn test_activate_swaps_link_atomically() {
    let journal = Journal::new();
    let gateway = FakeGateway::new(journal.clone());
    activate(&gateway, &target(), &release(1), "production")
        .await
        .unwrap();
    assert_eq!(
        journal.entries(),
        vec![
            "run web1 ln -sfn /srv/clustermaster/prod/shop_2024-02-01_090000 \
             /srv/clustermaster/prod/production.tmp \
             && mv -Tf /srv/clustermaster/prod/production.tmp /srv/clustermaster/prod/production"
        ]
    );
}

#[tokio::test]
async fn test_sync_release_links_against_base() {
    let journal = Journal::new();
    let gateway = FakeGateway::new(journal.clone());
    sync_release(
        &gateway,
        Path::new("/home/me/shop"),
        &target(),
        &release(2),
        Some(&release(1)),
        &SyncOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(
        journal.entries(),
        vec![
            "sync web1 /srv/clustermaster/prod/shop_2024-02-02_090000 \
             link-dest=/srv/clustermaster/prod/shop_2024-02-01_090000"
        ]
    );
}

#[tokio::test]
async fn test_failed_sync_is_reported() {
    let gateway = FakeGateway::new(Journal::new());
    gateway.fail_commands_containing("shop_2024-02-02");
    let err = sync_release(
        &gateway,
        Path::new("/src"),
        &target(),
        &release(2),
        None,
        &SyncOptions::default(),
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("[R002] web1"));
}

#[tokio::test]
async fn test_link_data_dirs_creates_parents() {
    let journal = Journal::new();
    let gateway = FakeGateway::new(journal.clone());
    link_data_dirs(
        &gateway,
        &target(),
        &release(1),
        &["logs".to_string(), "/web/uploads".to_string()],
    )
    .await
    .unwrap();

    let rel = "/srv/clustermaster/prod/shop_2024-02-01_090000";
    let data = "/srv/clustermaster/prod/data";
    assert_eq!(
        journal.entries(),
        vec![
            format!("run web1 rm -rf {rel}/logs && ln -s {data}/logs {rel}/logs"),
            format!(
                "run web1 rm -rf {rel}/web/uploads && mkdir -p {rel}/web \
                 && ln -s {data}/web/uploads {rel}/web/uploads"
            ),
        ]
    );
}

#[tokio::test]
async fn test_apply_renames_moves_variants() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("config")).unwrap();
    fs::write(dir.path().join("config/db.master.prod.php"), "").unwrap();
    let files = vec!["config/db.php".to_string()];
    let plan = rename::plan(RenameRequest {
        remote_dir: "/srv/clustermaster/prod",
        target_environment: "prod",
        cluster_files: &files,
        target_files: &files,
        local_root: dir.path(),
    })
    .unwrap();

    let journal = Journal::new();
    let gateway = FakeGateway::new(journal.clone());
    apply_renames(&gateway, &target(), &release(1), &plan)
        .await
        .unwrap();

    let rel = "/srv/clustermaster/prod/shop_2024-02-01_090000";
    assert_eq!(
        journal.entries(),
        vec![format!(
            "run web1 mv -f {rel}/config/db.master.prod.php {rel}/config/db.php"
        )]
    );
}

#[tokio::test]
async fn test_run_in_quotes_directory() {
    let journal = Journal::new();
    let gateway = FakeGateway::new(journal.clone());
    run_in(&gateway, &target().host, "/srv/my app", "php artisan cache:clear")
        .await
        .unwrap();
    assert_eq!(
        journal.entries(),
        vec!["run web1 cd '/srv/my app' && php artisan cache:clear"]
    );
}

#[tokio::test]
async fn test_exec_fails_on_non_zero_status() {
    let gateway = FakeGateway::new(Journal::new());
    gateway.fail_commands_containing("rm -rf");
    let err = remove_release(&gateway, &target(), &release(1))
        .await
        .unwrap_err();
    assert!(matches!(err, crate::DeployError::Remote(_)));
}
