use super::*;
use crate::commands::{deploy, rollback};
use dh_deploy::testing::{FakeGateway, Journal, ScriptedConfirmer};
use std::fs;
use tempfile::tempdir;

const CONFIG: &str = "project_name: shop\nhosts: [web1]\nremote_dir: /srv/app\ntarget: prod\n";

fn global(project_dir: &str, config: Option<&str>) -> GlobalArgs {
    GlobalArgs {
        verbose: false,
        project_dir: project_dir.to_string(),
        config: config.map(str::to_string),
        yes: true,
    }
}

fn orchestrator(root: &Path, gateway: Arc<FakeGateway>, answer: bool) -> Orchestrator {
    let config = Config::load_from_dir(root).unwrap();
    Orchestrator::new(
        config,
        root,
        gateway,
        Arc::new(ScriptedConfirmer::answering(&[answer])),
        Arc::new(ConfiguredCredentials),
    )
    .unwrap()
}

#[test]
fn test_config_path_defaults_to_project_dir() {
    assert_eq!(
        config_path(&global("/work/shop", None)),
        PathBuf::from("/work/shop/deckhand.yml")
    );
    assert_eq!(
        config_path(&global("/work/shop", Some("ops/deploy.yml"))),
        PathBuf::from("ops/deploy.yml")
    );
}

#[test]
fn test_load_config_root_is_config_directory() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("ops")).unwrap();
    let path = dir.path().join("ops/deploy.yml");
    fs::write(&path, CONFIG).unwrap();

    let (config, root) = load_config(&global(".", path.to_str())).unwrap();
    assert_eq!(config.project_name, "shop");
    assert_eq!(root, dir.path().join("ops"));
}

#[test]
fn test_load_config_missing_file() {
    let dir = tempdir().unwrap();
    let err = load_config(&global(dir.path().to_str().unwrap(), None)).unwrap_err();
    assert!(err.to_string().contains("[C001]"));
}

#[test]
fn test_build_orchestrator_rejects_invalid_keep() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("deckhand.yml"), CONFIG).unwrap();
    let (mut config, root) = load_config(&global(dir.path().to_str().unwrap(), None)).unwrap();
    config.keep_releases = 1;
    assert!(build_orchestrator(config, &root, &global(".", None)).is_err());
}

#[test]
fn test_report_outcomes_all_succeed() {
    assert!(report(RunOutcome::Completed, "Deploy").is_ok());
    assert!(report(RunOutcome::Declined, "Deploy").is_ok());
    assert!(report(RunOutcome::RollbackUnavailable, "Rollback").is_ok());
}

#[tokio::test]
async fn test_rollback_without_history_succeeds() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("deckhand.yml"), CONFIG).unwrap();
    let gateway = Arc::new(FakeGateway::new(Journal::new()));

    let orchestrator = orchestrator(dir.path(), gateway, true);
    assert!(rollback::run(&orchestrator).await.is_ok());
}

#[tokio::test]
async fn test_declined_deploy_succeeds_without_changes() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("deckhand.yml"), CONFIG).unwrap();
    let journal = Journal::new();
    let gateway = Arc::new(FakeGateway::new(journal.clone()));

    let orchestrator = orchestrator(dir.path(), gateway, false);
    assert!(deploy::run(&orchestrator).await.is_ok());
    assert!(journal.mutations().is_empty());
}

#[tokio::test]
async fn test_deploy_failure_carries_host_context() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("deckhand.yml"), CONFIG).unwrap();
    let gateway = Arc::new(FakeGateway::new(Journal::new()));
    gateway.fail_commands_containing("mkdir");

    let orchestrator = orchestrator(dir.path(), gateway, true);
    let err = deploy::run(&orchestrator).await.unwrap_err();
    assert!(err.to_string().contains("web1"));
}
