use super::*;
use dh_remote::{CommandOutput, RemoteResult, SyncOptions};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

/// Gateway that records commands and answers from a script.
#[derive(Default)]
struct ScriptedGateway {
    commands: Mutex<Vec<RemoteCommand>>,
    replies: Mutex<VecDeque<CommandOutput>>,
}

impl ScriptedGateway {
    fn reply(self, lines: &[&str]) -> Self {
        self.replies.lock().unwrap().push_back(CommandOutput {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            ..Default::default()
        });
        self
    }

    fn fail(self, stderr: &str) -> Self {
        self.replies.lock().unwrap().push_back(CommandOutput {
            stderr: stderr.to_string(),
            status: 1,
            ..Default::default()
        });
        self
    }

    fn commands(&self) -> Vec<RemoteCommand> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteGateway for ScriptedGateway {
    async fn list_directory(&self, _host: &HostName, _path: &str) -> RemoteResult<Vec<String>> {
        Ok(Vec::new())
    }

    async fn run_command(
        &self,
        _host: &HostName,
        command: &RemoteCommand,
    ) -> RemoteResult<CommandOutput> {
        self.commands.lock().unwrap().push(command.clone());
        Ok(self.replies.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn sync_tree(
        &self,
        _local: &Path,
        _host: &HostName,
        _remote: &str,
        _options: &SyncOptions,
    ) -> RemoteResult<CommandOutput> {
        Ok(CommandOutput::default())
    }

    fn gateway_type(&self) -> &'static str {
        "scripted"
    }
}

fn backend(gateway: Arc<ScriptedGateway>) -> MySqlBackend {
    MySqlBackend::new(
        gateway,
        HostName::try_new("db1").unwrap(),
        MySqlCredentials {
            database: "shop".to_string(),
            user: "root".to_string(),
            password: "s3cret pass".to_string(),
        },
    )
}

#[test]
fn test_command_uses_heredoc_and_masks_password() {
    let gateway = Arc::new(ScriptedGateway::default());
    let command = backend(gateway).command("SELECT 1");

    assert_eq!(
        command.line(),
        "mysql -N -B -uroot -p's3cret pass' shop <<'DECKHAND_SQL'\nSELECT 1;\nDECKHAND_SQL"
    );
    assert_eq!(
        command.to_string(),
        "mysql -N -B -uroot -p***** shop <<'DECKHAND_SQL'\nSELECT 1;\nDECKHAND_SQL"
    );
}

#[test]
fn test_credentials_debug_hides_password() {
    let creds = MySqlCredentials {
        database: "shop".to_string(),
        user: "root".to_string(),
        password: "hunter2".to_string(),
    };
    assert!(!format!("{creds:?}").contains("hunter2"));
}

#[tokio::test]
async fn test_execute_script_sets_lock_timeout_by_size() {
    let gateway = Arc::new(ScriptedGateway::default());
    let db = backend(gateway.clone()).with_lock_timeouts(5, 900);

    db.execute_script("ALTER TABLE a ADD b INT;", SizeClass::Small)
        .await
        .unwrap();
    db.execute_script("ALTER TABLE big ADD c INT;", SizeClass::Large)
        .await
        .unwrap();

    let commands = gateway.commands();
    assert!(commands[0]
        .line()
        .contains("SET SESSION lock_wait_timeout = 5;\nALTER TABLE a ADD b INT;"));
    assert!(commands[1]
        .line()
        .contains("SET SESSION lock_wait_timeout = 900;\nALTER TABLE big ADD c INT;"));
}

#[tokio::test]
async fn test_applied_records_parse_batch_output() {
    let gateway = Arc::new(
        ScriptedGateway::default()
            .reply(&["1"])
            .reply(&[
                "sql_19700101_000000_dbpatcher\t19700101000000\t\t\t2024-01-01 10:00:00\tNULL",
                "sql_20240115_103000\t20240115103000\tDROP TABLE a;\\nDROP TABLE b;\t\t2024-01-15 11:00:00\tNULL",
                "sql_20240116_103000\t20240116103000\t\t\t2024-01-16 11:00:00\t2024-01-17 08:00:00",
            ]),
    );
    let db = backend(gateway);

    let applied = db.applied_names().await.unwrap();
    assert_eq!(applied.len(), 2);
    assert!(applied.contains("sql_20240115_103000"));
    assert!(!applied.contains("sql_20240116_103000"));
}

#[tokio::test]
async fn test_missing_tracking_store() {
    let gateway = Arc::new(ScriptedGateway::default().reply(&["0"]));
    let db = backend(gateway.clone());
    assert!(db.applied_names().await.unwrap().is_empty());
    assert_eq!(gateway.commands().len(), 1);
}

#[tokio::test]
async fn test_client_failure_is_masked() {
    let gateway = Arc::new(
        ScriptedGateway::default().fail("ERROR 1045 (28000): Access denied, password 's3cret pass'"),
    );
    let err = backend(gateway).probe("temp_20240101120000").await.unwrap_err();
    let message = err.to_string();
    assert!(matches!(err, DbError::ConnectionError(_)));
    assert!(message.contains("Access denied"));
    assert!(!message.contains("s3cret"));
}

#[test]
fn test_unescape_field() {
    assert_eq!(unescape_field("NULL"), None);
    assert_eq!(unescape_field("a\\tb\\nc\\\\d").as_deref(), Some("a\tb\nc\\d"));
    assert_eq!(unescape_field("").as_deref(), Some(""));
}

#[test]
fn test_parse_batch_output_column_mismatch() {
    let lines = vec!["a\tb".to_string()];
    assert!(parse_batch_output(&lines, 3).is_err());
    assert_eq!(parse_batch_output(&lines, 2).unwrap().len(), 1);
}
