use async_trait::async_trait;
use mcp_manager::config::{Paths, Settings};
use mcp_manager::error::{Error, Result};
use mcp_manager::logs::LogManager;
use mcp_manager::registry::{JsonFileStore, ServerStore};
use mcp_manager::server::{ProcessController, ProcessTimings, ServerMap, ServerRecord};
use mcp_manager::{McpManager, ServerSpec, ServerStatus, ServerUpdate};
use mockall::mock;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

mock! {
    pub Store {}

    #[async_trait]
    impl ServerStore for Store {
        async fn load(&self) -> Result<ServerMap>;
        async fn save(&self, servers: &ServerMap) -> Result<()>;
    }
}

fn controller(paths: &Paths) -> ProcessController {
    ProcessController::new(LogManager::new(paths.clone())).with_timings(ProcessTimings {
        startup_wait: Duration::from_millis(300),
        poll_interval: Duration::from_millis(100),
        force_kill_window: Duration::from_secs(2),
        force_kill_settle: Duration::from_millis(200),
        restart_pause: Duration::from_millis(100),
    })
}

// Helper function to create a manager over a JSON registry in a temp dir
fn create_test_manager(dir: &TempDir) -> McpManager {
    let paths = Paths::new(dir.path());
    let store = Arc::new(JsonFileStore::from_paths(&paths));
    McpManager::new(paths.clone(), store, controller(&paths), Settings::default())
}

fn create_mock_manager(store: MockStore) -> McpManager {
    let paths = Paths::new("/nonexistent/mcp");
    McpManager::new(paths.clone(), Arc::new(store), controller(&paths), Settings::default())
}

#[tokio::test]
async fn test_duplicate_create_is_rejected() -> Result<()> {
    let dir = TempDir::new().unwrap();
    let manager = create_test_manager(&dir);

    manager.create_server(ServerSpec::new("fetch", "uvx mcp-server-fetch")).await?;
    let result = manager.create_server(ServerSpec::new("fetch", "other command")).await;

    assert!(matches!(result, Err(Error::AlreadyExists(name)) if name == "fetch"));
    let servers = manager.list_servers(true).await?;
    assert_eq!(servers.len(), 1);
    assert_eq!(servers[0].command, "uvx mcp-server-fetch");

    Ok(())
}

#[tokio::test]
async fn test_create_validates_and_normalizes() -> Result<()> {
    let dir = TempDir::new().unwrap();
    let manager = create_test_manager(&dir);

    for bad in ["a/b", "..", "x:y", ""] {
        let result = manager.create_server(ServerSpec::new(bad, "echo hi")).await;
        assert!(matches!(result, Err(Error::InvalidArgument(_))), "{:?} accepted", bad);
    }
    let result = manager.create_server(ServerSpec::new("ok", "   ")).await;
    assert!(matches!(result, Err(Error::InvalidArgument(_))));

    let record = manager
        .create_server(ServerSpec {
            name: " spaced ".to_string(),
            command: " echo hi ".to_string(),
            config_file: Some("  ".to_string()),
            health_check: Some("curl -f localhost".to_string()),
        })
        .await?;

    assert_eq!(record.name, "spaced");
    assert_eq!(record.command, "echo hi");
    assert!(record.config_file.is_none());
    assert!(record.has_health_check());
    assert_eq!(record.status, ServerStatus::Stopped);

    Ok(())
}

#[tokio::test]
async fn test_unknown_server_is_not_found() {
    let dir = TempDir::new().unwrap();
    let manager = create_test_manager(&dir);

    assert!(matches!(manager.start_server("nope").await, Err(Error::NotFound(_))));
    assert!(matches!(manager.stop_server("nope", None, false).await, Err(Error::NotFound(_))));
    assert!(matches!(manager.inspect_server("nope").await, Err(Error::NotFound(_))));
    assert!(matches!(manager.remove_server("nope", false, false).await, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_update_server() -> Result<()> {
    let dir = TempDir::new().unwrap();
    let manager = create_test_manager(&dir);
    let mut spec = ServerSpec::new("api", "python server.py");
    spec.config_file = Some("/etc/api.json".to_string());
    manager.create_server(spec).await?;

    let updated = manager
        .update_server(
            "api",
            ServerUpdate {
                command: Some("python server.py --port 9000".to_string()),
                config_file: Some(String::new()),
                health_check: None,
            },
        )
        .await?;

    assert_eq!(updated.command, "python server.py --port 9000");
    assert!(updated.config_file.is_none());
    assert_eq!(manager.get_server("api").await?, updated);

    let result = manager
        .update_server(
            "api",
            ServerUpdate {
                command: Some(" ".to_string()),
                ..ServerUpdate::default()
            },
        )
        .await;
    assert!(matches!(result, Err(Error::InvalidArgument(_))));

    Ok(())
}

#[tokio::test]
async fn test_remove_respects_keep_logs() -> Result<()> {
    let dir = TempDir::new().unwrap();
    let manager = create_test_manager(&dir);
    let logs = manager.log_manager().clone();

    manager.create_server(ServerSpec::new("kept", "echo a")).await?;
    manager.create_server(ServerSpec::new("gone", "echo b")).await?;
    logs.append_marker("kept", "line")?;
    logs.append_marker("gone", "line")?;

    let outcome = manager.remove_server("kept", false, true).await?;
    assert!(outcome.log_warning.is_none());
    assert!(logs.log_file_path("kept").exists());

    manager.remove_server("gone", false, false).await?;
    assert!(!logs.log_file_path("gone").exists());

    assert!(manager.list_servers(true).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_batch_attempts_every_name() -> Result<()> {
    let dir = TempDir::new().unwrap();
    let manager = create_test_manager(&dir);
    manager.create_server(ServerSpec::new("a", "echo a")).await?;
    manager.create_server(ServerSpec::new("b", "echo b")).await?;

    let names = vec!["a".to_string(), "missing".to_string(), "b".to_string()];
    let outcome = manager.stop_servers(&names, None, false).await;

    assert!(!outcome.is_success());
    assert_eq!(outcome.results.len(), 3);
    let failures: Vec<&str> = outcome.failures().map(|(name, _)| name).collect();
    assert_eq!(failures, vec!["missing"]);

    let outcome = manager.remove_servers(&names, false, false).await;
    assert_eq!(outcome.failures().count(), 1);
    assert!(manager.list_servers(true).await?.is_empty());

    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_lifecycle_through_manager() -> Result<()> {
    let dir = TempDir::new().unwrap();
    let manager = create_test_manager(&dir);
    manager.create_server(ServerSpec::new("echo-test", "echo hello && sleep 100")).await?;

    let started = manager.start_server("echo-test").await?;
    assert_eq!(started.status, ServerStatus::Running);
    assert_eq!(manager.list_servers(false).await?.len(), 1);
    assert!(manager.get_logs("echo-test", Some(10))?.contains(&"hello".to_string()));

    let inspection = manager.inspect_server("echo-test").await?;
    assert_eq!(inspection.record.pid, started.pid);
    assert!(inspection.process_info.is_some());
    assert!(inspection.log_size > 0);

    let result = manager.remove_server("echo-test", false, false).await;
    assert!(matches!(result, Err(Error::InvalidArgument(_))));

    let stopped = manager.stop_server("echo-test", Some(2), false).await?;
    assert_eq!(stopped.status, ServerStatus::Stopped);
    assert!(manager.list_servers(false).await?.is_empty());
    assert_eq!(manager.get_server("echo-test").await?.pid, None);

    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_start_is_persisted() -> Result<()> {
    let dir = TempDir::new().unwrap();
    let manager = create_test_manager(&dir);
    manager.create_server(ServerSpec::new("bad-cmd", "/nonexistent/binary")).await?;

    let result = manager.start_server("bad-cmd").await;
    assert!(matches!(result, Err(Error::StartFailure { .. })));

    let record = manager.get_server("bad-cmd").await?;
    assert_eq!(record.status, ServerStatus::Error);
    assert!(record.pid.is_none());

    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_force_remove_kills_running_server() -> Result<()> {
    let dir = TempDir::new().unwrap();
    let manager = create_test_manager(&dir);
    manager.create_server(ServerSpec::new("sleeper", "sleep 100")).await?;
    let pid = manager.start_server("sleeper").await?.pid.expect("pid recorded");

    let outcome = manager.remove_server("sleeper", true, false).await?;

    assert!(outcome.record.pid.is_none());
    assert!(!mcp_manager::server::os::is_alive(pid));
    assert!(manager.list_servers(true).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_prune_logs_removes_orphans() -> Result<()> {
    let dir = TempDir::new().unwrap();
    let manager = create_test_manager(&dir);
    let logs = manager.log_manager().clone();

    manager.create_server(ServerSpec::new("live", "echo a")).await?;
    logs.append_marker("live", "x")?;
    logs.append_marker("ghost", "x")?;

    assert_eq!(manager.prune_logs().await?, 1);
    assert_eq!(logs.list_log_files(), vec!["live"]);

    Ok(())
}

#[tokio::test]
async fn test_backup_and_restore() -> Result<()> {
    let dir = TempDir::new().unwrap();
    let manager = create_test_manager(&dir);
    manager.create_server(ServerSpec::new("one", "echo 1")).await?;
    manager.create_server(ServerSpec::new("two", "echo 2")).await?;

    let backup = manager.backup_registry(None).await?;
    assert!(backup.starts_with(dir.path()));

    manager.remove_server("two", false, false).await?;
    assert_eq!(manager.list_servers(true).await?.len(), 1);

    assert_eq!(manager.restore_registry(&backup).await?, 2);
    assert_eq!(manager.list_servers(true).await?.len(), 2);

    let missing = dir.path().join("no-such-backup.json");
    assert!(matches!(
        manager.restore_registry(&missing).await,
        Err(Error::NotFound(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_log_commands_validate_names() {
    let dir = TempDir::new().unwrap();
    let manager = create_test_manager(&dir);

    assert!(matches!(manager.get_logs("../etc", None), Err(Error::InvalidArgument(_))));
    assert!(matches!(manager.get_logs("quiet", None), Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_registry_failure_is_propagated() {
    let mut store = MockStore::new();
    store
        .expect_load()
        .times(1)
        .returning(|| Err(Error::Configuration("registry is corrupt".to_string())));
    store.expect_save().times(0);

    let manager = create_mock_manager(store);
    let result = manager.create_server(ServerSpec::new("fetch", "uvx fetch")).await;

    assert!(matches!(result, Err(Error::Configuration(_))));
}

#[tokio::test]
async fn test_create_saves_once_with_new_record() -> Result<()> {
    let mut store = MockStore::new();
    store.expect_load().times(1).returning(|| {
        let mut servers = ServerMap::new();
        servers.insert("existing".to_string(), ServerRecord::new("existing", "echo e"));
        Ok(servers)
    });
    store
        .expect_save()
        .times(1)
        .withf(|servers| servers.len() == 2 && servers.contains_key("fresh"))
        .returning(|_| Ok(()));

    let manager = create_mock_manager(store);
    let record = manager.create_server(ServerSpec::new("fresh", "echo f")).await?;
    assert_eq!(record.name, "fresh");

    Ok(())
}

#[tokio::test]
async fn test_listing_does_not_save_when_nothing_changed() -> Result<()> {
    let mut store = MockStore::new();
    store.expect_load().times(1).returning(|| {
        let mut servers = ServerMap::new();
        servers.insert("idle".to_string(), ServerRecord::new("idle", "echo i"));
        Ok(servers)
    });
    store.expect_save().times(0);

    let manager = create_mock_manager(store);
    let servers = manager.list_servers(true).await?;
    assert_eq!(servers.len(), 1);

    Ok(())
}
