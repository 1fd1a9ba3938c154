use mcp_manager::ServerStatus;
use mcp_manager::error::{Error, Result};
use mcp_manager::registry::{JsonFileStore, ServerStore};
use mcp_manager::server::{ServerMap, ServerRecord};

fn sample_map() -> ServerMap {
    let mut servers = ServerMap::new();
    let mut fetch = ServerRecord::new("fetch", "uvx mcp-server-fetch");
    fetch.health_check = Some("curl -f localhost:8000".to_string());
    servers.insert(fetch.name.clone(), fetch);

    let mut fs = ServerRecord::new("fs", "npx -y @modelcontextprotocol/server-filesystem /tmp");
    fs.status = ServerStatus::Running;
    fs.pid = Some(1234);
    servers.insert(fs.name.clone(), fs);
    servers
}

#[tokio::test]
async fn test_missing_registry_is_empty() -> Result<()> {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("servers.json"));

    assert!(store.load().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_save_and_load() -> Result<()> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/servers.json");
    let store = JsonFileStore::new(&path);
    let servers = sample_map();

    store.save(&servers).await?;
    let loaded = store.load().await?;

    assert_eq!(loaded, servers);
    assert_eq!(loaded["fs"].pid, Some(1234));

    // No temp file is left next to the registry
    let entries: Vec<_> = std::fs::read_dir(path.parent().unwrap())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("servers.json")]);

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["fs"]["status"], "running");

    Ok(())
}

#[tokio::test]
async fn test_malformed_registry_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("servers.json");
    std::fs::write(&path, "{ \"fetch\": ").unwrap();

    let result = JsonFileStore::new(&path).load().await;
    assert!(matches!(result, Err(Error::Configuration(_))));
}

#[tokio::test]
async fn test_mismatched_key_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("servers.json");
    std::fs::write(
        &path,
        r#"{ "alpha": { "name": "beta", "command": "true", "created": "2025-01-01T00:00:00+00:00" } }"#,
    )
    .unwrap();

    let result = JsonFileStore::new(&path).load().await;
    assert!(matches!(result, Err(Error::Configuration(_))));
}

#[tokio::test]
async fn test_blank_registry_is_empty() -> Result<()> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("servers.json");
    std::fs::write(&path, "\n").unwrap();

    assert!(JsonFileStore::new(&path).load().await?.is_empty());

    Ok(())
}
