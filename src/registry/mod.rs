//! Registry persistence for server records.
//!
//! The facade talks to storage through the [`ServerStore`] trait and performs
//! one load and one save per operation. [`JsonFileStore`] keeps the registry as
//! a pretty-printed JSON object keyed by server name.
//!
//! Writes go to a sibling temporary file that is then renamed over the
//! registry, so a crash never leaves a half-written file. Concurrent
//! invocations are not serialized: the last save wins.

use crate::config::Paths;
use crate::error::{Error, Result};
use crate::server::ServerMap;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Durable storage of server records.
#[async_trait]
pub trait ServerStore: Send + Sync {
    /// Loads every record. A store that was never written is empty.
    async fn load(&self) -> Result<ServerMap>;

    /// Replaces the stored records with `servers`.
    async fn save(&self, servers: &ServerMap) -> Result<()>;
}

/// Registry stored as JSON in `servers.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_paths(paths: &Paths) -> Self {
        Self::new(paths.servers_file())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ServerStore for JsonFileStore {
    async fn load(&self) -> Result<ServerMap> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ServerMap::new()),
            Err(e) => {
                return Err(Error::Configuration(format!(
                    "Failed to read registry {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        if content.trim().is_empty() {
            return Ok(ServerMap::new());
        }

        let servers: ServerMap = serde_json::from_str(&content).map_err(|e| {
            Error::Configuration(format!(
                "Failed to parse registry {}: {}",
                self.path.display(),
                e
            ))
        })?;

        if let Some((key, record)) = servers.iter().find(|(key, record)| **key != record.name) {
            return Err(Error::Configuration(format!(
                "Registry entry '{}' holds a record named '{}'",
                key, record.name
            )));
        }

        Ok(servers)
    }

    async fn save(&self, servers: &ServerMap) -> Result<()> {
        write_atomically(&self.path, servers).await?;
        tracing::debug!(count = servers.len(), "Registry saved");
        Ok(())
    }
}

async fn write_atomically(path: &Path, servers: &ServerMap) -> Result<()> {
    let json = serde_json::to_string_pretty(servers)
        .map_err(|e| Error::Configuration(format!("Failed to encode registry: {}", e)))?;

    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            Error::Configuration(format!("Failed to create {}: {}", dir.display(), e))
        })?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, json).await.map_err(|e| {
        Error::Configuration(format!("Failed to write {}: {}", tmp.display(), e))
    })?;
    tokio::fs::rename(&tmp, path).await.map_err(|e| {
        Error::Configuration(format!("Failed to replace {}: {}", path.display(), e))
    })
}
