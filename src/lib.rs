/*!
 # MCP Manager

 A Rust library and CLI for supervising local MCP server processes, modelled
 on container tools: servers are registered once by name and then started,
 stopped, restarted, inspected and removed like containers.

 ## Overview

 MCP Manager provides functionality to:
 - Register named servers (a shell command plus metadata) in a JSON registry
 - Spawn each server in its own process group with output appended to a log file
 - Stop servers gracefully, escalating to a forced kill after a timeout
 - Reconcile stored status against the live process table
 - Tail, follow, search, clear and rotate server logs

 ## Basic Usage

 ```no_run
 use mcp_manager::{McpManager, Result, ServerSpec};
 use mcp_manager::config::Paths;

 #[tokio::main]
 async fn main() -> Result<()> {
     let manager = McpManager::from_paths(Paths::resolve(None)?)?;

     manager
         .create_server(ServerSpec::new("fetch", "uvx mcp-server-fetch"))
         .await?;
     let record = manager.start_server("fetch").await?;
     println!("fetch is {} with pid {:?}", record.status, record.pid);

     for line in manager.get_logs("fetch", Some(20))? {
         println!("{}", line);
     }

     manager.stop_server("fetch", None, false).await?;
     Ok(())
 }
 ```

 ## Features

 - **Lifecycle Control**: start, stop, restart and force-kill with process-group signalling
 - **Reconciliation**: stored status is a cache, re-checked against the OS before use
 - **Logs**: efficient tail, follow via `tail -F`, numbered rotation
 - **Registry**: pluggable [`registry::ServerStore`], JSON file by default
 - **Error Handling**: one [`Error`] type with per-server batch reporting
*/

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod logs;
pub mod registry;
pub mod server;

pub use error::{Error, Result};
pub use server::{ProcessInfo, ServerRecord, ServerStatus};

use chrono::Local;
use config::{Paths, Settings, validate_command, validate_server_name};
use logs::{LogManager, LogStream};
use registry::{JsonFileStore, ServerStore};
use serde::Serialize;
use server::{ProcessController, ProcessTimings, ServerMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Definition of a server to register.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerSpec {
    pub name: String,
    pub command: String,
    pub config_file: Option<String>,
    pub health_check: Option<String>,
}

impl ServerSpec {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            ..Self::default()
        }
    }
}

/// Changes to an existing server. `None` leaves a field alone; an empty
/// string clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerUpdate {
    pub command: Option<String>,
    pub config_file: Option<String>,
    pub health_check: Option<String>,
}

/// Result of removing a server.
#[derive(Debug, Clone)]
pub struct RemoveOutcome {
    /// The record as it was removed
    pub record: ServerRecord,
    /// Set when the log file could not be deleted; removal still succeeded
    pub log_warning: Option<String>,
}

/// Everything `inspect` reports about one server.
#[derive(Debug, Clone, Serialize)]
pub struct Inspection {
    #[serde(flatten)]
    pub record: ServerRecord,
    pub process_info: Option<ProcessInfo>,
    pub log_file: PathBuf,
    pub log_size: u64,
}

/// Per-name results of a command applied to several servers.
///
/// Every name is attempted; one failure does not stop the rest.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    pub results: Vec<(String, Result<T>)>,
}

impl<T> BatchOutcome<T> {
    fn new() -> Self {
        Self {
            results: Vec::new(),
        }
    }

    fn push(&mut self, name: &str, result: Result<T>) {
        if let Err(e) = &result {
            tracing::error!(server_name = %name, error = %e, "Operation failed");
        }
        self.results.push((name.to_string(), result));
    }

    /// True when every name succeeded.
    pub fn is_success(&self) -> bool {
        self.results.iter().all(|(_, r)| r.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &Error)> {
        self.results
            .iter()
            .filter_map(|(name, r)| r.as_ref().err().map(|e| (name.as_str(), e)))
    }
}

/// Coordinates the registry, the lifecycle controller and the log manager.
///
/// Every operation reloads the registry, applies one change and saves it
/// again; nothing is cached between calls. All public methods are
/// instrumented with `tracing` spans.
pub struct McpManager {
    paths: Paths,
    store: Arc<dyn ServerStore>,
    controller: ProcessController,
    logs: LogManager,
    settings: Settings,
}

impl McpManager {
    /// Create a manager from explicit parts
    pub fn new(
        paths: Paths,
        store: Arc<dyn ServerStore>,
        controller: ProcessController,
        settings: Settings,
    ) -> Self {
        Self {
            logs: LogManager::new(paths.clone()),
            paths,
            store,
            controller,
            settings,
        }
    }

    /// Create a manager backed by the JSON registry and settings under `paths`
    ///
    /// Creates the configuration and log directories if needed.
    #[tracing::instrument(skip(paths), fields(config_dir = %paths.config_dir().display()))]
    pub fn from_paths(paths: Paths) -> Result<Self> {
        paths.ensure_dirs()?;
        let settings = Settings::from_file(paths.settings_file())?;
        let timings = ProcessTimings {
            startup_wait: settings.startup_wait(),
            ..ProcessTimings::default()
        };
        let controller = ProcessController::new(LogManager::new(paths.clone())).with_timings(timings);
        let store = Arc::new(JsonFileStore::from_paths(&paths));
        tracing::debug!(?settings, "Manager ready");

        Ok(Self::new(paths, store, controller, settings))
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn log_manager(&self) -> &LogManager {
        &self.logs
    }

    fn not_found(name: &str) -> Error {
        Error::NotFound(format!("Server '{}' does not exist", name))
    }

    /// Reconciles every record, saving only if something changed.
    async fn load_reconciled(&self) -> Result<ServerMap> {
        let mut servers = self.store.load().await?;
        let before = servers.clone();
        for record in servers.values_mut() {
            self.controller.update_server_status(record);
        }
        if servers != before {
            self.store.save(&servers).await?;
        }
        Ok(servers)
    }

    /// List servers, reconciled against the OS
    ///
    /// Without `include_stopped` only running servers are returned.
    #[tracing::instrument(skip(self))]
    pub async fn list_servers(&self, include_stopped: bool) -> Result<Vec<ServerRecord>> {
        let servers = self.load_reconciled().await?;
        Ok(servers
            .into_values()
            .filter(|record| include_stopped || record.is_running())
            .collect())
    }

    /// Fetch one reconciled record
    #[tracing::instrument(skip(self), fields(server_name = %name))]
    pub async fn get_server(&self, name: &str) -> Result<ServerRecord> {
        let mut servers = self.load_reconciled().await?;
        servers.remove(name).ok_or_else(|| Self::not_found(name))
    }

    /// Register a new server in the stopped state
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] for a bad name or empty command,
    /// [`Error::AlreadyExists`] if the name is taken.
    #[tracing::instrument(skip(self, spec), fields(server_name = %spec.name))]
    pub async fn create_server(&self, spec: ServerSpec) -> Result<ServerRecord> {
        let name = validate_server_name(&spec.name)?;
        let command = validate_command(&spec.command)?;

        let mut servers = self.store.load().await?;
        if servers.contains_key(&name) {
            return Err(Error::AlreadyExists(name));
        }

        let mut record = ServerRecord::new(name.clone(), command);
        record.config_file = non_empty(spec.config_file);
        record.health_check = non_empty(spec.health_check);

        servers.insert(name, record.clone());
        self.store.save(&servers).await?;
        tracing::info!("Server created");
        Ok(record)
    }

    /// Change the command or metadata of a server
    ///
    /// A running server keeps its current process; the new command is used on
    /// the next start.
    #[tracing::instrument(skip(self, update), fields(server_name = %name))]
    pub async fn update_server(&self, name: &str, update: ServerUpdate) -> Result<ServerRecord> {
        let command = update.command.as_deref().map(validate_command).transpose()?;

        let mut servers = self.store.load().await?;
        let record = servers.get_mut(name).ok_or_else(|| Self::not_found(name))?;

        if let Some(command) = command {
            record.command = command;
        }
        if let Some(config_file) = update.config_file {
            record.config_file = non_empty(Some(config_file));
        }
        if let Some(health_check) = update.health_check {
            record.health_check = non_empty(Some(health_check));
        }

        let updated = record.clone();
        self.store.save(&servers).await?;
        tracing::info!("Server updated");
        Ok(updated)
    }

    /// Start a server; already running servers are left alone
    ///
    /// The registry is saved even when the start fails, so the `error` status
    /// is persisted.
    #[tracing::instrument(skip(self), fields(server_name = %name))]
    pub async fn start_server(&self, name: &str) -> Result<ServerRecord> {
        let mut servers = self.store.load().await?;
        let record = servers.get_mut(name).ok_or_else(|| Self::not_found(name))?;

        let result = self.controller.start(record).await;
        let snapshot = record.clone();
        self.store.save(&servers).await?;
        result.map(|()| snapshot)
    }

    /// Stop a server
    ///
    /// `timeout` defaults to the configured shutdown timeout. With `force` the
    /// graceful phase is skipped.
    #[tracing::instrument(skip(self), fields(server_name = %name))]
    pub async fn stop_server(
        &self,
        name: &str,
        timeout: Option<u64>,
        force: bool,
    ) -> Result<ServerRecord> {
        let timeout = timeout.unwrap_or(self.settings.shutdown_timeout);
        let mut servers = self.store.load().await?;
        let record = servers.get_mut(name).ok_or_else(|| Self::not_found(name))?;

        self.controller.update_server_status(record);
        let result = if force {
            self.controller.force_kill(record).await;
            Ok(())
        } else {
            self.controller.stop(record, timeout).await
        };

        let snapshot = record.clone();
        self.store.save(&servers).await?;
        result.map(|()| snapshot)
    }

    /// Restart a server, stopping it first only if it is running
    #[tracing::instrument(skip(self), fields(server_name = %name))]
    pub async fn restart_server(&self, name: &str, timeout: Option<u64>) -> Result<ServerRecord> {
        let timeout = timeout.unwrap_or(self.settings.shutdown_timeout);
        let mut servers = self.store.load().await?;
        let record = servers.get_mut(name).ok_or_else(|| Self::not_found(name))?;

        let result = self.controller.restart(record, timeout).await;
        let snapshot = record.clone();
        self.store.save(&servers).await?;
        result.map(|()| snapshot)
    }

    /// Unregister a server and delete its log
    ///
    /// A running server is refused unless `force` is set, in which case it is
    /// killed first. Log deletion is advisory: a failure is returned as
    /// [`RemoveOutcome::log_warning`] instead of failing the removal.
    #[tracing::instrument(skip(self), fields(server_name = %name))]
    pub async fn remove_server(
        &self,
        name: &str,
        force: bool,
        keep_logs: bool,
    ) -> Result<RemoveOutcome> {
        let mut servers = self.store.load().await?;
        let mut record = servers.remove(name).ok_or_else(|| Self::not_found(name))?;

        self.controller.update_server_status(&mut record);
        if record.is_running() {
            if !force {
                return Err(Error::InvalidArgument(format!(
                    "Server '{}' is running; stop it first or use --force",
                    name
                )));
            }
            self.controller.force_kill(&mut record).await;
        }

        self.store.save(&servers).await?;
        tracing::info!("Server removed");

        let log_warning = if keep_logs {
            None
        } else {
            self.logs.delete_logs(name).err().map(|e| {
                tracing::warn!(error = %e, "Failed to delete server logs");
                e.to_string()
            })
        };

        Ok(RemoveOutcome {
            record,
            log_warning,
        })
    }

    /// Reconciled record plus resource usage and log details
    #[tracing::instrument(skip(self), fields(server_name = %name))]
    pub async fn inspect_server(&self, name: &str) -> Result<Inspection> {
        let record = self.get_server(name).await?;
        let process_info = self.controller.get_process_info(&record).await;

        Ok(Inspection {
            log_file: self.logs.log_file_path(name),
            log_size: self.logs.get_log_file_size(name),
            process_info,
            record,
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn start_servers(&self, names: &[String]) -> BatchOutcome<ServerRecord> {
        let mut outcome = BatchOutcome::new();
        for name in names {
            outcome.push(name, self.start_server(name).await);
        }
        outcome
    }

    #[tracing::instrument(skip(self))]
    pub async fn stop_servers(
        &self,
        names: &[String],
        timeout: Option<u64>,
        force: bool,
    ) -> BatchOutcome<ServerRecord> {
        let mut outcome = BatchOutcome::new();
        for name in names {
            outcome.push(name, self.stop_server(name, timeout, force).await);
        }
        outcome
    }

    #[tracing::instrument(skip(self))]
    pub async fn restart_servers(
        &self,
        names: &[String],
        timeout: Option<u64>,
    ) -> BatchOutcome<ServerRecord> {
        let mut outcome = BatchOutcome::new();
        for name in names {
            outcome.push(name, self.restart_server(name, timeout).await);
        }
        outcome
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_servers(
        &self,
        names: &[String],
        force: bool,
        keep_logs: bool,
    ) -> BatchOutcome<RemoveOutcome> {
        let mut outcome = BatchOutcome::new();
        for name in names {
            outcome.push(name, self.remove_server(name, force, keep_logs).await);
        }
        outcome
    }

    /// Last `lines` log lines (default from settings)
    pub fn get_logs(&self, name: &str, lines: Option<usize>) -> Result<Vec<String>> {
        let name = validate_server_name(name)?;
        self.logs
            .get_logs(&name, lines.unwrap_or(self.settings.log_tail_lines))
    }

    /// Lines appended to the log from now on
    pub fn follow_logs(&self, name: &str) -> Result<LogStream> {
        let name = validate_server_name(name)?;
        self.logs.follow_logs(&name)
    }

    /// Substring search over the last `lines` log lines (default 1000)
    pub fn search_logs(
        &self,
        name: &str,
        pattern: &str,
        lines: Option<usize>,
        case_sensitive: bool,
    ) -> Result<Vec<String>> {
        let name = validate_server_name(name)?;
        let lines = lines.unwrap_or(constants::DEFAULT_SEARCH_LINES);
        Ok(self.logs.search_logs(&name, pattern, lines, case_sensitive))
    }

    #[tracing::instrument(skip(self), fields(server_name = %name))]
    pub fn clear_logs(&self, name: &str) -> Result<()> {
        let name = validate_server_name(name)?;
        self.logs.clear_logs(&name)
    }

    /// Rotate the log keeping `keep` backups (default from settings)
    #[tracing::instrument(skip(self), fields(server_name = %name))]
    pub fn rotate_logs(&self, name: &str, keep: Option<usize>) -> Result<()> {
        let name = validate_server_name(name)?;
        self.logs
            .rotate_logs(&name, keep.unwrap_or(self.settings.log_backups))
    }

    /// Delete log files that belong to no registered server
    #[tracing::instrument(skip(self))]
    pub async fn prune_logs(&self) -> Result<usize> {
        let servers = self.store.load().await?;
        let active: Vec<String> = servers.into_keys().collect();
        Ok(self.logs.cleanup_orphaned_logs(&active))
    }

    /// Copy the registry to `target`, or to a timestamped file next to it
    #[tracing::instrument(skip(self))]
    pub async fn backup_registry(&self, target: Option<PathBuf>) -> Result<PathBuf> {
        let target = target.unwrap_or_else(|| {
            self.paths.config_dir().join(format!(
                "servers.{}.json",
                Local::now().format("%Y%m%d-%H%M%S")
            ))
        });

        let servers = self.store.load().await?;
        JsonFileStore::new(&target).save(&servers).await?;
        tracing::info!(path = %target.display(), count = servers.len(), "Registry backed up");
        Ok(target)
    }

    /// Replace the registry with a backup file
    ///
    /// The backup is fully decoded before anything is written.
    #[tracing::instrument(skip(self))]
    pub async fn restore_registry(&self, backup: &Path) -> Result<usize> {
        if !backup.is_file() {
            return Err(Error::NotFound(format!(
                "Backup file {} does not exist",
                backup.display()
            )));
        }
        let servers = JsonFileStore::new(backup).load().await?;
        self.store.save(&servers).await?;
        tracing::info!(count = servers.len(), "Registry restored");
        Ok(servers.len())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
