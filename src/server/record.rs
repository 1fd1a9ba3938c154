use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Status of a supervised server.
///
/// The stored value is only a cache of what the OS last reported; see
/// [`ProcessController::update_server_status`](crate::server::ProcessController::update_server_status).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    /// No process is associated with the server
    #[default]
    Stopped,
    /// A process was spawned and is inside its startup grace interval
    Starting,
    /// The process is alive
    Running,
    /// The last start attempt failed
    Error,
}

impl ServerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerStatus::Stopped => "stopped",
            ServerStatus::Starting => "starting",
            ServerStatus::Running => "running",
            ServerStatus::Error => "error",
        }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted description of one supervised server.
///
/// # Examples
///
/// ```
/// use mcp_manager::server::{ServerRecord, ServerStatus};
///
/// let record = ServerRecord::new("fetch", "uvx mcp-server-fetch");
/// assert_eq!(record.status, ServerStatus::Stopped);
/// assert!(record.pid.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRecord {
    /// Unique, filesystem-safe name
    pub name: String,
    /// Shell command line used to launch the server
    pub command: String,
    /// Optional configuration file path, stored for the user
    #[serde(default)]
    pub config_file: Option<String>,
    /// Optional health-check command, stored but never executed
    #[serde(default)]
    pub health_check: Option<String>,
    /// OS process id while starting or running
    #[serde(default)]
    pub pid: Option<u32>,
    /// Last known status
    #[serde(default)]
    pub status: ServerStatus,
    /// When the record was created
    pub created: DateTime<Local>,
    /// When the current process was spawned
    #[serde(default)]
    pub started: Option<DateTime<Local>>,
}

/// Registry contents keyed by server name.
pub type ServerMap = BTreeMap<String, ServerRecord>;

impl ServerRecord {
    /// Creates a stopped record stamped with the current time.
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            config_file: None,
            health_check: None,
            pid: None,
            status: ServerStatus::Stopped,
            created: Local::now(),
            started: None,
        }
    }

    /// True when the cached status says running and a pid is recorded.
    pub fn is_running(&self) -> bool {
        self.status == ServerStatus::Running && self.pid.is_some()
    }

    pub fn is_stopped(&self) -> bool {
        self.status == ServerStatus::Stopped
    }

    pub fn has_health_check(&self) -> bool {
        self.health_check.as_deref().is_some_and(|c| !c.is_empty())
    }

    /// Records a freshly spawned process.
    pub(crate) fn mark_starting(&mut self, pid: u32) {
        self.pid = Some(pid);
        self.started = Some(Local::now());
        self.status = ServerStatus::Starting;
    }

    /// Clears the runtime fields and marks the record stopped.
    pub fn clear_runtime_data(&mut self) {
        self.pid = None;
        self.started = None;
        self.status = ServerStatus::Stopped;
    }

    /// Clears the runtime fields and marks the record failed.
    pub(crate) fn mark_error(&mut self) {
        self.clear_runtime_data();
        self.status = ServerStatus::Error;
    }
}
