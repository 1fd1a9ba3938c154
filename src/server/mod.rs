//! Server management module for MCP Manager.
//!
//! This module holds the persisted server record and the lifecycle controller
//! that maps a record onto a real OS process. Public controller methods are
//! instrumented with `tracing` spans.
//!
//! # Components
//!
//! * `record` - The persisted server record and its status
//! * `process` - Spawning, stopping, killing and reconciling server processes
//! * `os` - Signal delivery, liveness checks and resource snapshots
//!
//! # Examples
//!
//! Reconciling a stale record:
//!
//! ```no_run
//! use mcp_manager::config::Paths;
//! use mcp_manager::logs::LogManager;
//! use mcp_manager::server::{ProcessController, ServerRecord, ServerStatus};
//!
//! let controller = ProcessController::new(LogManager::new(Paths::new("/tmp/mcp")));
//!
//! let mut record = ServerRecord::new("fetch", "uvx mcp-server-fetch");
//! record.status = ServerStatus::Running;
//! record.pid = Some(999_999);
//!
//! controller.update_server_status(&mut record);
//! assert_eq!(record.status, ServerStatus::Stopped);
//! assert!(record.pid.is_none());
//! ```
pub mod os;
mod process;
mod record;

pub use os::ProcessInfo;
pub use process::{ProcessController, ProcessTimings};
pub use record::{ServerMap, ServerRecord, ServerStatus};
