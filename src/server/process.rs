// src/server/process.rs
use super::os::{self, ProcessInfo, SignalOutcome, TermSignal};
use super::record::{ServerRecord, ServerStatus};
use crate::config::validate_timeout;
use crate::constants::{
    DEFAULT_STARTUP_WAIT, FORCE_KILL_SETTLE, FORCE_KILL_WINDOW, RESTART_PAUSE,
    TERMINATION_POLL_INTERVAL,
};
use crate::error::{Error, Result};
use crate::logs::LogManager;
use async_process::Command;
use chrono::Local;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::time::{self, Instant};

/// Fixed waits used by the lifecycle controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessTimings {
    /// Grace interval after spawning before the process counts as running
    pub startup_wait: Duration,
    /// Interval between liveness polls while stopping
    pub poll_interval: Duration,
    /// How long to wait after SIGKILL during `stop`
    pub force_kill_window: Duration,
    /// How long `force_kill` waits before clearing runtime fields
    pub force_kill_settle: Duration,
    /// Pause between the stop and start halves of a restart
    pub restart_pause: Duration,
}

impl Default for ProcessTimings {
    fn default() -> Self {
        Self {
            startup_wait: DEFAULT_STARTUP_WAIT,
            poll_interval: TERMINATION_POLL_INTERVAL,
            force_kill_window: FORCE_KILL_WINDOW,
            force_kill_settle: FORCE_KILL_SETTLE,
            restart_pause: RESTART_PAUSE,
        }
    }
}

/// Spawns, reconciles and terminates the processes behind server records.
///
/// Every operation takes the record by mutable reference and leaves its
/// `status`, `pid` and `started` fields reflecting what the OS reported.
/// The controller keeps no state of its own between calls.
///
/// # Example
///
/// ```no_run
/// use mcp_manager::config::Paths;
/// use mcp_manager::logs::LogManager;
/// use mcp_manager::server::{ProcessController, ServerRecord};
///
/// #[tokio::main]
/// async fn main() -> mcp_manager::Result<()> {
///     let logs = LogManager::new(Paths::new("/tmp/mcp"));
///     let controller = ProcessController::new(logs);
///
///     let mut record = ServerRecord::new("sleeper", "sleep 60");
///     controller.start(&mut record).await?;
///     controller.stop(&mut record, 5).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ProcessController {
    logs: LogManager,
    timings: ProcessTimings,
}

impl ProcessController {
    /// Create a controller writing process output through `logs`
    pub fn new(logs: LogManager) -> Self {
        Self {
            logs,
            timings: ProcessTimings::default(),
        }
    }

    /// Replace the fixed waits
    pub fn with_timings(mut self, timings: ProcessTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn timings(&self) -> &ProcessTimings {
        &self.timings
    }

    /// Start the server process
    ///
    /// Does nothing if the process is already running. Otherwise writes a
    /// start marker to the log, spawns the command through the shell in a new
    /// process group, and waits the startup grace interval.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StartFailure`] if the spawn fails or the process exits
    /// during the grace interval. The record is left in the `error` state.
    #[tracing::instrument(skip(self, record), fields(server_name = %record.name))]
    pub async fn start(&self, record: &mut ServerRecord) -> Result<()> {
        self.update_server_status(record);
        if record.is_running() {
            tracing::debug!(pid = ?record.pid, "Server already running");
            return Ok(());
        }

        match self.spawn_and_confirm(record).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::error!(error = %e, "Server failed to start");
                record.mark_error();
                Err(e)
            }
        }
    }

    async fn spawn_and_confirm(&self, record: &mut ServerRecord) -> Result<()> {
        let name = record.name.clone();
        let start_failure = |reason: String| Error::StartFailure {
            name: name.clone(),
            reason,
        };

        let marker = format!(
            "\n=== Starting {} at {} ===",
            record.name,
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        self.logs
            .append_marker(&record.name, &marker)
            .map_err(|e| start_failure(e.to_string()))?;

        let stdout = self
            .logs
            .open_for_append(&record.name)
            .map_err(|e| start_failure(e.to_string()))?;
        let stderr = stdout
            .try_clone()
            .map_err(|e| start_failure(format!("Failed to duplicate log handle: {}", e)))?;

        let mut command = shell_command(&record.command);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));
        new_process_group(&mut command);

        let mut child = Command::from(command)
            .spawn()
            .map_err(|e| start_failure(format!("OS error: {}", e)))?;

        let pid = child.id();
        record.mark_starting(pid);
        tracing::info!(pid, "Spawned server process");

        time::sleep(self.timings.startup_wait).await;

        // Dropping `child` later does not kill it; the handle only reaps it.
        match child.try_status() {
            Ok(None) => {
                record.status = ServerStatus::Running;
                tracing::info!(pid, "Server running");
                Ok(())
            }
            Ok(Some(status)) => Err(start_failure(describe_early_exit(status))),
            Err(e) => Err(start_failure(format!("Failed to poll process: {}", e))),
        }
    }

    /// Stop the server process
    ///
    /// Sends SIGTERM to the process group and polls for up to `timeout`
    /// seconds, then escalates to SIGKILL and waits the forced-kill window.
    /// Stopping a record without a process succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for a timeout outside 1–300 seconds
    /// and [`Error::StopFailure`] when the process survives SIGKILL or cannot
    /// be signalled. On failure the record keeps its pid.
    #[tracing::instrument(skip(self, record), fields(server_name = %record.name))]
    pub async fn stop(&self, record: &mut ServerRecord, timeout: u64) -> Result<()> {
        let pid = match record.pid {
            Some(pid) if !record.is_stopped() => pid,
            _ => {
                record.clear_runtime_data();
                return Ok(());
            }
        };
        let timeout = validate_timeout(timeout)?;

        let name = record.name.clone();
        let stop_failure = |reason: String| Error::StopFailure {
            name: name.clone(),
            reason,
        };

        match os::signal_group(pid, TermSignal::Terminate) {
            Ok(SignalOutcome::Delivered) => {}
            Ok(SignalOutcome::Gone) => {
                tracing::debug!(pid, "Process already gone");
                record.clear_runtime_data();
                return Ok(());
            }
            Err(e) => return Err(stop_failure(format!("OS error: {}", e))),
        }

        if self.wait_for_exit(pid, Duration::from_secs(timeout)).await {
            tracing::info!(pid, "Server stopped");
            record.clear_runtime_data();
            return Ok(());
        }

        tracing::warn!(pid, timeout, "Server ignored SIGTERM, sending SIGKILL");
        match os::signal_group(pid, TermSignal::Kill) {
            Ok(SignalOutcome::Delivered) => {}
            Ok(SignalOutcome::Gone) => {
                record.clear_runtime_data();
                return Ok(());
            }
            Err(e) => return Err(stop_failure(format!("OS error: {}", e))),
        }

        if self.wait_for_exit(pid, self.timings.force_kill_window).await {
            tracing::info!(pid, "Server killed");
            record.clear_runtime_data();
            return Ok(());
        }

        Err(stop_failure("Process could not be terminated".to_string()))
    }

    /// Kill the server process immediately
    ///
    /// Skips the graceful phase. Signal failures are treated as the process
    /// already being dead; the runtime fields are always cleared.
    #[tracing::instrument(skip(self, record), fields(server_name = %record.name))]
    pub async fn force_kill(&self, record: &mut ServerRecord) {
        if let Some(pid) = record.pid {
            match os::signal_group(pid, TermSignal::Kill) {
                Ok(SignalOutcome::Delivered) => {
                    tracing::info!(pid, "Sent SIGKILL to server");
                    time::sleep(self.timings.force_kill_settle).await;
                }
                Ok(SignalOutcome::Gone) => {}
                Err(e) => tracing::warn!(pid, error = %e, "Failed to signal server, assuming dead"),
            }
        }
        record.clear_runtime_data();
    }

    /// Restart the server process
    ///
    /// Stops the process only if it is actually running, pauses, then starts
    /// it again. A failed stop aborts the restart so two copies never run.
    #[tracing::instrument(skip(self, record), fields(server_name = %record.name))]
    pub async fn restart(&self, record: &mut ServerRecord, timeout: u64) -> Result<()> {
        self.update_server_status(record);
        if record.is_running() {
            self.stop(record, timeout).await?;
        }

        time::sleep(self.timings.restart_pause).await;

        self.start(record).await
    }

    /// Reconcile the record with the OS
    ///
    /// A recorded pid that is alive (and not a zombie) means `running`;
    /// anything else clears the runtime fields. Records without a pid that
    /// still claim to be running are marked stopped; `error` is kept.
    pub fn update_server_status(&self, record: &mut ServerRecord) {
        match record.pid {
            Some(pid) if os::is_alive(pid) => record.status = ServerStatus::Running,
            Some(pid) => {
                tracing::debug!(server_name = %record.name, pid, "Recorded process is gone");
                record.clear_runtime_data();
            }
            None => {
                if matches!(record.status, ServerStatus::Running | ServerStatus::Starting) {
                    record.clear_runtime_data();
                }
            }
        }
    }

    /// Resource snapshot of a running server, or `None`
    pub async fn get_process_info(&self, record: &ServerRecord) -> Option<ProcessInfo> {
        let pid = record.pid.filter(|_| record.is_running())?;
        os::process_info(pid).await
    }

    async fn wait_for_exit(&self, pid: u32, limit: Duration) -> bool {
        let started = Instant::now();
        loop {
            if !os::is_alive(pid) {
                return true;
            }
            if started.elapsed() >= limit {
                return false;
            }
            time::sleep(self.timings.poll_interval).await;
        }
    }
}

fn describe_early_exit(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("Process terminated immediately with exit code {}", code),
        None => format!("Process terminated immediately ({})", status),
    }
}

#[cfg(unix)]
fn shell_command(command_line: &str) -> std::process::Command {
    let mut command = std::process::Command::new("sh");
    command.arg("-c").arg(command_line);
    command
}

#[cfg(windows)]
fn shell_command(command_line: &str) -> std::process::Command {
    let mut command = std::process::Command::new("cmd");
    command.arg("/C").arg(command_line);
    command
}

/// Makes the child lead its own process group so the whole group can be signalled.
#[cfg(unix)]
fn new_process_group(command: &mut std::process::Command) {
    use std::os::unix::process::CommandExt;

    command.process_group(0);
}

#[cfg(windows)]
fn new_process_group(command: &mut std::process::Command) {
    use std::os::windows::process::CommandExt;

    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    command.creation_flags(CREATE_NEW_PROCESS_GROUP);
}
