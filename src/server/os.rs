//! Thin wrappers over the host's process primitives.
//!
//! Signals go through `nix` on Unix; liveness checks and resource snapshots
//! go through `sysinfo`. Nothing here touches a [`ServerRecord`](super::ServerRecord).

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::io;
use sysinfo::{
    MINIMUM_CPU_UPDATE_INTERVAL, Pid, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System,
};

/// Termination signals used by the lifecycle controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermSignal {
    /// Polite request to exit (SIGTERM)
    Terminate,
    /// Unconditional kill (SIGKILL)
    Kill,
}

/// Result of delivering a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// The signal reached the process group or the process
    Delivered,
    /// Neither the group nor the process exists any more
    Gone,
}

/// Point-in-time resource usage of a supervised process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    /// Process id
    pub pid: u32,
    /// Resident memory in MiB, one decimal
    pub memory_mb: f64,
    /// CPU usage in percent over the sampling interval, one decimal
    pub cpu_percent: f64,
    /// When the OS started the process
    pub create_time: Option<DateTime<Local>>,
    /// OS scheduler state, e.g. "Sleeping"
    pub status: String,
    /// Number of threads
    pub num_threads: usize,
    /// Full command line
    pub cmdline: Vec<String>,
}

fn is_defunct(status: ProcessStatus) -> bool {
    matches!(status, ProcessStatus::Zombie | ProcessStatus::Dead)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Returns true if `pid` exists and is not a zombie.
///
/// Lookup problems count as "not alive".
pub fn is_alive(pid: u32) -> bool {
    let target = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[target]), true);

    system
        .process(target)
        .is_some_and(|process| !is_defunct(process.status()))
}

/// Samples memory, CPU, threads and command line of `pid`.
///
/// Takes two readings [`MINIMUM_CPU_UPDATE_INTERVAL`] apart so the CPU
/// figure is meaningful. Returns `None` if the process vanished or is a zombie.
pub async fn process_info(pid: u32) -> Option<ProcessInfo> {
    let target = Pid::from_u32(pid);
    let mut system = System::new();

    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[target]),
        true,
        ProcessRefreshKind::everything(),
    );
    system.process(target)?;

    tokio::time::sleep(MINIMUM_CPU_UPDATE_INTERVAL).await;
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[target]),
        true,
        ProcessRefreshKind::everything(),
    );

    let process = system.process(target)?;
    if is_defunct(process.status()) {
        return None;
    }

    let create_time = i64::try_from(process.start_time())
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|utc| utc.with_timezone(&Local));

    Some(ProcessInfo {
        pid,
        memory_mb: round1(process.memory() as f64 / 1024.0 / 1024.0),
        cpu_percent: round1(f64::from(process.cpu_usage())),
        create_time,
        status: process.status().to_string(),
        num_threads: process
            .tasks()
            .map(|tasks| tasks.len())
            .filter(|count| *count > 0)
            .unwrap_or(1),
        cmdline: process
            .cmd()
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect(),
    })
}

/// Sends `signal` to the process group led by `pid`, falling back to `pid` alone.
///
/// Never signals the caller's own process group.
#[cfg(unix)]
pub fn signal_group(pid: u32, signal: TermSignal) -> io::Result<SignalOutcome> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill, killpg};
    use nix::unistd::{Pid as NixPid, getpgid, getpgrp};

    let raw = i32::try_from(pid)
        .ok()
        .filter(|raw| *raw > 1)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, format!("invalid pid {}", pid)))?;
    let target = NixPid::from_raw(raw);
    let sig = match signal {
        TermSignal::Terminate => Signal::SIGTERM,
        TermSignal::Kill => Signal::SIGKILL,
    };

    let group = match getpgid(Some(target)) {
        Ok(pgid) => pgid,
        // The leader is gone but members of its group may remain.
        Err(Errno::ESRCH) => target,
        Err(e) => return Err(e.into()),
    };
    if group != getpgrp() {
        match killpg(group, sig) {
            Ok(()) => return Ok(SignalOutcome::Delivered),
            Err(Errno::ESRCH) => {}
            Err(e) => return Err(e.into()),
        }
    }

    tracing::debug!(pid, ?signal, "Process group unavailable, signalling process directly");
    match kill(target, sig) {
        Ok(()) => Ok(SignalOutcome::Delivered),
        Err(Errno::ESRCH) => Ok(SignalOutcome::Gone),
        Err(e) => Err(e.into()),
    }
}

/// Sends `signal` to `pid`. Without Unix process groups only the process itself is reached.
#[cfg(not(unix))]
pub fn signal_group(pid: u32, signal: TermSignal) -> io::Result<SignalOutcome> {
    let target = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[target]), true);

    let Some(process) = system.process(target) else {
        return Ok(SignalOutcome::Gone);
    };
    let sig = match signal {
        TermSignal::Terminate => sysinfo::Signal::Term,
        TermSignal::Kill => sysinfo::Signal::Kill,
    };
    let delivered = process.kill_with(sig).unwrap_or_else(|| process.kill());
    if delivered {
        Ok(SignalOutcome::Delivered)
    } else {
        Err(io::Error::other(format!("failed to signal process {}", pid)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_process_is_alive() {
        assert!(is_alive(std::process::id()));
    }

    #[test]
    fn test_unused_pid_is_not_alive() {
        // Above the default Linux pid_max
        assert!(!is_alive(4_000_000));
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_missing_process_is_gone() {
        let outcome = signal_group(4_000_000, TermSignal::Terminate).unwrap();
        assert_eq!(outcome, SignalOutcome::Gone);
    }

    #[cfg(unix)]
    #[test]
    fn test_refuses_special_pids() {
        assert!(signal_group(0, TermSignal::Kill).is_err());
        assert!(signal_group(1, TermSignal::Kill).is_err());
    }

    #[tokio::test]
    async fn test_process_info_for_self() {
        let info = process_info(std::process::id()).await.unwrap();
        assert_eq!(info.pid, std::process::id());
        assert!(info.num_threads >= 1);
        assert!(!info.cmdline.is_empty());
    }
}
