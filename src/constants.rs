//! Shared constants for MCP Manager.

use std::time::Duration;

/// Configuration directory name under the user's home.
pub const CONFIG_DIR_NAME: &str = ".mcp";

/// Environment variable overriding the configuration directory.
pub const CONFIG_DIR_ENV: &str = "MCP_CONFIG_DIR";

/// Registry file name inside the configuration directory.
pub const SERVERS_FILE: &str = "servers.json";

/// Settings file name inside the configuration directory.
pub const SETTINGS_FILE: &str = "config.json";

/// Log directory name inside the configuration directory.
pub const LOGS_DIR: &str = "logs";

/// Log file extension (without the dot).
pub const LOG_FILE_EXTENSION: &str = "log";

/// Seconds to wait for a graceful shutdown before escalating.
pub const DEFAULT_SHUTDOWN_TIMEOUT: u64 = 10;

/// Accepted range for the graceful shutdown timeout, in seconds.
pub const MIN_SHUTDOWN_TIMEOUT: u64 = 1;
pub const MAX_SHUTDOWN_TIMEOUT: u64 = 300;

/// Grace interval after spawning before a process counts as running.
pub const DEFAULT_STARTUP_WAIT: Duration = Duration::from_secs(1);

/// Interval between liveness polls while stopping.
pub const TERMINATION_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How long to wait for SIGKILL to take effect during `stop`.
pub const FORCE_KILL_WINDOW: Duration = Duration::from_secs(3);

/// How long `force_kill` waits before clearing runtime fields.
pub const FORCE_KILL_SETTLE: Duration = Duration::from_secs(1);

/// Pause between the stop and start halves of a restart.
pub const RESTART_PAUSE: Duration = Duration::from_secs(1);

/// Poll interval when following a log without `tail`.
pub const FOLLOW_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default number of log lines shown by `logs`.
pub const DEFAULT_LOG_TAIL_LINES: usize = 50;

/// Default number of lines scanned by `logs --search`.
pub const DEFAULT_SEARCH_LINES: usize = 1000;

/// Default number of rotated backups kept.
pub const DEFAULT_LOG_BACKUPS: usize = 5;

/// Characters that may not appear in a server name.
pub const RESERVED_NAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
/// Conventional exit code for Ctrl-C.
pub const EXIT_INTERRUPTED: i32 = 130;
