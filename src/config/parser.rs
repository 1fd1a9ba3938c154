use crate::constants::{
    CONFIG_DIR_ENV, CONFIG_DIR_NAME, DEFAULT_LOG_BACKUPS, DEFAULT_LOG_TAIL_LINES,
    DEFAULT_SHUTDOWN_TIMEOUT, LOG_FILE_EXTENSION, LOGS_DIR, SERVERS_FILE, SETTINGS_FILE,
};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// On-disk locations used by the manager.
///
/// Everything lives below a single configuration directory:
///
/// ```text
/// ~/.mcp/
/// ├── servers.json   registry
/// ├── config.json    settings (optional)
/// └── logs/
///     └── <name>.log
/// ```
///
/// # Examples
///
/// ```
/// use mcp_manager::config::Paths;
///
/// let paths = Paths::new("/tmp/mcp-example");
/// assert!(paths.servers_file().ends_with("servers.json"));
/// assert!(paths.log_file("fetch").ends_with("logs/fetch.log"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    config_dir: PathBuf,
}

impl Paths {
    /// Creates paths rooted at `config_dir`. Nothing is created on disk.
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// Resolves the configuration directory.
    ///
    /// An explicit directory wins, then `MCP_CONFIG_DIR`, then `~/.mcp`.
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self> {
        if let Some(dir) = explicit {
            return Ok(Self::new(dir));
        }
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::new(PathBuf::from(dir)));
        }
        let home = dirs::home_dir().ok_or_else(|| {
            Error::Configuration("Failed to determine home directory".to_string())
        })?;
        Ok(Self::new(home.join(CONFIG_DIR_NAME)))
    }

    /// Creates the configuration and log directories if missing.
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(self.logs_dir()).map_err(|e| {
            Error::Configuration(format!(
                "Failed to create config directories under {}: {}",
                self.config_dir.display(),
                e
            ))
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn servers_file(&self) -> PathBuf {
        self.config_dir.join(SERVERS_FILE)
    }

    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.config_dir.join(LOGS_DIR)
    }

    /// Deterministic log path for a server name.
    pub fn log_file(&self, name: &str) -> PathBuf {
        self.logs_dir()
            .join(format!("{}.{}", name, LOG_FILE_EXTENSION))
    }
}

/// User-tunable settings, read from `config.json`.
///
/// Every field has a default, so a missing file or a partial file is fine.
///
/// # JSON Schema
///
/// ```json
/// {
///   "shutdown_timeout": 10,
///   "startup_wait_ms": 1000,
///   "log_tail_lines": 50,
///   "log_backups": 5
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seconds `stop` waits for a graceful exit before sending SIGKILL.
    pub shutdown_timeout: u64,
    /// Milliseconds `start` waits before deciding the process survived.
    pub startup_wait_ms: u64,
    /// Lines shown by `logs` when `--tail` is not given.
    pub log_tail_lines: usize,
    /// Backups kept by `logs --rotate` when no count is given.
    pub log_backups: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            startup_wait_ms: crate::constants::DEFAULT_STARTUP_WAIT.as_millis() as u64,
            log_tail_lines: DEFAULT_LOG_TAIL_LINES,
            log_backups: DEFAULT_LOG_BACKUPS,
        }
    }
}

impl Settings {
    /// Loads settings from a file path, returning defaults when the file is absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the file exists but cannot be read
    /// or is not valid JSON.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read settings file: {}", e))
        })?;

        Self::parse_from_str(&content)
    }

    /// Parses settings from a JSON string.
    pub fn parse_from_str(content: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(content)
            .map_err(|e| Error::Configuration(format!("Failed to parse settings: {}", e)))?;
        super::validator::validate_settings(&settings)?;
        Ok(settings)
    }

    pub fn startup_wait(&self) -> Duration {
        Duration::from_millis(self.startup_wait_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_use_defaults() {
        let settings = Settings::parse_from_str(r#"{ "shutdown_timeout": 30 }"#).unwrap();

        assert_eq!(settings.shutdown_timeout, 30);
        assert_eq!(settings.startup_wait_ms, 1000);
        assert_eq!(settings.log_tail_lines, 50);
        assert_eq!(settings.log_backups, 5);
    }

    #[test]
    fn test_malformed_settings_rejected() {
        let err = Settings::parse_from_str("{ not json").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_out_of_range_timeout_rejected() {
        let err = Settings::parse_from_str(r#"{ "shutdown_timeout": 0 }"#).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_missing_settings_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::from_file(dir.path().join("config.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_explicit_dir_wins() {
        let paths = Paths::resolve(Some(PathBuf::from("/srv/mcp"))).unwrap();
        assert_eq!(paths.config_dir(), Path::new("/srv/mcp"));
        assert_eq!(paths.log_file("a"), PathBuf::from("/srv/mcp/logs/a.log"));
    }
}
