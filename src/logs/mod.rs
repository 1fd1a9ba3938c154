//! Log management module for MCP Manager.
//!
//! Each server owns one append-only text file at `<config_dir>/logs/<name>.log`.
//! The spawned process writes into it directly; this module only appends
//! supervisor markers and otherwise reads and maintains the file.
//!
//! # Examples
//!
//! ```no_run
//! use mcp_manager::config::Paths;
//! use mcp_manager::logs::LogManager;
//!
//! let logs = LogManager::new(Paths::new("/tmp/mcp"));
//! for line in logs.get_logs("fetch", 20).unwrap() {
//!     println!("{}", line);
//! }
//! ```
mod follow;
mod tail;

pub use follow::LogStream;

use crate::config::Paths;
use crate::config::validator::validate_backup_count;
use crate::constants::{FOLLOW_POLL_INTERVAL, LOG_FILE_EXTENSION};
use crate::error::{Error, Result};
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Reads and maintains per-server log files.
#[derive(Debug, Clone)]
pub struct LogManager {
    paths: Paths,
}

impl LogManager {
    pub fn new(paths: Paths) -> Self {
        Self { paths }
    }

    /// Deterministic log path for `name`.
    pub fn log_file_path(&self, name: &str) -> PathBuf {
        self.paths.log_file(name)
    }

    fn backup_path(&self, name: &str, index: usize) -> PathBuf {
        let mut path = self.log_file_path(name).into_os_string();
        path.push(format!(".{}", index));
        PathBuf::from(path)
    }

    /// Opens the log for appending, creating it and the log directory.
    pub fn open_for_append(&self, name: &str) -> Result<File> {
        let path = self.log_file_path(name);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                Error::Log(format!("Failed to create log directory {}: {}", dir.display(), e))
            })?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| Error::Log(format!("Failed to open {}: {}", path.display(), e)))
    }

    /// Appends a supervisor marker line.
    pub fn append_marker(&self, name: &str, line: &str) -> Result<()> {
        let mut file = self.open_for_append(name)?;
        writeln!(file, "{}", line)
            .and_then(|_| file.flush())
            .map_err(|e| Error::Log(format!("Failed to write log marker: {}", e)))
    }

    /// Returns the last `n` lines of the server's log.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the server never wrote a log, [`Error::Log`] if
    /// the file cannot be read.
    pub fn get_logs(&self, name: &str, n: usize) -> Result<Vec<String>> {
        let path = self.existing_log(name)?;
        tail::read_tail_lines(&path, n)
            .map_err(|e| Error::Log(format!("Failed to read {}: {}", path.display(), e)))
    }

    /// Streams lines appended to the log from now on.
    ///
    /// The stream never ends on its own; drop it to stop following.
    pub fn follow_logs(&self, name: &str) -> Result<LogStream> {
        let path = self.existing_log(name)?;
        Ok(follow::follow(path, FOLLOW_POLL_INTERVAL))
    }

    /// Case-(in)sensitive substring search over the last `max_lines` lines.
    ///
    /// Never fails: an absent or unreadable log yields no matches.
    pub fn search_logs(
        &self,
        name: &str,
        pattern: &str,
        max_lines: usize,
        case_sensitive: bool,
    ) -> Vec<String> {
        let lines = match self.get_logs(name, max_lines) {
            Ok(lines) => lines,
            Err(e) => {
                tracing::debug!(server_name = %name, error = %e, "Log search found nothing to read");
                return Vec::new();
            }
        };

        if case_sensitive {
            lines.into_iter().filter(|l| l.contains(pattern)).collect()
        } else {
            let needle = pattern.to_lowercase();
            lines
                .into_iter()
                .filter(|l| l.to_lowercase().contains(&needle))
                .collect()
        }
    }

    /// Truncates the log; absent logs are left alone.
    pub fn clear_logs(&self, name: &str) -> Result<()> {
        let path = self.log_file_path(name);
        match OpenOptions::new().write(true).truncate(true).open(&path) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Log(format!("Failed to clear {}: {}", path.display(), e))),
        }
    }

    /// Removes the log; absent logs are success.
    pub fn delete_logs(&self, name: &str) -> Result<()> {
        remove_if_exists(&self.log_file_path(name))
    }

    /// Numbered rotation keeping `keep` backups (`<name>.log.1` is newest).
    pub fn rotate_logs(&self, name: &str, keep: usize) -> Result<()> {
        let keep = validate_backup_count(keep)?;
        let current = self.log_file_path(name);
        if !current.exists() {
            return Ok(());
        }

        remove_if_exists(&self.backup_path(name, keep))?;
        for index in (1..keep).rev() {
            let from = self.backup_path(name, index);
            if from.exists() {
                rename(&from, &self.backup_path(name, index + 1))?;
            }
        }
        rename(&current, &self.backup_path(name, 1))?;

        File::create(&current)
            .map_err(|e| Error::Log(format!("Failed to create {}: {}", current.display(), e)))?;
        tracing::info!(server_name = %name, keep, "Rotated log");
        Ok(())
    }

    /// Log size in bytes, 0 when absent.
    pub fn get_log_file_size(&self, name: &str) -> u64 {
        fs::metadata(self.log_file_path(name))
            .map(|m| m.len())
            .unwrap_or(0)
    }

    /// Names of all servers that have a current log file, sorted.
    pub fn list_log_files(&self) -> Vec<String> {
        let entries = match fs::read_dir(self.paths.logs_dir()) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| path.extension().is_some_and(|ext| ext == LOG_FILE_EXTENSION))
            .filter_map(|path| {
                path.file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
            })
            .collect();
        names.sort();
        names
    }

    /// Deletes logs whose server is not in `active_names`; returns how many went.
    pub fn cleanup_orphaned_logs(&self, active_names: &[String]) -> usize {
        let active: HashSet<&str> = active_names.iter().map(String::as_str).collect();
        let mut removed = 0;

        for name in self.list_log_files() {
            if active.contains(name.as_str()) {
                continue;
            }
            match self.delete_logs(&name) {
                Ok(()) => {
                    tracing::info!(server_name = %name, "Removed orphaned log");
                    removed += 1;
                }
                Err(e) => tracing::warn!(server_name = %name, error = %e, "Failed to remove orphaned log"),
            }
        }
        removed
    }

    fn existing_log(&self, name: &str) -> Result<PathBuf> {
        let path = self.log_file_path(name);
        if path.is_file() {
            Ok(path)
        } else {
            Err(Error::NotFound(format!("No logs found for server '{}'", name)))
        }
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Log(format!("Failed to delete {}: {}", path.display(), e))),
    }
}

fn rename(from: &Path, to: &Path) -> Result<()> {
    fs::rename(from, to).map_err(|e| {
        Error::Log(format!(
            "Failed to move {} to {}: {}",
            from.display(),
            to.display(),
            e
        ))
    })
}
