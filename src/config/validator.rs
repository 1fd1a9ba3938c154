use crate::config::Settings;
use crate::constants::{MAX_SHUTDOWN_TIMEOUT, MIN_SHUTDOWN_TIMEOUT, RESERVED_NAME_CHARS};
use crate::error::{Error, Result};

/// Validates a server name and returns it trimmed.
///
/// Names double as log file names, so anything that could escape the log
/// directory or confuse a shell is rejected.
pub fn validate_server_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidArgument(
            "Server name cannot be empty".to_string(),
        ));
    }

    if name == "." || name == ".." {
        return Err(Error::InvalidArgument(format!(
            "Server name '{}' is reserved",
            name
        )));
    }

    if let Some(c) = name
        .chars()
        .find(|c| RESERVED_NAME_CHARS.contains(c) || c.is_control())
    {
        return Err(Error::InvalidArgument(format!(
            "Server name '{}' contains invalid character {:?}",
            name, c
        )));
    }

    Ok(name.to_string())
}

/// Validates a launch command and returns it trimmed.
pub fn validate_command(command: &str) -> Result<String> {
    let command = command.trim();
    if command.is_empty() {
        return Err(Error::InvalidArgument(
            "Server command cannot be empty".to_string(),
        ));
    }
    Ok(command.to_string())
}

/// Validates a graceful shutdown timeout in seconds.
pub fn validate_timeout(timeout: u64) -> Result<u64> {
    if !(MIN_SHUTDOWN_TIMEOUT..=MAX_SHUTDOWN_TIMEOUT).contains(&timeout) {
        return Err(Error::InvalidArgument(format!(
            "Timeout must be between {} and {} seconds, got {}",
            MIN_SHUTDOWN_TIMEOUT, MAX_SHUTDOWN_TIMEOUT, timeout
        )));
    }
    Ok(timeout)
}

/// Validates the number of rotated log backups to keep.
pub fn validate_backup_count(keep: usize) -> Result<usize> {
    if keep == 0 {
        return Err(Error::InvalidArgument(
            "At least one log backup must be kept".to_string(),
        ));
    }
    Ok(keep)
}

/// Full settings validation
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_timeout(settings.shutdown_timeout)?;
    validate_backup_count(settings.log_backups)?;

    Ok(())
}
