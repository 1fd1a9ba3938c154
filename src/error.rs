//! Error handling module for MCP Manager.
//!
//! This module defines the error types used throughout the library.
//! Every lifecycle, registry and log operation reports failures through
//! [`Error`], so the command layer can report them per server.
//!
//! # Example
//!
//! ```
//! use mcp_manager::error::{Error, Result};
//!
//! fn handle_error(result: Result<()>) {
//!     match result {
//!         Ok(_) => println!("Operation succeeded"),
//!         Err(Error::NotFound(what)) => println!("Not found: {}", what),
//!         Err(Error::StartFailure { name, reason }) => println!("{} failed: {}", name, reason),
//!         Err(e) => println!("Other error: {}", e),
//!     }
//! }
//! ```
use thiserror::Error;

/// Errors that can occur in the mcp-manager library.
#[derive(Error, Debug)]
pub enum Error {
    /// An operation referenced a server or log file that does not exist.
    ///
    /// This error occurs when:
    /// - A server name is not present in the registry
    /// - Logs are requested for a server that never wrote a log file
    #[error("Not found: {0}")]
    NotFound(String),

    /// A server with the same name is already registered.
    #[error("Server '{0}' already exists")]
    AlreadyExists(String),

    /// The server process could not be spawned or exited during startup.
    ///
    /// The reason carries either the OS error or the exit code.
    #[error("Failed to start server '{name}': {reason}")]
    StartFailure {
        /// Server name
        name: String,
        /// Exit code or OS reason
        reason: String,
    },

    /// Graceful and forced termination both failed.
    ///
    /// The process is unkillable or defunct and needs manual intervention.
    /// This error is never retried automatically.
    #[error("Failed to stop server '{name}': {reason}")]
    StopFailure {
        /// Server name
        name: String,
        /// Why the process is still alive
        reason: String,
    },

    /// The registry or settings file could not be read, written or decoded.
    ///
    /// This error occurs when:
    /// - The configuration directory cannot be created
    /// - `servers.json` is malformed
    /// - The registry cannot be written
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A log file could not be read or written.
    #[error("Log error: {0}")]
    Log(String),

    /// A caller supplied a value that fails validation.
    ///
    /// This error occurs when:
    /// - A server name contains path separators or reserved characters
    /// - A command is empty
    /// - A timeout is outside the accepted range
    /// - A running server is removed without `force`
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Output could not be rendered as JSON or YAML.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The operator interrupted a blocking operation.
    #[error("Operation cancelled by user")]
    Interrupted,
}

impl Error {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Interrupted => crate::constants::EXIT_INTERRUPTED,
            _ => crate::constants::EXIT_FAILURE,
        }
    }
}

/// Result type for mcp-manager operations.
pub type Result<T> = std::result::Result<T, Error>;
