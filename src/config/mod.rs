//! Configuration module for MCP Manager.
//!
//! This module resolves where the manager keeps its files, loads optional
//! user settings, and validates user-supplied values such as server names.
//!
//! # Examples
//!
//! Resolving paths and loading settings:
//!
//! ```no_run
//! use mcp_manager::config::{Paths, Settings};
//!
//! let paths = Paths::resolve(None).unwrap();
//! paths.ensure_dirs().unwrap();
//! let settings = Settings::from_file(paths.settings_file()).unwrap();
//! println!("Shutdown timeout: {}s", settings.shutdown_timeout);
//! ```
mod parser;
pub mod validator;

pub use parser::{Paths, Settings};
pub use validator::{validate_command, validate_server_name, validate_timeout};
