//! Command-line interface for the `mcp` binary.
//!
//! Argument parsing uses clap derive. [`commands::CommandHandler`] maps each
//! subcommand onto [`McpManager`](crate::McpManager) and returns an exit code;
//! [`output`] renders records as tables, text, JSON or YAML.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const AFTER_HELP: &str = "\
EXAMPLES:
  mcp create fetch 'uvx mcp-server-fetch'   Register a server
  mcp start fetch                           Start it
  mcp ps                                    List running servers
  mcp logs fetch -f                         Follow its output
  mcp stop fetch --timeout 5                Stop, killing after 5s
  mcp rm fetch                              Remove it and its logs";

#[derive(Debug, Parser)]
#[command(name = "mcp")]
#[command(version)]
#[command(about = "Manage local MCP server processes like containers")]
#[command(after_help = AFTER_HELP)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration directory (default: ~/.mcp)
    #[arg(long, global = true, env = "MCP_CONFIG_DIR", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    Table,
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InspectFormat {
    Text,
    Json,
    Yaml,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List servers
    ///
    /// Only running servers are shown unless --all is given.
    #[command(visible_aliases = ["list", "ls"])]
    Ps {
        /// Show all servers, including stopped ones
        #[arg(short, long)]
        all: bool,
        #[arg(long, value_enum, default_value = "table")]
        format: ListFormat,
    },
    /// Register a new server
    Create {
        /// Unique server name
        name: String,
        /// Shell command that launches the server
        command: String,
        /// Configuration file to associate with the server
        #[arg(long = "config", value_name = "FILE")]
        config_file: Option<String>,
        /// Health-check command (stored only)
        #[arg(long)]
        health_check: Option<String>,
        /// Start the server right after creating it
        #[arg(long)]
        auto_start: bool,
    },
    /// Start one or more servers
    Start {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Stop one or more servers
    ///
    /// Sends SIGTERM to the server's process group and escalates to SIGKILL
    /// when the timeout expires.
    Stop {
        #[arg(required = true)]
        names: Vec<String>,
        /// Seconds to wait before killing (default: 10)
        #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..=300))]
        timeout: Option<u64>,
        /// Kill immediately without a graceful phase
        #[arg(short, long)]
        force: bool,
    },
    /// Restart one or more servers
    Restart {
        #[arg(required = true)]
        names: Vec<String>,
        /// Seconds to wait for the old process to exit
        #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..=300))]
        timeout: Option<u64>,
    },
    /// Remove one or more servers
    #[command(visible_aliases = ["remove", "delete"])]
    Rm {
        #[arg(required = true)]
        names: Vec<String>,
        /// Kill running servers instead of refusing
        #[arg(short, long)]
        force: bool,
        /// Keep the log files
        #[arg(long)]
        keep_logs: bool,
    },
    /// Show or manage server logs
    #[command(visible_alias = "log")]
    Logs {
        name: String,
        /// Follow new output until interrupted
        #[arg(short, long, conflicts_with_all = ["search", "clear", "rotate"])]
        follow: bool,
        /// Number of lines to show
        #[arg(short = 'n', long = "tail", value_name = "N")]
        tail: Option<usize>,
        /// Show only lines containing this text
        #[arg(long, value_name = "PATTERN")]
        search: Option<String>,
        /// Match --search case-sensitively
        #[arg(long, requires = "search")]
        case_sensitive: bool,
        /// Truncate the log file
        #[arg(long, conflicts_with_all = ["search", "rotate"])]
        clear: bool,
        /// Rotate the log, keeping this many backups (default: 5)
        #[arg(long, value_name = "KEEP", num_args = 0..=1, default_missing_value = "0")]
        rotate: Option<usize>,
    },
    /// Show detailed information about a server
    Inspect {
        name: String,
        #[arg(long, value_enum, default_value = "text")]
        format: InspectFormat,
    },
    /// Change a server's command or metadata
    Update {
        name: String,
        /// New launch command
        #[arg(long)]
        command: Option<String>,
        /// New configuration file; an empty value clears it
        #[arg(long = "config", value_name = "FILE")]
        config_file: Option<String>,
        /// New health-check command; an empty value clears it
        #[arg(long)]
        health_check: Option<String>,
    },
    /// Delete log files of servers that no longer exist
    PruneLogs,
    /// Copy the registry to a backup file
    Backup {
        /// Destination (default: timestamped file in the config directory)
        output: Option<PathBuf>,
    },
    /// Replace the registry with a backup file
    Restore { file: PathBuf },
}
