//! Subcommand handlers.
//!
//! Handlers print results on stdout, per-server failures on stderr, and
//! return the process exit code.

use super::output;
use super::{Commands, InspectFormat, ListFormat};
use crate::constants::{EXIT_FAILURE, EXIT_SUCCESS};
use crate::error::Result;
use crate::{BatchOutcome, McpManager, ServerSpec, ServerUpdate};
use futures::StreamExt;
use std::path::PathBuf;

/// Runs parsed subcommands against a manager.
pub struct CommandHandler {
    manager: McpManager,
}

impl CommandHandler {
    pub fn new(manager: McpManager) -> Self {
        Self { manager }
    }

    /// Executes `command` and returns the exit code.
    #[tracing::instrument(skip_all)]
    pub async fn dispatch(&self, command: Commands) -> i32 {
        let result = match command {
            Commands::Ps { all, format } => self.ps(all, format).await,
            Commands::Create {
                name,
                command,
                config_file,
                health_check,
                auto_start,
            } => {
                let spec = ServerSpec {
                    name,
                    command,
                    config_file,
                    health_check,
                };
                self.create(spec, auto_start).await
            }
            Commands::Start { names } => {
                let outcome = self.manager.start_servers(&names).await;
                Ok(report(&outcome, |name, record| {
                    format!("{} (pid {})", name, display_pid(record.pid))
                }))
            }
            Commands::Stop {
                names,
                timeout,
                force,
            } => {
                let outcome = self.manager.stop_servers(&names, timeout, force).await;
                Ok(report(&outcome, |name, _| name.to_string()))
            }
            Commands::Restart { names, timeout } => {
                let outcome = self.manager.restart_servers(&names, timeout).await;
                Ok(report(&outcome, |name, record| {
                    format!("{} (pid {})", name, display_pid(record.pid))
                }))
            }
            Commands::Rm {
                names,
                force,
                keep_logs,
            } => {
                let outcome = self.manager.remove_servers(&names, force, keep_logs).await;
                for (name, result) in &outcome.results {
                    if let Ok(removed) = result {
                        if let Some(warning) = &removed.log_warning {
                            eprintln!("Warning: logs of '{}' were not deleted: {}", name, warning);
                        }
                    }
                }
                Ok(report(&outcome, |name, _| name.to_string()))
            }
            Commands::Logs {
                name,
                follow,
                tail,
                search,
                case_sensitive,
                clear,
                rotate,
            } => {
                self.logs(LogsRequest {
                    name,
                    follow,
                    tail,
                    search,
                    case_sensitive,
                    clear,
                    rotate,
                })
                .await
            }
            Commands::Inspect { name, format } => self.inspect(&name, format).await,
            Commands::Update {
                name,
                command,
                config_file,
                health_check,
            } => {
                let update = ServerUpdate {
                    command,
                    config_file,
                    health_check,
                };
                self.update(&name, update).await
            }
            Commands::PruneLogs => self.prune_logs().await,
            Commands::Backup { output } => self.backup(output).await,
            Commands::Restore { file } => self.restore(file).await,
        };

        match result {
            Ok(code) => code,
            Err(e) => {
                eprintln!("Error: {}", e);
                e.exit_code()
            }
        }
    }

    async fn ps(&self, all: bool, format: ListFormat) -> Result<i32> {
        let servers = self.manager.list_servers(all).await?;
        let rendered = match format {
            ListFormat::Table => output::format_table(&servers),
            ListFormat::Json => output::to_json(&servers)?,
            ListFormat::Yaml => output::to_yaml(&servers)?,
        };
        println!("{}", rendered);
        Ok(EXIT_SUCCESS)
    }

    async fn create(&self, spec: ServerSpec, auto_start: bool) -> Result<i32> {
        let record = self.manager.create_server(spec).await?;
        println!("Created server '{}'", record.name);

        if auto_start {
            let started = self.manager.start_server(&record.name).await?;
            println!(
                "Started server '{}' (pid {})",
                started.name,
                display_pid(started.pid)
            );
        }
        Ok(EXIT_SUCCESS)
    }

    async fn logs(&self, request: LogsRequest) -> Result<i32> {
        let name = request.name.as_str();

        if request.clear {
            self.manager.clear_logs(name)?;
            println!("Cleared logs for '{}'", name);
            return Ok(EXIT_SUCCESS);
        }

        if let Some(keep) = request.rotate {
            self.manager.rotate_logs(name, Some(keep).filter(|k| *k > 0))?;
            println!("Rotated logs for '{}'", name);
            return Ok(EXIT_SUCCESS);
        }

        if let Some(pattern) = &request.search {
            let matches =
                self.manager
                    .search_logs(name, pattern, request.tail, request.case_sensitive)?;
            for line in &matches {
                println!("{}", line);
            }
            return Ok(EXIT_SUCCESS);
        }

        for line in self.manager.get_logs(name, request.tail)? {
            println!("{}", line);
        }

        if request.follow {
            let mut stream = self.manager.follow_logs(name)?;
            while let Some(line) = stream.next().await {
                println!("{}", line?);
            }
        }
        Ok(EXIT_SUCCESS)
    }

    async fn inspect(&self, name: &str, format: InspectFormat) -> Result<i32> {
        let inspection = self.manager.inspect_server(name).await?;
        let rendered = match format {
            InspectFormat::Text => output::format_details(&inspection),
            InspectFormat::Json => output::to_json(&inspection)?,
            InspectFormat::Yaml => output::to_yaml(&inspection)?,
        };
        println!("{}", rendered);
        Ok(EXIT_SUCCESS)
    }

    async fn update(&self, name: &str, update: ServerUpdate) -> Result<i32> {
        let record = self.manager.update_server(name, update).await?;
        println!("Updated server '{}'", record.name);
        if record.is_running() {
            println!("Restart '{}' to apply a new command", record.name);
        }
        Ok(EXIT_SUCCESS)
    }

    async fn prune_logs(&self) -> Result<i32> {
        let removed = self.manager.prune_logs().await?;
        println!("Removed {} orphaned log file(s)", removed);
        Ok(EXIT_SUCCESS)
    }

    async fn backup(&self, output: Option<PathBuf>) -> Result<i32> {
        let path = self.manager.backup_registry(output).await?;
        println!("Registry backed up to {}", path.display());
        Ok(EXIT_SUCCESS)
    }

    async fn restore(&self, file: PathBuf) -> Result<i32> {
        let count = self.manager.restore_registry(&file).await?;
        println!("Restored {} server(s) from {}", count, file.display());
        Ok(EXIT_SUCCESS)
    }
}

struct LogsRequest {
    name: String,
    follow: bool,
    tail: Option<usize>,
    search: Option<String>,
    case_sensitive: bool,
    clear: bool,
    rotate: Option<usize>,
}

fn display_pid(pid: Option<u32>) -> String {
    pid.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Prints one line per target and folds the outcome into an exit code.
fn report<T>(outcome: &BatchOutcome<T>, describe: impl Fn(&str, &T) -> String) -> i32 {
    for (name, result) in &outcome.results {
        match result {
            Ok(value) => println!("{}", describe(name, value)),
            Err(e) => eprintln!("Error: {}: {}", name, e),
        }
    }
    if outcome.is_success() {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    }
}
