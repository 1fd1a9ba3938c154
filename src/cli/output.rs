//! Rendering of records for the terminal.

use crate::Inspection;
use crate::error::{Error, Result};
use crate::server::ServerRecord;
use serde::Serialize;
use std::fmt::Write;

const NAME_WIDTH: usize = 20;
const STATUS_WIDTH: usize = 10;
const PID_WIDTH: usize = 8;
const CREATED_WIDTH: usize = 20;
const COMMAND_WIDTH: usize = 40;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| Error::Serialization(e.to_string()))
}

pub fn to_yaml<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_yaml::to_string(value)
        .map(|yaml| yaml.trim_end().to_string())
        .map_err(|e| Error::Serialization(e.to_string()))
}

/// Shortens `text` to `width` characters, ending in `...` when cut.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Fixed-width table in the style of `docker ps`.
pub fn format_table(records: &[ServerRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<NAME_WIDTH$} {:<STATUS_WIDTH$} {:<PID_WIDTH$} {:<CREATED_WIDTH$} {}",
        "NAME", "STATUS", "PID", "CREATED", "COMMAND"
    );

    for record in records {
        let pid = record
            .pid
            .map(|pid| pid.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{:<NAME_WIDTH$} {:<STATUS_WIDTH$} {:<PID_WIDTH$} {:<CREATED_WIDTH$} {}",
            record.name,
            record.status.as_str(),
            pid,
            record.created.format(TIME_FORMAT).to_string(),
            truncate(&record.command, COMMAND_WIDTH)
        );
    }
    out.trim_end().to_string()
}

/// Human-readable `inspect` output.
pub fn format_details(inspection: &Inspection) -> String {
    let record = &inspection.record;
    let mut out = String::new();

    let _ = writeln!(out, "Name:         {}", record.name);
    let _ = writeln!(out, "Status:       {}", record.status);
    let _ = writeln!(out, "Command:      {}", record.command);
    if let Some(config_file) = &record.config_file {
        let _ = writeln!(out, "Config file:  {}", config_file);
    }
    if let Some(health_check) = &record.health_check {
        let _ = writeln!(out, "Health check: {}", health_check);
    }
    let _ = writeln!(out, "Created:      {}", record.created.format(TIME_FORMAT));
    if let Some(pid) = record.pid {
        let _ = writeln!(out, "PID:          {}", pid);
    }
    if let Some(started) = record.started {
        let _ = writeln!(out, "Started:      {}", started.format(TIME_FORMAT));
    }

    if let Some(info) = &inspection.process_info {
        let _ = writeln!(out, "Memory:       {:.1} MB", info.memory_mb);
        let _ = writeln!(out, "CPU:          {:.1}%", info.cpu_percent);
        let _ = writeln!(out, "Threads:      {}", info.num_threads);
        if !info.cmdline.is_empty() {
            let _ = writeln!(out, "Cmdline:      {}", info.cmdline.join(" "));
        }
    }

    let _ = writeln!(out, "Log file:     {}", inspection.log_file.display());
    let _ = writeln!(out, "Log size:     {}", format_size(inspection.log_size));
    out.trim_end().to_string()
}

pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
