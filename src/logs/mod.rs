//! Read-only access to the per-run log files the supervisor writes.
//!
//! Pure filesystem projection; nothing here touches the registry or the
//! running processes.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LogError {
    #[error("log i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// One log file in the configured log directory.
#[derive(Debug, Clone, Serialize)]
pub struct LogSummary {
    pub name: String,
    pub modified: DateTime<Utc>,
    pub size: u64,
}

/// List every log file written so far.
pub fn get_all_instance_logs(log_dir: &Path) -> Result<Vec<LogSummary>, LogError> {
    let dir = fs::read_dir(log_dir).map_err(|e| {
        tracing::error!("Error reading log directory: {}", e);
        LogError::Io(e)
    })?;

    let mut logs = Vec::new();

    for entry in dir {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        logs.push(LogSummary {
            name: entry.file_name().to_string_lossy().into_owned(),
            modified: DateTime::<Utc>::from(metadata.modified()?),
            size: metadata.len(),
        });
    }

    Ok(logs)
}

/// Read one log file's full contents.
///
/// `file` is joined onto the log directory as-is; callers exposing this to
/// untrusted input must reject path separators themselves.
pub fn get_instance_log(log_dir: &Path, file: &str) -> Result<String, LogError> {
    fs::read_to_string(log_dir.join(file)).map_err(|e| {
        tracing::error!("Error reading log file: {}", e);
        LogError::Io(e)
    })
}
