//! Supervisor error taxonomy. Every start-up stage maps to its own variant
//! so operators can tell which stage failed without parsing message text.

use std::io;

/// Errors surfaced by supervisor operations.
#[derive(thiserror::Error, Debug)]
pub enum SupervisorError {
    #[error("instance name must be set")]
    InvalidArgument,

    #[error("error reading configuration: {0}")]
    ConfigurationRead(#[source] anyhow::Error),

    #[error("error writing configuration: {0}")]
    ConfigurationWrite(#[source] anyhow::Error),

    #[error("error creating server log folder: {0}")]
    Directory(#[source] io::Error),

    #[error("error creating log file: {0}")]
    LogFile(#[source] io::Error),

    #[error("error starting instance: {0}")]
    ProcessStart(#[source] io::Error),

    #[error("instance with pid {pid} not found")]
    NotFound { pid: u32 },

    #[error("failed to terminate process: {reason}")]
    TerminationFailed { reason: String },

    #[error("registry lock poisoned")]
    LockPoisoned,
}

impl SupervisorError {
    /// Machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::ConfigurationRead(_) => "CONFIGURATION_READ",
            Self::ConfigurationWrite(_) => "CONFIGURATION_WRITE",
            Self::Directory(_) => "LOG_DIRECTORY",
            Self::LogFile(_) => "LOG_FILE",
            Self::ProcessStart(_) => "PROCESS_START",
            Self::NotFound { .. } => "INSTANCE_NOT_FOUND",
            Self::TerminationFailed { .. } => "TERMINATION_FAILED",
            Self::LockPoisoned => "LOCK_POISONED",
        }
    }
}
