//! Error types for command execution.
//!
//! A non-zero exit status is the only process outcome treated as failure.
//! Errors carry the rendered command line and captured stderr verbatim so the
//! caller can show exactly what went wrong.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Result type alias for command execution.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of runner errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The executable could not be found.
    NotFound,
    /// The command ran and exited unsuccessfully.
    Failed,
    /// The command exceeded its deadline.
    Timeout,
    /// Permission denied while spawning or writing the log.
    Permission,
    /// The requested mode is not available on this platform.
    Platform,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "Executable not found",
            Self::Failed => "Command failed",
            Self::Timeout => "Command timed out",
            Self::Permission => "Permission denied",
            Self::Platform => "Unsupported on this platform",
            Self::Other => "Unexpected error",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while running a command.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The process could not be started.
    #[error("failed to execute {program}: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The process exited with a non-zero status.
    #[error("command `{command}` failed ({}){}", exit_label(.code), stderr_suffix(.stderr))]
    CommandFailed {
        /// Rendered command line.
        command: String,
        /// Exit code, `None` when terminated by a signal.
        code: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },

    /// The process was killed after exceeding its deadline.
    #[error("command `{command}` timed out after {}s", .timeout.as_secs())]
    TimedOut {
        /// Rendered command line.
        command: String,
        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// The requested execution mode is not supported here.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// IO error on a file the runner manages (the command log).
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path involved in the error.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(":\n{trimmed}")
    }
}

impl Error {
    /// Create an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Spawn { source, .. } | Error::Io { source, .. } => match source.kind() {
                io::ErrorKind::NotFound => ErrorCategory::NotFound,
                io::ErrorKind::PermissionDenied => ErrorCategory::Permission,
                _ => ErrorCategory::Other,
            },
            Error::CommandFailed { .. } => ErrorCategory::Failed,
            Error::TimedOut { .. } => ErrorCategory::Timeout,
            Error::Unsupported(_) => ErrorCategory::Platform,
        }
    }

    /// Captured stderr, when the error came from a finished process.
    #[must_use]
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Error::CommandFailed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}
