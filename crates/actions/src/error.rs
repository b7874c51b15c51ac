//! Error types for step execution.

use crate::step::ActionKind;
use crate::template::TemplateError;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias for step execution.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse error classes used by callers to decide containment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed or incomplete step definition; nothing was executed.
    Configuration,
    /// An OS-level operation failed (download, write, command exit).
    Execution,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration error"),
            Self::Execution => write!(f, "execution error"),
        }
    }
}

/// Errors that can occur while validating or executing steps.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A template field could not be rendered.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// A step definition is incomplete or malformed.
    #[error("step {} ({action}) is invalid: {message}", .index + 1)]
    InvalidStep {
        /// Zero-based position in the sequence.
        index: usize,
        /// Kind of the offending step.
        action: ActionKind,
        /// What is wrong with it.
        message: String,
    },

    /// A step failed; remaining steps were not run.
    #[error("step {} ({action}) failed: {source}", .index + 1)]
    Step {
        /// Zero-based position in the sequence.
        index: usize,
        /// Kind of the failed step.
        action: ActionKind,
        /// The underlying failure.
        #[source]
        source: Box<Error>,
    },

    /// Fetching remote content failed.
    #[error("download of {url} failed: {message}")]
    Download {
        /// Source URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// A command (including an elevated fallback) failed.
    #[error(transparent)]
    Command(#[from] cmdrun::Error),

    /// A filesystem operation failed.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path involved in the error.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// A permission mode is not a valid octal number.
    #[error("invalid file mode '{0}' (expected octal such as 0644)")]
    InvalidMode(String),

    /// The operation has no meaning on this platform.
    #[error("unsupported on this platform: {0}")]
    Unsupported(String),
}

impl Error {
    /// Create an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Classify this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Template(_) | Error::InvalidStep { .. } | Error::InvalidMode(_) => {
                ErrorCategory::Configuration
            }
            Error::Step { source, .. } => source.category(),
            Error::Download { .. }
            | Error::Command(_)
            | Error::Io { .. }
            | Error::Unsupported(_) => ErrorCategory::Execution,
        }
    }

    /// Zero-based index of the failed step, if this error came from a sequence.
    #[must_use]
    pub fn step_index(&self) -> Option<usize> {
        match self {
            Error::Step { index, .. } | Error::InvalidStep { index, .. } => Some(*index),
            _ => None,
        }
    }
}
