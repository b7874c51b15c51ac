//! Error types for provider loading, detection and provisioning.
//!
//! Errors fall into three categories: malformed definitions fail fast,
//! detection misses are logged and excluded, and execution failures abort
//! the sequence they belong to.

use crate::detect::DetectionMiss;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias for provider operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of provider errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A definition or request is malformed; nothing was executed.
    Configuration,
    /// A provider is not usable on this host.
    DetectionMiss,
    /// An OS-level operation failed.
    Execution,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Configuration => "Invalid configuration",
            Self::DetectionMiss => "Provider not available",
            Self::Execution => "Operation failed",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Configuration => "Fix the provider definition or the command arguments",
            Self::DetectionMiss => "Run `outfit detect` to see which providers are usable here",
            Self::Execution => "Re-run with --debug to see command output",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur in provider operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A definition file could not be parsed.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Definition file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// A definition parsed but is not usable.
    #[error("invalid provider '{name}': {message}")]
    Invalid {
        /// Provider name (may be empty).
        name: String,
        /// What is wrong.
        message: String,
    },

    /// No provider definitions were found anywhere.
    #[error("no provider definitions found (searched built-ins and {} directories)", .searched.len())]
    NoProviders {
        /// Directories searched.
        searched: Vec<PathBuf>,
    },

    /// No provider with this name is registered.
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),

    /// The provider is registered but not usable on this host.
    #[error("provider '{name}' is not available: {reason}")]
    NotAvailable {
        /// Provider name.
        name: String,
        /// Why detection rejected it.
        reason: DetectionMiss,
    },

    /// A repository request is malformed.
    #[error("invalid repository '{name}': {message}")]
    InvalidRepository {
        /// Repository name as given.
        name: String,
        /// What is wrong.
        message: String,
    },

    /// Nothing is available to act as the default package manager.
    #[error("no package manager is available on this system")]
    NoDefault,

    /// The provider does not define the requested operation.
    #[error("provider '{name}' does not support {operation}")]
    Unsupported {
        /// Provider name.
        name: String,
        /// Operation requested.
        operation: String,
    },

    /// A step sequence failed.
    #[error(transparent)]
    Actions(#[from] actions::Error),

    /// A package-manager command failed.
    #[error(transparent)]
    Command(#[from] cmdrun::Error),

    /// Reading a definition directory failed.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Create an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Get the category of this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Parse { .. }
            | Self::Invalid { .. }
            | Self::NoProviders { .. }
            | Self::UnknownProvider(_)
            | Self::InvalidRepository { .. }
            | Self::Unsupported { .. } => ErrorCategory::Configuration,
            Self::NotAvailable { .. } | Self::NoDefault => ErrorCategory::DetectionMiss,
            Self::Actions(e) => match e.category() {
                actions::ErrorCategory::Configuration => ErrorCategory::Configuration,
                actions::ErrorCategory::Execution => ErrorCategory::Execution,
            },
            Self::Command(_) | Self::Io { .. } => ErrorCategory::Execution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            Error::UnknownProvider("x".into()).category(),
            ErrorCategory::Configuration
        );
        assert_eq!(Error::NoDefault.category(), ErrorCategory::DetectionMiss);
        assert_eq!(
            Error::NotAvailable {
                name: "yay".into(),
                reason: DetectionMiss::BinaryNotFound("yay".into()),
            }
            .category(),
            ErrorCategory::DetectionMiss
        );
        assert_eq!(
            Error::Command(cmdrun::Error::Unsupported("x".into())).category(),
            ErrorCategory::Execution
        );
    }

    #[test]
    fn test_step_errors_keep_their_category() {
        let config = Error::Actions(actions::Error::InvalidMode("9".into()));
        assert_eq!(config.category(), ErrorCategory::Configuration);

        let exec = Error::Actions(actions::Error::Download {
            url: "u".into(),
            message: "m".into(),
        });
        assert_eq!(exec.category(), ErrorCategory::Execution);
    }

    #[test]
    fn test_no_providers_message() {
        let err = Error::NoProviders {
            searched: vec!["/a".into(), "/b".into()],
        };
        assert!(err.to_string().contains("2 directories"));
    }
}
