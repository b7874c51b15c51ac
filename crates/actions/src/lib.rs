//! # actions
//!
//! Declarative step execution for provisioning.
//!
//! A provider definition describes work as an ordered list of typed
//! [`ActionStep`]s (download, command, write, remove, mkdir, chmod, chown,
//! symlink, copy). Every string field is a template rendered against one
//! [`TemplateContext`] per high-level operation, then the step is run through
//! injected collaborators: a [`cmdrun::CommandExecutor`] for processes and
//! elevated fallbacks, and a [`Fetcher`] for downloads.
//!
//! ## Guarantees
//!
//! - The whole sequence is validated before anything runs.
//! - Steps run strictly in order; the first failure stops the sequence and
//!   the error carries the failed step's index and kind.
//! - File contents are replaced atomically (temp file, then rename or an
//!   elevated move).
//! - There is no rollback and no retry.
//!
//! ## Example
//!
//! ```
//! use actions::{ActionStep, ExecContext, StaticFetcher, TemplateContext};
//! use cmdrun::RecordingExecutor;
//!
//! let exec = RecordingExecutor::new();
//! let fetcher = StaticFetcher::new();
//! let ctx = ExecContext::new(&exec, &fetcher).elevated(true);
//! let template = TemplateContext::builder().name("docker").build();
//!
//! let steps = vec![ActionStep::Command {
//!     exec: "apt-get".to_string(),
//!     args: vec!["update".to_string()],
//! }];
//!
//! let summary = actions::execute(&steps, &template, &ctx).unwrap();
//! assert_eq!(summary.completed, 1);
//! assert_eq!(exec.command_lines(), vec!["apt-get update"]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod fsops;
pub mod step;
pub mod template;

pub use context::{ExecContext, NoProgress, ProgressCallback, StepOutcome};
pub use error::{Error, ErrorCategory, Result};
pub use executor::{ExecuteSummary, execute, execute_with_progress, validate};
pub use fetch::{Fetcher, HttpFetcher, StaticFetcher};
pub use step::{ActionKind, ActionStep, parse_mode};
pub use template::{TemplateContext, TemplateContextBuilder, TemplateError};
