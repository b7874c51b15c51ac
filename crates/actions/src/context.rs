//! Execution context and progress traits
//!
//! These let the engine run without depending on a particular process
//! runner, HTTP client or terminal UI.

use crate::fetch::Fetcher;
use cmdrun::CommandExecutor;
use std::collections::BTreeMap;

/// Collaborators and switches for one step sequence.
pub struct ExecContext<'a> {
    /// Runs `command` steps and elevated fallbacks.
    pub executor: &'a dyn CommandExecutor,
    /// Retrieves `download` sources.
    pub fetcher: &'a dyn Fetcher,
    /// Force elevation for `command` steps (repository mutation).
    pub elevated: bool,
    /// Render and report steps without touching the system.
    pub dry_run: bool,
    /// Extra environment for `command` steps.
    pub env: BTreeMap<String, String>,
}

impl<'a> ExecContext<'a> {
    /// Context with elevation and dry-run off and no extra environment.
    pub fn new(executor: &'a dyn CommandExecutor, fetcher: &'a dyn Fetcher) -> Self {
        Self {
            executor,
            fetcher,
            elevated: false,
            dry_run: false,
            env: BTreeMap::new(),
        }
    }

    /// Force elevation for `command` steps.
    #[must_use]
    pub fn elevated(mut self, elevated: bool) -> Self {
        self.elevated = elevated;
        self
    }

    /// Enable dry-run.
    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Add environment for `command` steps.
    #[must_use]
    pub fn env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }
}

/// Outcome of one step, as reported to a [`ProgressCallback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step ran and succeeded.
    Done,
    /// Dry-run: the step was rendered but not executed.
    Skipped,
    /// The step failed; no further steps run.
    Failed,
}

/// Progress callback for step execution
///
/// Implement this trait to receive progress updates during execution.
pub trait ProgressCallback {
    /// Called once before the first step, after validation.
    fn on_start(&mut self, total: usize);

    /// Called before step `index` (zero-based) runs.
    fn on_step_start(&mut self, index: usize, description: &str);

    /// Called after step `index` finishes.
    fn on_step_complete(&mut self, index: usize, outcome: StepOutcome);

    /// Called after the last step, or after the failing one.
    fn on_finish(&mut self) {}
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_start(&mut self, _total: usize) {}
    fn on_step_start(&mut self, _index: usize, _description: &str) {}
    fn on_step_complete(&mut self, _index: usize, _outcome: StepOutcome) {}
}
