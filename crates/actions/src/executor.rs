//! Step sequence execution
//!
//! Validates the whole sequence, then renders and runs each step in order.
//! The first failure stops the sequence; steps already done stay done.

use crate::context::{ExecContext, NoProgress, ProgressCallback, StepOutcome};
use crate::error::{Error, Result};
use crate::fsops;
use crate::step::{ActionStep, parse_mode};
use crate::template::TemplateContext;
use cmdrun::CommandSpec;
use std::path::Path;

/// Summary of a sequence run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecuteSummary {
    /// Steps in the sequence.
    pub total: usize,
    /// Steps executed.
    pub completed: usize,
    /// Steps rendered but skipped (dry-run).
    pub skipped: usize,
}

impl ExecuteSummary {
    /// Whether every step was accounted for.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed + self.skipped == self.total
    }
}

/// Validate every step without running any of them.
pub fn validate(steps: &[ActionStep]) -> Result<()> {
    steps
        .iter()
        .enumerate()
        .try_for_each(|(index, step)| step.validate(index))
}

/// Execute a step sequence with no progress reporting.
pub fn execute(
    steps: &[ActionStep],
    template: &TemplateContext,
    ctx: &ExecContext<'_>,
) -> Result<ExecuteSummary> {
    execute_with_progress(steps, template, ctx, &mut NoProgress)
}

/// Execute a step sequence, reporting to `progress`.
///
/// Nothing runs unless every step validates. On failure the error names the
/// failed step's index and kind, and later steps are not attempted.
pub fn execute_with_progress<P: ProgressCallback>(
    steps: &[ActionStep],
    template: &TemplateContext,
    ctx: &ExecContext<'_>,
    progress: &mut P,
) -> Result<ExecuteSummary> {
    validate(steps)?;

    let mut summary = ExecuteSummary {
        total: steps.len(),
        ..ExecuteSummary::default()
    };
    progress.on_start(steps.len());

    for (index, step) in steps.iter().enumerate() {
        let wrap = |source: Error| Error::Step {
            index,
            action: step.kind(),
            source: Box::new(source),
        };

        let rendered = match step.render(template) {
            Ok(rendered) => rendered,
            Err(e) => {
                progress.on_step_start(index, &step.describe());
                progress.on_step_complete(index, StepOutcome::Failed);
                progress.on_finish();
                return Err(wrap(e));
            }
        };
        let description = rendered.describe();
        progress.on_step_start(index, &description);

        if ctx.dry_run {
            log::info!("[dry-run] step {}: {description}", index + 1);
            summary.skipped += 1;
            progress.on_step_complete(index, StepOutcome::Skipped);
            continue;
        }

        log::debug!("step {}/{}: {description}", index + 1, steps.len());
        if let Err(e) = run_step(&rendered, ctx) {
            log::debug!("step {} failed: {e}", index + 1);
            progress.on_step_complete(index, StepOutcome::Failed);
            progress.on_finish();
            return Err(wrap(e));
        }
        summary.completed += 1;
        progress.on_step_complete(index, StepOutcome::Done);
    }

    progress.on_finish();
    Ok(summary)
}

/// Run one already-rendered step.
fn run_step(step: &ActionStep, ctx: &ExecContext<'_>) -> Result<()> {
    let exec = ctx.executor;
    match step {
        ActionStep::Download { source, dest } => {
            let bytes = ctx.fetcher.fetch(source)?;
            fsops::write_file(Path::new(dest), &bytes, None, exec)
        }
        ActionStep::Command { exec: program, args } => {
            let spec = CommandSpec::new(program.as_str())
                .args(args.iter().map(String::as_str))
                .envs(ctx.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                .elevated(ctx.elevated);
            exec.execute(&spec)?;
            Ok(())
        }
        ActionStep::Write { dest, content } => {
            fsops::write_file(Path::new(dest), content.as_bytes(), None, exec)
        }
        ActionStep::Remove { dest } => fsops::remove(Path::new(dest), exec),
        ActionStep::Mkdir { dest } => fsops::make_dir(Path::new(dest), exec),
        ActionStep::Chmod { dest, mode } => {
            fsops::chmod(Path::new(dest), parse_mode(mode)?, exec)
        }
        ActionStep::Chown { dest, owner } => fsops::chown(Path::new(dest), owner, exec),
        ActionStep::Symlink { source, dest } => {
            fsops::symlink(Path::new(source), Path::new(dest), exec)
        }
        ActionStep::Copy { source, dest } => {
            fsops::copy_file(Path::new(source), Path::new(dest), exec)
        }
    }
}
