use crate::commands::report_batch;
use crate::context::AppContext;
use crate::progress::StepProgress;
use crate::ui;
use ::providers::SetupOutcome;
use anyhow::{Context, Result};

fn describe(name: &str, outcome: &SetupOutcome, done: &str) {
    match outcome {
        SetupOutcome::Unchanged => ui::info(&format!("{name}: nothing to do")),
        SetupOutcome::Steps(summary) if summary.skipped > 0 => {
            ui::info(&format!("{name}: {} steps (dry run)", summary.skipped));
        }
        SetupOutcome::Steps(summary) => {
            ui::success(&format!("{name} {done} ({} steps)", summary.completed));
        }
        SetupOutcome::Package { manager, package } => {
            ui::success(&format!("{name} {done} ({package} via {manager})"));
        }
    }
}

pub fn setup(ctx: &AppContext, names: &[String]) -> Result<()> {
    if !ctx.confirm(&format!("Install {}?", names.join(", ")), true)? {
        ui::warn("Cancelled");
        return Ok(());
    }

    let provisioner = ctx.provisioner();
    let mut progress = StepProgress::new(ctx.quiet);

    if let [name] = names {
        let outcome = provisioner
            .setup(name, &mut progress)
            .with_context(|| format!("Failed to set up {name}"))?;
        describe(name, &outcome, "installed");
        return Ok(());
    }

    let report = provisioner.setup_each(names, &mut progress);
    report_batch(&report, "setups")
}

pub fn teardown(ctx: &AppContext, name: &str) -> Result<()> {
    if !ctx.confirm(&format!("Remove {name}?"), false)? {
        ui::warn("Cancelled");
        return Ok(());
    }

    let mut progress = StepProgress::new(ctx.quiet);
    let outcome = ctx
        .provisioner()
        .teardown(name, &mut progress)
        .with_context(|| format!("Failed to remove {name}"))?;
    describe(name, &outcome, "removed");
    Ok(())
}
