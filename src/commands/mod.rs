pub mod detect;
pub mod packages;
pub mod providers;
pub mod repo;
pub mod setup;

use crate::ui;
use ::providers::BatchReport;
use anyhow::Result;

/// Print each failure of a batch, then fail unless everything succeeded.
pub(crate) fn report_batch(report: &BatchReport, what: &str) -> Result<()> {
    for (item, error) in &report.failed {
        ui::error(&format!("{item}: {error}"));
    }
    if report.is_success() {
        ui::success(&format!("{} {what} done", report.succeeded.len()));
        return Ok(());
    }
    anyhow::bail!(
        "{} of {} {what} failed",
        report.failed.len(),
        report.failed.len() + report.succeeded.len()
    )
}
