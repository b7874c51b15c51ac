//! Step progress on the terminal.

use crate::ui;
use actions::{ProgressCallback, StepOutcome};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

const MESSAGE_WIDTH: usize = 50;

/// Progress bar over a step sequence.
///
/// Dry-run steps and failures are printed above the bar so they stay
/// visible after it clears.
pub struct StepProgress {
    bar: ProgressBar,
    quiet: bool,
    current: String,
    failed: bool,
}

impl StepProgress {
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: ProgressBar::hidden(),
            quiet,
            current: String::new(),
            failed: false,
        }
    }
}

impl ProgressCallback for StepProgress {
    fn on_start(&mut self, total: usize) {
        if self.quiet {
            return;
        }
        self.bar = ProgressBar::new(total as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        {
            self.bar.set_style(style.progress_chars("=>-"));
        }
    }

    fn on_step_start(&mut self, _index: usize, description: &str) {
        self.current = description.to_string();
        self.bar.set_message(ui::truncate(description, MESSAGE_WIDTH));
    }

    fn on_step_complete(&mut self, index: usize, outcome: StepOutcome) {
        let line = format!("{}. {}", index + 1, self.current);
        match outcome {
            StepOutcome::Done => {}
            StepOutcome::Skipped => {
                if !self.quiet {
                    self.bar.suspend(|| println!("  {} {}", "○".dimmed(), line.dimmed()));
                }
            }
            StepOutcome::Failed => {
                self.failed = true;
                self.bar.suspend(|| eprintln!("  {} {}", "✗".red(), line));
            }
        }
        self.bar.inc(1);
    }

    fn on_finish(&mut self) {
        if self.failed {
            self.bar.abandon();
        } else {
            self.bar.finish_and_clear();
        }
    }
}
