//! Terminal progress for command groups.

use colored::Colorize;
use conversion::{ExecutionRecord, RunObserver};
use indicatif::{ProgressBar, ProgressStyle};

use crate::ui;

/// Width of the command text shown next to the bar
const MESSAGE_WIDTH: usize = 50;

/// Shows one progress bar per command group and prints a line per finished step
pub struct GroupProgress {
    bar: Option<ProgressBar>,
    quiet: bool,
}

impl GroupProgress {
    pub fn new(quiet: bool) -> Self {
        Self { bar: None, quiet }
    }

    fn finish_bar(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl RunObserver for GroupProgress {
    fn on_group_start(&mut self, group: &str, steps: usize) {
        self.finish_bar();
        if self.quiet {
            return;
        }

        ui::section(&format!("{group} ({steps})"));
        let bar = ProgressBar::new(steps as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|s| s.progress_chars("=>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        self.bar = Some(bar);
    }

    fn on_step_start(&mut self, _group: &str, command: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(ui::truncate(command, MESSAGE_WIDTH));
        }
    }

    fn on_step_complete(&mut self, record: &ExecutionRecord) {
        let line = format!(
            "  {} {}",
            ui::outcome_label(record.outcome),
            ui::truncate(&record.command, MESSAGE_WIDTH + 20)
        );
        let failure = if record.outcome.is_failure() {
            record.output.trim()
        } else {
            ""
        };

        let print = || {
            println!("{line}");
            for l in failure.lines().take(5) {
                println!("      {}", l.dimmed());
            }
        };

        match &self.bar {
            Some(bar) => {
                bar.suspend(print);
                bar.inc(1);
            }
            None if !self.quiet => print(),
            None => {}
        }
    }
}

impl Drop for GroupProgress {
    fn drop(&mut self) {
        self.finish_bar();
    }
}
