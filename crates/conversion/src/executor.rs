//! Command plan executor - runs command groups best-effort, one at a time
//!
//! [`CommandPlanExecutor::run`] returns a [`CommandRun`], a lazy
//! forward-only iterator: each call to `next` executes exactly one step
//! and yields its [`ExecutionRecord`]. A failing step is recorded and the
//! sequence continues. The run consumes the executor, so real commands can
//! never be replayed by iterating twice.

use crate::commands::CommandGroup;
use crate::context::{NoObserver, RunObserver, ShellRunner};
use crate::patcher::{ConfigPatcher, EditEntry, EditPlan};
use crate::types::{ExecutionRecord, Outcome, RunSummary};
use std::collections::VecDeque;
use std::path::PathBuf;

/// Group name used for records of post-install adjustments
pub const POST_INSTALL_GROUP: &str = "post-install";

enum Step {
    Command {
        group: &'static str,
        group_len: usize,
        command: String,
    },
    Adjustment {
        group_len: usize,
        entry: EditEntry,
    },
}

impl Step {
    fn group(&self) -> &'static str {
        match self {
            Step::Command { group, .. } => *group,
            Step::Adjustment { .. } => POST_INSTALL_GROUP,
        }
    }

    fn group_len(&self) -> usize {
        match self {
            Step::Command { group_len, .. } | Step::Adjustment { group_len, .. } => *group_len,
        }
    }

    fn label(&self) -> String {
        match self {
            Step::Command { command, .. } => command.clone(),
            Step::Adjustment { entry, .. } => {
                format!("edit {}: {}", entry.target.display(), entry.describe())
            }
        }
    }
}

/// Runs command groups and post-install adjustments
pub struct CommandPlanExecutor<'a, R: ?Sized> {
    runner: &'a R,
    post_install: EditPlan,
    patcher: ConfigPatcher,
}

impl<'a, R: ShellRunner + ?Sized> CommandPlanExecutor<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        Self {
            runner,
            post_install: EditPlan::new(),
            patcher: ConfigPatcher::new(PathBuf::from("/")),
        }
    }

    /// Adjustments to apply after every command group, through `patcher`
    pub fn with_post_install(mut self, edits: EditPlan, patcher: ConfigPatcher) -> Self {
        self.post_install = edits;
        self.patcher = patcher;
        self
    }

    /// Start a run over `groups` in the given order
    pub fn run(self, groups: Vec<CommandGroup>, dry_run: bool) -> CommandRun<'a, R, NoObserver> {
        self.run_observed(groups, dry_run, NoObserver)
    }

    /// Start a run that reports progress to `observer`
    pub fn run_observed<O: RunObserver>(
        self,
        groups: Vec<CommandGroup>,
        dry_run: bool,
        observer: O,
    ) -> CommandRun<'a, R, O> {
        let mut steps = VecDeque::new();
        for group in groups {
            let group_len = group.len();
            let name = group.name();
            steps.extend(group.commands.into_iter().map(|command| Step::Command {
                group: name,
                group_len,
                command,
            }));
        }

        let group_len = self.post_install.len();
        steps.extend(
            self.post_install
                .entries
                .into_iter()
                .map(|entry| Step::Adjustment { group_len, entry }),
        );

        CommandRun {
            runner: self.runner,
            patcher: self.patcher,
            steps,
            dry_run,
            current_group: None,
            observer,
        }
    }
}

/// Lazy, single-pass sequence of execution records
pub struct CommandRun<'a, R: ?Sized, O> {
    runner: &'a R,
    patcher: ConfigPatcher,
    steps: VecDeque<Step>,
    dry_run: bool,
    current_group: Option<&'static str>,
    observer: O,
}

impl<R: ShellRunner + ?Sized, O: RunObserver> CommandRun<'_, R, O> {
    /// Steps not yet executed
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }

    /// Drain the run, returning every record and a summary
    pub fn finish(self) -> (Vec<ExecutionRecord>, RunSummary) {
        let mut summary = RunSummary::default();
        let records: Vec<ExecutionRecord> = self
            .inspect(|record| summary.add_record(record))
            .collect();
        (records, summary)
    }

    fn execute(&self, step: &Step) -> (Outcome, String) {
        if self.dry_run {
            log::info!("Would execute [{}]: {}", step.group(), step.label());
            return (Outcome::Planned, String::new());
        }

        match step {
            Step::Command { command, .. } => self.execute_command(command),
            Step::Adjustment { entry, .. } => self.execute_adjustment(entry),
        }
    }

    fn execute_command(&self, command: &str) -> (Outcome, String) {
        log::info!("Executing command: {command}");
        match self.runner.run(command) {
            Ok(output) if output.success => (Outcome::Succeeded, output.combined()),
            Ok(output) => {
                let text = output.combined();
                log::error!("Command failed: {command}: {text}");
                (Outcome::Failed, text)
            }
            Err(e) => {
                log::error!("Command failed: {command}: {e}");
                (Outcome::Failed, e.to_string())
            }
        }
    }

    fn execute_adjustment(&self, entry: &EditEntry) -> (Outcome, String) {
        let report = self.patcher.patch_file(&entry.target, &[entry], false);
        match report.result {
            Ok(change) if change.is_changed() => (Outcome::Succeeded, "modified".to_string()),
            Ok(_) => (Outcome::Succeeded, "already up to date".to_string()),
            Err(e) => (Outcome::Failed, e.to_string()),
        }
    }
}

impl<R: ShellRunner + ?Sized, O: RunObserver> Iterator for CommandRun<'_, R, O> {
    type Item = ExecutionRecord;

    fn next(&mut self) -> Option<ExecutionRecord> {
        let step = self.steps.pop_front()?;
        let group = step.group();

        if self.current_group != Some(group) {
            self.current_group = Some(group);
            self.observer.on_group_start(group, step.group_len());
        }

        let label = step.label();
        self.observer.on_step_start(group, &label);
        let (outcome, output) = self.execute(&step);

        let record = ExecutionRecord {
            group: group.to_string(),
            command: label,
            outcome,
            output,
        };
        self.observer.on_step_complete(&record);
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.steps.len(), Some(self.steps.len()))
    }
}
