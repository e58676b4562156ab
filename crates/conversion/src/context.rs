//! Collaborator traits
//!
//! These traits keep the engine free of process spawning and terminal
//! output. The CLI provides real implementations; tests provide stubs.

use crate::error::Result;
use crate::types::{CommandOutput, ExecutionRecord};

/// Executes shell command strings
///
/// Used both for read-only host probing and for the mutating commands of
/// a command plan. Implementations run the command to completion before
/// returning.
pub trait ShellRunner {
    /// Run a command line and capture its output
    fn run(&self, command: &str) -> Result<CommandOutput>;

    /// Run a command and return just success/failure
    fn run_status(&self, command: &str) -> Result<bool> {
        Ok(self.run(command)?.success)
    }

    /// Run a command and capture stdout with the trailing newline removed
    fn run_capture(&self, command: &str) -> Result<String> {
        let output = self.run(command)?;
        Ok(output.stdout_str().trim_end_matches('\n').to_string())
    }
}

impl<R: ShellRunner + ?Sized> ShellRunner for &R {
    fn run(&self, command: &str) -> Result<CommandOutput> {
        (**self).run(command)
    }
}

/// Receives notifications while a command plan runs
pub trait RunObserver {
    /// Called when a group starts
    fn on_group_start(&mut self, group: &str, count: usize);

    /// Called right before a step executes (or is planned in dry-run)
    fn on_step_start(&mut self, group: &str, command: &str);

    /// Called when a step completes
    fn on_step_complete(&mut self, record: &ExecutionRecord);
}

impl<O: RunObserver + ?Sized> RunObserver for &mut O {
    fn on_group_start(&mut self, group: &str, count: usize) {
        (**self).on_group_start(group, count);
    }

    fn on_step_start(&mut self, group: &str, command: &str) {
        (**self).on_step_start(group, command);
    }

    fn on_step_complete(&mut self, record: &ExecutionRecord) {
        (**self).on_step_complete(record);
    }
}

/// No-op observer
pub struct NoObserver;

impl RunObserver for NoObserver {
    fn on_group_start(&mut self, _group: &str, _count: usize) {}
    fn on_step_start(&mut self, _group: &str, _command: &str) {}
    fn on_step_complete(&mut self, _record: &ExecutionRecord) {}
}
