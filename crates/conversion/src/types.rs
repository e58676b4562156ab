//! Core types shared across the conversion engine

use serde::{Deserialize, Serialize};
use std::process::Output;

/// User-selected switches, fixed for the duration of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Compute and report everything, mutate nothing
    pub dry_run: bool,
    /// Add third-party repositories and the matching pacman mirror edit
    pub third_party_repos: bool,
    /// Run theming commands and rename the desktop menu label
    pub theming: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            dry_run: false,
            third_party_repos: true,
            theming: true,
        }
    }
}

/// Output from a shell command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub success: bool,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: output.stdout,
            stderr: output.stderr,
            success: output.status.success(),
        }
    }
}

impl CommandOutput {
    /// Successful output with the given stdout (handy for stubs)
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into().into_bytes(),
            stderr: Vec::new(),
            success: true,
        }
    }

    /// Failed output with the given stderr
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            stdout: Vec::new(),
            stderr: stderr.into().into_bytes(),
            success: false,
        }
    }

    /// Get stdout as a string
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Get stderr as a string
    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    /// Stdout and stderr joined, trimmed of trailing newlines
    pub fn combined(&self) -> String {
        let stdout = self.stdout_str();
        let stderr = self.stderr_str();
        let joined = match (stdout.trim_end().is_empty(), stderr.trim_end().is_empty()) {
            (false, false) => format!("{}\n{}", stdout.trim_end(), stderr.trim_end()),
            (false, true) => stdout,
            (true, false) => stderr,
            (true, true) => String::new(),
        };
        joined.trim_end_matches('\n').to_string()
    }
}

/// Outcome of a single planned step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Succeeded,
    Failed,
    /// Dry run: the step would have run
    Planned,
}

impl Outcome {
    /// Check if the outcome represents a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Planned => "planned",
        };
        f.write_str(label)
    }
}

/// What happened to one command (or post-install adjustment) in a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Name of the group the step belongs to
    pub group: String,
    /// Command text or adjustment description
    pub command: String,
    pub outcome: Outcome,
    /// Captured stdout/stderr (empty for planned steps)
    pub output: String,
}

/// Summary of execution records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub planned: usize,
}

impl RunSummary {
    /// Total number of steps seen
    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.planned
    }

    /// Check if the run had no failures
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Add a record to the summary
    pub fn add_record(&mut self, record: &ExecutionRecord) {
        match record.outcome {
            Outcome::Succeeded => self.succeeded += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Planned => self.planned += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(outcome: Outcome) -> ExecutionRecord {
        ExecutionRecord {
            group: "generic".to_string(),
            command: "true".to_string(),
            outcome,
            output: String::new(),
        }
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = RunSummary::default();
        summary.add_record(&record(Outcome::Succeeded));
        summary.add_record(&record(Outcome::Failed));
        summary.add_record(&record(Outcome::Planned));
        summary.add_record(&record(Outcome::Planned));

        assert_eq!(summary.total(), 4);
        assert_eq!(summary.planned, 2);
        assert!(!summary.is_success());
    }

    #[test]
    fn test_combined_output() {
        assert_eq!(CommandOutput::ok("hello\n").combined(), "hello");
        assert_eq!(CommandOutput::failed("boom\n").combined(), "boom");
        let both = CommandOutput {
            stdout: b"out\n".to_vec(),
            stderr: b"err\n".to_vec(),
            success: false,
        };
        assert_eq!(both.combined(), "out\nerr");
        assert_eq!(CommandOutput::default().combined(), "");
    }

    #[test]
    fn test_default_flags() {
        let flags = FeatureFlags::default();
        assert!(!flags.dry_run);
        assert!(flags.third_party_repos);
        assert!(flags.theming);
    }
}
