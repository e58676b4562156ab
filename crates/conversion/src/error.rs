//! Error types for the conversion engine.
//!
//! Fatal errors ([`Error`]) abort a run. Per-file edit failures
//! ([`EditError`]) are recorded in a patch report and never abort.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a conversion run.
#[derive(Debug, Error)]
pub enum Error {
    /// Installed RAM is below 1 GiB, so tuning values are undefined
    #[error("installed RAM is below 1 GiB ({ram_kb} kB); tuning values are undefined")]
    RamTooLow {
        /// Measured RAM in kilobytes
        ram_kb: u64,
    },

    /// `/proc/meminfo` (or equivalent) could not be parsed
    #[error("could not parse memory information: {0}")]
    InvalidMemInfo(String),

    /// A required command-list file could not be read
    #[error("could not read command list '{name}' at {path}")]
    CommandList {
        /// Command-list name (generic, theming, repos, repos-v3)
        name: String,
        /// Path that was read
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// A shell command could not be spawned at all
    #[error("failed to execute `{command}`: {message}")]
    Spawn {
        /// Command text
        command: String,
        /// Reason reported by the OS
        message: String,
    },

    /// A host probe failed
    #[error("host probe failed: {0}")]
    Probe(String),
}

/// Errors that prevent a single configuration file from being patched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// File could not be read
    #[error("could not read {path}: {message}")]
    Read {
        /// File path
        path: PathBuf,
        /// Reason
        message: String,
    },

    /// File could not be written back
    #[error("could not write {path}: {message}")]
    Write {
        /// File path
        path: PathBuf,
        /// Reason
        message: String,
    },

    /// A pattern matcher did not compile
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern {
        /// Pattern source
        pattern: String,
        /// Compiler message
        message: String,
    },
}

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let low = Error::RamTooLow { ram_kb: 512 };
        assert!(low.to_string().contains("512 kB"));

        let list = Error::CommandList {
            name: "repos-v3".to_string(),
            path: PathBuf::from("scripts/repos-v3"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(list.to_string().contains("'repos-v3'"));
        assert!(std::error::Error::source(&list).is_some());
    }

    #[test]
    fn test_edit_error_names_file() {
        let err = EditError::Write {
            path: PathBuf::from("/etc/pacman.conf"),
            message: "read-only".to_string(),
        };
        assert_eq!(err.to_string(), "could not write /etc/pacman.conf: read-only");
    }
}
