//! Command groups and the line-delimited files they are loaded from

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Identifies a command group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupKind {
    /// Installs the patched staging tree onto the live root
    Install,
    Generic,
    Repos,
    ReposV3,
    Theming,
}

impl GroupKind {
    /// Groups backed by a command-list file, in load order
    pub const FILE_BACKED: [GroupKind; 4] = [
        GroupKind::Generic,
        GroupKind::Theming,
        GroupKind::Repos,
        GroupKind::ReposV3,
    ];

    /// Group name, also the command-list file name
    pub fn name(&self) -> &'static str {
        match self {
            GroupKind::Install => "install",
            GroupKind::Generic => "generic",
            GroupKind::Repos => "repos",
            GroupKind::ReposV3 => "repos-v3",
            GroupKind::Theming => "theming",
        }
    }

    /// Check if this is one of the third-party repository groups
    pub fn is_repo_group(&self) -> bool {
        matches!(self, GroupKind::Repos | GroupKind::ReposV3)
    }
}

impl std::fmt::Display for GroupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A named, ordered sequence of shell commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandGroup {
    pub kind: GroupKind,
    pub commands: Vec<String>,
}

impl CommandGroup {
    pub fn new(kind: GroupKind, commands: Vec<String>) -> Self {
        Self { kind, commands }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Supplies command groups by kind
pub trait CommandSource {
    /// Get the loaded group for a kind, if the source has one
    fn command_group(&self, kind: GroupKind) -> Option<&CommandGroup>;
}

/// The four command lists, loaded once at startup
#[derive(Debug, Clone, Default)]
pub struct CommandLists {
    groups: Vec<CommandGroup>,
}

impl CommandLists {
    /// Load every file-backed list from `dir`.
    ///
    /// A missing or unreadable list is fatal.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut groups = Vec::with_capacity(GroupKind::FILE_BACKED.len());
        for kind in GroupKind::FILE_BACKED {
            let path = dir.join(kind.name());
            let content = fs::read_to_string(&path).map_err(|source| Error::CommandList {
                name: kind.name().to_string(),
                path: path.clone(),
                source,
            })?;
            let commands = parse_command_list(&content);
            log::debug!("Loaded {} commands from {}", commands.len(), path.display());
            groups.push(CommandGroup::new(kind, commands));
        }
        Ok(Self { groups })
    }

    /// Build from already-loaded groups
    pub fn from_groups(groups: Vec<CommandGroup>) -> Self {
        Self { groups }
    }
}

impl CommandSource for CommandLists {
    fn command_group(&self, kind: GroupKind) -> Option<&CommandGroup> {
        self.groups.iter().find(|g| g.kind == kind)
    }
}

/// Split a command-list file into commands.
///
/// One command per line; blank lines and `#` comments are skipped.
pub fn parse_command_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(ToString::to_string)
        .collect()
}
