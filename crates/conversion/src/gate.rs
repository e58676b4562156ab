//! Capability gate - turns host facts and feature flags into a plan
//!
//! Every edit and command group the conversion knows about is listed here
//! with the [`Condition`] under which it applies. [`resolve`] keeps the
//! ones whose condition holds. Planning is pure: the same facts and flags
//! always produce the same plan, dry-run or not.

use crate::commands::{CommandGroup, CommandSource, GroupKind};
use crate::facts::HostFacts;
use crate::patcher::{EditEntry, EditPlan};
use crate::tuning::TuningValues;
use crate::types::FeatureFlags;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const MAKEPKG_CONF: &str = "etc/makepkg.conf";
pub const PACMAN_CONF: &str = "etc/pacman.conf";
pub const SYSCTL_CONF: &str = "etc/sysctl.d/99-jomos-settings.conf";
pub const MKINITCPIO_CONF: &str = "etc/mkinitcpio.conf";

/// Swappiness and cache pressure shipped in the sysctl drop-in
pub const SYSCTL_PLACEHOLDER: u32 = 50;

const CORE_REPO: &str = "[core]\nInclude = /etc/pacman.d/mirrorlist";
const CACHYOS_MARKER: &str = "[cachyos]";
const ACTIVE_COMPRESSION: &str = "(?m)^COMPRESSION=";
const MENU_LABEL_FROM: &str = "button-title=EndeavourOS";
const MENU_LABEL_TO: &str = "button-title=JomOS";

/// Predicate over host facts and feature flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Condition {
    Always,
    Theming,
    /// Theming enabled and a desktop menu file was found
    ThemingWithMenu,
    /// Third-party repos enabled on a v3-capable host
    ThirdPartyV3,
    /// Third-party repos enabled on a baseline host
    ThirdPartyGeneric,
}

impl Condition {
    pub fn holds(&self, facts: &HostFacts, flags: &FeatureFlags) -> bool {
        match self {
            Condition::Always => true,
            Condition::Theming => flags.theming,
            Condition::ThemingWithMenu => flags.theming && facts.menu_config.is_some(),
            Condition::ThirdPartyV3 => flags.third_party_repos && facts.supports_v3(),
            Condition::ThirdPartyGeneric => flags.third_party_repos && !facts.supports_v3(),
        }
    }
}

/// Everything a run will do, decided up front
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Edits to the staged configuration tree
    pub edits: EditPlan,
    /// File-backed command groups, in execution order
    pub groups: Vec<GroupKind>,
    /// Edits applied to the live system after all command groups
    pub post_install: EditPlan,
    pub dry_run: bool,
}

impl Plan {
    /// Look up the selected groups in a command source.
    ///
    /// A group the source does not have resolves to an empty group.
    pub fn command_groups<S: CommandSource + ?Sized>(&self, source: &S) -> Vec<CommandGroup> {
        self.groups
            .iter()
            .map(|&kind| {
                source.command_group(kind).cloned().unwrap_or_else(|| {
                    log::warn!("No command list loaded for group '{kind}'");
                    CommandGroup::new(kind, Vec::new())
                })
            })
            .collect()
    }

    /// The selected third-party repository group, if any
    pub fn repo_group(&self) -> Option<GroupKind> {
        self.groups.iter().copied().find(GroupKind::is_repo_group)
    }
}

/// Build the plan for this host
pub fn resolve(facts: &HostFacts, flags: &FeatureFlags, tuning: &TuningValues) -> Plan {
    let mut edits = EditPlan::new();
    for entry in edit_catalog(tuning) {
        if entry.condition.holds(facts, flags) {
            edits.push(entry);
        }
    }

    let groups = group_catalog()
        .into_iter()
        .filter(|(_, condition)| condition.holds(facts, flags))
        .map(|(kind, _)| kind)
        .collect();

    let mut post_install = EditPlan::new();
    if let Some(menu) = &facts.menu_config {
        let rename = menu_rename(menu.clone());
        if rename.condition.holds(facts, flags) {
            post_install.push(rename);
        }
    }

    let plan = Plan {
        edits,
        groups,
        post_install,
        dry_run: flags.dry_run,
    };
    log::debug!(
        "Resolved plan: {} edits, groups [{}], {} post-install adjustments",
        plan.edits.len(),
        plan.groups
            .iter()
            .map(GroupKind::name)
            .collect::<Vec<_>>()
            .join(", "),
        plan.post_install.len()
    );
    plan
}

/// Command groups in execution order with their conditions.
/// At most one of the repo groups can hold for any facts and flags.
fn group_catalog() -> [(GroupKind, Condition); 4] {
    [
        (GroupKind::Generic, Condition::Always),
        (GroupKind::ReposV3, Condition::ThirdPartyV3),
        (GroupKind::Repos, Condition::ThirdPartyGeneric),
        (GroupKind::Theming, Condition::Theming),
    ]
}

/// Every staged-config edit, rendered with this host's tuning values
fn edit_catalog(tuning: &TuningValues) -> Vec<EditEntry> {
    vec![
        EditEntry::literal(MAKEPKG_CONF, "#MAKEFLAGS=\"-j2\"", "MAKEFLAGS=\"-j$(nproc)\""),
        EditEntry::literal(
            SYSCTL_CONF,
            &format!("vm.swappiness = {SYSCTL_PLACEHOLDER}"),
            format!("vm.swappiness = {}", tuning.swappiness),
        ),
        EditEntry::literal(
            SYSCTL_CONF,
            &format!("vm.vfs_cache_pressure = {SYSCTL_PLACEHOLDER}"),
            format!("vm.vfs_cache_pressure = {}", tuning.vfs_cache_pressure),
        ),
        // An active COMPRESSION line is the one mkinitcpio reads
        EditEntry::pattern(
            MKINITCPIO_CONF,
            r#"(?m)^COMPRESSION="[^"]*""#,
            "COMPRESSION=\"zstd\"",
        ),
        EditEntry::pattern(
            MKINITCPIO_CONF,
            r#"(?m)^#COMPRESSION="[^"]*""#,
            "COMPRESSION=\"zstd\"",
        )
        .unless_matching(ACTIVE_COMPRESSION),
        EditEntry::literal(
            MKINITCPIO_CONF,
            "#COMPRESSION_OPTIONS=()",
            "COMPRESSION_OPTIONS=(-2)",
        ),
        EditEntry::literal(
            PACMAN_CONF,
            CORE_REPO,
            format!(
                "[cachyos-v3]\nInclude = /etc/pacman.d/cachyos-v3-mirrorlist\n\
                 [cachyos]\nInclude = /etc/pacman.d/cachyos-mirrorlist\n\n{CORE_REPO}"
            ),
        )
        .unless_present(CACHYOS_MARKER)
        .when(Condition::ThirdPartyV3),
        EditEntry::literal(
            PACMAN_CONF,
            CORE_REPO,
            format!("[cachyos]\nInclude = /etc/pacman.d/cachyos-mirrorlist\n\n{CORE_REPO}"),
        )
        .unless_present(CACHYOS_MARKER)
        .when(Condition::ThirdPartyGeneric),
    ]
}

fn menu_rename(menu: PathBuf) -> EditEntry {
    EditEntry::literal(menu, MENU_LABEL_FROM, MENU_LABEL_TO).when(Condition::ThemingWithMenu)
}
