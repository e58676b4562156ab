// Core commands
pub mod convert;
pub mod plan;

use anyhow::{Context, Result};
use colored::Colorize;
use conversion::tuning::{self, TuningValues};
use conversion::{EditStatus, HostFacts, PatchReport, ShellRunner};

use crate::config::RunConfig;
use crate::probe::SystemProbe;
use crate::ui;

/// Facts and derived tuning for the host a run targets
pub struct Host {
    pub facts: HostFacts,
    pub tuning: TuningValues,
}

/// Probe the live root and derive tuning values. Both steps are fatal.
pub fn inspect_host<R: ShellRunner + ?Sized>(runner: &R, config: &RunConfig) -> Result<Host> {
    let probe = SystemProbe::new(runner, &config.live_root);
    let facts = HostFacts::gather(&probe).context("Failed to gather host facts")?;
    let tuning = tuning::compute(facts.ram_kb).context("Cannot derive memory tuning")?;
    Ok(Host { facts, tuning })
}

/// Print host facts and tuning values
pub fn print_host(host: &Host) {
    let facts = &host.facts;
    ui::header("Host");
    ui::kv("User", &facts.username);
    ui::kv("Home", &facts.home_dir.display().to_string());
    ui::kv(
        "RAM",
        &format!("{} GiB ({} kB)", host.tuning.ram_gb, facts.ram_kb),
    );
    ui::kv("Instruction set", &facts.instruction_set_tier.to_string());
    ui::kv("Swap", &facts.existing_swap.to_string());
    ui::kv("Zswap", if facts.zswap_enabled { "enabled" } else { "disabled" });
    ui::kv(
        "Menu config",
        &facts
            .menu_config
            .as_ref()
            .map_or_else(|| "none".to_string(), |p| p.display().to_string()),
    );

    ui::section("Tuning");
    ui::kv("vm.swappiness", &host.tuning.swappiness.to_string());
    ui::kv(
        "vm.vfs_cache_pressure",
        &host.tuning.vfs_cache_pressure.to_string(),
    );
}

/// Print what the patcher did per file, with diffs when asked
pub fn print_patch_report(report: &PatchReport, show_diffs: bool) {
    ui::section("Config edits");
    if report.files.is_empty() {
        ui::dim("No config edits selected");
        return;
    }

    for file in &report.files {
        let path = file.path.display().to_string();
        match &file.result {
            Ok(change) => {
                if change.is_changed() {
                    ui::success(&path);
                } else {
                    println!("{} {}", "·".dimmed(), path.dimmed());
                }
                for edit in &change.edits {
                    let status = match edit.status {
                        EditStatus::Applied => "applied".green(),
                        EditStatus::AlreadyApplied => "already applied".dimmed(),
                    };
                    println!("    {} ({status})", edit.description);
                }
                if show_diffs && let Some(diff) = &change.diff {
                    ui::print_diff(diff);
                }
            }
            Err(e) => ui::error(&format!("{path}: {e}")),
        }
    }
}
