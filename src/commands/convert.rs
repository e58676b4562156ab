//! Convert command - turn the running installation into JomOS
//!
//! Order of work: gather facts, derive tuning, load command lists, confirm,
//! patch the staging tree, then install and run every selected group.

use anyhow::{Context, Result, bail};
use colored::Colorize;
use conversion::{
    CommandLists, CommandPlanExecutor, ConfigPatcher, ExecutionRecord, GroupKind, Outcome,
    RunSummary, ShellRunner, gate,
};
use dialoguer::Input;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use super::{inspect_host, print_host, print_patch_report};
use crate::Context as AppContext;
use crate::cli::ConvertArgs;
use crate::config::{RunConfig, Settings};
use crate::progress::GroupProgress;
use crate::runner::SystemShell;
use crate::staging;
use crate::ui;

/// Word the user must type to start a conversion
const CONFIRM_WORD: &str = "Confirm";

/// How a convert run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Every group ran; individual commands may still have failed
    Completed(RunSummary),
    /// The confirmation was not typed exactly
    Declined,
}

pub fn run(ctx: &AppContext, config_path: Option<&Path>, args: ConvertArgs) -> Result<Completion> {
    let config = Settings::load(config_path)?.resolve(&args.flags);
    convert(ctx, &config, &SystemShell, args.yes)
}

/// Convert using `shell` for probing and for every command
fn convert<R: ShellRunner + ?Sized>(
    ctx: &AppContext,
    config: &RunConfig,
    shell: &R,
    yes: bool,
) -> Result<Completion> {
    let host = inspect_host(shell, config)?;
    let lists = CommandLists::load(&config.scripts_dir).with_context(|| {
        format!(
            "Failed to load command lists from {}",
            config.scripts_dir.display()
        )
    })?;

    if !ctx.quiet {
        ui::banner();
    }

    if !yes && !confirm()? {
        ui::warn("Confirmation not typed exactly. Nothing was changed.");
        log::warn!("Conversion declined at the confirmation prompt");
        return Ok(Completion::Declined);
    }

    log::info!(
        "Username: \"{}\", RAM: {} GiB, swappiness: {}, vfs_cache_pressure: {}",
        host.facts.username,
        host.tuning.ram_gb,
        host.tuning.swappiness,
        host.tuning.vfs_cache_pressure
    );
    if !ctx.quiet {
        print_host(&host);
    }

    let flags = config.flags;
    if flags.dry_run {
        ui::info("Dry run: no files will be written and no commands executed");
    }

    let plan = gate::resolve(&host.facts, &flags, &host.tuning);

    staging::prepare(&config.staging_root, &config.live_root, flags.dry_run)?;
    let patcher = ConfigPatcher::new(&config.staging_root)
        .with_preview(staging::preview(&config.live_root));
    let report = patcher.apply(&plan.edits, flags.dry_run);
    if !ctx.quiet {
        print_patch_report(&report, flags.dry_run || ctx.verbose > 0);
    }
    for (path, e) in report.failures() {
        log::error!("Config edit failed for {}: {e}", path.display());
    }

    let install = staging::install_group(&config.staging_root, &config.live_root)?;
    let installed = install_destinations(config)?;

    let mut groups = vec![install];
    groups.extend(plan.command_groups(&lists));

    let executor = CommandPlanExecutor::new(shell)
        .with_post_install(plan.post_install.clone(), ConfigPatcher::new(&config.live_root));
    let (records, summary) = executor
        .run_observed(groups, flags.dry_run, GroupProgress::new(ctx.quiet))
        .finish();

    if !flags.dry_run {
        staging::log_installed(&succeeded_installs(&records, &installed));
    }

    log::info!(
        "Run finished: {} succeeded, {} failed, {} planned",
        summary.succeeded,
        summary.failed,
        summary.planned
    );

    if !ctx.quiet {
        ui::print_summary(&summary);
        ui::section("Sysctl tweaks");
        for tweak in host.tuning.sysctl_tweaks() {
            println!("  {}", tweak.dimmed());
        }
        println!();
    }

    Ok(Completion::Completed(summary))
}

/// Ask for the confirmation word. Refuses to prompt without a terminal.
fn confirm() -> Result<bool> {
    if !std::io::stdin().is_terminal() {
        bail!("Refusing to convert without confirmation: stdin is not a terminal (pass --yes)");
    }

    let answer: String = Input::new()
        .with_prompt(format!("Type \"{CONFIRM_WORD}\" to continue"))
        .allow_empty(true)
        .interact_text()
        .context("Failed to read confirmation")?;

    Ok(is_confirmation(&answer))
}

fn is_confirmation(answer: &str) -> bool {
    answer == CONFIRM_WORD
}

/// Live paths the install group writes, in command order
fn install_destinations(config: &RunConfig) -> Result<Vec<PathBuf>> {
    let files = staging::staged_files(&config.staging_root)?;
    Ok(files
        .iter()
        .filter_map(|f| f.strip_prefix(&config.staging_root).ok())
        .map(|rel| config.live_root.join(rel))
        .collect())
}

/// Destinations whose install command succeeded
fn succeeded_installs(records: &[ExecutionRecord], destinations: &[PathBuf]) -> Vec<PathBuf> {
    records
        .iter()
        .filter(|r| r.group == GroupKind::Install.name())
        .zip(destinations)
        .filter(|(r, _)| r.outcome == Outcome::Succeeded)
        .map(|(_, dest)| dest.clone())
        .collect()
}
