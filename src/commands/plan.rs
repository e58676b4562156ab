//! Plan command - show what a conversion would do on this host

use anyhow::{Context, Result};
use colored::Colorize;
use conversion::{CommandLists, ConfigPatcher, Plan, gate};
use serde_json::json;
use std::path::Path;

use super::{Host, inspect_host, print_host, print_patch_report};
use crate::Context as AppContext;
use crate::cli::PlanArgs;
use crate::config::{RunConfig, Settings};
use crate::runner::SystemShell;
use crate::staging;
use crate::ui;

pub fn run(_ctx: &AppContext, config_path: Option<&Path>, args: PlanArgs) -> Result<()> {
    let config = Settings::load(config_path)?.resolve(&args.flags);
    let shell = SystemShell;
    let host = inspect_host(&shell, &config)?;
    let plan = gate::resolve(&host.facts, &config.flags, &host.tuning);

    // Missing lists only matter when converting
    let lists = match CommandLists::load(&config.scripts_dir) {
        Ok(lists) => Some(lists),
        Err(e) => {
            log::warn!("{e}");
            None
        }
    };

    if args.json {
        print_json(&host, &config, &plan, lists.as_ref())?;
        return Ok(());
    }

    print_host(&host);
    print_plan(&config, &plan, lists.as_ref());

    if args.diff {
        let patcher = ConfigPatcher::new(&config.staging_root)
            .with_preview(staging::preview(&config.live_root));
        print_patch_report(&patcher.apply(&plan.edits, true), true);
    }

    Ok(())
}

fn print_plan(config: &RunConfig, plan: &Plan, lists: Option<&CommandLists>) {
    ui::section("Flags");
    ui::kv("dry_run", &config.flags.dry_run.to_string());
    ui::kv("third_party_repos", &config.flags.third_party_repos.to_string());
    ui::kv("theming", &config.flags.theming.to_string());

    ui::section("Selected config edits");
    if plan.edits.is_empty() {
        ui::dim("none");
    }
    for entry in plan.edits.iter() {
        println!("  {} {}", entry.target.display().to_string().bold(), entry.describe());
    }

    ui::section("Command groups");
    match staging::staged_files(&config.staging_root) {
        Ok(files) => println!("  {} ({} staged files)", "install".bold(), files.len()),
        Err(e) => println!("  {} ({})", "install".bold(), e.to_string().red()),
    }
    for group in &plan.groups {
        let count = lists
            .and_then(|l| plan.command_groups(l).into_iter().find(|g| g.kind == *group))
            .map_or_else(|| "not loaded".to_string(), |g| format!("{} commands", g.len()));
        println!("  {} ({count})", group.name().bold());
    }

    ui::section("Post-install");
    if plan.post_install.is_empty() {
        ui::dim("none");
    }
    for entry in plan.post_install.iter() {
        println!("  {} {}", entry.target.display().to_string().bold(), entry.describe());
    }
    println!();
}

fn print_json(
    host: &Host,
    config: &RunConfig,
    plan: &Plan,
    lists: Option<&CommandLists>,
) -> Result<()> {
    let commands: serde_json::Map<String, serde_json::Value> = lists
        .map(|l| plan.command_groups(l))
        .unwrap_or_default()
        .into_iter()
        .map(|g| (g.name().to_string(), json!(g.commands)))
        .collect();

    let value = json!({
        "facts": host.facts,
        "tuning": host.tuning,
        "sysctl": host.tuning.sysctl_tweaks(),
        "flags": config.flags,
        "plan": plan,
        "commands": commands,
    });

    let out = serde_json::to_string_pretty(&value).context("Failed to serialize plan")?;
    println!("{out}");
    Ok(())
}
