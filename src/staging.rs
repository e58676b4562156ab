//! Staging tree handling
//!
//! The staging root mirrors the live `/etc`. System configs are copied in,
//! patched there, then installed back onto the live root as the first
//! command group of a run.

use anyhow::{Context, Result};
use conversion::gate::{MAKEPKG_CONF, MKINITCPIO_CONF, PACMAN_CONF, SYSCTL_CONF};
use conversion::{CommandGroup, GroupKind};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::runner::shell_quote;

/// Live configs copied into the staging tree before patching
pub const COPIED_FROM_LIVE: [&str; 3] = [MAKEPKG_CONF, PACMAN_CONF, MKINITCPIO_CONF];

/// Sysctl drop-in with placeholder values, restaged on every run
const SYSCTL_TEMPLATE: &str = include_str!("../etc/sysctl.d/99-jomos-settings.conf");

/// Files longer than this are not echoed into the log after install
const MAX_LOGGED_FILE_LEN: usize = 2000;

/// Copy live configs into the staging tree and reset the sysctl drop-in
/// to its template.
///
/// A file that cannot be copied is logged and its stale staged copy
/// removed; the patcher will then report it. Does nothing in dry-run.
pub fn prepare(staging_root: &Path, live_root: &Path, dry_run: bool) -> Result<()> {
    if dry_run {
        log::info!(
            "Dry run: not copying live configs into {}",
            staging_root.display()
        );
        return Ok(());
    }

    for rel in COPIED_FROM_LIVE {
        let from = live_root.join(rel);
        let to = staging_root.join(rel);
        if let Err(e) = copy_file(&from, &to) {
            log::error!("Could not stage {}: {e:#}", from.display());
            if to.exists() {
                fs::remove_file(&to)
                    .with_context(|| format!("Failed to remove stale {}", to.display()))?;
            }
        }
    }

    let sysctl = staging_root.join(SYSCTL_CONF);
    if let Some(parent) = sysctl.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(&sysctl, SYSCTL_TEMPLATE)
        .with_context(|| format!("Failed to write {}", sysctl.display()))?;
    log::info!("Staged sysctl template at {}", sysctl.display());

    Ok(())
}

/// What `prepare` would stage, keyed by relative target, without writing.
///
/// Live configs that cannot be read are left out.
pub fn preview(live_root: &Path) -> BTreeMap<PathBuf, String> {
    let mut contents = BTreeMap::new();
    for rel in COPIED_FROM_LIVE {
        let from = live_root.join(rel);
        match fs::read_to_string(&from) {
            Ok(content) => {
                contents.insert(PathBuf::from(rel), content);
            }
            Err(e) => log::warn!("Could not read {}: {e}", from.display()),
        }
    }
    contents.insert(PathBuf::from(SYSCTL_CONF), SYSCTL_TEMPLATE.to_string());
    contents
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::copy(from, to).with_context(|| format!("Failed to copy to {}", to.display()))?;
    log::debug!("Staged {} -> {}", from.display(), to.display());
    Ok(())
}

/// Every regular file under `staging_root/etc`, sorted
pub fn staged_files(staging_root: &Path) -> Result<Vec<PathBuf>> {
    let etc = staging_root.join("etc");
    if !etc.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(&etc).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", etc.display()))?;
        let is_temp = entry.file_name().to_string_lossy().ends_with(".jomos-tmp");
        if entry.file_type().is_file() && !is_temp {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Command group installing every staged file onto the live root
pub fn install_group(staging_root: &Path, live_root: &Path) -> Result<CommandGroup> {
    let mut commands = Vec::new();
    for file in staged_files(staging_root)? {
        let rel = file
            .strip_prefix(staging_root)
            .with_context(|| format!("{} is outside the staging tree", file.display()))?;
        let dest = live_root.join(rel);
        commands.push(format!(
            "install -D -o root -g root -m 644 {} {}",
            shell_quote(&file.to_string_lossy()),
            shell_quote(&dest.to_string_lossy())
        ));
    }
    Ok(CommandGroup::new(GroupKind::Install, commands))
}

/// Log each installed file, with its content when it is short
pub fn log_installed(files: &[PathBuf]) {
    for file in files {
        match fs::read_to_string(file) {
            Ok(content) if content.len() < MAX_LOGGED_FILE_LEN => {
                log::info!("Installed file: {}\n{}", file.display(), content);
            }
            Ok(_) => log::info!("Installed file: {}\n(File too long to display)", file.display()),
            Err(e) => log::warn!("Installed file: {} (unreadable: {e})", file.display()),
        }
    }
}
