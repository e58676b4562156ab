//! Idempotent text edits on staged configuration files
//!
//! Edits are grouped per file and computed against an in-memory copy. A
//! file is written back only when every edit for it succeeded, so a bad
//! edit leaves that file untouched while the rest of the plan proceeds.
//! An edit whose matcher no longer matches is treated as already applied,
//! which makes re-running a conversion harmless.

use crate::error::EditError;
use crate::gate::Condition;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// How an edit finds the text it replaces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Matcher {
    /// Exact substring, first occurrence
    Literal(String),
    /// Regular expression, first match; `$n` groups allowed in the replacement
    Pattern(String),
}

impl Matcher {
    fn source(&self) -> &str {
        match self {
            Matcher::Literal(s) | Matcher::Pattern(s) => s,
        }
    }

    /// Whether the matcher finds anything in `content`
    fn is_found_in(&self, content: &str) -> Result<bool, EditError> {
        match self {
            Matcher::Literal(s) => Ok(content.contains(s.as_str())),
            Matcher::Pattern(p) => Ok(compile(p)?.is_match(content)),
        }
    }
}

fn compile(pattern: &str) -> Result<Regex, EditError> {
    Regex::new(pattern).map_err(|e| EditError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// One conditional substitution in a configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditEntry {
    /// File to edit; relative paths resolve against the patcher root
    pub target: PathBuf,
    pub matcher: Matcher,
    /// Rendered replacement text
    pub replacement: String,
    /// Treat the edit as already applied when this matcher finds something
    pub unless: Option<Matcher>,
    /// Predicate the gate evaluated to include this entry
    pub condition: Condition,
}

impl EditEntry {
    /// Literal substitution that always applies
    pub fn literal(target: impl Into<PathBuf>, from: &str, to: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            matcher: Matcher::Literal(from.to_string()),
            replacement: to.into(),
            unless: None,
            condition: Condition::Always,
        }
    }

    /// Regex substitution that always applies
    pub fn pattern(target: impl Into<PathBuf>, pattern: &str, to: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            matcher: Matcher::Pattern(pattern.to_string()),
            replacement: to.into(),
            unless: None,
            condition: Condition::Always,
        }
    }

    /// Skip the edit when the file already contains `marker`
    pub fn unless_present(mut self, marker: impl Into<String>) -> Self {
        self.unless = Some(Matcher::Literal(marker.into()));
        self
    }

    /// Skip the edit when `pattern` matches anywhere in the file
    pub fn unless_matching(mut self, pattern: &str) -> Self {
        self.unless = Some(Matcher::Pattern(pattern.to_string()));
        self
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    /// One-line description for logs: `'from' -> 'to'`
    pub fn describe(&self) -> String {
        format!(
            "'{}' -> '{}'",
            first_line(self.matcher.source()),
            first_line(&self.replacement)
        )
    }

    /// Apply the edit to `content`, returning the new content if it changed
    fn apply_to(&self, content: &str) -> Result<Option<String>, EditError> {
        if let Some(guard) = &self.unless
            && guard.is_found_in(content)?
        {
            return Ok(None);
        }

        let updated = match &self.matcher {
            Matcher::Literal(from) => {
                if !content.contains(from.as_str()) {
                    return Ok(None);
                }
                content.replacen(from.as_str(), &self.replacement, 1)
            }
            Matcher::Pattern(pattern) => compile(pattern)?
                .replace(content, self.replacement.as_str())
                .into_owned(),
        };

        Ok((updated != content).then_some(updated))
    }
}

fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or("")
}

/// Ordered list of edits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditPlan {
    pub entries: Vec<EditEntry>,
}

impl EditPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: EditEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EditEntry> {
        self.entries.iter()
    }

    /// Distinct targets in first-appearance order
    pub fn targets(&self) -> Vec<&Path> {
        let mut targets: Vec<&Path> = Vec::new();
        for entry in &self.entries {
            if !targets.contains(&entry.target.as_path()) {
                targets.push(&entry.target);
            }
        }
        targets
    }

    /// Entries for one target, in plan order
    pub fn entries_for(&self, target: &Path) -> Vec<&EditEntry> {
        self.entries.iter().filter(|e| e.target == target).collect()
    }
}

/// Per-edit result inside a successfully processed file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EditStatus {
    Applied,
    /// Matcher absent or marker present; nothing to do
    AlreadyApplied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub description: String,
    pub status: EditStatus,
}

/// What happened to a file whose edits all succeeded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub edits: Vec<EditOutcome>,
    /// Unified diff of the staged change, if any
    pub diff: Option<String>,
    /// Whether new content was written to disk
    pub written: bool,
}

impl FileChange {
    /// Check if any edit changed the content
    pub fn is_changed(&self) -> bool {
        self.edits.iter().any(|e| e.status == EditStatus::Applied)
    }
}

/// Result for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    pub result: Result<FileChange, EditError>,
}

/// Aggregated results of applying an edit plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchReport {
    pub files: Vec<FileReport>,
}

impl PatchReport {
    /// Files that failed, with their errors
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &EditError)> {
        self.files.iter().filter_map(|f| match &f.result {
            Ok(_) => None,
            Err(e) => Some((f.path.as_path(), e)),
        })
    }

    /// Files whose content changed (or would change, in dry-run)
    pub fn changed_files(&self) -> Vec<&Path> {
        self.files
            .iter()
            .filter(|f| matches!(&f.result, Ok(change) if change.is_changed()))
            .map(|f| f.path.as_path())
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Applies edit plans to files under a root directory
#[derive(Debug, Clone)]
pub struct ConfigPatcher {
    root: PathBuf,
    /// Dry-run contents by target, in place of the files under `root`
    preview: Option<BTreeMap<PathBuf, String>>,
}

impl ConfigPatcher {
    /// Patch files under `root` (the staging tree)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            preview: None,
        }
    }

    /// In dry-run, read every target from `contents` instead of the root.
    ///
    /// `contents` is what the root would hold once staged. A target it
    /// lacks fails to read, as it would in a real run.
    pub fn with_preview(mut self, contents: BTreeMap<PathBuf, String>) -> Self {
        self.preview = Some(contents);
        self
    }

    /// Resolve a target against the root. Absolute targets are used as-is.
    pub fn resolve(&self, target: &Path) -> PathBuf {
        self.root.join(target)
    }

    /// Apply every entry of the plan, one file at a time
    pub fn apply(&self, plan: &EditPlan, dry_run: bool) -> PatchReport {
        let files = plan
            .targets()
            .into_iter()
            .map(|target| self.patch_file(target, &plan.entries_for(target), dry_run))
            .collect();
        PatchReport { files }
    }

    /// Apply `edits` to a single file
    pub fn patch_file(&self, target: &Path, edits: &[&EditEntry], dry_run: bool) -> FileReport {
        let path = self.resolve(target);
        let result = self.patch_resolved(&path, target, edits, dry_run);
        if let Err(e) = &result {
            log::error!("Skipping {}: {e}", path.display());
        }
        FileReport { path, result }
    }

    fn patch_resolved(
        &self,
        path: &Path,
        target: &Path,
        edits: &[&EditEntry],
        dry_run: bool,
    ) -> Result<FileChange, EditError> {
        let original = self.read_source(path, target, dry_run)?;

        let mut staged = original.clone();
        let mut outcomes = Vec::with_capacity(edits.len());
        for entry in edits {
            let status = match entry.apply_to(&staged)? {
                Some(updated) => {
                    staged = updated;
                    EditStatus::Applied
                }
                None => EditStatus::AlreadyApplied,
            };
            outcomes.push(EditOutcome {
                description: entry.describe(),
                status,
            });
        }

        if staged == original {
            log::info!("{} already up to date", path.display());
            return Ok(FileChange {
                edits: outcomes,
                diff: None,
                written: false,
            });
        }

        for outcome in outcomes.iter().filter(|o| o.status == EditStatus::Applied) {
            if dry_run {
                log::info!("Would patch {}: {}", path.display(), outcome.description);
            } else {
                log::info!("Patching {}: {}", path.display(), outcome.description);
            }
        }

        let diff = unified_diff(path, &original, &staged);

        if dry_run {
            return Ok(FileChange {
                edits: outcomes,
                diff: Some(diff),
                written: false,
            });
        }

        write_replacing(path, &staged)?;
        log::info!("File {} modified", path.display());

        Ok(FileChange {
            edits: outcomes,
            diff: Some(diff),
            written: true,
        })
    }

    fn read_source(&self, path: &Path, target: &Path, dry_run: bool) -> Result<String, EditError> {
        if let Some(preview) = self.preview.as_ref().filter(|_| dry_run) {
            return preview.get(target).cloned().ok_or_else(|| EditError::Read {
                path: path.to_path_buf(),
                message: "no staged copy would exist".to_string(),
            });
        }

        fs::read_to_string(path).map_err(|e| EditError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Write via a sibling temp file renamed over the target
fn write_replacing(path: &Path, content: &str) -> Result<(), EditError> {
    let write_err = |e: std::io::Error| EditError::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{file_name}.jomos-tmp"));

    fs::write(&tmp, content).map_err(write_err)?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        write_err(e)
    })
}

fn unified_diff(path: &Path, old: &str, new: &str) -> String {
    let name = path.display().to_string();
    similar::TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(2)
        .header(&name, &name)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MAKEPKG: &str = "CFLAGS=\"-O2\"\n#MAKEFLAGS=\"-j2\"\nDEBUG_CFLAGS=\"-g\"\n";
    const PACMAN: &str = "[options]\nParallelDownloads = 5\n\n[core]\nInclude = /etc/pacman.d/mirrorlist\n";

    fn staging(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        dir
    }

    fn read(dir: &TempDir, name: &str) -> String {
        fs::read_to_string(dir.path().join(name)).unwrap()
    }

    fn makeflags() -> EditEntry {
        EditEntry::literal("etc/makepkg.conf", "#MAKEFLAGS=\"-j2\"", "MAKEFLAGS=\"-j$(nproc)\"")
    }

    fn mirror() -> EditEntry {
        EditEntry::literal(
            "etc/pacman.conf",
            "[core]\nInclude = /etc/pacman.d/mirrorlist",
            "[cachyos]\nInclude = /etc/pacman.d/cachyos-mirrorlist\n\n[core]\nInclude = /etc/pacman.d/mirrorlist",
        )
        .unless_present("[cachyos]")
    }

    #[test]
    fn test_literal_edit_applied() {
        let dir = staging(&[("etc/makepkg.conf", MAKEPKG)]);
        let mut plan = EditPlan::new();
        plan.push(makeflags());

        let report = ConfigPatcher::new(dir.path()).apply(&plan, false);

        assert!(report.is_success());
        assert_eq!(report.changed_files().len(), 1);
        let content = read(&dir, "etc/makepkg.conf");
        assert!(content.contains("\nMAKEFLAGS=\"-j$(nproc)\"\n"));
        assert!(!content.contains("#MAKEFLAGS"));
    }

    #[test]
    fn test_second_apply_is_noop() {
        let dir = staging(&[("etc/makepkg.conf", MAKEPKG), ("etc/pacman.conf", PACMAN)]);
        let mut plan = EditPlan::new();
        plan.push(makeflags());
        plan.push(mirror());
        let patcher = ConfigPatcher::new(dir.path());

        patcher.apply(&plan, false);
        let once_makepkg = read(&dir, "etc/makepkg.conf");
        let once_pacman = read(&dir, "etc/pacman.conf");

        let second = patcher.apply(&plan, false);

        assert!(second.is_success());
        assert!(second.changed_files().is_empty());
        assert_eq!(read(&dir, "etc/makepkg.conf"), once_makepkg);
        assert_eq!(read(&dir, "etc/pacman.conf"), once_pacman);
        assert_eq!(once_pacman.matches("[cachyos]").count(), 1);
        for file in &second.files {
            let change = file.result.as_ref().unwrap();
            assert!(!change.written);
            assert!(change.edits.iter().all(|e| e.status == EditStatus::AlreadyApplied));
        }
    }

    fn compression_plan() -> EditPlan {
        let mut plan = EditPlan::new();
        plan.push(EditEntry::pattern(
            "etc/mkinitcpio.conf",
            r#"(?m)^COMPRESSION="[^"]*""#,
            "COMPRESSION=\"zstd\"",
        ));
        plan.push(
            EditEntry::pattern(
                "etc/mkinitcpio.conf",
                r#"(?m)^#COMPRESSION="[^"]*""#,
                "COMPRESSION=\"zstd\"",
            )
            .unless_matching("(?m)^COMPRESSION="),
        );
        plan.push(EditEntry::literal(
            "etc/mkinitcpio.conf",
            "#COMPRESSION_OPTIONS=()",
            "COMPRESSION_OPTIONS=(-2)",
        ));
        plan
    }

    #[test]
    fn test_pattern_edit() {
        let content = "#COMPRESSION=\"gzip\"\n#COMPRESSION=\"bzip2\"\n#COMPRESSION_OPTIONS=()\n";
        let dir = staging(&[("etc/mkinitcpio.conf", content)]);
        let plan = compression_plan();
        let patcher = ConfigPatcher::new(dir.path());

        patcher.apply(&plan, false);
        let patched = read(&dir, "etc/mkinitcpio.conf");
        assert_eq!(
            patched,
            "COMPRESSION=\"zstd\"\n#COMPRESSION=\"bzip2\"\nCOMPRESSION_OPTIONS=(-2)\n"
        );

        let again = patcher.apply(&plan, false);
        assert!(again.changed_files().is_empty());
        assert_eq!(read(&dir, "etc/mkinitcpio.conf"), patched);
    }

    #[test]
    fn test_pattern_edit_rewrites_effective_line() {
        let content = "#COMPRESSION=\"gzip\"\n#COMPRESSION=\"bzip2\"\nCOMPRESSION=\"lz4\"\n";
        let dir = staging(&[("etc/mkinitcpio.conf", content)]);
        let plan = compression_plan();
        let patcher = ConfigPatcher::new(dir.path());

        patcher.apply(&plan, false);
        let patched = read(&dir, "etc/mkinitcpio.conf");
        assert_eq!(
            patched,
            "#COMPRESSION=\"gzip\"\n#COMPRESSION=\"bzip2\"\nCOMPRESSION=\"zstd\"\n"
        );

        let again = patcher.apply(&plan, false);
        assert!(again.changed_files().is_empty());
        assert_eq!(read(&dir, "etc/mkinitcpio.conf"), patched);
    }

    #[test]
    fn test_failed_edit_leaves_file_untouched() {
        let dir = staging(&[("etc/makepkg.conf", MAKEPKG), ("etc/pacman.conf", PACMAN)]);
        let mut plan = EditPlan::new();
        plan.push(makeflags());
        plan.push(EditEntry::pattern("etc/makepkg.conf", "(unclosed", "x"));
        plan.push(mirror());

        let report = ConfigPatcher::new(dir.path()).apply(&plan, false);

        assert!(!report.is_success());
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0].1, EditError::InvalidPattern { .. }));
        // The makepkg edit that succeeded in memory was not written
        assert_eq!(read(&dir, "etc/makepkg.conf"), MAKEPKG);
        // The independent pacman edit still ran
        assert!(read(&dir, "etc/pacman.conf").contains("[cachyos]"));
    }

    #[test]
    fn test_missing_file_does_not_stop_others() {
        let dir = staging(&[("etc/makepkg.conf", MAKEPKG)]);
        let mut plan = EditPlan::new();
        plan.push(mirror());
        plan.push(makeflags());

        let report = ConfigPatcher::new(dir.path()).apply(&plan, false);

        assert_eq!(report.files.len(), 2);
        assert!(matches!(report.files[0].result, Err(EditError::Read { .. })));
        assert!(report.files[1].result.is_ok());
        assert!(read(&dir, "etc/makepkg.conf").contains("MAKEFLAGS=\"-j$(nproc)\""));
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let dir = staging(&[("etc/makepkg.conf", MAKEPKG)]);
        let mut plan = EditPlan::new();
        plan.push(makeflags());

        let report = ConfigPatcher::new(dir.path()).apply(&plan, true);

        assert_eq!(read(&dir, "etc/makepkg.conf"), MAKEPKG);
        let change = report.files[0].result.as_ref().unwrap();
        assert!(!change.written);
        assert!(change.is_changed());
        let diff = change.diff.as_deref().unwrap();
        assert!(diff.contains("-#MAKEFLAGS=\"-j2\""));
        assert!(diff.contains("+MAKEFLAGS=\"-j$(nproc)\""));
        // No temp files left behind either
        assert_eq!(fs::read_dir(dir.path().join("etc")).unwrap().count(), 1);
    }

    #[test]
    fn test_dry_run_reads_preview_over_stale_copy() {
        // Leftover copy from an earlier run, already patched
        let stale = MAKEPKG.replace("#MAKEFLAGS=\"-j2\"", "MAKEFLAGS=\"-j$(nproc)\"");
        let dir = staging(&[("etc/makepkg.conf", stale.as_str())]);
        let mut plan = EditPlan::new();
        plan.push(makeflags());
        plan.push(mirror());

        let preview =
            BTreeMap::from([(PathBuf::from("etc/makepkg.conf"), MAKEPKG.to_string())]);
        let patcher = ConfigPatcher::new(dir.path()).with_preview(preview);
        let report = patcher.apply(&plan, true);

        assert_eq!(report.files.len(), 2);
        let change = report.files[0].result.as_ref().unwrap();
        assert!(change.is_changed());
        assert!(change.diff.as_deref().unwrap().contains("-#MAKEFLAGS=\"-j2\""));
        // Not in the preview, so it would not be staged either
        assert!(matches!(report.files[1].result, Err(EditError::Read { .. })));
        assert_eq!(read(&dir, "etc/makepkg.conf"), stale);

        // Outside dry-run the staged copy is what counts
        let report = patcher.apply(&plan, false);
        assert!(report.changed_files().is_empty());
    }

    #[test]
    fn test_guard_pattern_skips_edit() {
        let dir = staging(&[(
            "etc/mkinitcpio.conf",
            "#COMPRESSION=\"gzip\"\nCOMPRESSION=\"lz4\"\n",
        )]);
        let mut plan = EditPlan::new();
        plan.push(
            EditEntry::pattern("etc/mkinitcpio.conf", r#"(?m)^#COMPRESSION="[^"]*""#, "X")
                .unless_matching("(?m)^COMPRESSION="),
        );

        let report = ConfigPatcher::new(dir.path()).apply(&plan, false);

        let change = report.files[0].result.as_ref().unwrap();
        assert_eq!(change.edits[0].status, EditStatus::AlreadyApplied);
        assert!(!change.written);
    }

    #[test]
    fn test_invalid_guard_pattern_fails_file() {
        let dir = staging(&[("etc/makepkg.conf", MAKEPKG)]);
        let mut plan = EditPlan::new();
        plan.push(makeflags().unless_matching("(oops"));

        let report = ConfigPatcher::new(dir.path()).apply(&plan, false);

        assert!(matches!(
            report.files[0].result,
            Err(EditError::InvalidPattern { .. })
        ));
        assert_eq!(read(&dir, "etc/makepkg.conf"), MAKEPKG);
    }

    #[test]
    fn test_targets_keep_first_appearance_order() {
        let mut plan = EditPlan::new();
        plan.push(mirror());
        plan.push(makeflags());
        plan.push(mirror());
        let targets = plan.targets();
        assert_eq!(
            targets,
            vec![Path::new("etc/pacman.conf"), Path::new("etc/makepkg.conf")]
        );
        assert_eq!(plan.entries_for(Path::new("etc/pacman.conf")).len(), 2);
    }

    #[test]
    fn test_describe_uses_first_lines() {
        assert_eq!(
            mirror().describe(),
            "'[core]' -> '[cachyos]'"
        );
    }
}
