//! Live host probe
//!
//! Reads /proc and /sys directly and shells out for the dynamic loader,
//! `swapon` and `whoami`. All paths hang off a root so tests can point the
//! probe at a fake tree.

use conversion::facts::{
    parse_instruction_tier, parse_meminfo, parse_swap_summary, parse_zswap_state,
};
use conversion::{Error, HostProbe, InstructionSetTier, Result, ShellRunner, SwapKind};
use std::fs;
use std::path::{Path, PathBuf};

const LOADER_HELP: &str = "/lib/ld-linux-x86-64.so.2 --help";
const LIVE_USER: &str = "liveuser";
const MENU_DIR: &str = ".config/xfce4/panel";

pub struct SystemProbe<'a, R: ShellRunner + ?Sized> {
    runner: &'a R,
    root: PathBuf,
    /// Invoking user when running under sudo
    sudo_user: Option<String>,
}

impl<'a, R: ShellRunner + ?Sized> SystemProbe<'a, R> {
    pub fn new(runner: &'a R, root: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            root: root.into(),
            sudo_user: std::env::var("SUDO_USER")
                .ok()
                .filter(|u| !u.is_empty() && u != "root"),
        }
    }

    fn read(&self, rel: &str) -> Result<String> {
        let path = self.root.join(rel);
        fs::read_to_string(&path)
            .map_err(|e| Error::Probe(format!("could not read {}: {e}", path.display())))
    }
}

impl<R: ShellRunner + ?Sized> HostProbe for SystemProbe<'_, R> {
    fn measure_ram(&self) -> Result<u64> {
        parse_meminfo(&self.read("proc/meminfo")?)
    }

    fn detect_instruction_tier(&self) -> Result<InstructionSetTier> {
        let output = self.runner.run(LOADER_HELP)?;
        Ok(parse_instruction_tier(&output.stdout_str()))
    }

    fn detect_swap_state(&self) -> Result<SwapKind> {
        let output = self.runner.run("swapon -s")?;
        if !output.success {
            return Err(Error::Probe(format!(
                "swapon failed: {}",
                output.stderr_str().trim()
            )));
        }
        Ok(parse_swap_summary(&output.stdout_str()))
    }

    fn detect_zswap_state(&self) -> Result<bool> {
        Ok(parse_zswap_state(
            &self.read("sys/module/zswap/parameters/enabled")?,
        ))
    }

    fn detect_user(&self) -> Result<(String, PathBuf)> {
        let home_root = self.root.join("home");

        let username = if home_root.join(LIVE_USER).exists() {
            LIVE_USER.to_string()
        } else if let Some(user) = &self.sudo_user {
            user.clone()
        } else {
            self.runner.run_capture("whoami")?.trim().to_string()
        };

        if username.is_empty() {
            return Err(Error::Probe("could not determine the target user".to_string()));
        }

        let home = home_root.join(&username);
        Ok((username, home))
    }

    fn locate_menu_config(&self, home: &Path) -> Option<PathBuf> {
        let dir = home.join(MENU_DIR);
        let mut found: Vec<PathBuf> = fs::read_dir(&dir)
            .ok()?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("whiskermenu-") && n.ends_with(".rc"))
            })
            .collect();
        found.sort();
        found.into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conversion::{CommandOutput, HostFacts};
    use tempfile::TempDir;

    /// Answers fixed output per command prefix
    struct CannedShell {
        answers: Vec<(&'static str, CommandOutput)>,
    }

    impl ShellRunner for CannedShell {
        fn run(&self, command: &str) -> Result<CommandOutput> {
            self.answers
                .iter()
                .find(|(prefix, _)| command.starts_with(prefix))
                .map(|(_, out)| out.clone())
                .ok_or_else(|| Error::Spawn {
                    command: command.to_string(),
                    message: "not found".to_string(),
                })
        }
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn fake_host() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "proc/meminfo", "MemTotal:        8052656 kB\nMemFree: 1 kB\n");
        write(dir.path(), "sys/module/zswap/parameters/enabled", "N\n");
        dir
    }

    fn shell() -> CannedShell {
        CannedShell {
            answers: vec![
                (
                    "/lib/ld-linux",
                    CommandOutput::ok("  x86-64-v3 (supported, searched)\n"),
                ),
                (
                    "swapon",
                    CommandOutput::ok("Filename Type Size Used Priority\n/dev/zram0 partition 1 0 100\n"),
                ),
                ("whoami", CommandOutput::ok("alice\n")),
            ],
        }
    }

    fn probe<'a>(runner: &'a CannedShell, root: &Path) -> SystemProbe<'a, CannedShell> {
        SystemProbe {
            runner,
            root: root.to_path_buf(),
            sudo_user: None,
        }
    }

    #[test]
    fn test_gather_from_fake_host() {
        let host = fake_host();
        let shell = shell();
        let facts = HostFacts::gather(&probe(&shell, host.path())).unwrap();

        assert_eq!(facts.ram_kb, 8_052_656);
        assert_eq!(facts.instruction_set_tier, InstructionSetTier::V3);
        assert_eq!(facts.existing_swap, SwapKind::Zram);
        assert!(!facts.zswap_enabled);
        assert_eq!(facts.username, "alice");
        assert_eq!(facts.home_dir, host.path().join("home/alice"));
        assert_eq!(facts.menu_config, None);
    }

    #[test]
    fn test_live_user_wins() {
        let host = fake_host();
        fs::create_dir_all(host.path().join("home/liveuser")).unwrap();
        let shell = shell();
        let (user, home) = probe(&shell, host.path()).detect_user().unwrap();
        assert_eq!(user, "liveuser");
        assert_eq!(home, host.path().join("home/liveuser"));
    }

    #[test]
    fn test_sudo_user_beats_whoami() {
        let host = fake_host();
        let shell = shell();
        let mut p = probe(&shell, host.path());
        p.sudo_user = Some("bob".to_string());
        assert_eq!(p.detect_user().unwrap().0, "bob");
    }

    #[test]
    fn test_missing_loader_falls_back_to_baseline() {
        let host = fake_host();
        let shell = CannedShell {
            answers: vec![("whoami", CommandOutput::ok("alice\n"))],
        };
        let facts = HostFacts::gather(&probe(&shell, host.path())).unwrap();
        assert_eq!(facts.instruction_set_tier, InstructionSetTier::Baseline);
        assert_eq!(facts.existing_swap, SwapKind::None);
    }

    #[test]
    fn test_missing_meminfo_is_fatal() {
        let host = TempDir::new().unwrap();
        let shell = shell();
        assert!(HostFacts::gather(&probe(&shell, host.path())).is_err());
    }

    #[test]
    fn test_locate_menu_config() {
        let host = fake_host();
        let home = host.path().join("home/alice");
        write(&home, ".config/xfce4/panel/whiskermenu-9.rc", "button-title=EndeavourOS\n");
        write(&home, ".config/xfce4/panel/whiskermenu-12.rc", "button-title=EndeavourOS\n");
        write(&home, ".config/xfce4/panel/launcher-3.rc", "");

        let shell = shell();
        let found = probe(&shell, host.path()).locate_menu_config(&home);
        assert_eq!(
            found,
            Some(home.join(".config/xfce4/panel/whiskermenu-12.rc"))
        );
    }
}
