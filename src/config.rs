use anyhow::{Context, Result};
use conversion::FeatureFlags;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::FlagArgs;

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("jomos"))
}

// ============================================================================
// Settings file
// ============================================================================

/// Contents of ~/.config/jomos/config.toml
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub flags: FlagSettings,

    #[serde(default)]
    pub paths: PathSettings,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagSettings {
    pub dry_run: bool,
    pub third_party_repos: bool,
    pub theming: bool,
}

impl Default for FlagSettings {
    fn default() -> Self {
        let flags = FeatureFlags::default();
        Self {
            dry_run: flags.dry_run,
            third_party_repos: flags.third_party_repos,
            theming: flags.theming,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Directory with the command-list files
    pub scripts_dir: String,
    /// Staging tree that mirrors the live /etc
    pub staging_root: String,
    /// Root of the live system
    pub live_root: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            scripts_dir: "scripts".to_string(),
            staging_root: ".".to_string(),
            live_root: "/".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, or from the default location.
    ///
    /// A missing file yields defaults; an unreadable or invalid one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => expand_path(&p.to_string_lossy()),
            None => config_dir()?.join("config.toml"),
        };

        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Invalid TOML format in {}", path.display()))
    }

    /// Merge CLI overrides over the file settings
    pub fn resolve(&self, args: &FlagArgs) -> RunConfig {
        let flags = FeatureFlags {
            dry_run: args.dry_run || self.flags.dry_run,
            third_party_repos: args
                .third_party_repos
                .unwrap_or(self.flags.third_party_repos),
            theming: args.theming.unwrap_or(self.flags.theming),
        };

        RunConfig {
            flags,
            scripts_dir: args
                .scripts_dir
                .clone()
                .unwrap_or_else(|| expand_path(&self.paths.scripts_dir)),
            staging_root: args
                .staging_root
                .clone()
                .unwrap_or_else(|| expand_path(&self.paths.staging_root)),
            live_root: expand_path(&self.paths.live_root),
        }
    }
}

/// Everything a run needs to know about its environment
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub flags: FeatureFlags,
    pub scripts_dir: PathBuf,
    pub staging_root: PathBuf,
    pub live_root: PathBuf,
}

/// Expand `~` in a configured path
fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(Some(&dir.path().join("nope.toml"))).unwrap();
        assert!(!settings.flags.dry_run);
        assert!(settings.flags.third_party_repos);
        assert!(settings.flags.theming);
        assert_eq!(settings.paths.scripts_dir, "scripts");
        assert_eq!(settings.paths.live_root, "/");
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[flags]\ntheming = false\n\n[paths]\nscripts_dir = \"/opt/jomos/scripts\"\n",
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert!(!settings.flags.theming);
        assert!(settings.flags.third_party_repos);
        assert_eq!(settings.paths.scripts_dir, "/opt/jomos/scripts");
        assert_eq!(settings.paths.staging_root, ".");
    }

    #[test]
    fn test_invalid_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[flags\ntheming = ").unwrap();
        assert!(Settings::load(Some(&path)).is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let settings = Settings {
            flags: FlagSettings {
                dry_run: false,
                third_party_repos: true,
                theming: false,
            },
            paths: PathSettings::default(),
        };
        let args = FlagArgs {
            dry_run: true,
            third_party_repos: Some(false),
            theming: None,
            scripts_dir: Some(PathBuf::from("/tmp/scripts")),
            staging_root: None,
        };

        let config = settings.resolve(&args);
        assert!(config.flags.dry_run);
        assert!(!config.flags.third_party_repos);
        assert!(!config.flags.theming);
        assert_eq!(config.scripts_dir, PathBuf::from("/tmp/scripts"));
        assert_eq!(config.staging_root, PathBuf::from("."));
        assert_eq!(config.live_root, PathBuf::from("/"));
    }

    #[test]
    fn test_dry_run_from_file_sticks() {
        let settings = Settings {
            flags: FlagSettings {
                dry_run: true,
                ..FlagSettings::default()
            },
            paths: PathSettings::default(),
        };
        let config = settings.resolve(&FlagArgs::default());
        assert!(config.flags.dry_run);
    }
}
