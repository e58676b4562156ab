use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "jomos")]
#[command(author = "JomOS contributors")]
#[command(version)]
#[command(about = "Convert an existing installation into a host-tuned JomOS system", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: ~/.config/jomos/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Convert this system (the default when no subcommand is given)
    Convert(ConvertArgs),

    /// Show host facts, tuning values and the resolved plan without changing anything
    Plan(PlanArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Feature flags
// ============================================================================

/// Flag and path overrides shared by `convert` and `plan`
#[derive(Args, Debug, Default, Clone)]
pub struct FlagArgs {
    /// Dry run - compute and log everything, change nothing
    #[arg(short = 'n', long, env = "JOMOS_DRY_RUN")]
    pub dry_run: bool,

    /// Enable third-party repositories and the pacman mirror edit
    #[arg(long, value_name = "BOOL")]
    pub third_party_repos: Option<bool>,

    /// Enable theming commands and the desktop menu rename
    #[arg(long, value_name = "BOOL")]
    pub theming: Option<bool>,

    /// Directory holding the generic, theming, repos and repos-v3 command lists
    #[arg(long, value_name = "DIR")]
    pub scripts_dir: Option<PathBuf>,

    /// Root of the staging tree (contains etc/)
    #[arg(long, value_name = "DIR")]
    pub staging_root: Option<PathBuf>,
}

// ============================================================================
// Convert
// ============================================================================

#[derive(Args, Debug, Default)]
pub struct ConvertArgs {
    #[command(flatten)]
    pub flags: FlagArgs,

    /// Skip the typed confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

// ============================================================================
// Plan
// ============================================================================

#[derive(Args, Debug, Default)]
pub struct PlanArgs {
    #[command(flatten)]
    pub flags: FlagArgs,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,

    /// Show staged config diffs
    #[arg(long)]
    pub diff: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_defaults_to_none() {
        let cli = Cli::try_parse_from(["jomos"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_convert_flags() {
        let cli = Cli::try_parse_from([
            "jomos",
            "-v",
            "convert",
            "--dry-run",
            "--third-party-repos",
            "false",
            "--yes",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Some(Command::Convert(args)) => {
                assert!(args.flags.dry_run);
                assert_eq!(args.flags.third_party_repos, Some(false));
                assert_eq!(args.flags.theming, None);
                assert!(args.yes);
            }
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn test_plan_json() {
        let cli = Cli::try_parse_from(["jomos", "plan", "--json", "--theming", "true"]).unwrap();
        match cli.command {
            Some(Command::Plan(args)) => {
                assert!(args.json);
                assert_eq!(args.flags.theming, Some(true));
            }
            _ => panic!("expected plan"),
        }
    }
}
