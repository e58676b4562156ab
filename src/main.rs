mod cli;
mod commands;
mod config;
mod probe;
mod progress;
mod runner;
mod staging;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command, ConvertArgs};
use commands::convert::Completion;
use std::io;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

/// Exit code when the user declines the confirmation prompt
const EXIT_DECLINED: u8 = 2;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };
    let config_path = cli.config.as_deref();

    match cli.command.unwrap_or(Command::Convert(ConvertArgs::default())) {
        Command::Convert(args) => match commands::convert::run(&ctx, config_path, args)? {
            Completion::Completed(_) => Ok(ExitCode::SUCCESS),
            Completion::Declined => Ok(ExitCode::from(EXIT_DECLINED)),
        },
        Command::Plan(args) => {
            commands::plan::run(&ctx, config_path, args)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "jomos", &mut io::stdout());
            Ok(ExitCode::SUCCESS)
        }
    }
}
