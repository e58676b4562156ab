use conversion::{CommandOutput, ShellRunner};
use std::process::{Command, Stdio};

/// Runs command lines through `sh -c` and captures their output
pub struct SystemShell;

impl ShellRunner for SystemShell {
    fn run(&self, command: &str) -> conversion::Result<CommandOutput> {
        Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .output()
            .map(CommandOutput::from)
            .map_err(|e| conversion::Error::Spawn {
                command: command.to_string(),
                message: e.to_string(),
            })
    }
}

/// Quote a value for safe use in a `sh -c` command line
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
