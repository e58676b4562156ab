use colored::Colorize;
use conversion::{Outcome, RunSummary};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Short colored label for a step outcome
pub fn outcome_label(outcome: Outcome) -> String {
    match outcome {
        Outcome::Succeeded => "✓".green().to_string(),
        Outcome::Failed => "✗".red().to_string(),
        Outcome::Planned => "○".blue().to_string(),
    }
}

/// Print a unified diff with added and removed lines colored
pub fn print_diff(diff: &str) {
    for line in diff.lines() {
        if line.starts_with("+++") || line.starts_with("---") {
            println!("    {}", line.bold());
        } else if line.starts_with("@@") {
            println!("    {}", line.cyan());
        } else if line.starts_with('+') {
            println!("    {}", line.green());
        } else if line.starts_with('-') {
            println!("    {}", line.red());
        } else {
            println!("    {}", line.dimmed());
        }
    }
}

/// Print the run summary counters
pub fn print_summary(summary: &RunSummary) {
    println!();
    if summary.failed == 0 {
        println!("  {} Conversion complete", "✓".green().bold());
    } else {
        println!(
            "  {} Conversion complete with {} failed command(s)",
            "⚠".yellow().bold(),
            summary.failed
        );
    }

    if summary.succeeded > 0 {
        println!("    {} succeeded", summary.succeeded.to_string().green());
    }
    if summary.failed > 0 {
        println!("    {} failed", summary.failed.to_string().red());
    }
    if summary.planned > 0 {
        println!("    {} planned (dry run)", summary.planned.to_string().blue());
    }
}

/// Print the JomOS banner and what continuing will do
pub fn banner() {
    println!(
        "{}",
        r#"
       ██╗ ██████╗ ███╗   ███╗ ██████╗ ███████╗
       ██║██╔═══██╗████╗ ████║██╔═══██╗██╔════╝
       ██║██║   ██║██╔████╔██║██║   ██║███████╗
  ██   ██║██║   ██║██║╚██╔╝██║██║   ██║╚════██║
  ╚█████╔╝╚██████╔╝██║ ╚═╝ ██║╚██████╔╝███████║
   ╚════╝  ╚═════╝ ╚═╝     ╚═╝ ╚═════╝ ╚══════╝
"#
        .cyan()
    );
    println!("  {}", format!("JomOS {}", env!("CARGO_PKG_VERSION")).bold());
    println!();
    println!("  JomOS is a meta Linux distribution which lets you mix and match");
    println!("  well tested configurations and optimizations with little effort,");
    println!("  integrated into one largely cohesive system.");
    println!();
    println!("  {}", "Continuing will:".red().bold());
    println!("  {}", "- Convert the existing installation into JomOS".red());
    println!();
}

/// Truncate a command line for display, keeping the start
pub fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let kept: String = text.chars().take(max_len - 3).collect();
        format!("{kept}...")
    }
}
