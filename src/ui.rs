use colored::*;

use crate::agent::FileAttachment;

const RULE_WIDTH: usize = 60;

pub fn print_header(model: &str, detail: &str) {
    let line = "─".repeat(RULE_WIDTH);
    println!("{}", line.black().bold());

    let name = "Mindly".yellow().bold();
    let version = format!("v{}", env!("CARGO_PKG_VERSION")).black().bold();
    println!("  {} {}", name, version);

    let info = format!("  {}  •  {}", model, detail).cyan();
    println!("{}", info);

    println!("{}", line.black().bold());
}

pub fn print_step(msg: &str) {
    println!("  {} {}", "•".green(), msg);
}

pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green().bold(), msg.green());
}

pub fn print_warning(msg: &str) {
    println!("  {} {}", "⚠️ ".yellow().bold(), msg.yellow());
}

pub fn print_error(msg: &str) {
    println!("  {} {}", "❌".red().bold(), msg.red());
}

pub fn print_thinking(msg: &str) {
    println!("  {} {}...", "∴".magenta(), msg);
}

/// One attachment line: name, type and the download reference.
pub fn print_file(file: &FileAttachment) {
    let size = file
        .size
        .map(|s| format!(" ({} bytes)", s))
        .unwrap_or_default();
    println!(
        "  {} {} {}{}",
        "📎".cyan(),
        file.name.bold(),
        file.mime_type.black().bold(),
        size
    );
    println!("     {}", file.download_url.cyan());
}

/// `set` / `not set` marker for status output.
pub fn flag(set: bool) -> ColoredString {
    if set {
        "✓".green()
    } else {
        "not set".red()
    }
}
