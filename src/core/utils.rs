//! Utilities module - Console status lines

use colored::*;

use super::error::ConfigError;

/// Print a step message
pub fn print_step(message: &str) {
    println!("   {} {}", "→".bright_blue(), message);
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("   {} {}", "✓".bright_green(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("   {} {}", "✗".bright_red(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("   {} {}", "⚠".bright_yellow(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("   {} {}", "ℹ".bright_cyan(), message);
}

/// Print an aligned `label: value` line
pub fn print_field(label: &str, value: &str) {
    let label = format!("{:<12}", format!("{}:", label));
    println!("   {} {}", label.bright_black(), value.bright_green());
}

/// Print a rules error, pointing at the offending key when there is one
pub fn print_config_error(err: &ConfigError) {
    print_error(&err.to_string());
    if let Some(key) = err.key() {
        eprintln!("     {} {}", "key:".bright_black(), key.bright_yellow());
    }
}
