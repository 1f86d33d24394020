//! Comando flags - Variáveis de make e defines
use anyhow::Result;
use colored::*;
use std::path::Path;

pub fn run(rules: &Path, defaults: Option<&Path>, verbose: bool) -> Result<()> {
    let config = super::load_rules(rules, defaults)?;

    if verbose {
        println!("{}", "Variáveis de make:".bright_cyan());
    }
    for (key, value) in config.make_vars() {
        println!("{}={}", key, value);
    }

    if verbose {
        println!("{}", "Defines:".bright_cyan());
    }
    for define in config.defines() {
        println!("-D{}", define);
    }

    Ok(())
}
