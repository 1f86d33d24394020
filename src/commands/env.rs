//! Comando env - Mostra ambiente
use anyhow::Result;
use colored::*;

use tongs::core::config::{env_vars, files, firmware_paths};
use tongs::core::make;
use tongs::core::{builder, utils};

pub fn run(verbose: bool) -> Result<()> {
    println!("{}", "🔧 Ambiente de build:".bright_cyan());
    println!();

    match builder::firmware_root() {
        Ok(root) => utils::print_field("Firmware", &root.display().to_string()),
        Err(err) => utils::print_warning(&err.to_string()),
    }

    let program = make::make_program();
    match which::which(&program) {
        Ok(path) => utils::print_field("Make", &path.display().to_string()),
        Err(_) => utils::print_warning(&format!("{} não encontrado no PATH", program)),
    }

    utils::print_field(
        "Regras",
        &format!("{}/<teclado>/{}", firmware_paths::KEYBOARDS, files::RULES),
    );

    if verbose {
        for var in [env_vars::FIRMWARE_ROOT, env_vars::MAKE, env_vars::MAKEFLAGS] {
            let value = std::env::var(var).unwrap_or_else(|_| "(não definido)".to_string());
            utils::print_field(var, &value);
        }
    }

    Ok(())
}
