//! Comando compiledb - Gera compile_commands.json
//!
//! Limpa a árvore, roda `make -n` e transforma a saída num banco de
//! compilação do clang.

use anyhow::Result;
use colored::*;
use std::io::Cursor;
use xshell::Shell;

use tongs::core::compiledb::{self, SystemIncludes};
use tongs::core::config::firmware_paths;
use tongs::core::make::MakeCommand;
use tongs::core::{builder, utils};

pub fn run(keyboard: &str, keymap: &str, verbose: bool) -> Result<()> {
    println!("{}", "🗂  Gerando banco de compilação...".bright_yellow());

    let root = builder::firmware_root()?;
    let rules = firmware_paths::rules(&root, keyboard);
    let config = super::load_rules(&rules, None)?;

    let make = MakeCommand::new(&root, keyboard, keymap)
        .with_config(&config)
        .dry_run(true);
    let sh = Shell::new()?;

    utils::print_step(&format!("Limpando com {} clean", make.program));
    builder::clean(&sh, &make)?;

    utils::print_step(&format!("Coletando instruções de {}", make.command_line()));
    let output = builder::capture_make(&sh, &make)?;

    let mut includes = SystemIncludes::new();
    let records = compiledb::parse_make_n(Cursor::new(output), &root, |bin| includes.lookup(bin))?;
    utils::print_info(&format!("{} comandos de compilação encontrados", records.len()));

    if records.is_empty() {
        utils::print_warning("Nenhum arquivo compilado; o make já estava atualizado?");
    }

    let db = firmware_paths::compile_db(&root);
    compiledb::write(&db, &records)?;

    if verbose {
        for record in &records {
            println!("     {}", record.file.bright_black());
        }
    }

    utils::print_success(&format!("Banco escrito em {}", db.display()));
    Ok(())
}
