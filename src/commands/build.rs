//! Comando build - Compila o firmware de um teclado

use anyhow::{Result, bail};
use colored::*;
use std::path::PathBuf;
use xshell::Shell;

use tongs::core::config::firmware_paths;
use tongs::core::make::MakeCommand;
use tongs::core::{builder, utils};

pub struct BuildOptions {
    pub keyboard: String,
    pub keymap: String,
    pub rules: Option<PathBuf>,
    pub defaults: Option<PathBuf>,
    pub target: Option<String>,
    pub jobs: Option<usize>,
    pub dry_run: bool,
}

pub fn run(opts: &BuildOptions, verbose: bool) -> Result<()> {
    println!(
        "{}",
        format!("🔨 Forjando {}:{}...", opts.keyboard, opts.keymap).bright_yellow()
    );

    let root = builder::firmware_root()?;
    let rules = match &opts.rules {
        Some(path) => path.clone(),
        None => firmware_paths::rules(&root, &opts.keyboard),
    };

    // Configuração inválida aborta antes de qualquer compilação
    utils::print_step(&format!("Validando {}...", rules.display()));
    let config = super::load_rules(&rules, opts.defaults.as_deref())?;
    utils::print_success(&format!(
        "{} / {}",
        config.target_mcu, config.bootloader_protocol
    ));

    let mut make = MakeCommand::new(&root, &opts.keyboard, &opts.keymap).with_config(&config);
    if let Some(target) = &opts.target {
        make = make.target(target.as_str());
    }
    if let Some(jobs) = opts.jobs {
        make = make.jobs(jobs);
    }

    if opts.dry_run {
        println!("{}", make.command_line());
        return Ok(());
    }

    let sh = Shell::new()?;
    builder::run_make(&sh, &make, verbose)?;

    let image = builder::firmware_image(&root, &opts.keyboard, &opts.keymap, config.target_mcu);
    if !image.exists() {
        utils::print_warning(&format!(
            "Imagem não encontrada em {}. Tamanho não verificado.",
            image.display()
        ));
        return Ok(());
    }

    utils::print_step("Verificando tamanho...");
    let size = builder::image_size(&image)?;
    match builder::check_size(&config, size) {
        Ok(report) => {
            let kind = if builder::uses_hex(config.target_mcu) { "hex" } else { "bin" };
            utils::print_success(&format!(
                "{} bytes ({}), {} livres de {}",
                report.size, kind, report.free(), report.max
            ));
        }
        Err(err) => {
            utils::print_error(&err.to_string());
            bail!("Firmware grande demais para {}", config.target_mcu);
        }
    }

    println!("{}", "✓ Build concluído!".bright_green().bold());
    println!("   Imagem: {}", image.display().to_string().bright_cyan());
    Ok(())
}
