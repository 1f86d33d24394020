//! Comando check - Valida um rules.mk

use anyhow::{Context, Result, bail};
use colored::*;
use std::path::Path;

use tongs::core::descriptor;
use tongs::core::error::ConfigError;
use tongs::core::utils;

pub fn run(rules: &Path, defaults: Option<&Path>, verbose: bool) -> Result<()> {
    println!(
        "{}",
        format!("🔍 Validando {}...", rules.display()).bright_yellow()
    );

    let base = super::base_profile(defaults)?;
    let source = std::fs::read_to_string(rules)
        .context(format!("Failed to read rules: {}", rules.display()))?;

    let config = match descriptor::load_with(&base, &source) {
        Ok(config) => config,
        Err(err) => {
            utils::print_config_error(&err);
            if let ConfigError::UnknownKey { .. } | ConfigError::InvalidValue { .. } = err {
                utils::print_info("Use 'tongs list' para ver chaves e valores aceitos");
            }
            bail!("{} não é válido", rules.display());
        }
    };

    if verbose {
        utils::print_field("Perfil", config.device_profile.as_str());
        utils::print_field("MCU", config.target_mcu.as_str());
        utils::print_field("Bootloader", config.bootloader_protocol.as_str());
    }

    utils::print_success(&format!(
        "{} ({} / {})",
        rules.display(),
        config.target_mcu,
        config.bootloader_protocol
    ));
    Ok(())
}
