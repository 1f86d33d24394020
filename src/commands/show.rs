//! Comando show - Mostra a configuração resolvida

use anyhow::{Context, Result};
use colored::*;
use std::path::Path;

use tongs::core::descriptor::BuildConfiguration;
use tongs::core::layer::Layer;
use tongs::core::schema::{Feature, format_bool};
use tongs::core::utils;

use crate::Format;

pub fn run(rules: &Path, defaults: Option<&Path>, format: Format) -> Result<()> {
    let config = super::load_rules(rules, defaults)?;

    match format {
        Format::Text => print_text(rules, &config),
        Format::Rules => print!("{}", config.render()),
        Format::Toml => print!("{}", Layer::to_toml(&config)?),
        Format::Json => {
            let json = serde_json::to_string_pretty(&config).context("Failed to serialize configuration")?;
            println!("{}", json);
        }
    }

    Ok(())
}

fn print_text(rules: &Path, config: &BuildConfiguration) {
    println!("{}", format!("📋 {}", rules.display()).bright_cyan());
    println!();

    utils::print_field("Perfil", config.device_profile.as_str());
    utils::print_field("MCU", config.target_mcu.as_str());
    utils::print_field("Família", config.target_mcu.family().as_str());
    utils::print_field("Bootloader", config.bootloader_protocol.as_str());
    println!();

    for feature in Feature::ALL {
        let state = match config.feature(feature) {
            Some(on) => format_bool(on).bright_green(),
            None => "(padrão)".bright_black(),
        };
        println!("   {:<18} {}", feature.key(), state);
    }
}
