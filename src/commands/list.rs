//! Comando list - Lista o esquema aceito pelo rules.mk

use anyhow::Result;
use colored::*;

use tongs::core::schema::{BootloaderProtocol, Feature, Mcu};

pub fn mcus(verbose: bool) -> Result<()> {
    println!("{}", "🧠 MCUs conhecidos:".bright_cyan());
    println!();

    for mcu in Mcu::ALL {
        print!("  {:<12} {}", mcu.as_str().bright_green(), mcu.family().as_str());
        if verbose {
            print!("  {} KiB", mcu.flash_size() / 1024);
        }
        println!();
    }

    Ok(())
}

pub fn bootloaders(verbose: bool) -> Result<()> {
    println!("{}", "⚡ Bootloaders:".bright_cyan());
    println!();

    for bootloader in BootloaderProtocol::ALL {
        let families: Vec<&str> = bootloader.families().iter().map(|f| f.as_str()).collect();
        println!("  {:<13} {}", bootloader.as_str().bright_green(), families.join(", "));

        if verbose {
            let parts: Vec<&str> = Mcu::ALL
                .into_iter()
                .filter(|m| bootloader.supports(*m))
                .map(|m| m.as_str())
                .collect();
            println!("  {:<13} {}", "", parts.join(" ").bright_black());
        }
    }

    Ok(())
}

pub fn features(_verbose: bool) -> Result<()> {
    println!("{}", "🧩 Features (yes/no):".bright_cyan());
    println!();

    for feature in Feature::ALL {
        println!("  {:<18} {}", feature.key().bright_green(), feature.description());
    }

    Ok(())
}
