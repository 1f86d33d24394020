//! Builder module - Core build functionality
//!
//! Finds the firmware tree, runs make in it and checks the resulting image
//! against the flash budget of the configured MCU.

use anyhow::{Context, Result, bail};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use xshell::{Shell, cmd};

use super::config::{env_vars, files, firmware_paths};
use super::descriptor::BuildConfiguration;
use super::error::FlashBudgetError;
use super::make::MakeCommand;
use super::schema::{Architecture, Mcu};

/// A directory with a top-level Makefile and a `keyboards/` tree
pub fn is_firmware_root(dir: &Path) -> bool {
    dir.join(files::MAKEFILE).is_file() && dir.join(firmware_paths::KEYBOARDS).is_dir()
}

/// Get the firmware root directory
pub fn firmware_root() -> Result<PathBuf> {
    if let Ok(root) = std::env::var(env_vars::FIRMWARE_ROOT) {
        let root = PathBuf::from(root);
        if !is_firmware_root(&root) {
            bail!(
                "{} points at {}, which is not a firmware tree",
                env_vars::FIRMWARE_ROOT,
                root.display()
            );
        }
        return Ok(root);
    }

    let current = std::env::current_dir().context("Failed to get current directory")?;
    find_firmware_root(&current)
}

/// Walk up from `start` to the first firmware root
pub fn find_firmware_root(start: &Path) -> Result<PathBuf> {
    for dir in start.ancestors() {
        if is_firmware_root(dir) {
            return Ok(dir.to_path_buf());
        }
    }

    bail!(
        "Could not find firmware root (a directory with {} and {}/) above {}",
        files::MAKEFILE,
        firmware_paths::KEYBOARDS,
        start.display()
    )
}

/// Run make, streaming nothing unless it fails or `verbose` is set
pub fn run_make(sh: &Shell, make: &MakeCommand, verbose: bool) -> Result<()> {
    println!(
        "   {} {} (make: {})",
        "→".bright_blue(),
        make.goal().bright_cyan(),
        make.program.bright_black()
    );
    if verbose {
        println!("     {}", make.command_line().bright_black());
    }

    let spinner = spinner(&format!("make {}", make.goal()));
    let program = &make.program;
    let args = make.args();
    let output = cmd!(sh, "{program} {args...}")
        .env_remove(env_vars::MAKEFLAGS)
        .quiet()
        .ignore_status()
        .output()
        .context(format!("Failed to execute {}", program))?;
    spinner.finish_and_clear();

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        eprintln!("{}", stderr);
        bail!("Failed to build {}", make.goal());
    }

    if verbose {
        let stdout = String::from_utf8_lossy(&output.stdout);
        println!("{}", stdout);
    }

    Ok(())
}

/// Run make and return its stdout (used for `-n` dry runs)
pub fn capture_make(sh: &Shell, make: &MakeCommand) -> Result<String> {
    let program = &make.program;
    let args = make.args();
    let output = cmd!(sh, "{program} {args...}")
        .env_remove(env_vars::MAKEFLAGS)
        .quiet()
        .ignore_status()
        .output()
        .context(format!("Failed to execute {}", program))?;

    if !output.status.success() {
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        bail!("Got error from: {}", make.command_line());
    }

    String::from_utf8(output.stdout).context("make printed invalid UTF-8")
}

/// `make clean`; failures are ignored like a stale tree would be
pub fn clean(sh: &Shell, make: &MakeCommand) -> Result<()> {
    let program = &make.program;
    let args = make.clean_args();
    cmd!(sh, "{program} {args...}")
        .env_remove(env_vars::MAKEFLAGS)
        .quiet()
        .ignore_status()
        .output()
        .context(format!("Failed to execute {}", program))?;
    Ok(())
}

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("   {spinner:.cyan} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Path of the image make leaves in the firmware root
pub fn firmware_image(root: &Path, keyboard: &str, keymap: &str, mcu: Mcu) -> PathBuf {
    root.join(format!(
        "{}_{}.{}",
        keyboard.replace('/', "_"),
        keymap,
        mcu.architecture().image_extension()
    ))
}

/// Bytes the image will occupy in flash.
///
/// Intel HEX files count their data records; anything else is raw.
pub fn image_size(path: &Path) -> Result<u64> {
    let is_hex = path.extension().is_some_and(|ext| ext == "hex");
    if !is_hex {
        let meta = std::fs::metadata(path).context(format!("Failed to stat {}", path.display()))?;
        return Ok(meta.len());
    }

    let text = std::fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;
    hex_payload_size(&text).context(format!("Malformed Intel HEX: {}", path.display()))
}

/// Sum of data record lengths in Intel HEX text
pub fn hex_payload_size(text: &str) -> Result<u64> {
    let mut total = 0u64;

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let record = line
            .strip_prefix(':')
            .filter(|r| r.len() >= 10 && r.is_ascii())
            .with_context(|| format!("line {}: not a HEX record", idx + 1))?;

        let len = record
            .get(0..2)
            .and_then(|field| u8::from_str_radix(field, 16).ok())
            .with_context(|| format!("line {}: bad byte count", idx + 1))?;
        let kind = record
            .get(6..8)
            .and_then(|field| u8::from_str_radix(field, 16).ok())
            .with_context(|| format!("line {}: bad record type", idx + 1))?;

        match kind {
            0x00 => total += u64::from(len),
            0x01 => break,
            _ => {}
        }
    }

    Ok(total)
}

/// Image size against what the bootloader leaves free
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeReport {
    pub size: u64,
    pub max: u64,
}

impl SizeReport {
    pub fn free(&self) -> u64 {
        self.max.saturating_sub(self.size)
    }
}

/// Reject images that do not fit next to the bootloader
pub fn check_size(config: &BuildConfiguration, size: u64) -> Result<SizeReport, FlashBudgetError> {
    let mcu = config.target_mcu;
    let bootloader = config.bootloader_protocol;
    let max = mcu.flash_size().saturating_sub(bootloader.reserved_size(mcu));

    if size > max {
        return Err(FlashBudgetError {
            mcu: mcu.as_str().to_string(),
            bootloader: bootloader.as_str().to_string(),
            size,
            max,
            over: size - max,
        });
    }

    Ok(SizeReport { size, max })
}

/// Whether the image for this MCU is an Intel HEX file
pub fn uses_hex(mcu: Mcu) -> bool {
    mcu.architecture() == Architecture::Avr
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::descriptor;

    fn fake_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Makefile"), "all:\n").unwrap();
        std::fs::create_dir_all(dir.path().join("keyboards/pad/keymaps/default")).unwrap();
        dir
    }

    #[test]
    fn finds_root_from_nested_dir() {
        let tree = fake_tree();
        let nested = tree.path().join("keyboards/pad/keymaps/default");
        assert_eq!(find_firmware_root(&nested).unwrap(), tree.path());
    }

    #[test]
    fn no_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_firmware_root(dir.path()).unwrap_err().to_string();
        assert!(err.contains("Could not find firmware root"));
    }

    #[test]
    fn image_names_follow_keyboard_path() {
        let root = Path::new("/fw");
        assert_eq!(
            firmware_image(root, "handwired/pad", "default", Mcu::Atmega32u4),
            PathBuf::from("/fw/handwired_pad_default.hex")
        );
        assert_eq!(
            firmware_image(root, "pad", "vim", Mcu::Rp2040),
            PathBuf::from("/fw/pad_vim.bin")
        );
        assert!(uses_hex(Mcu::Atmega32u2));
        assert!(!uses_hex(Mcu::Stm32f072));
    }

    #[test]
    fn hex_counts_data_records_only() {
        let hex = ":100000000C94A1000C94C3000C94C3000C94C30058\n\
                   :0400100000000000EC\n\
                   :02000004000FEB\n\
                   :00000001FF\n\
                   :10000000FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF00\n";
        assert_eq!(hex_payload_size(hex).unwrap(), 20);
        assert!(hex_payload_size("garbage\n").is_err());
    }

    #[test]
    fn non_ascii_hex_record_is_an_error() {
        let err = hex_payload_size(":aé000000000000\n").unwrap_err();
        assert!(err.to_string().contains("not a HEX record"));
        assert!(hex_payload_size(":zz00000000FF\n").is_err());
    }

    #[test]
    fn image_size_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("pad_default.bin");
        std::fs::write(&bin, vec![0u8; 1234]).unwrap();
        assert_eq!(image_size(&bin).unwrap(), 1234);

        let hex = dir.path().join("pad_default.hex");
        std::fs::write(&hex, ":0400000001020304F2\n:00000001FF\n").unwrap();
        assert_eq!(image_size(&hex).unwrap(), 4);
    }

    #[test]
    fn flash_budget_subtracts_bootloader() {
        let config = descriptor::load("MCU = atmega32u4\nBOOTLOADER = caterina\n").unwrap();

        let report = check_size(&config, 28_000).unwrap();
        assert_eq!(report.max, 32 * 1024 - 4096);
        assert_eq!(report.free(), 28_672 - 28_000);

        let err = check_size(&config, 28_700).unwrap_err();
        assert_eq!(err.over, 28);
        assert!(err.to_string().contains("28 bytes over"));
    }

    #[test]
    fn halfkay_leaves_more_room() {
        let config = descriptor::load("MCU = atmega32u4\nBOOTLOADER = halfkay\n").unwrap();
        assert!(check_size(&config, 28_700).is_ok());
    }
}
