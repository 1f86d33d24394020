//! Configuration module - Paths, file names and environment variables

/// File names inside the firmware tree
pub mod files {
    /// Per-keyboard build rules
    pub const RULES: &str = "rules.mk";

    /// Top-level makefile marking the firmware root
    pub const MAKEFILE: &str = "Makefile";

    /// Clang compilation database written by `tongs compiledb`
    pub const COMPILE_DB: &str = "compile_commands.json";
}

/// Firmware tree layout
pub mod firmware_paths {
    use std::path::{Path, PathBuf};

    /// Directory holding one subdirectory per keyboard
    pub const KEYBOARDS: &str = "keyboards";

    /// `<root>/keyboards/<keyboard>`
    pub fn keyboard_dir(root: &Path, keyboard: &str) -> PathBuf {
        root.join(KEYBOARDS).join(keyboard)
    }

    /// `<root>/keyboards/<keyboard>/rules.mk`
    pub fn rules(root: &Path, keyboard: &str) -> PathBuf {
        keyboard_dir(root, keyboard).join(super::files::RULES)
    }

    /// `<root>/compile_commands.json`
    pub fn compile_db(root: &Path) -> PathBuf {
        root.join(super::files::COMPILE_DB)
    }
}

/// Environment variables read by Tongs
pub mod env_vars {
    /// Overrides firmware root discovery
    pub const FIRMWARE_ROOT: &str = "TONGS_FIRMWARE_ROOT";

    /// Overrides the make executable
    pub const MAKE: &str = "MAKE";

    /// Stripped before running make so nested flags do not leak in
    pub const MAKEFLAGS: &str = "MAKEFLAGS";
}
