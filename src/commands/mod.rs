//! Módulo de comandos do Tongs

pub mod build;
pub mod check;
pub mod compiledb;
pub mod env;
pub mod flags;
pub mod list;
pub mod show;

use anyhow::Result;
use std::path::Path;

use tongs::core::descriptor::{self, BuildConfiguration};
use tongs::core::layer::Layer;

/// Base profile: built-in defaults, overlaid by `defaults` when given
pub fn base_profile(defaults: Option<&Path>) -> Result<BuildConfiguration> {
    let base = BuildConfiguration::default();
    match defaults {
        Some(path) => Ok(Layer::load_toml(path)?.apply(&base)),
        None => Ok(base),
    }
}

/// Load `rules` over the base profile
pub fn load_rules(rules: &Path, defaults: Option<&Path>) -> Result<BuildConfiguration> {
    let base = base_profile(defaults)?;
    descriptor::load_file(rules, &base)
}
