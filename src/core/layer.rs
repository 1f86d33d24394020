//! Layer module - Partial configurations stacked over a base profile
//!
//! A parsed `rules.mk` and a TOML profile file are both layers. Applying a
//! layer to a [`BuildConfiguration`] overrides only the fields it sets.
//!
//! Profile file format:
//!
//! ```toml
//! is_macropad = true
//! mcu = "atmega32u4"
//! bootloader = "atmel-dfu"
//!
//! [features]
//! tap_dance = true
//! ```

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::descriptor::BuildConfiguration;
use super::schema::{BootloaderProtocol, DeviceProfile, Feature, Mcu};

/// Partial build configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layer {
    pub device_profile: Option<DeviceProfile>,
    pub target_mcu: Option<Mcu>,
    pub bootloader_protocol: Option<BootloaderProtocol>,
    pub feature_flags: BTreeMap<Feature, bool>,
}

impl Layer {
    /// Override `base` field by field; feature flags merge per feature.
    pub fn apply(&self, base: &BuildConfiguration) -> BuildConfiguration {
        let mut feature_flags = base.feature_flags.clone();
        feature_flags.extend(self.feature_flags.iter().map(|(f, on)| (*f, *on)));

        BuildConfiguration {
            device_profile: self.device_profile.unwrap_or(base.device_profile),
            target_mcu: self.target_mcu.unwrap_or(base.target_mcu),
            bootloader_protocol: self.bootloader_protocol.unwrap_or(base.bootloader_protocol),
            feature_flags,
        }
    }

    /// Parse a TOML profile.
    pub fn from_toml(text: &str) -> Result<Self> {
        let file: ProfileFile = toml::from_str(text).context("Invalid profile TOML")?;
        file.try_into()
    }

    /// Read and parse a TOML profile file.
    pub fn load_toml(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .context(format!("Failed to read profile: {}", path.display()))?;
        Self::from_toml(&text).context(format!("Failed to load profile: {}", path.display()))
    }

    /// Fully populated profile TOML for `config`.
    pub fn to_toml(config: &BuildConfiguration) -> Result<String> {
        let file = ProfileFile {
            is_macropad: Some(config.device_profile.is_macropad()),
            mcu: Some(config.target_mcu.as_str().to_string()),
            bootloader: Some(config.bootloader_protocol.as_str().to_string()),
            features: config
                .feature_flags
                .iter()
                .map(|(f, on)| (f.name().to_string(), *on))
                .collect(),
        };
        toml::to_string(&file).context("Failed to serialize profile")
    }
}

impl From<&BuildConfiguration> for Layer {
    fn from(config: &BuildConfiguration) -> Self {
        Self {
            device_profile: Some(config.device_profile),
            target_mcu: Some(config.target_mcu),
            bootloader_protocol: Some(config.bootloader_protocol),
            feature_flags: config.feature_flags.clone(),
        }
    }
}

/// On-disk shape of a profile file
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProfileFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    is_macropad: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    mcu: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    bootloader: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    features: BTreeMap<String, bool>,
}

impl TryFrom<ProfileFile> for Layer {
    type Error = anyhow::Error;

    fn try_from(file: ProfileFile) -> Result<Self> {
        let target_mcu = match file.mcu.as_deref() {
            Some(name) => match name.parse::<Mcu>() {
                Ok(mcu) => Some(mcu),
                Err(()) => bail!("Unknown MCU in profile: {}", name),
            },
            None => None,
        };

        let bootloader_protocol = match file.bootloader.as_deref() {
            Some(name) => match name.parse::<BootloaderProtocol>() {
                Ok(bl) => Some(bl),
                Err(()) => bail!("Unknown bootloader in profile: {}", name),
            },
            None => None,
        };

        let mut feature_flags = BTreeMap::new();
        for (name, on) in file.features {
            let Some(feature) = Feature::from_name(&name) else {
                bail!("Unknown feature in profile: {}", name);
            };
            feature_flags.insert(feature, on);
        }

        Ok(Self {
            device_profile: file.is_macropad.map(DeviceProfile::from_flag),
            target_mcu,
            bootloader_protocol,
            feature_flags,
        })
    }
}
