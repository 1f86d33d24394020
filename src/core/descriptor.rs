//! Descriptor module - The per-target build configuration
//!
//! Loads a `rules.mk` style source into a validated [`BuildConfiguration`].
//!
//! # Format
//! ```text
//! # comment
//! IS_MACROPAD = yes
//! MCU = atmega32u4
//! BOOTLOADER = atmel-dfu
//! TAP_DANCE_ENABLE = yes   # trailing comments are stripped
//! ```
//!
//! Keys are resolved independently of their order. A key assigned twice is
//! rejected. Every line is parsed before anything is applied, so a source
//! that fails never yields a partially applied configuration.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use super::error::ConfigError;
use super::layer::Layer;
use super::schema::{self, BootloaderProtocol, DeviceProfile, Feature, Key, Mcu};

/// Resolved build-time choices for one keyboard target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildConfiguration {
    pub device_profile: DeviceProfile,
    pub target_mcu: Mcu,
    pub bootloader_protocol: BootloaderProtocol,
    /// Only features set by some layer; the rest are left to the firmware.
    pub feature_flags: BTreeMap<Feature, bool>,
}

impl Default for BuildConfiguration {
    /// Built-in base profile every source is layered over.
    fn default() -> Self {
        Self {
            device_profile: DeviceProfile::Keyboard,
            target_mcu: Mcu::Atmega32u4,
            bootloader_protocol: BootloaderProtocol::AtmelDfu,
            feature_flags: BTreeMap::new(),
        }
    }
}

impl BuildConfiguration {
    pub fn feature(&self, feature: Feature) -> Option<bool> {
        self.feature_flags.get(&feature).copied()
    }

    /// Features explicitly switched on.
    pub fn enabled_features(&self) -> impl Iterator<Item = Feature> + '_ {
        self.feature_flags
            .iter()
            .filter(|(_, on)| **on)
            .map(|(f, _)| *f)
    }

    /// Canonical `rules.mk` text; loading it back yields `self`.
    pub fn render(&self) -> String {
        self.make_vars()
            .into_iter()
            .map(|(k, v)| format!("{} = {}\n", k, v))
            .collect()
    }

    /// `KEY=value` overrides handed to make, in schema order.
    pub fn make_vars(&self) -> Vec<(String, String)> {
        let mut vars = vec![
            (
                Key::IsMacropad.as_str().to_string(),
                schema::format_bool(self.device_profile.is_macropad()).to_string(),
            ),
            (Key::Mcu.as_str().to_string(), self.target_mcu.as_str().to_string()),
            (
                Key::Bootloader.as_str().to_string(),
                self.bootloader_protocol.as_str().to_string(),
            ),
        ];

        for feature in Feature::ALL {
            if let Some(on) = self.feature(feature) {
                vars.push((feature.key().to_string(), schema::format_bool(on).to_string()));
            }
        }

        vars
    }

    /// Preprocessor defines implied by this configuration (without `-D`).
    pub fn defines(&self) -> Vec<String> {
        let mut defines = Vec::new();

        if self.device_profile.is_macropad() {
            defines.push(Key::IsMacropad.as_str().to_string());
        }
        defines.push(self.bootloader_protocol.define());
        defines.extend(self.enabled_features().map(|f| f.key().to_string()));

        defines
    }
}

/// Parse and validate `source` over the built-in defaults.
pub fn load(source: &str) -> Result<BuildConfiguration, ConfigError> {
    load_with(&BuildConfiguration::default(), source)
}

/// Parse and validate `source` over `base`.
pub fn load_with(base: &BuildConfiguration, source: &str) -> Result<BuildConfiguration, ConfigError> {
    let layer = parse(source)?;
    let config = layer.apply(base);
    validate(&config)?;
    Ok(config)
}

/// Read a rules file and load it over `base`.
pub fn load_file(path: &Path, base: &BuildConfiguration) -> Result<BuildConfiguration> {
    let source = std::fs::read_to_string(path)
        .context(format!("Failed to read rules: {}", path.display()))?;

    load_with(base, &source).context(format!("Invalid rules: {}", path.display()))
}

/// Check the invariants the type system does not already enforce.
pub fn validate(config: &BuildConfiguration) -> Result<(), ConfigError> {
    let mcu = config.target_mcu;
    let bootloader = config.bootloader_protocol;

    if !bootloader.supports(mcu) {
        let supported: Vec<&str> = BootloaderProtocol::ALL
            .into_iter()
            .filter(|b| b.supports(mcu))
            .map(|b| b.as_str())
            .collect();

        return Err(ConfigError::IncompatibleCombination {
            mcu: mcu.as_str().to_string(),
            bootloader: bootloader.as_str().to_string(),
            supported: supported.join(", "),
        });
    }

    Ok(())
}

/// Parse `source` into a layer without applying or validating it.
pub fn parse(source: &str) -> Result<Layer, ConfigError> {
    let mut layer = Layer::default();
    let mut seen: HashMap<Key, usize> = HashMap::new();

    for (idx, raw) in source.lines().enumerate() {
        let line = idx + 1;
        let Some((name, value)) = split_assignment(raw, line)? else {
            continue;
        };

        let Some(key) = Key::parse(name) else {
            return Err(ConfigError::UnknownKey {
                key: name.to_string(),
                line,
                hint: Key::suggest(name),
            });
        };

        if let Some(first) = seen.insert(key, line) {
            return Err(ConfigError::DuplicateKey {
                key: name.to_string(),
                first,
                second: line,
            });
        }

        match key {
            Key::IsMacropad => {
                layer.device_profile = Some(DeviceProfile::from_flag(parse_flag(key, value, line)?));
            }
            Key::Mcu => {
                let mcu = value
                    .parse::<Mcu>()
                    .map_err(|()| invalid(key, value, line, "a known MCU (see `tongs list mcus`)"))?;
                layer.target_mcu = Some(mcu);
            }
            Key::Bootloader => {
                let bootloader = value.parse::<BootloaderProtocol>().map_err(|()| {
                    invalid(key, value, line, "a known bootloader (see `tongs list bootloaders`)")
                })?;
                layer.bootloader_protocol = Some(bootloader);
            }
            Key::Feature(feature) => {
                layer.feature_flags.insert(feature, parse_flag(key, value, line)?);
            }
        }
    }

    Ok(layer)
}

/// Split one source line into `(key, value)`; `None` for blank and comment lines.
fn split_assignment(raw: &str, line: usize) -> Result<Option<(&str, &str)>, ConfigError> {
    let text = raw.trim();
    if text.is_empty() || text.starts_with('#') {
        return Ok(None);
    }

    let text = match text.split_once('#') {
        Some((before, _)) => before.trim_end(),
        None => text,
    };

    let Some((lhs, rhs)) = text.split_once('=') else {
        return Err(ConfigError::Syntax {
            line,
            text: text.to_string(),
        });
    };

    // `:=` and `?=` assign the same way for a flat rules file; `+=` appends,
    // which a single-valued key cannot do
    let key = lhs.trim_end();
    if key.ends_with('+') {
        return Err(ConfigError::Syntax {
            line,
            text: text.to_string(),
        });
    }
    let key = key.strip_suffix([':', '?']).unwrap_or(key).trim();
    if key.is_empty() {
        return Err(ConfigError::Syntax {
            line,
            text: text.to_string(),
        });
    }

    Ok(Some((key, rhs.trim())))
}

fn parse_flag(key: Key, value: &str, line: usize) -> Result<bool, ConfigError> {
    schema::parse_bool(value).ok_or_else(|| invalid(key, value, line, "`yes` or `no`"))
}

fn invalid(key: Key, value: &str, line: usize, expected: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.as_str().to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
        line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MACROPAD: &str = "\
IS_MACROPAD = yes
MCU = atmega32u4
BOOTLOADER = atmel-dfu
TAP_DANCE_ENABLE = yes
";

    #[test]
    fn macropad_rules_load() {
        let config = load(MACROPAD).unwrap();
        assert_eq!(config.device_profile, DeviceProfile::Macropad);
        assert_eq!(config.target_mcu, Mcu::Atmega32u4);
        assert_eq!(config.bootloader_protocol, BootloaderProtocol::AtmelDfu);
        assert_eq!(config.feature_flags, BTreeMap::from([(Feature::TapDance, true)]));
    }

    #[test]
    fn comments_blank_lines_and_spacing() {
        let config = load(
            "# header\n\n   # indented comment\nMCU=STM32F411\nBOOTLOADER =stm32-dfu # trailing\n\tNKRO_ENABLE = no\n",
        )
        .unwrap();
        assert_eq!(config.target_mcu, Mcu::Stm32f411);
        assert_eq!(config.bootloader_protocol, BootloaderProtocol::Stm32Dfu);
        assert_eq!(config.feature(Feature::Nkro), Some(false));
        assert_eq!(config.device_profile, DeviceProfile::Keyboard);
    }

    #[test]
    fn make_assignment_flavours() {
        let config = load("MCU := RP2040\nBOOTLOADER ?= rp2040\n").unwrap();
        assert_eq!(config.target_mcu, Mcu::Rp2040);
    }

    #[test]
    fn order_does_not_matter() {
        let reversed: String = MACROPAD.lines().rev().map(|l| format!("{l}\n")).collect();
        assert_eq!(load(&reversed).unwrap(), load(MACROPAD).unwrap());
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = load("MCU = atmega32u4\nRGB_MATRIX_ENABLE = yes\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownKey { ref key, line: 2, .. } if key == "RGB_MATRIX_ENABLE"
        ));
    }

    #[test]
    fn invalid_flag_names_the_key() {
        let err = load("TAP_DANCE_ENABLE = maybe\n").unwrap_err();
        assert_eq!(err.key(), Some("TAP_DANCE_ENABLE"));
        assert!(matches!(err, ConfigError::InvalidValue { ref value, .. } if value == "maybe"));
    }

    #[test]
    fn unknown_mcu_is_invalid_value() {
        let err = load("MCU = z80\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "MCU"));
    }

    #[test]
    fn avr_with_arm_bootloader_is_incompatible() {
        let err = load("MCU = atmega32u4\nBOOTLOADER = stm32-dfu\n").unwrap_err();
        match err {
            ConfigError::IncompatibleCombination { mcu, bootloader, supported } => {
                assert_eq!(mcu, "atmega32u4");
                assert_eq!(bootloader, "stm32-dfu");
                assert!(supported.contains("atmel-dfu"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn bootloader_alone_is_checked_against_base_mcu() {
        // base MCU is atmega32u4
        assert!(load("BOOTLOADER = rp2040\n").is_err());
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let err = load("MCU = atmega32u4\n\nMCU = atmega32u2\n").unwrap_err();
        assert_eq!(
            err,
            ConfigError::DuplicateKey {
                key: "MCU".into(),
                first: 1,
                second: 3
            }
        );
    }

    #[test]
    fn line_without_assignment_is_syntax_error() {
        let err = load("MCU atmega32u4\n").unwrap_err();
        assert!(matches!(err, ConfigError::Syntax { line: 1, .. }));
        assert!(matches!(load(" = yes\n"), Err(ConfigError::Syntax { .. })));
    }

    #[test]
    fn append_assignment_is_syntax_error() {
        let err = load("MCU += atmega32u4\n").unwrap_err();
        assert_eq!(
            err,
            ConfigError::Syntax {
                line: 1,
                text: "MCU += atmega32u4".into()
            }
        );
    }

    #[test]
    fn load_with_layers_over_base() {
        let mut base = BuildConfiguration {
            target_mcu: Mcu::Stm32f072,
            bootloader_protocol: BootloaderProtocol::Stm32Dfu,
            ..Default::default()
        };
        base.feature_flags.insert(Feature::Lto, true);

        let config = load_with(&base, "IS_MACROPAD = yes\n").unwrap();
        assert_eq!(config.target_mcu, Mcu::Stm32f072);
        assert_eq!(config.device_profile, DeviceProfile::Macropad);
        assert_eq!(config.feature(Feature::Lto), Some(true));
    }

    #[test]
    fn validate_programmatic_config() {
        let ok = BuildConfiguration::default();
        assert!(validate(&ok).is_ok());

        let bad = BuildConfiguration {
            target_mcu: Mcu::Rp2040,
            bootloader_protocol: BootloaderProtocol::Caterina,
            ..Default::default()
        };
        assert!(matches!(validate(&bad), Err(ConfigError::IncompatibleCombination { .. })));
    }

    #[test]
    fn render_round_trips() {
        let config = load(MACROPAD).unwrap();
        assert_eq!(config.render(), MACROPAD);
        assert_eq!(load(&config.render()).unwrap(), config);
    }

    #[test]
    fn defines_follow_configuration() {
        let config = load(MACROPAD).unwrap();
        assert_eq!(
            config.defines(),
            vec!["IS_MACROPAD", "BOOTLOADER_ATMEL_DFU", "TAP_DANCE_ENABLE"]
        );
    }
}
