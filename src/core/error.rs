//! Error module - Typed errors for rules loading and flash budget checks

use thiserror::Error;

/// Errors raised while loading or validating a build configuration.
///
/// Every variant is fatal for the current target: retrying the same source
/// cannot succeed, so callers abort the build and report the message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("line {line}: unknown key `{key}`{}", hint_suffix(.hint))]
    UnknownKey {
        key: String,
        line: usize,
        hint: Option<&'static str>,
    },

    #[error("line {line}: invalid value `{value}` for `{key}` (expected {expected})")]
    InvalidValue {
        key: String,
        value: String,
        expected: String,
        line: usize,
    },

    #[error("MCU `{mcu}` cannot be flashed with bootloader `{bootloader}` (supported: {supported})")]
    IncompatibleCombination {
        mcu: String,
        bootloader: String,
        supported: String,
    },

    #[error("line {second}: duplicate key `{key}` (first assigned on line {first})")]
    DuplicateKey {
        key: String,
        first: usize,
        second: usize,
    },

    #[error("line {line}: expected `KEY = value`, found `{text}`")]
    Syntax { line: usize, text: String },
}

impl ConfigError {
    /// The rules key this error points at, when there is one.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::UnknownKey { key, .. }
            | Self::InvalidValue { key, .. }
            | Self::DuplicateKey { key, .. } => Some(key),
            Self::IncompatibleCombination { .. } => Some("BOOTLOADER"),
            Self::Syntax { .. } => None,
        }
    }
}

fn hint_suffix(hint: &Option<&'static str>) -> String {
    match hint {
        Some(key) => format!(", did you mean `{key}`?"),
        None => String::new(),
    }
}

/// Firmware image does not fit in the flash left over by the bootloader.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("firmware image is {size} bytes, {over} bytes over the {max} byte budget of {mcu} with {bootloader}")]
pub struct FlashBudgetError {
    pub mcu: String,
    pub bootloader: String,
    pub size: u64,
    pub max: u64,
    pub over: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_key_message_includes_hint() {
        let err = ConfigError::UnknownKey {
            key: "TAP_DANCE_ENABEL".into(),
            line: 4,
            hint: Some("TAP_DANCE_ENABLE"),
        };
        assert_eq!(
            err.to_string(),
            "line 4: unknown key `TAP_DANCE_ENABEL`, did you mean `TAP_DANCE_ENABLE`?"
        );
        assert_eq!(err.key(), Some("TAP_DANCE_ENABEL"));
    }

    #[test]
    fn invalid_value_message_names_key_and_schema() {
        let err = ConfigError::InvalidValue {
            key: "TAP_DANCE_ENABLE".into(),
            value: "maybe".into(),
            expected: "`yes` or `no`".into(),
            line: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("TAP_DANCE_ENABLE"));
        assert!(msg.contains("maybe"));
        assert!(msg.contains("`yes` or `no`"));
    }
}
