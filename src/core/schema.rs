//! Schema module - Recognised rules keys, MCU and bootloader tables
//!
//! Everything a `rules.mk` may name is a closed enumeration here. The
//! identifiers are spelled exactly as the firmware toolchain spells them.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Firmware personality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum DeviceProfile {
    Macropad,
    #[default]
    Keyboard,
}

impl DeviceProfile {
    pub fn from_flag(is_macropad: bool) -> Self {
        if is_macropad { Self::Macropad } else { Self::Keyboard }
    }

    pub fn is_macropad(self) -> bool {
        self == Self::Macropad
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Macropad => "macropad",
            Self::Keyboard => "keyboard",
        }
    }
}

/// Instruction set the firmware is cross-compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture {
    Avr,
    Arm,
}

impl Architecture {
    /// Extension of the image `make` leaves in the firmware root.
    pub fn image_extension(self) -> &'static str {
        match self {
            Self::Avr => "hex",
            Self::Arm => "bin",
        }
    }
}

/// MCU family, the granularity bootloader compatibility is decided at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum McuFamily {
    /// AVR with native USB (LUFA)
    AvrUsb,
    /// AVR without USB hardware (V-USB bit-banging)
    AvrVusb,
    Stm32,
    Kinetis,
    Rp2040,
}

impl McuFamily {
    pub fn architecture(self) -> Architecture {
        match self {
            Self::AvrUsb | Self::AvrVusb => Architecture::Avr,
            Self::Stm32 | Self::Kinetis | Self::Rp2040 => Architecture::Arm,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AvrUsb => "avr-usb",
            Self::AvrVusb => "avr-vusb",
            Self::Stm32 => "stm32",
            Self::Kinetis => "kinetis",
            Self::Rp2040 => "rp2040",
        }
    }
}

/// Microcontrollers known to the toolchain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Mcu {
    Atmega16u2,
    Atmega32u2,
    Atmega16u4,
    Atmega32u4,
    At90usb646,
    At90usb1286,
    Atmega32a,
    Atmega328p,
    Stm32f072,
    Stm32f103,
    Stm32f303,
    Stm32f401,
    Stm32f411,
    Mk20dx256,
    Mkl26z64,
    Rp2040,
}

impl Mcu {
    pub const ALL: [Mcu; 16] = [
        Mcu::Atmega16u2,
        Mcu::Atmega32u2,
        Mcu::Atmega16u4,
        Mcu::Atmega32u4,
        Mcu::At90usb646,
        Mcu::At90usb1286,
        Mcu::Atmega32a,
        Mcu::Atmega328p,
        Mcu::Stm32f072,
        Mcu::Stm32f103,
        Mcu::Stm32f303,
        Mcu::Stm32f401,
        Mcu::Stm32f411,
        Mcu::Mk20dx256,
        Mcu::Mkl26z64,
        Mcu::Rp2040,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Atmega16u2 => "atmega16u2",
            Self::Atmega32u2 => "atmega32u2",
            Self::Atmega16u4 => "atmega16u4",
            Self::Atmega32u4 => "atmega32u4",
            Self::At90usb646 => "at90usb646",
            Self::At90usb1286 => "at90usb1286",
            Self::Atmega32a => "atmega32a",
            Self::Atmega328p => "atmega328p",
            Self::Stm32f072 => "STM32F072",
            Self::Stm32f103 => "STM32F103",
            Self::Stm32f303 => "STM32F303",
            Self::Stm32f401 => "STM32F401",
            Self::Stm32f411 => "STM32F411",
            Self::Mk20dx256 => "MK20DX256",
            Self::Mkl26z64 => "MKL26Z64",
            Self::Rp2040 => "RP2040",
        }
    }

    pub fn family(self) -> McuFamily {
        match self {
            Self::Atmega16u2
            | Self::Atmega32u2
            | Self::Atmega16u4
            | Self::Atmega32u4
            | Self::At90usb646
            | Self::At90usb1286 => McuFamily::AvrUsb,
            Self::Atmega32a | Self::Atmega328p => McuFamily::AvrVusb,
            Self::Stm32f072 | Self::Stm32f103 | Self::Stm32f303 | Self::Stm32f401 | Self::Stm32f411 => {
                McuFamily::Stm32
            }
            Self::Mk20dx256 | Self::Mkl26z64 => McuFamily::Kinetis,
            Self::Rp2040 => McuFamily::Rp2040,
        }
    }

    pub fn architecture(self) -> Architecture {
        self.family().architecture()
    }

    /// Total program flash in bytes (external QSPI flash for the RP2040).
    pub fn flash_size(self) -> u64 {
        const K: u64 = 1024;
        match self {
            Self::Atmega16u2 | Self::Atmega16u4 => 16 * K,
            Self::Atmega32u2 | Self::Atmega32u4 | Self::Atmega32a | Self::Atmega328p => 32 * K,
            Self::At90usb646 => 64 * K,
            Self::At90usb1286 => 128 * K,
            Self::Stm32f072 => 128 * K,
            Self::Stm32f103 => 64 * K,
            Self::Stm32f303 | Self::Stm32f401 | Self::Mk20dx256 => 256 * K,
            Self::Stm32f411 => 512 * K,
            Self::Mkl26z64 => 64 * K,
            Self::Rp2040 => 2048 * K,
        }
    }
}

impl FromStr for Mcu {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mcu::ALL.into_iter().find(|m| m.as_str() == s).ok_or(())
    }
}

/// Flashing protocols spoken by device bootloaders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BootloaderProtocol {
    AtmelDfu,
    LufaDfu,
    QmkDfu,
    Caterina,
    Halfkay,
    BootloadHid,
    UsbAspLoader,
    Stm32Dfu,
    Stm32duino,
    Kiibohd,
    Rp2040,
    TinyUf2,
}

impl BootloaderProtocol {
    pub const ALL: [BootloaderProtocol; 12] = [
        BootloaderProtocol::AtmelDfu,
        BootloaderProtocol::LufaDfu,
        BootloaderProtocol::QmkDfu,
        BootloaderProtocol::Caterina,
        BootloaderProtocol::Halfkay,
        BootloaderProtocol::BootloadHid,
        BootloaderProtocol::UsbAspLoader,
        BootloaderProtocol::Stm32Dfu,
        BootloaderProtocol::Stm32duino,
        BootloaderProtocol::Kiibohd,
        BootloaderProtocol::Rp2040,
        BootloaderProtocol::TinyUf2,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AtmelDfu => "atmel-dfu",
            Self::LufaDfu => "lufa-dfu",
            Self::QmkDfu => "qmk-dfu",
            Self::Caterina => "caterina",
            Self::Halfkay => "halfkay",
            Self::BootloadHid => "bootloadhid",
            Self::UsbAspLoader => "usbasploader",
            Self::Stm32Dfu => "stm32-dfu",
            Self::Stm32duino => "stm32duino",
            Self::Kiibohd => "kiibohd",
            Self::Rp2040 => "rp2040",
            Self::TinyUf2 => "tinyuf2",
        }
    }

    /// MCU families this bootloader can be installed on.
    pub fn families(self) -> &'static [McuFamily] {
        match self {
            Self::AtmelDfu | Self::LufaDfu | Self::QmkDfu | Self::Caterina => &[McuFamily::AvrUsb],
            Self::Halfkay => &[McuFamily::AvrUsb, McuFamily::Kinetis],
            Self::BootloadHid | Self::UsbAspLoader => &[McuFamily::AvrVusb],
            Self::Stm32Dfu | Self::Stm32duino | Self::TinyUf2 => &[McuFamily::Stm32],
            Self::Kiibohd => &[McuFamily::Kinetis],
            Self::Rp2040 => &[McuFamily::Rp2040],
        }
    }

    pub fn supports(self, mcu: Mcu) -> bool {
        self.families().contains(&mcu.family())
    }

    /// Bytes of application flash the bootloader occupies on `mcu`.
    ///
    /// ROM bootloaders (STM32 system memory, RP2040 boot ROM) take nothing.
    pub fn reserved_size(self, mcu: Mcu) -> u64 {
        match self {
            Self::AtmelDfu | Self::LufaDfu | Self::QmkDfu | Self::Caterina | Self::BootloadHid => 4096,
            Self::UsbAspLoader => 2048,
            Self::Halfkay if mcu.architecture() == Architecture::Avr => 512,
            Self::Halfkay => 0,
            Self::Stm32duino => 8192,
            Self::Kiibohd => 4096,
            Self::TinyUf2 => 65536,
            Self::Stm32Dfu | Self::Rp2040 => 0,
        }
    }

    /// Preprocessor define the firmware keys its jump-to-bootloader code on.
    pub fn define(self) -> String {
        format!("BOOTLOADER_{}", self.as_str().replace('-', "_").to_uppercase())
    }
}

impl FromStr for BootloaderProtocol {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BootloaderProtocol::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or(())
    }
}

/// Optional firmware features toggled with `*_ENABLE = yes|no`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    TapDance,
    Combo,
    Mousekey,
    Extrakey,
    Console,
    Command,
    Nkro,
    Encoder,
    Rgblight,
    Lto,
}

impl Feature {
    pub const ALL: [Feature; 10] = [
        Feature::TapDance,
        Feature::Combo,
        Feature::Mousekey,
        Feature::Extrakey,
        Feature::Console,
        Feature::Command,
        Feature::Nkro,
        Feature::Encoder,
        Feature::Rgblight,
        Feature::Lto,
    ];

    /// Rules key, e.g. `TAP_DANCE_ENABLE`
    pub fn key(self) -> &'static str {
        match self {
            Self::TapDance => "TAP_DANCE_ENABLE",
            Self::Combo => "COMBO_ENABLE",
            Self::Mousekey => "MOUSEKEY_ENABLE",
            Self::Extrakey => "EXTRAKEY_ENABLE",
            Self::Console => "CONSOLE_ENABLE",
            Self::Command => "COMMAND_ENABLE",
            Self::Nkro => "NKRO_ENABLE",
            Self::Encoder => "ENCODER_ENABLE",
            Self::Rgblight => "RGBLIGHT_ENABLE",
            Self::Lto => "LTO_ENABLE",
        }
    }

    /// Name used in TOML profile files, e.g. `tap_dance`
    pub fn name(self) -> &'static str {
        match self {
            Self::TapDance => "tap_dance",
            Self::Combo => "combo",
            Self::Mousekey => "mousekey",
            Self::Extrakey => "extrakey",
            Self::Console => "console",
            Self::Command => "command",
            Self::Nkro => "nkro",
            Self::Encoder => "encoder",
            Self::Rgblight => "rgblight",
            Self::Lto => "lto",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Feature::ALL.into_iter().find(|f| f.key() == key)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Feature::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::TapDance => "one key, different actions per tap count",
            Self::Combo => "chorded key combinations",
            Self::Mousekey => "mouse emulation keys",
            Self::Extrakey => "media and system control keys",
            Self::Console => "debug console over HID",
            Self::Command => "magic command key sequences",
            Self::Nkro => "n-key rollover",
            Self::Encoder => "rotary encoder support",
            Self::Rgblight => "RGB underglow",
            Self::Lto => "link time optimisation",
        }
    }
}

/// A recognised left-hand side of a rules assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    IsMacropad,
    Mcu,
    Bootloader,
    Feature(Feature),
}

impl Key {
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "IS_MACROPAD" => Some(Self::IsMacropad),
            "MCU" => Some(Self::Mcu),
            "BOOTLOADER" => Some(Self::Bootloader),
            other => Feature::from_key(other).map(Self::Feature),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::IsMacropad => "IS_MACROPAD",
            Self::Mcu => "MCU",
            Self::Bootloader => "BOOTLOADER",
            Self::Feature(f) => f.key(),
        }
    }

    /// Every recognised key, in canonical rules order.
    pub fn all() -> impl Iterator<Item = Key> {
        [Key::IsMacropad, Key::Mcu, Key::Bootloader]
            .into_iter()
            .chain(Feature::ALL.into_iter().map(Key::Feature))
    }

    /// Closest recognised key within two edits, for typo hints.
    pub fn suggest(unknown: &str) -> Option<&'static str> {
        Key::all()
            .map(|k| (edit_distance(unknown, k.as_str()), k.as_str()))
            .filter(|(d, _)| *d <= 2)
            .min_by_key(|(d, _)| *d)
            .map(|(_, k)| k)
    }
}

/// `yes`/`no`, case-sensitive like make's `ifeq`.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "yes" => Some(true),
        "no" => Some(false),
        _ => None,
    }
}

pub fn format_bool(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.chars().enumerate() {
        let mut row = vec![i + 1; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            row[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(row[j] + 1);
        }
        prev = row;
    }

    prev[b.len()]
}

macro_rules! serialize_as_str {
    ($($ty:ty),*) => {
        $(
            impl Serialize for $ty {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    serializer.serialize_str(self.as_str())
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

serialize_as_str!(DeviceProfile, Mcu, BootloaderProtocol);

impl Serialize for Feature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mcu_identifiers_round_trip() {
        for mcu in Mcu::ALL {
            assert_eq!(mcu.as_str().parse::<Mcu>(), Ok(mcu));
        }
        assert!("ATMEGA32U4".parse::<Mcu>().is_err());
    }

    #[test]
    fn avr_bootloaders_reject_arm_parts() {
        assert!(BootloaderProtocol::AtmelDfu.supports(Mcu::Atmega32u4));
        assert!(!BootloaderProtocol::Stm32Dfu.supports(Mcu::Atmega32u4));
        assert!(!BootloaderProtocol::Caterina.supports(Mcu::Rp2040));
        assert!(BootloaderProtocol::Halfkay.supports(Mcu::Mk20dx256));
        assert!(!BootloaderProtocol::Halfkay.supports(Mcu::Atmega328p));
    }

    #[test]
    fn every_mcu_has_a_bootloader() {
        for mcu in Mcu::ALL {
            assert!(
                BootloaderProtocol::ALL.iter().any(|b| b.supports(mcu)),
                "{mcu} has no compatible bootloader"
            );
        }
    }

    #[test]
    fn halfkay_reserves_less_on_arm() {
        assert_eq!(BootloaderProtocol::Halfkay.reserved_size(Mcu::Atmega32u4), 512);
        assert_eq!(BootloaderProtocol::Halfkay.reserved_size(Mcu::Mk20dx256), 0);
    }

    #[test]
    fn bootloader_define() {
        assert_eq!(BootloaderProtocol::AtmelDfu.define(), "BOOTLOADER_ATMEL_DFU");
        assert_eq!(BootloaderProtocol::Rp2040.define(), "BOOTLOADER_RP2040");
    }

    #[test]
    fn bool_literals_are_strict() {
        assert_eq!(parse_bool("yes"), Some(true));
        assert_eq!(parse_bool("no"), Some(false));
        for bad in ["Yes", "NO", "true", "1", "maybe", ""] {
            assert_eq!(parse_bool(bad), None, "{bad}");
        }
    }

    #[test]
    fn keys_parse_and_suggest() {
        assert_eq!(Key::parse("TAP_DANCE_ENABLE"), Some(Key::Feature(Feature::TapDance)));
        assert_eq!(Key::parse("MCU"), Some(Key::Mcu));
        assert_eq!(Key::parse("RGB_MATRIX_ENABLE"), None);
        assert_eq!(Key::suggest("TAP_DANCE_ENABEL"), Some("TAP_DANCE_ENABLE"));
        assert_eq!(Key::suggest("BOOTLOADR"), Some("BOOTLOADER"));
        assert_eq!(Key::suggest("COMPLETELY_UNRELATED"), None);
    }
}
