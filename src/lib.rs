//! Tongs - Regras de build por teclado
//!
//! Loads a keyboard's `rules.mk`, validates it against the known MCUs,
//! bootloaders and features, and drives the firmware's make build with the
//! result.
//!
//! ```
//! use tongs::core::descriptor;
//!
//! let config = descriptor::load("MCU = atmega32u4\nBOOTLOADER = caterina\n").unwrap();
//! assert_eq!(config.target_mcu.as_str(), "atmega32u4");
//! ```

pub mod core;

pub use crate::core::descriptor::{BuildConfiguration, load, load_with, validate};
pub use crate::core::error::ConfigError;
