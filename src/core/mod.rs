//! Módulo core - Lógica central do Tongs

pub mod builder;
pub mod compiledb;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod layer;
pub mod make;
pub mod schema;
pub mod utils;
