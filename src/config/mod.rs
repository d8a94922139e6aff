// src/config/mod.rs

//! Configuration loading and validation for encarun.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate structural invariants (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ConfigFile, ControllerSection, NumericParameter, RawConfigFile, RunSection,
};
pub use validate::validate_config;
