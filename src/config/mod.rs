// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - [`model`] maps the TOML file into raw structs.
//! - [`loader`] reads the file from disk.
//! - [`validate`] turns a [`model::RawConfigFile`] into a checked
//!   [`model::ConfigFile`] (pipeline uniqueness, rule references, etc.).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{
    ConfigFile, JobConfig, JobKind, RawConfigFile, ReloadSection, RuleConfig, WatchSection,
};
