// src/config/mod.rs

//! Configuration loading and validation for assetdag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk, or fall back to conventions (`loader.rs`).
//! - Validate paths, stage options and watch bindings (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_for_project, load_from_path, DEFAULT_CONFIG_FILE};
pub use model::{
    ClassPaths, ConfigFile, ConfigSection, ConvertSection, ImageSection, RawConfigFile,
    ResizeSection, ResizeVariant, ScriptSection, StyleSection, WatchSection,
};
pub use validate::parse_browser_version;
