// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{PipelineError, Result};

/// File name looked up in the project root when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "Assetdag.toml";

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Resolve the configuration for a project.
///
/// - An explicit path must exist.
/// - Without one, `<root>/Assetdag.toml` is used when present, otherwise the
///   built-in conventions (`src/*` -> `build/*`) apply.
pub fn load_for_project(explicit: Option<&Path>, root: &Path) -> Result<ConfigFile> {
    match explicit {
        Some(path) => {
            if !path.is_file() {
                return Err(PipelineError::ConfigError(format!(
                    "config file {:?} does not exist",
                    path
                )));
            }
            info!(config = ?path, "loading configuration");
            load_and_validate(path)
        }
        None => {
            let candidate = default_config_path(root);
            if candidate.is_file() {
                info!(config = ?candidate, "loading configuration");
                load_and_validate(&candidate)
            } else {
                debug!(root = ?root, "no {DEFAULT_CONFIG_FILE} found; using conventions");
                ConfigFile::try_from(RawConfigFile::default())
            }
        }
    }
}

/// Default config location inside a project root.
pub fn default_config_path(root: &Path) -> PathBuf {
    root.join(DEFAULT_CONFIG_FILE)
}
