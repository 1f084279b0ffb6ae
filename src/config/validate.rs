// src/config/validate.rs

use std::collections::HashSet;

use globset::Glob;

use crate::config::model::{ClassPaths, ConfigFile, RawConfigFile};
use crate::errors::{PipelineError, Result};
use crate::types::AssetClass;

/// Browser names accepted in `[styles.targets]`.
pub const KNOWN_BROWSERS: &[&str] = &[
    "android", "chrome", "edge", "firefox", "ie", "ios_saf", "opera", "safari", "samsung",
];

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PipelineError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_global_config(cfg)?;
    validate_class_paths(AssetClass::Style, &cfg.styles.paths)?;
    validate_class_paths(AssetClass::Script, &cfg.scripts.paths)?;
    validate_class_paths(AssetClass::Image, &cfg.images.paths)?;
    validate_styles(cfg)?;
    validate_scripts(cfg)?;
    validate_images(cfg)?;
    validate_watch(cfg)?;
    Ok(())
}

fn config_error(msg: impl Into<String>) -> PipelineError {
    PipelineError::ConfigError(msg.into())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.jobs == Some(0) {
        return Err(config_error("[config].jobs must be >= 1 (got 0)"));
    }

    if cfg.config.queue_length == 0 {
        return Err(config_error("[config].queue_length must be >= 1 (got 0)"));
    }

    Ok(())
}

fn validate_class_paths(class: AssetClass, paths: &ClassPaths) -> Result<()> {
    let section = class.label();

    if paths.src.trim().is_empty() {
        return Err(config_error(format!("[{section}].src must not be empty")));
    }
    if paths.out.trim().is_empty() {
        return Err(config_error(format!("[{section}].out must not be empty")));
    }
    if paths.src.trim_end_matches('/') == paths.out.trim_end_matches('/') {
        return Err(config_error(format!(
            "[{section}].out must differ from [{section}].src (both are {:?})",
            paths.src
        )));
    }

    Glob::new(&paths.glob).map_err(|e| {
        config_error(format!("[{section}].glob {:?} is not a valid glob: {e}", paths.glob))
    })?;

    Ok(())
}

fn validate_styles(cfg: &RawConfigFile) -> Result<()> {
    if cfg.styles.minified_suffix.is_empty() {
        return Err(config_error("[styles].minified_suffix must not be empty"));
    }

    for (browser, version) in cfg.styles.targets.iter() {
        if !KNOWN_BROWSERS.contains(&browser.as_str()) {
            return Err(config_error(format!(
                "[styles.targets] unknown browser '{browser}' (expected one of {})",
                KNOWN_BROWSERS.join(", ")
            )));
        }
        if parse_browser_version(version).is_none() {
            return Err(config_error(format!(
                "[styles.targets].{browser} has invalid version {version:?} (expected e.g. \"13\" or \"13.1\")"
            )));
        }
    }

    Ok(())
}

fn validate_scripts(cfg: &RawConfigFile) -> Result<()> {
    if cfg.scripts.minified_suffix.is_empty() {
        return Err(config_error("[scripts].minified_suffix must not be empty"));
    }

    let bundle = cfg.scripts.bundle.trim();
    if bundle.is_empty() || bundle.contains('/') || bundle.contains('\\') {
        return Err(config_error(format!(
            "[scripts].bundle must be a plain file stem (got {:?})",
            cfg.scripts.bundle
        )));
    }

    Ok(())
}

fn validate_images(cfg: &RawConfigFile) -> Result<()> {
    let images = &cfg.images;

    if images.extensions.is_empty() {
        return Err(config_error("[images].extensions must list at least one extension"));
    }

    let mut suffixes = HashSet::new();
    for variant in images.resize.variants.iter() {
        if variant.width == 0 {
            return Err(config_error("[images.resize] variant width must be >= 1"));
        }
        // Two variants with the same suffix would write the same file.
        if !suffixes.insert(variant.suffix.as_str()) {
            return Err(config_error(format!(
                "[images.resize] duplicate variant suffix {:?}",
                variant.suffix
            )));
        }
    }

    if images.convert.width == 0 {
        return Err(config_error("[images.convert].width must be >= 1"));
    }

    Ok(())
}

fn validate_watch(cfg: &RawConfigFile) -> Result<()> {
    for class in AssetClass::ALL {
        if cfg.watch.tasks_for(class).iter().any(|t| t.trim().is_empty()) {
            return Err(config_error(format!(
                "[watch].{} contains an empty task name",
                class.label()
            )));
        }
    }
    Ok(())
}

/// Parse a browser version like `"13"`, `"13.1"` or `"13.1.2"` into the
/// packed `major << 16 | minor << 8 | patch` form used for CSS targets.
pub fn parse_browser_version(version: &str) -> Option<u32> {
    let mut parts = version.trim().split('.');
    let major: u32 = parts.next()?.parse().ok()?;
    let minor: u32 = match parts.next() {
        Some(p) => p.parse().ok()?,
        None => 0,
    };
    let patch: u32 = match parts.next() {
        Some(p) => p.parse().ok()?,
        None => 0,
    };
    if parts.next().is_some() || minor > 255 || patch > 255 || major > 255 {
        return None;
    }
    Some((major << 16) | (minor << 8) | patch)
}
