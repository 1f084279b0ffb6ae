// src/stage/mod.rs

//! Transform stages.
//!
//! A stage wraps one external transformer (SCSS compiler, CSS/JS minifier,
//! image codec) behind [`TransformStage`]. The stage only turns inputs into
//! [`OutputArtifact`]s; discovery, folder checks, concurrency and writing
//! are handled by the executor and the [`crate::exec::WorkerPool`].
//!
//! - [`styles`]: readable and minified CSS from SCSS.
//! - [`scripts`]: beautified per-file JS and the minified bundle.
//! - [`images`]: multi-width resize and format conversion.

pub mod images;
pub mod scripts;
pub mod styles;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::fs::FileSystem;
use crate::types::AssetClass;

pub use images::{ConvertImages, ResizeImages};
pub use scripts::{MinifiedScripts, ReadableScripts};
pub use styles::{MinifiedStyles, ReadableStyles};

/// One file produced by a stage, relative to the class output directory.
#[derive(Debug, Clone)]
pub struct OutputArtifact {
    pub relative_path: PathBuf,
    pub bytes: Vec<u8>,
    /// Source map JSON, written next to the artifact as `<name>.map`.
    pub source_map: Option<String>,
}

impl OutputArtifact {
    pub fn new(relative_path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            relative_path: relative_path.into(),
            bytes: bytes.into(),
            source_map: None,
        }
    }

    pub fn with_source_map(mut self, map: Option<String>) -> Self {
        self.source_map = map;
        self
    }

    /// Path of the companion source map.
    pub fn map_path(&self) -> PathBuf {
        let mut name = self.relative_path.as_os_str().to_owned();
        name.push(".map");
        PathBuf::from(name)
    }
}

/// Independent piece of work inside a stage. Failures are tracked per unit.
#[derive(Debug, Clone)]
pub struct StageUnit {
    /// Human-readable name used in logs and reports (usually a file name).
    pub label: String,
    pub inputs: Vec<PathBuf>,
}

impl StageUnit {
    pub fn single(path: PathBuf) -> Self {
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            label,
            inputs: vec![path],
        }
    }
}

/// How a stage finds its inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    /// Files matching the class glob, via [`crate::resolve::PathResolver::resolve`].
    Glob,
    /// Direct listing of the source root filtered by extension.
    Listing(Vec<String>),
}

/// What a stage can see while running one unit.
#[derive(Debug, Clone)]
pub struct StageEnv {
    pub fs: Arc<dyn FileSystem>,
    pub src_root: PathBuf,
    pub out_root: PathBuf,
}

impl StageEnv {
    /// Path of `source` relative to the source root (falls back to the file name).
    pub fn relative_source(&self, source: &Path) -> PathBuf {
        source
            .strip_prefix(&self.src_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| source.file_name().map(PathBuf::from).unwrap_or_default())
    }
}

/// Uniform contract over an external transformer.
pub trait TransformStage: Send + Sync + fmt::Debug {
    /// Name used in logs.
    fn name(&self) -> &str;

    fn class(&self) -> AssetClass;

    fn input_mode(&self) -> InputMode {
        InputMode::Glob
    }

    /// Split the discovered sources into units. Default: one unit per file.
    fn units(&self, sources: Vec<PathBuf>, _env: &StageEnv) -> Vec<StageUnit> {
        sources.into_iter().map(StageUnit::single).collect()
    }

    /// Transform one unit. An error here fails this unit only.
    fn apply(&self, unit: &StageUnit, env: &StageEnv) -> Result<Vec<OutputArtifact>>;
}

/// `dir/name.ext` -> `dir/name{suffix}.{ext}`.
pub fn renamed(relative: &Path, suffix: &str, ext: &str) -> PathBuf {
    let stem = relative
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file = format!("{stem}{suffix}.{ext}");
    match relative.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(file),
        _ => PathBuf::from(file),
    }
}

/// Trailing comment pointing a text artifact at its source map.
pub(crate) fn source_map_comment(artifact: &Path, css: bool) -> String {
    let name = artifact
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if css {
        format!("\n/*# sourceMappingURL={name}.map */\n")
    } else {
        format!("\n//# sourceMappingURL={name}.map\n")
    }
}
