// src/resolve.rs

//! Source discovery for each asset class.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use globset::{Glob, GlobMatcher};
use tracing::debug;

use crate::config::ConfigFile;
use crate::fs::FileSystem;
use crate::types::AssetClass;
use crate::watch::path_utils::relative_str;

/// Resolves configured globs to source files.
///
/// All returned paths are `root`-joined. Directory entries are visited in
/// sorted order, so a fixed filesystem snapshot always yields the same list.
#[derive(Debug, Clone)]
pub struct PathResolver {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    config: Arc<ConfigFile>,
}

impl PathResolver {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>, config: Arc<ConfigFile>) -> Self {
        Self {
            fs,
            root: root.into(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute source root of a class.
    pub fn source_root(&self, class: AssetClass) -> PathBuf {
        self.root.join(&self.config.paths_for(class).src)
    }

    /// Absolute output directory of a class.
    pub fn output_root(&self, class: AssetClass) -> PathBuf {
        self.root.join(&self.config.paths_for(class).out)
    }

    /// Files of `class` matching its glob. Empty when nothing matches or the
    /// source root does not exist.
    pub fn resolve(&self, class: AssetClass) -> Result<Vec<PathBuf>> {
        let paths = self.config.paths_for(class);
        let matcher = Glob::new(&paths.glob)
            .with_context(|| format!("invalid glob pattern: {}", paths.glob))?
            .compile_matcher();

        let base = self.source_root(class);
        let mut files = Vec::new();
        if self.fs.is_dir(&base) {
            self.walk(&base, &matcher, &mut files)?;
        }

        debug!(class = %class, count = files.len(), "resolved sources");
        Ok(files)
    }

    fn walk(&self, dir: &Path, matcher: &GlobMatcher, out: &mut Vec<PathBuf>) -> Result<()> {
        let mut entries = self.fs.read_dir(dir)?;
        entries.sort();

        for path in entries {
            if self.fs.is_dir(&path) {
                self.walk(&path, matcher, out)?;
            } else if self.fs.is_file(&path) {
                if let Some(rel) = relative_str(&self.root, &path) {
                    if matcher.is_match(&rel) {
                        out.push(path);
                    }
                }
            }
        }
        Ok(())
    }

    /// Non-recursive listing of `dir` keeping only whitelisted extensions
    /// (compared case-insensitively, without the dot).
    ///
    /// The image stages read their inputs this way instead of via the glob.
    pub fn list_direct(&self, dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
        if !self.fs.is_dir(dir) {
            return Ok(Vec::new());
        }

        let mut entries = self.fs.read_dir(dir)?;
        entries.sort();

        Ok(entries
            .into_iter()
            .filter(|p| self.fs.is_file(p))
            .filter(|p| has_listed_extension(p, extensions))
            .collect())
    }
}

fn has_listed_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}
