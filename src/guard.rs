// src/guard.rs

//! Folder existence checks run before every stage.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::errors::{PipelineError, Result};
use crate::fs::FileSystem;

/// Result of [`FolderGuard::ensure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ensured {
    /// `true` when the directory did not exist and was created by this call.
    pub created: bool,
}

/// State of an input directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFolder {
    Present,
    Missing,
}

/// Makes sure output folders exist and reports on input folders.
#[derive(Debug, Clone)]
pub struct FolderGuard {
    fs: Arc<dyn FileSystem>,
}

impl FolderGuard {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Create `path` (recursively) unless it already exists.
    ///
    /// Failure to create is the one fatal condition for a task.
    pub fn ensure(&self, path: &Path) -> Result<Ensured> {
        if self.fs.is_dir(path) {
            return Ok(Ensured { created: false });
        }

        match self.fs.create_dir_all(path) {
            Ok(()) => {
                info!(folder = ?path, "created missing folder");
                Ok(Ensured { created: true })
            }
            Err(err) => {
                error!(folder = ?path, error = %err, "failed to create folder");
                Err(PipelineError::FolderCreation {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    /// Check an input folder. A missing one is logged as a warning and is
    /// never an error; callers turn it into a no-op.
    pub fn check_input(&self, path: &Path, label: &str) -> InputFolder {
        if self.fs.is_dir(path) {
            InputFolder::Present
        } else {
            warn!(folder = ?path, "{label} folder does not exist; nothing to do");
            InputFolder::Missing
        }
    }
}
