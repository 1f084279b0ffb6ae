#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use assetdag::config::ConfigFile;
use assetdag::dag::TaskGraph;
use assetdag::exec::{PipelineContext, TaskExecutor};
use assetdag::fs::{FileSystem, RealFileSystem};
use image::{Rgb, RgbImage};
use tempfile::TempDir;

/// A throwaway project directory on the real filesystem.
pub struct ProjectFixture {
    _dir: TempDir,
    root: PathBuf,
}

impl ProjectFixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let root = dir.path().canonicalize().expect("canonicalize temp dir");
        Self { _dir: dir, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, contents).expect("write fixture file");
        path
    }

    pub fn mkdir(&self, rel: &str) -> PathBuf {
        let path = self.path(rel);
        fs::create_dir_all(&path).expect("create dir");
        path
    }

    /// A gradient image; the format follows the file extension.
    pub fn write_image(&self, rel: &str, width: u32, height: u32) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        img.save(&path).expect("encode fixture image");
        path
    }

    /// Bytes no decoder accepts, under an image extension.
    pub fn write_corrupt(&self, rel: &str) -> PathBuf {
        self.write(rel, "this is not an image")
    }

    pub fn read_string(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).expect("read output file")
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    /// Sorted entry names of a directory; empty when it does not exist.
    pub fn list(&self, rel: &str) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.path(rel)) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub fn image_width(&self, rel: &str) -> u32 {
        image::image_dimensions(self.path(rel))
            .expect("read image dimensions")
            .0
    }

    /// Context over the real filesystem, without a runtime channel.
    pub fn context(&self, cfg: ConfigFile) -> Arc<PipelineContext> {
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        Arc::new(PipelineContext::new(self.root.clone(), Arc::new(cfg), fs))
    }

    /// Executor over the standard task graph for this project.
    pub fn executor(&self, cfg: ConfigFile) -> TaskExecutor {
        let graph = TaskGraph::standard(&cfg, &self.root).expect("standard task graph");
        TaskExecutor::new(Arc::new(graph), self.context(cfg))
    }
}

impl Default for ProjectFixture {
    fn default() -> Self {
        Self::new()
    }
}
