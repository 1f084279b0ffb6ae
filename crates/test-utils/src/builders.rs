#![allow(dead_code)]

use assetdag::config::{ConfigFile, RawConfigFile, ResizeVariant};
use assetdag::types::{AssetClass, TargetFormat};

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the built-in conventions (`src/*` -> `build/*`), with one
/// worker and `only_newer` off so repeated runs always transform.
pub struct ConfigBuilder {
    config: RawConfigFile,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        let mut config = RawConfigFile::default();
        config.config.jobs = Some(1);
        config.images.only_newer = false;
        Self { config }
    }

    pub fn jobs(mut self, jobs: usize) -> Self {
        self.config.config.jobs = Some(jobs);
        self
    }

    pub fn queue_length(mut self, len: usize) -> Self {
        self.config.config.queue_length = len;
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.config.debounce_ms = ms;
        self
    }

    /// Source maps for both styles and scripts.
    pub fn source_maps(mut self, on: bool) -> Self {
        self.config.styles.source_maps = on;
        self.config.scripts.source_maps = on;
        self
    }

    /// Replace the browser targets with a single browser.
    pub fn only_browser(mut self, name: &str, version: &str) -> Self {
        self.config.styles.targets.clear();
        self.config
            .styles
            .targets
            .insert(name.to_string(), version.to_string());
        self
    }

    pub fn browser(mut self, name: &str, version: &str) -> Self {
        self.config
            .styles
            .targets
            .insert(name.to_string(), version.to_string());
        self
    }

    pub fn bundle(mut self, stem: &str) -> Self {
        self.config.scripts.bundle = stem.to_string();
        self
    }

    pub fn resize_variants(mut self, variants: &[(u32, &str)]) -> Self {
        self.config.images.resize.variants = variants
            .iter()
            .map(|(width, suffix)| ResizeVariant {
                width: *width,
                suffix: suffix.to_string(),
            })
            .collect();
        self
    }

    pub fn upscale(mut self, on: bool) -> Self {
        self.config.images.resize.upscale = on;
        self.config.images.convert.upscale = on;
        self
    }

    pub fn convert(mut self, format: TargetFormat, width: u32, suffix: &str) -> Self {
        self.config.images.convert.format = format;
        self.config.images.convert.width = width;
        self.config.images.convert.suffix = suffix.to_string();
        self
    }

    pub fn only_newer(mut self, on: bool) -> Self {
        self.config.images.only_newer = on;
        self
    }

    pub fn extensions(mut self, exts: &[&str]) -> Self {
        self.config.images.extensions = exts.iter().map(|e| e.to_string()).collect();
        self
    }

    /// Replace the tasks bound to one asset class.
    pub fn watch(mut self, class: AssetClass, tasks: &[&str]) -> Self {
        let tasks: Vec<String> = tasks.iter().map(|t| t.to_string()).collect();
        match class {
            AssetClass::Style => self.config.watch.styles = tasks,
            AssetClass::Script => self.config.watch.scripts = tasks,
            AssetClass::Image => self.config.watch.images = tasks,
        }
        self
    }

    /// The unvalidated config, for tests that expect validation to fail.
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
