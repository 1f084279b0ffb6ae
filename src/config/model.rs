use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{AssetClass, TargetFormat};

/// Top-level configuration as read from `Assetdag.toml`.
///
/// ```toml
/// [config]
/// jobs = 4
///
/// [styles]
/// src = "src/scss"
/// glob = "src/scss/**/*.scss"
/// out = "build/css"
///
/// [images.resize]
/// variants = [{ width = 480, suffix = "-sm" }]
/// ```
///
/// Every section is optional; a missing file behaves like an empty one.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub styles: StyleSection,

    #[serde(default)]
    pub scripts: ScriptSection,

    #[serde(default)]
    pub images: ImageSection,

    #[serde(default)]
    pub watch: WatchSection,
}

/// Validated configuration.
///
/// Only obtainable through `ConfigFile::try_from(RawConfigFile)`, which runs
/// the checks in [`crate::config::validate`].
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    styles: StyleSection,
    scripts: ScriptSection,
    images: ImageSection,
    watch: WatchSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            config: raw.config,
            styles: raw.styles,
            scripts: raw.scripts,
            images: raw.images,
            watch: raw.watch,
        }
    }

    pub fn global(&self) -> &ConfigSection {
        &self.config
    }

    pub fn styles(&self) -> &StyleSection {
        &self.styles
    }

    pub fn scripts(&self) -> &ScriptSection {
        &self.scripts
    }

    pub fn images(&self) -> &ImageSection {
        &self.images
    }

    pub fn watch(&self) -> &WatchSection {
        &self.watch
    }

    /// Source root, glob and output directory for one asset class.
    pub fn paths_for(&self, class: AssetClass) -> &ClassPaths {
        match class {
            AssetClass::Style => &self.styles.paths,
            AssetClass::Script => &self.scripts.paths,
            AssetClass::Image => &self.images.paths,
        }
    }

    /// Effective worker pool size.
    pub fn jobs(&self) -> usize {
        self.config.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Override the worker pool size (from `--jobs`).
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.config.jobs = Some(jobs.max(1));
        self
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(RawConfigFile::default())
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// Maximum number of stage items transformed at the same time.
    ///
    /// Defaults to the number of available CPUs.
    #[serde(default)]
    pub jobs: Option<usize>,

    /// Window in which filesystem events are merged into one batch.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// How many re-runs of a busy task may be queued by the watcher.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,
}

fn default_debounce_ms() -> u64 {
    150
}

fn default_queue_length() -> usize {
    1
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            jobs: None,
            debounce_ms: default_debounce_ms(),
            queue_length: default_queue_length(),
        }
    }
}

/// Where one asset class lives on disk, relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassPaths {
    /// Source root, e.g. `src/scss`.
    pub src: String,
    /// Glob over root-relative paths, e.g. `src/scss/**/*.scss`.
    pub glob: String,
    /// Output directory, e.g. `build/css`.
    pub out: String,
}

impl ClassPaths {
    fn new(src: &str, glob: &str, out: &str) -> Self {
        Self {
            src: src.to_string(),
            glob: glob.to_string(),
            out: out.to_string(),
        }
    }
}

/// `[styles]` section.
#[derive(Debug, Clone)]
pub struct StyleSection {
    pub paths: ClassPaths,
    pub source_maps: bool,
    pub minified_suffix: String,
    /// Browser name -> minimum version, used for vendor prefixing.
    pub targets: BTreeMap<String, String>,
    /// Extra directories searched by `@use` / `@import`.
    pub load_paths: Vec<String>,
}

impl Default for StyleSection {
    fn default() -> Self {
        Self {
            paths: ClassPaths::new("src/scss", "src/scss/**/*.scss", "build/css"),
            source_maps: true,
            minified_suffix: default_min_suffix(),
            targets: default_browser_targets(),
            load_paths: Vec::new(),
        }
    }
}

/// Browser floor roughly matching the autoprefixer "defaults" query.
pub fn default_browser_targets() -> BTreeMap<String, String> {
    [
        ("chrome", "80"),
        ("edge", "80"),
        ("firefox", "78"),
        ("safari", "13"),
        ("ios_saf", "13"),
        ("samsung", "12"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_min_suffix() -> String {
    ".min".to_string()
}

/// `[scripts]` section.
#[derive(Debug, Clone)]
pub struct ScriptSection {
    pub paths: ClassPaths,
    pub source_maps: bool,
    pub minified_suffix: String,
    /// Base name of the minified bundle (`bundle` -> `bundle.min.js`).
    pub bundle: String,
}

impl Default for ScriptSection {
    fn default() -> Self {
        Self {
            paths: ClassPaths::new("src/js", "src/js/**/*.js", "build/js"),
            source_maps: true,
            minified_suffix: default_min_suffix(),
            bundle: "bundle".to_string(),
        }
    }
}

/// `[images]` section.
#[derive(Debug, Clone)]
pub struct ImageSection {
    pub paths: ClassPaths,
    /// Lower-case extensions (no dot) the image stages accept.
    pub extensions: Vec<String>,
    /// Skip an image whose outputs are all newer than it.
    pub only_newer: bool,
    pub resize: ResizeSection,
    pub convert: ConvertSection,
}

impl Default for ImageSection {
    fn default() -> Self {
        Self {
            paths: ClassPaths::new("src/img", "src/img/**/*", "build/img"),
            extensions: vec!["jpg".into(), "jpeg".into(), "png".into()],
            only_newer: true,
            resize: ResizeSection::default(),
            convert: ConvertSection::default(),
        }
    }
}

/// `[images.resize]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResizeSection {
    #[serde(default)]
    pub upscale: bool,
    #[serde(default = "default_variants")]
    pub variants: Vec<ResizeVariant>,
}

impl Default for ResizeSection {
    fn default() -> Self {
        Self {
            upscale: false,
            variants: default_variants(),
        }
    }
}

/// One output size of the resize stage.
///
/// An empty suffix keeps the source basename unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResizeVariant {
    pub width: u32,
    #[serde(default)]
    pub suffix: String,
}

fn default_variants() -> Vec<ResizeVariant> {
    vec![
        ResizeVariant { width: 480, suffix: "-sm".into() },
        ResizeVariant { width: 768, suffix: "-md".into() },
        ResizeVariant { width: 1280, suffix: "-lg".into() },
    ]
}

/// `[images.convert]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConvertSection {
    #[serde(default)]
    pub format: TargetFormat,
    #[serde(default = "default_convert_width")]
    pub width: u32,
    #[serde(default)]
    pub suffix: String,
    #[serde(default)]
    pub upscale: bool,
}

fn default_convert_width() -> u32 {
    480
}

impl Default for ConvertSection {
    fn default() -> Self {
        Self {
            format: TargetFormat::default(),
            width: default_convert_width(),
            suffix: String::new(),
            upscale: false,
        }
    }
}

/// `[watch]` section: which tasks each asset class re-runs on change.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    #[serde(default = "default_watch_styles")]
    pub styles: Vec<String>,
    #[serde(default = "default_watch_scripts")]
    pub scripts: Vec<String>,
    #[serde(default = "default_watch_images")]
    pub images: Vec<String>,
}

impl WatchSection {
    pub fn tasks_for(&self, class: AssetClass) -> &[String] {
        match class {
            AssetClass::Style => &self.styles,
            AssetClass::Script => &self.scripts,
            AssetClass::Image => &self.images,
        }
    }
}

fn default_watch_styles() -> Vec<String> {
    vec!["build-styles".into(), "build-styles-minified".into()]
}

fn default_watch_scripts() -> Vec<String> {
    vec!["build-scripts".into(), "build-scripts-minified".into()]
}

fn default_watch_images() -> Vec<String> {
    vec!["resize-images".into(), "convert-images".into()]
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            styles: default_watch_styles(),
            scripts: default_watch_scripts(),
            images: default_watch_images(),
        }
    }
}

// The per-class sections flatten their paths, and each class has different
// path defaults, so they are deserialized through small shadow structs.

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StyleSectionDe {
    src: Option<String>,
    glob: Option<String>,
    out: Option<String>,
    source_maps: Option<bool>,
    minified_suffix: Option<String>,
    targets: Option<BTreeMap<String, String>>,
    #[serde(default)]
    load_paths: Vec<String>,
}

impl<'de> Deserialize<'de> for StyleSection {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let de = StyleSectionDe::deserialize(d)?;
        let base = StyleSection::default();
        Ok(StyleSection {
            paths: merge_paths(base.paths, de.src, de.glob, de.out),
            source_maps: de.source_maps.unwrap_or(base.source_maps),
            minified_suffix: de.minified_suffix.unwrap_or(base.minified_suffix),
            targets: de.targets.unwrap_or(base.targets),
            load_paths: de.load_paths,
        })
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptSectionDe {
    src: Option<String>,
    glob: Option<String>,
    out: Option<String>,
    source_maps: Option<bool>,
    minified_suffix: Option<String>,
    bundle: Option<String>,
}

impl<'de> Deserialize<'de> for ScriptSection {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let de = ScriptSectionDe::deserialize(d)?;
        let base = ScriptSection::default();
        Ok(ScriptSection {
            paths: merge_paths(base.paths, de.src, de.glob, de.out),
            source_maps: de.source_maps.unwrap_or(base.source_maps),
            minified_suffix: de.minified_suffix.unwrap_or(base.minified_suffix),
            bundle: de.bundle.unwrap_or(base.bundle),
        })
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ImageSectionDe {
    src: Option<String>,
    glob: Option<String>,
    out: Option<String>,
    extensions: Option<Vec<String>>,
    only_newer: Option<bool>,
    #[serde(default)]
    resize: ResizeSection,
    #[serde(default)]
    convert: ConvertSection,
}

impl<'de> Deserialize<'de> for ImageSection {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let de = ImageSectionDe::deserialize(d)?;
        let base = ImageSection::default();
        Ok(ImageSection {
            paths: merge_paths(base.paths, de.src, de.glob, de.out),
            extensions: de
                .extensions
                .map(|exts| {
                    exts.into_iter()
                        .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                        .collect()
                })
                .unwrap_or(base.extensions),
            only_newer: de.only_newer.unwrap_or(base.only_newer),
            resize: de.resize,
            convert: de.convert,
        })
    }
}

/// Apply user overrides on top of class defaults.
///
/// Moving only `src` also moves the default glob along with it, so
/// `src = "assets/scss"` alone keeps working.
fn merge_paths(
    base: ClassPaths,
    src: Option<String>,
    glob: Option<String>,
    out: Option<String>,
) -> ClassPaths {
    let glob = match (&src, glob) {
        (_, Some(glob)) => glob,
        (Some(new_src), None) => {
            let tail = base.glob.strip_prefix(base.src.as_str()).unwrap_or("/**/*");
            format!("{}{}", new_src.trim_end_matches('/'), tail)
        }
        (None, None) => base.glob,
    };
    ClassPaths {
        src: src.unwrap_or(base.src),
        glob,
        out: out.unwrap_or(base.out),
    }
}
