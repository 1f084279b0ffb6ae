// src/stage/styles.rs

//! SCSS -> CSS stages.
//!
//! Compilation is done by `grass`; vendor prefixing, minification and the
//! source map come from `lightningcss`. The readable and the minified
//! variants are separate stages so each can run (and fail) on its own.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::SourceMap;
use tracing::debug;

use crate::config::{parse_browser_version, ConfigFile};
use crate::stage::{
    renamed, source_map_comment, OutputArtifact, StageEnv, StageUnit, TransformStage,
};
use crate::types::AssetClass;

/// Options shared by both style stages.
#[derive(Debug, Clone)]
pub struct StyleOptions {
    pub browsers: Browsers,
    pub source_maps: bool,
    pub minified_suffix: String,
    pub load_paths: Vec<PathBuf>,
}

impl StyleOptions {
    pub fn from_config(cfg: &ConfigFile, root: &Path) -> Self {
        let styles = cfg.styles();
        Self {
            browsers: browsers_from_targets(styles.targets.iter()),
            source_maps: styles.source_maps,
            minified_suffix: styles.minified_suffix.clone(),
            load_paths: styles.load_paths.iter().map(|p| root.join(p)).collect(),
        }
    }
}

/// Build `lightningcss` browser targets from `name -> version` pairs.
///
/// Unknown names and unparsable versions are ignored here; config
/// validation rejects them earlier.
pub fn browsers_from_targets<'a>(
    targets: impl IntoIterator<Item = (&'a String, &'a String)>,
) -> Browsers {
    let mut browsers = Browsers::default();
    for (name, version) in targets {
        let Some(v) = parse_browser_version(version) else {
            continue;
        };
        match name.as_str() {
            "android" => browsers.android = Some(v),
            "chrome" => browsers.chrome = Some(v),
            "edge" => browsers.edge = Some(v),
            "firefox" => browsers.firefox = Some(v),
            "ie" => browsers.ie = Some(v),
            "ios_saf" => browsers.ios_saf = Some(v),
            "opera" => browsers.opera = Some(v),
            "safari" => browsers.safari = Some(v),
            "samsung" => browsers.samsung = Some(v),
            _ => {}
        }
    }
    browsers
}

fn is_partial(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('_'))
        .unwrap_or(false)
}

/// One unit per non-partial stylesheet.
fn style_units(sources: Vec<PathBuf>) -> Vec<StageUnit> {
    sources
        .into_iter()
        .filter(|p| {
            let partial = is_partial(p);
            if partial {
                debug!(file = ?p, "skipping partial");
            }
            !partial
        })
        .map(StageUnit::single)
        .collect()
}

/// Compile one SCSS file to expanded CSS.
fn compile_scss(source: &Path, env: &StageEnv, opts: &StyleOptions) -> Result<String> {
    let input = env.fs.read_to_string(source)?;

    let mut options = grass::Options::default().style(grass::OutputStyle::Expanded);
    if let Some(dir) = source.parent() {
        options = options.load_path(dir);
    }
    options = options.load_path(&env.src_root);
    for path in opts.load_paths.iter() {
        options = options.load_path(path);
    }

    grass::from_string(input, &options).map_err(|e| anyhow!("{e}"))
}

/// Prefix (and optionally minify) compiled CSS.
///
/// lightningcss adds vendor prefixes in its rule-level `minify` pass, so the
/// readable output also gets that pass: identical rules merge, longhands
/// fold into shorthands and colours are normalized. `minify` here only
/// controls the printer (whitespace).
///
/// Returns the printed CSS and, when requested, the source map JSON.
fn prefix_css(
    css: &str,
    filename: &str,
    opts: &StyleOptions,
    minify: bool,
) -> Result<(String, Option<String>)> {
    let targets = Targets::from(opts.browsers);

    let mut sheet = StyleSheet::parse(
        css,
        ParserOptions {
            filename: filename.to_string(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| anyhow!("{e}"))?;

    sheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| anyhow!("{e}"))?;

    let mut source_map = opts.source_maps.then(|| SourceMap::new("/"));

    let printed = sheet
        .to_css(PrinterOptions {
            minify,
            targets,
            source_map: source_map.as_mut(),
            ..PrinterOptions::default()
        })
        .map_err(|e| anyhow!("{e}"))?;

    let map_json = match source_map.as_mut() {
        Some(map) => Some(map.to_json(None).map_err(|e| anyhow!("{e:?}"))?),
        None => None,
    };

    Ok((printed.code, map_json))
}

fn build_css(
    unit: &StageUnit,
    env: &StageEnv,
    opts: &StyleOptions,
    minify: bool,
    suffix: &str,
) -> Result<Vec<OutputArtifact>> {
    let source = unit
        .inputs
        .first()
        .ok_or_else(|| anyhow!("style unit '{}' has no input", unit.label))?;

    let relative = env.relative_source(source);
    let out_rel = renamed(&relative, suffix, "css");

    let compiled = compile_scss(source, env, opts)?;
    let (mut code, map) = prefix_css(&compiled, &relative.to_string_lossy(), opts, minify)?;

    if map.is_some() {
        code.push_str(&source_map_comment(&out_rel, true));
    }

    debug!(file = %unit.label, output = ?out_rel, minify, "compiled stylesheet");
    Ok(vec![OutputArtifact::new(out_rel, code).with_source_map(map)])
}

/// Expanded, autoprefixed CSS: `a.scss` -> `a.css`.
#[derive(Debug, Clone)]
pub struct ReadableStyles {
    opts: StyleOptions,
}

impl ReadableStyles {
    pub fn new(opts: StyleOptions) -> Self {
        Self { opts }
    }
}

impl TransformStage for ReadableStyles {
    fn name(&self) -> &str {
        "styles"
    }

    fn class(&self) -> AssetClass {
        AssetClass::Style
    }

    fn units(&self, sources: Vec<PathBuf>, _env: &StageEnv) -> Vec<StageUnit> {
        style_units(sources)
    }

    fn apply(&self, unit: &StageUnit, env: &StageEnv) -> Result<Vec<OutputArtifact>> {
        build_css(unit, env, &self.opts, false, "")
    }
}

/// Autoprefixed and minified CSS: `a.scss` -> `a.min.css`.
#[derive(Debug, Clone)]
pub struct MinifiedStyles {
    opts: StyleOptions,
}

impl MinifiedStyles {
    pub fn new(opts: StyleOptions) -> Self {
        Self { opts }
    }
}

impl TransformStage for MinifiedStyles {
    fn name(&self) -> &str {
        "styles-minified"
    }

    fn class(&self) -> AssetClass {
        AssetClass::Style
    }

    fn units(&self, sources: Vec<PathBuf>, _env: &StageEnv) -> Vec<StageUnit> {
        style_units(sources)
    }

    fn apply(&self, unit: &StageUnit, env: &StageEnv) -> Result<Vec<OutputArtifact>> {
        let suffix = self.opts.minified_suffix.clone();
        build_css(unit, env, &self.opts, true, &suffix)
    }
}
