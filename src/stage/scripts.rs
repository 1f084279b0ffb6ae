// src/stage/scripts.rs

//! JavaScript stages backed by `oxc`.
//!
//! - [`ReadableScripts`] re-prints every file on its own (beautified).
//! - [`MinifiedScripts`] concatenates all sources into one bundle, then
//!   compresses and mangles it.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;
use parcel_sourcemap::{OriginalLocation, SourceMap};
use tracing::debug;

use crate::config::ConfigFile;
use crate::stage::{
    renamed, source_map_comment, OutputArtifact, StageEnv, StageUnit, TransformStage,
};
use crate::types::AssetClass;

#[derive(Debug, Clone)]
pub struct ScriptOptions {
    pub source_maps: bool,
    pub minified_suffix: String,
    pub bundle: String,
}

impl ScriptOptions {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let scripts = cfg.scripts();
        Self {
            source_maps: scripts.source_maps,
            minified_suffix: scripts.minified_suffix.clone(),
            bundle: scripts.bundle.clone(),
        }
    }
}

/// Parse errors are joined into one message so the unit failure names them all.
fn parse_failure<E: std::fmt::Display>(label: &str, errors: &[E]) -> anyhow::Error {
    let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    anyhow!("failed to parse {label}: {}", messages.join("; "))
}

/// Parse and re-print `source` without compression.
fn beautify_js(source: &str, label: &str) -> Result<String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::mjs()).parse();
    if !ret.errors.is_empty() {
        return Err(parse_failure(label, &ret.errors));
    }
    Ok(Codegen::new().build(&ret.program).code)
}

/// Compress + mangle `source`; optionally emit a source map naming `map_source`.
fn minify_js(source: &str, label: &str, map_source: Option<&Path>) -> Result<(String, Option<String>)> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::mjs()).parse();
    if !ret.errors.is_empty() {
        return Err(parse_failure(label, &ret.errors));
    }

    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);

    let output = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            source_map_path: map_source.map(Path::to_path_buf),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program);

    let map = output.map.map(|m| m.to_json_string());
    Ok((output.code, map))
}

/// Where one input file starts in the joined bundle text.
struct BundleSegment {
    source: String,
    first_line: u32,
    lines: u32,
    content: String,
}

/// Rewrite a map over the joined bundle text so it points into the real
/// input files. Sources are named relative to the script source root and
/// carry their content.
fn remap_to_inputs(map_json: &str, segments: &[BundleSegment]) -> Result<String> {
    let joined = SourceMap::from_json("/", map_json).map_err(|e| anyhow!("{e}"))?;
    let mut out = SourceMap::new("/");
    for segment in segments.iter() {
        let index = out.add_source(&segment.source);
        out.set_source_content(index as usize, &segment.content)
            .map_err(|e| anyhow!("{e}"))?;
    }

    for mapping in joined.get_mappings() {
        let original = mapping.original.and_then(|loc| {
            let index = segments
                .partition_point(|s| s.first_line <= loc.original_line)
                .checked_sub(1)?;
            let line = loc.original_line - segments[index].first_line;
            // The `;` separator between files has no source of its own.
            if line >= segments[index].lines {
                return None;
            }
            let name = loc
                .name
                .and_then(|n| joined.get_name(n).ok())
                .map(|n| out.add_name(n));
            Some(OriginalLocation::new(
                line,
                loc.original_column,
                index as u32,
                name,
            ))
        });
        out.add_mapping(mapping.generated_line, mapping.generated_column, original);
    }

    out.to_json(None).map_err(|e| anyhow!("{e}"))
}

/// Beautified per-file output: `src/js/a.js` -> `build/js/a.js`.
#[derive(Debug, Clone, Default)]
pub struct ReadableScripts;

impl ReadableScripts {
    pub fn new() -> Self {
        Self
    }
}

impl TransformStage for ReadableScripts {
    fn name(&self) -> &str {
        "scripts"
    }

    fn class(&self) -> AssetClass {
        AssetClass::Script
    }

    fn apply(&self, unit: &StageUnit, env: &StageEnv) -> Result<Vec<OutputArtifact>> {
        let source = unit
            .inputs
            .first()
            .ok_or_else(|| anyhow!("script unit '{}' has no input", unit.label))?;
        let relative = env.relative_source(source);
        let out_rel = renamed(&relative, "", "js");

        let text = env.fs.read_to_string(source)?;
        let code = beautify_js(&text, &unit.label)?;

        debug!(file = %unit.label, output = ?out_rel, "beautified script");
        Ok(vec![OutputArtifact::new(out_rel, code)])
    }
}

/// Single minified bundle: every source, in resolver order, into
/// `bundle.min.js` (+ `bundle.min.js.map`, which names the input files).
#[derive(Debug, Clone)]
pub struct MinifiedScripts {
    opts: ScriptOptions,
}

impl MinifiedScripts {
    pub fn new(opts: ScriptOptions) -> Self {
        Self { opts }
    }

    fn bundle_path(&self) -> PathBuf {
        renamed(
            Path::new(&format!("{}.js", self.opts.bundle)),
            &self.opts.minified_suffix,
            "js",
        )
    }
}

impl TransformStage for MinifiedScripts {
    fn name(&self) -> &str {
        "scripts-minified"
    }

    fn class(&self) -> AssetClass {
        AssetClass::Script
    }

    fn units(&self, sources: Vec<PathBuf>, _env: &StageEnv) -> Vec<StageUnit> {
        if sources.is_empty() {
            return Vec::new();
        }
        vec![StageUnit {
            label: self.bundle_path().to_string_lossy().into_owned(),
            inputs: sources,
        }]
    }

    fn apply(&self, unit: &StageUnit, env: &StageEnv) -> Result<Vec<OutputArtifact>> {
        let mut joined = String::new();
        let mut segments = Vec::with_capacity(unit.inputs.len());
        let mut line = 0u32;
        for input in unit.inputs.iter() {
            let text = env.fs.read_to_string(input)?;
            joined.push_str(&text);
            let mut lines = text.matches('\n').count() as u32;
            if !text.ends_with('\n') {
                joined.push('\n');
                lines += 1;
            }
            // Keep statements from running into each other across files.
            joined.push_str(";\n");
            segments.push(BundleSegment {
                source: env
                    .relative_source(input)
                    .to_string_lossy()
                    .replace('\\', "/"),
                first_line: line,
                lines,
                content: text,
            });
            line += lines + 1;
        }

        let out_rel = self.bundle_path();
        let bundle_name = format!("{}.js", self.opts.bundle);
        let map_source = self.opts.source_maps.then(|| Path::new(&bundle_name));

        let (mut code, map) = minify_js(&joined, &unit.label, map_source)?;
        let map = match map {
            Some(json) => {
                code.push_str(&source_map_comment(&out_rel, false));
                Some(remap_to_inputs(&json, &segments)?)
            }
            None => None,
        };

        debug!(
            files = unit.inputs.len(),
            output = ?out_rel,
            bytes = code.len(),
            "minified script bundle"
        );
        Ok(vec![OutputArtifact::new(out_rel, code).with_source_map(map)])
    }
}
