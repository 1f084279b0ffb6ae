// src/stage/images.rs

//! Raster image stages backed by the `image` crate.
//!
//! Both stages list the image source root directly (no glob) and keep only
//! whitelisted extensions. Each image is its own unit, so one corrupt file
//! fails alone.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader};
use tracing::debug;

use crate::config::{ConfigFile, ConvertSection, ResizeVariant};
use crate::stage::{renamed, InputMode, OutputArtifact, StageEnv, StageUnit, TransformStage};
use crate::types::{AssetClass, TargetFormat};

fn source_extension(source: &Path) -> Result<String> {
    source
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("{:?} has no file extension", source))
}

fn decode(source: &Path, bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes).with_context(|| format!("decoding {:?}", source))
}

/// Width read from the image header, without decoding the pixels.
fn header_width(source: &Path, bytes: &[u8]) -> Result<u32> {
    let (width, _) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .with_context(|| format!("reading {:?}", source))?
        .into_dimensions()
        .with_context(|| format!("decoding {:?}", source))?;
    Ok(width)
}

/// Whether a `width` output is produced from an `orig_w` wide original.
fn produces(orig_w: u32, width: u32, upscale: bool) -> bool {
    orig_w >= width || upscale
}

/// Scale `img` to `width`, keeping the aspect ratio.
///
/// `None` when the image is narrower than `width` and upscaling is off.
/// Equal widths are passed through untouched.
fn scale_to_width(img: &DynamicImage, width: u32, upscale: bool) -> Option<DynamicImage> {
    let (orig_w, orig_h) = img.dimensions();
    if !produces(orig_w, width, upscale) {
        return None;
    }
    if orig_w == width {
        return Some(img.clone());
    }
    let height = ((orig_h as u64 * width as u64) / orig_w.max(1) as u64).max(1) as u32;
    Some(img.resize_exact(width, height, FilterType::Lanczos3))
}

fn encode(img: &DynamicImage, format: TargetFormat) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    // JPEG has no alpha channel and the WebP encoder only takes 8-bit buffers.
    let result = match format {
        TargetFormat::Jpeg => {
            DynamicImage::ImageRgb8(img.to_rgb8()).write_to(&mut buf, format.image_format())
        }
        TargetFormat::Webp => {
            DynamicImage::ImageRgba8(img.to_rgba8()).write_to(&mut buf, format.image_format())
        }
        TargetFormat::Png => img.write_to(&mut buf, format.image_format()),
    };
    result.with_context(|| format!("encoding {}", format.extension()))?;
    Ok(buf.into_inner())
}

/// `true` when every planned output exists and is newer than `source`.
///
/// `planned` holds only the outputs the no-upscale rule lets through, so an
/// empty plan has nothing left to write.
fn outputs_up_to_date(source: &Path, planned: &[PathBuf], env: &StageEnv) -> bool {
    let Some(src_time) = env.fs.modified(source) else {
        return false;
    };
    planned.iter().all(|rel| {
        env.fs
            .modified(&env.out_root.join(rel))
            .map(|out_time| out_time > src_time)
            .unwrap_or(false)
    })
}

fn single_input<'a>(unit: &'a StageUnit) -> Result<&'a PathBuf> {
    unit.inputs
        .first()
        .ok_or_else(|| anyhow!("image unit '{}' has no input", unit.label))
}

/// Multi-width resize, keeping the source format.
///
/// `photo.jpg` with variants `480:-sm, 768:-md` becomes `photo-sm.jpg` and
/// `photo-md.jpg`. Variants wider than the original are skipped unless
/// `upscale` is set.
#[derive(Debug, Clone)]
pub struct ResizeImages {
    variants: Vec<ResizeVariant>,
    upscale: bool,
    extensions: Vec<String>,
    only_newer: bool,
}

impl ResizeImages {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let images = cfg.images();
        Self {
            variants: images.resize.variants.clone(),
            upscale: images.resize.upscale,
            extensions: images.extensions.clone(),
            only_newer: images.only_newer,
        }
    }

    /// Outputs an `orig_w` wide source ends up with.
    fn planned(&self, relative: &Path, ext: &str, orig_w: u32) -> Vec<PathBuf> {
        self.variants
            .iter()
            .filter(|v| produces(orig_w, v.width, self.upscale))
            .map(|v| renamed(relative, &v.suffix, ext))
            .collect()
    }
}

impl TransformStage for ResizeImages {
    fn name(&self) -> &str {
        "resize-images"
    }

    fn class(&self) -> AssetClass {
        AssetClass::Image
    }

    fn input_mode(&self) -> InputMode {
        InputMode::Listing(self.extensions.clone())
    }

    fn apply(&self, unit: &StageUnit, env: &StageEnv) -> Result<Vec<OutputArtifact>> {
        let source = single_input(unit)?;
        let relative = env.relative_source(source);
        let ext = source_extension(source)?;
        let format = TargetFormat::from_extension(&ext)
            .ok_or_else(|| anyhow!("unsupported image format: {ext}"))?;

        let bytes = env.fs.read(source)?;
        if self.only_newer {
            let planned = self.planned(&relative, &ext, header_width(source, &bytes)?);
            if outputs_up_to_date(source, &planned, env) {
                debug!(file = %unit.label, "outputs up to date; skipping");
                return Ok(Vec::new());
            }
        }

        let img = decode(source, &bytes)?;
        let mut artifacts = Vec::with_capacity(self.variants.len());
        for variant in self.variants.iter() {
            let Some(scaled) = scale_to_width(&img, variant.width, self.upscale) else {
                debug!(
                    file = %unit.label,
                    width = variant.width,
                    original = img.width(),
                    "skipping variant wider than original"
                );
                continue;
            };
            let out_rel = renamed(&relative, &variant.suffix, &ext);
            artifacts.push(OutputArtifact::new(out_rel, encode(&scaled, format)?));
        }

        debug!(file = %unit.label, outputs = artifacts.len(), "resized image");
        Ok(artifacts)
    }
}

/// Re-encode each image to one target format at a fixed width.
#[derive(Debug, Clone)]
pub struct ConvertImages {
    convert: ConvertSection,
    extensions: Vec<String>,
    only_newer: bool,
}

impl ConvertImages {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let images = cfg.images();
        Self {
            convert: images.convert.clone(),
            extensions: images.extensions.clone(),
            only_newer: images.only_newer,
        }
    }

    fn output_for(&self, relative: &Path) -> PathBuf {
        renamed(relative, &self.convert.suffix, self.convert.format.extension())
    }
}

impl TransformStage for ConvertImages {
    fn name(&self) -> &str {
        "convert-images"
    }

    fn class(&self) -> AssetClass {
        AssetClass::Image
    }

    fn input_mode(&self) -> InputMode {
        InputMode::Listing(self.extensions.clone())
    }

    fn apply(&self, unit: &StageUnit, env: &StageEnv) -> Result<Vec<OutputArtifact>> {
        let source = single_input(unit)?;
        let relative = env.relative_source(source);
        let out_rel = self.output_for(&relative);

        let bytes = env.fs.read(source)?;
        if self.only_newer {
            let orig_w = header_width(source, &bytes)?;
            let planned = if produces(orig_w, self.convert.width, self.convert.upscale) {
                vec![out_rel.clone()]
            } else {
                Vec::new()
            };
            if outputs_up_to_date(source, &planned, env) {
                debug!(file = %unit.label, "output up to date; skipping");
                return Ok(Vec::new());
            }
        }

        let img = decode(source, &bytes)?;
        let Some(scaled) = scale_to_width(&img, self.convert.width, self.convert.upscale) else {
            debug!(
                file = %unit.label,
                width = self.convert.width,
                original = img.width(),
                "image narrower than target; skipping"
            );
            return Ok(Vec::new());
        };

        let bytes = encode(&scaled, self.convert.format)?;
        debug!(file = %unit.label, output = ?out_rel, "converted image");
        Ok(vec![OutputArtifact::new(out_rel, bytes)])
    }
}
