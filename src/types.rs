use std::fmt;

use serde::Deserialize;

/// The three kinds of source assets the pipeline knows about.
///
/// Each class maps to one source root, one source glob and one output
/// directory (see [`crate::config::ClassPaths`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Style,
    Script,
    Image,
}

impl AssetClass {
    pub const ALL: [AssetClass; 3] = [AssetClass::Style, AssetClass::Script, AssetClass::Image];

    /// Plural label used in task names and config sections (`styles`, ...).
    pub fn label(self) -> &'static str {
        match self {
            AssetClass::Style => "styles",
            AssetClass::Script => "scripts",
            AssetClass::Image => "images",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raster format an image stage encodes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Webp,
    Png,
    #[serde(alias = "jpg")]
    Jpeg,
}

impl Default for TargetFormat {
    fn default() -> Self {
        TargetFormat::Webp
    }
}

impl TargetFormat {
    /// File extension written for this format (without the dot).
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Webp => "webp",
            TargetFormat::Png => "png",
            TargetFormat::Jpeg => "jpg",
        }
    }

    pub fn image_format(self) -> image::ImageFormat {
        match self {
            TargetFormat::Webp => image::ImageFormat::WebP,
            TargetFormat::Png => image::ImageFormat::Png,
            TargetFormat::Jpeg => image::ImageFormat::Jpeg,
        }
    }

    /// Map a source file extension onto the format it is re-encoded with.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "webp" => Some(TargetFormat::Webp),
            "png" => Some(TargetFormat::Png),
            "jpg" | "jpeg" => Some(TargetFormat::Jpeg),
            _ => None,
        }
    }
}
