// src/dag/standard.rs

//! The built-in pipeline.
//!
//! ```text
//! styles  = series(clean-styles, build-styles, build-styles-minified)
//! scripts = series(clean-scripts, build-scripts, build-scripts-minified)
//! images  = parallel(resize-images, convert-images)
//! default = parallel(styles, scripts, images, watch)
//! ```

use std::path::Path;
use std::sync::Arc;

use crate::config::ConfigFile;
use crate::dag::builder::{TaskGraph, TaskGraphBuilder};
use crate::dag::task::LeafAction;
use crate::errors::{PipelineError, Result};
use crate::stage::scripts::ScriptOptions;
use crate::stage::styles::StyleOptions;
use crate::stage::{
    ConvertImages, MinifiedScripts, MinifiedStyles, ReadableScripts, ReadableStyles, ResizeImages,
};
use crate::types::AssetClass;

pub const DEFAULT_TASK: &str = "default";
pub const WATCH_TASK: &str = "watch";

impl TaskGraph {
    /// Build the standard task graph for a project rooted at `root`.
    ///
    /// Also checks that every `[watch]` binding names a known task.
    pub fn standard(cfg: &ConfigFile, root: &Path) -> Result<TaskGraph> {
        let style_opts = StyleOptions::from_config(cfg, root);
        let script_opts = ScriptOptions::from_config(cfg);

        let graph = TaskGraphBuilder::new()
            .leaf("clean-styles", LeafAction::Clean(AssetClass::Style))
            .leaf("clean-scripts", LeafAction::Clean(AssetClass::Script))
            .leaf("clean-images", LeafAction::Clean(AssetClass::Image))
            .leaf(
                "build-styles",
                LeafAction::Transform(Arc::new(ReadableStyles::new(style_opts.clone()))),
            )
            .leaf(
                "build-styles-minified",
                LeafAction::Transform(Arc::new(MinifiedStyles::new(style_opts))),
            )
            .leaf(
                "build-scripts",
                LeafAction::Transform(Arc::new(ReadableScripts::new())),
            )
            .leaf(
                "build-scripts-minified",
                LeafAction::Transform(Arc::new(MinifiedScripts::new(script_opts))),
            )
            .leaf(
                "resize-images",
                LeafAction::Transform(Arc::new(ResizeImages::from_config(cfg))),
            )
            .leaf(
                "convert-images",
                LeafAction::Transform(Arc::new(ConvertImages::from_config(cfg))),
            )
            .alias("convert-images-to-format", "convert-images")
            .leaf(WATCH_TASK, LeafAction::Watch)
            .sequence(
                "styles",
                Some(AssetClass::Style),
                &["clean-styles", "build-styles", "build-styles-minified"],
            )
            .sequence(
                "scripts",
                Some(AssetClass::Script),
                &["clean-scripts", "build-scripts", "build-scripts-minified"],
            )
            .parallel(
                "images",
                Some(AssetClass::Image),
                &["resize-images", "convert-images"],
            )
            .parallel(
                DEFAULT_TASK,
                None,
                &["styles", "scripts", "images", WATCH_TASK],
            )
            .build()?;

        for class in AssetClass::ALL {
            for name in cfg.watch().tasks_for(class) {
                if !graph.contains(name) {
                    return Err(PipelineError::ConfigError(format!(
                        "[watch] {} binds unknown task '{}'",
                        class.label(),
                        name
                    )));
                }
            }
        }

        Ok(graph)
    }
}
