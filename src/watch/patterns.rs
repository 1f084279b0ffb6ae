// src/watch/patterns.rs

//! Glob -> task bindings used by the watcher.

use anyhow::{Context, Result};
use globset::{Glob, GlobMatcher};

use crate::config::ConfigFile;
use crate::engine::TaskName;
use crate::types::AssetClass;

/// One asset class glob and the tasks it re-runs.
#[derive(Debug, Clone)]
pub struct WatchBinding {
    class: AssetClass,
    matcher: GlobMatcher,
    tasks: Vec<TaskName>,
}

impl WatchBinding {
    pub fn new(class: AssetClass, glob: &str, tasks: Vec<TaskName>) -> Result<Self> {
        let matcher = Glob::new(glob)
            .with_context(|| format!("invalid glob pattern: {glob}"))?
            .compile_matcher();
        Ok(Self {
            class,
            matcher,
            tasks,
        })
    }

    /// Does this root-relative path (forward slashes) match?
    pub fn matches(&self, rel_path: &str) -> bool {
        self.matcher.is_match(rel_path)
    }

    pub fn class(&self) -> AssetClass {
        self.class
    }

    pub fn tasks(&self) -> &[TaskName] {
        &self.tasks
    }
}

/// One binding per asset class with at least one bound task.
pub fn build_bindings(cfg: &ConfigFile) -> Result<Vec<WatchBinding>> {
    AssetClass::ALL
        .iter()
        .filter(|class| !cfg.watch().tasks_for(**class).is_empty())
        .map(|class| {
            WatchBinding::new(
                *class,
                &cfg.paths_for(*class).glob,
                cfg.watch().tasks_for(*class).to_vec(),
            )
        })
        .collect()
}

/// Tasks bound to `rel_path`, each once, in binding order.
pub fn tasks_for_path<'a>(bindings: &'a [WatchBinding], rel_path: &str) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    for binding in bindings.iter().filter(|b| b.matches(rel_path)) {
        for task in binding.tasks() {
            if !out.contains(&task.as_str()) {
                out.push(task.as_str());
            }
        }
    }
    out
}
