// src/exec/context.rs

//! Shared state handed to every task run.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::ConfigFile;
use crate::engine::RuntimeEvent;
use crate::exec::pool::WorkerPool;
use crate::fs::FileSystem;
use crate::guard::FolderGuard;
use crate::resolve::PathResolver;
use crate::types::AssetClass;
use crate::watch::{build_bindings, spawn_watcher, WatchSetup, WatcherHandle};

/// Everything a task needs besides the graph itself.
#[derive(Debug)]
pub struct PipelineContext {
    root: PathBuf,
    config: Arc<ConfigFile>,
    fs: Arc<dyn FileSystem>,
    resolver: PathResolver,
    guard: FolderGuard,
    pool: WorkerPool,
    /// Where the watcher delivers its triggers. `None` outside a runtime.
    runtime_tx: Option<mpsc::Sender<RuntimeEvent>>,
    watcher: Mutex<Option<WatcherHandle>>,
}

impl PipelineContext {
    pub fn new(root: impl Into<PathBuf>, config: Arc<ConfigFile>, fs: Arc<dyn FileSystem>) -> Self {
        let root = root.into();
        let resolver = PathResolver::new(Arc::clone(&fs), root.clone(), Arc::clone(&config));
        let guard = FolderGuard::new(Arc::clone(&fs));
        let pool = WorkerPool::new(config.jobs());
        Self {
            root,
            config,
            fs,
            resolver,
            guard,
            pool,
            runtime_tx: None,
            watcher: Mutex::new(None),
        }
    }

    pub fn with_runtime_tx(mut self, tx: mpsc::Sender<RuntimeEvent>) -> Self {
        self.runtime_tx = Some(tx);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn guard(&self) -> &FolderGuard {
        &self.guard
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn is_watching(&self) -> bool {
        self.watcher
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }

    /// Start the file watcher unless it is already running.
    ///
    /// Returns `true` when this call started it.
    pub fn start_watcher(&self) -> Result<bool> {
        let mut slot = self
            .watcher
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.is_some() {
            debug!("watcher already running");
            return Ok(false);
        }

        let runtime_tx = self
            .runtime_tx
            .clone()
            .ok_or_else(|| anyhow!("watching needs a running runtime"))?;

        let setup = WatchSetup {
            root: self.root.clone(),
            bindings: build_bindings(&self.config)?,
            watch_dirs: AssetClass::ALL
                .iter()
                .map(|class| self.resolver.source_root(*class))
                .collect(),
            debounce: Duration::from_millis(self.config.global().debounce_ms),
            fs: Arc::clone(&self.fs),
            runtime_tx,
        };

        *slot = Some(spawn_watcher(setup)?);
        Ok(true)
    }

    /// Stop the watcher, if any.
    pub fn stop_watcher(&self) {
        let handle = self
            .watcher
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        drop(handle);
    }
}
