// src/watch/watcher.rs

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::fs::FileSystem;
use crate::watch::event_handler::{collect_triggers, is_relevant, send_triggers};
use crate::watch::hash::ContentFingerprints;
use crate::watch::patterns::WatchBinding;

/// Everything [`spawn_watcher`] needs.
#[derive(Debug)]
pub struct WatchSetup {
    /// Project root; globs are matched against paths relative to it.
    pub root: PathBuf,
    pub bindings: Vec<WatchBinding>,
    /// Directories to observe recursively. Missing ones are skipped.
    pub watch_dirs: Vec<PathBuf>,
    /// Events arriving within this window are handled as one batch.
    pub debounce: Duration,
    pub fs: Arc<dyn FileSystem>,
    pub runtime_tx: mpsc::Sender<RuntimeEvent>,
}

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive. Dropping this handle
/// stops file watching and the event loop.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    task: JoinHandle<()>,
    dirs: Vec<PathBuf>,
}

impl WatcherHandle {
    /// Directories actually being observed.
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("dirs", &self.dirs)
            .finish_non_exhaustive()
    }
}

/// Spawn a filesystem watcher that sends `RuntimeEvent::TaskTriggered` for
/// the tasks bound to each changed path.
///
/// Must be called from within a tokio runtime.
pub fn spawn_watcher(setup: WatchSetup) -> Result<WatcherHandle> {
    let WatchSetup {
        root,
        bindings,
        watch_dirs,
        debounce,
        fs,
        runtime_tx,
    } = setup;

    // Canonicalize once so we have a stable base path.
    let root = fs.canonicalize(&root).unwrap_or(root);

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                // Fails only once the event loop is gone.
                let _ = event_tx.send(event);
            }
            Err(err) => {
                eprintln!("assetdag: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    let mut dirs = Vec::new();
    for dir in watch_dirs {
        if !fs.is_dir(&dir) {
            warn!(folder = ?dir, "not watching missing folder");
            continue;
        }
        let dir = fs.canonicalize(&dir).unwrap_or(dir);
        if dirs.contains(&dir) {
            continue;
        }
        watcher.watch(&dir, RecursiveMode::Recursive)?;
        info!("file watcher started on {:?}", dir);
        dirs.push(dir);
    }

    // Fingerprint existing sources up front so a touch without a content
    // change right after startup does not trigger a rebuild.
    let mut primed = ContentFingerprints::new(Arc::clone(&fs));
    for dir in dirs.iter() {
        primed.prime_tree(dir);
    }
    debug!(files = primed.len(), "primed content fingerprints");

    for binding in bindings.iter() {
        debug!(class = %binding.class(), tasks = ?binding.tasks(), "watch binding");
    }
    let bindings = Arc::new(bindings);
    let fingerprints = Arc::new(Mutex::new(primed));

    let task = tokio::spawn(async move {
        while let Some(first) = event_rx.recv().await {
            let mut batch = BTreeSet::new();
            absorb(first, &mut batch);

            // Collect the rest of the burst.
            let deadline = tokio::time::sleep(debounce);
            tokio::pin!(deadline);
            loop {
                tokio::select! {
                    _ = &mut deadline => break,
                    next = event_rx.recv() => match next {
                        Some(event) => absorb(event, &mut batch),
                        None => break,
                    },
                }
            }

            if batch.is_empty() {
                continue;
            }
            debug!(paths = batch.len(), "handling debounced batch");

            let root = root.clone();
            let bindings = Arc::clone(&bindings);
            let fingerprints = Arc::clone(&fingerprints);
            let triggers = tokio::task::spawn_blocking(move || {
                let mut fps = fingerprints.lock().unwrap_or_else(|p| p.into_inner());
                collect_triggers(&root, &batch, &bindings, &mut fps)
            })
            .await
            .unwrap_or_default();

            if !send_triggers(triggers, &runtime_tx).await {
                // The runtime is gone; nothing left to notify.
                break;
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle {
        _inner: watcher,
        task,
        dirs,
    })
}

fn absorb(event: Event, batch: &mut BTreeSet<PathBuf>) {
    if !is_relevant(&event.kind) {
        return;
    }
    batch.extend(event.paths);
}
