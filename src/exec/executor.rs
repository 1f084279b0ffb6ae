// src/exec/executor.rs

//! Walks the task graph and runs tasks.
//!
//! - sequence: children in order; a fatal child stops the rest.
//! - parallel: all children spawned at once, joined before reporting.
//! - leaf: folder checks, source discovery, then the worker pool.
//!
//! Every leaf has its own lock, so overlapping invocations of the same leaf
//! (e.g. a watch trigger while `default` is still building) queue up instead
//! of writing the same outputs concurrently.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::dag::{LeafAction, TaskGraph, TaskKind};
use crate::engine::TaskName;
use crate::exec::context::PipelineContext;
use crate::exec::report::{BatchReport, ItemFailure, TaskReport};
use crate::guard::InputFolder;
use crate::stage::{InputMode, StageEnv, TransformStage};
use crate::types::AssetClass;

pub type ReportFuture = Pin<Box<dyn Future<Output = TaskReport> + Send + 'static>>;

#[derive(Debug)]
struct ExecutorInner {
    graph: Arc<TaskGraph>,
    ctx: Arc<PipelineContext>,
    leaf_locks: HashMap<TaskName, Arc<Mutex<()>>>,
}

/// Cheap to clone; clones share the graph, context and leaf locks.
#[derive(Debug, Clone)]
pub struct TaskExecutor {
    inner: Arc<ExecutorInner>,
}

impl TaskExecutor {
    pub fn new(graph: Arc<TaskGraph>, ctx: Arc<PipelineContext>) -> Self {
        let leaf_locks = graph
            .task_names()
            .filter_map(|name| graph.get(name))
            .filter(|task| task.kind.is_leaf())
            .map(|task| (task.name.clone(), Arc::new(Mutex::new(()))))
            .collect();

        Self {
            inner: Arc::new(ExecutorInner {
                graph,
                ctx,
                leaf_locks,
            }),
        }
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.inner.graph
    }

    pub fn context(&self) -> &PipelineContext {
        &self.inner.ctx
    }

    /// Run `name` (a task or an alias) to completion.
    pub fn run(&self, name: &str) -> ReportFuture {
        let this = self.clone();
        let name = name.to_string();
        Box::pin(async move { this.run_task(name).await })
    }

    async fn run_task(&self, name: TaskName) -> TaskReport {
        let Some(task) = self.inner.graph.get(&name).cloned() else {
            return TaskReport::failed(name.clone(), format!("unknown task '{name}'"));
        };

        debug!(task = %task.name, kind = %task.kind.label(), "running task");
        match task.kind {
            TaskKind::Leaf(action) => self.run_leaf(&task.name, action).await,
            TaskKind::Sequence(children) => self.run_sequence(&task.name, &children).await,
            TaskKind::Parallel(children) => self.run_parallel(&task.name, &children).await,
        }
    }

    async fn run_sequence(&self, name: &str, children: &[TaskName]) -> TaskReport {
        let mut reports = Vec::with_capacity(children.len());
        let mut failed_child = None;

        for child in children {
            let report = self.run(child).await;
            let fatal = report.is_fatal();
            reports.push(report);
            if fatal {
                warn!(task = %name, child = %child, "child failed; stopping sequence");
                failed_child = Some(child.clone());
                break;
            }
        }

        let report = match failed_child {
            Some(child) => TaskReport::failed(name, format!("'{child}' failed")),
            None => TaskReport::succeeded(name),
        };
        report.with_children(reports)
    }

    async fn run_parallel(&self, name: &str, children: &[TaskName]) -> TaskReport {
        let handles: Vec<_> = children
            .iter()
            .map(|child| (child.clone(), tokio::spawn(self.run(child))))
            .collect();

        let mut reports = Vec::with_capacity(handles.len());
        for (child, handle) in handles {
            let report = match handle.await {
                Ok(report) => report,
                Err(join_err) => TaskReport::failed(child, format!("task panicked: {join_err}")),
            };
            reports.push(report);
        }

        let failed: Vec<&str> = reports
            .iter()
            .filter(|r| r.is_fatal())
            .map(|r| r.task.as_str())
            .collect();

        let report = if failed.is_empty() {
            TaskReport::succeeded(name)
        } else {
            TaskReport::failed(name, format!("failed: {}", failed.join(", ")))
        };
        report.with_children(reports)
    }

    async fn run_leaf(&self, name: &str, action: LeafAction) -> TaskReport {
        let lock = self.inner.leaf_locks.get(name).cloned();
        let _guard = match &lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        match action {
            LeafAction::Transform(stage) => self.run_stage(name, stage).await,
            LeafAction::Clean(class) => self.run_clean(name, class),
            LeafAction::Watch => self.run_watch(name),
        }
    }

    async fn run_stage(&self, name: &str, stage: Arc<dyn TransformStage>) -> TaskReport {
        let ctx = &self.inner.ctx;
        let class = stage.class();
        let src_root = ctx.resolver().source_root(class);
        let out_root = ctx.resolver().output_root(class);

        if ctx.guard().check_input(&src_root, class.label()) == InputFolder::Missing {
            return TaskReport::skipped(name, format!("source folder {:?} is missing", src_root));
        }

        if let Err(err) = ctx.guard().ensure(&out_root) {
            return TaskReport::failed(name, err.to_string());
        }

        let sources = match stage.input_mode() {
            InputMode::Glob => ctx.resolver().resolve(class),
            InputMode::Listing(extensions) => ctx.resolver().list_direct(&src_root, &extensions),
        };
        let sources = match sources {
            Ok(sources) => sources,
            Err(err) => return TaskReport::failed(name, format!("{err:#}")),
        };

        let env = StageEnv {
            fs: Arc::clone(ctx.fs()),
            src_root,
            out_root,
        };
        let units = stage.units(sources, &env);
        if units.is_empty() {
            info!(task = %name, "no sources; nothing to do");
            return TaskReport::succeeded(name).with_batch(BatchReport::empty(stage.name()));
        }

        let batch = ctx.pool().run_stage(stage, env, units).await;
        info!(
            task = %name,
            written = batch.written.len(),
            failed = batch.failures.len(),
            "stage finished"
        );
        TaskReport::succeeded(name).with_batch(batch)
    }

    /// Remove everything inside the class output directory, keeping the
    /// directory itself.
    fn run_clean(&self, name: &str, class: AssetClass) -> TaskReport {
        let ctx = &self.inner.ctx;
        let fs = ctx.fs();
        let out_root = ctx.resolver().output_root(class);
        let mut batch = BatchReport::empty(format!("clean-{}", class.label()));

        if !fs.is_dir(&out_root) {
            debug!(task = %name, folder = ?out_root, "output folder absent; nothing to clean");
            return TaskReport::succeeded(name).with_batch(batch);
        }

        let entries = match fs.read_dir(&out_root) {
            Ok(entries) => entries,
            Err(err) => return TaskReport::failed(name, format!("{err:#}")),
        };

        batch.units = entries.len();
        for entry in entries {
            let removed = if fs.is_dir(&entry) {
                fs.remove_dir_all(&entry)
            } else {
                fs.remove_file(&entry)
            };
            if let Err(err) = removed {
                warn!(task = %name, path = ?entry, error = %err, "could not remove");
                batch.failures.push(ItemFailure {
                    item: entry.display().to_string(),
                    message: format!("{err:#}"),
                });
            }
        }

        info!(task = %name, removed = batch.succeeded_units(), "cleaned output folder");
        TaskReport::succeeded(name).with_batch(batch)
    }

    fn run_watch(&self, name: &str) -> TaskReport {
        match self.inner.ctx.start_watcher() {
            Ok(true) => TaskReport::succeeded(name),
            Ok(false) => TaskReport::skipped(name, "already watching"),
            Err(err) => TaskReport::failed(name, format!("{err:#}")),
        }
    }
}
