// src/session.rs

//! One pipeline session: graph, shared context, executor and runtime.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::info;

use crate::config::ConfigFile;
use crate::dag::TaskGraph;
use crate::engine::{
    CoreRuntime, RunSummary, Runtime, RuntimeEvent, RuntimeOptions, TaskName, TriggerReason,
};
use crate::exec::{PipelineContext, RealExecutorBackend, TaskExecutor};
use crate::fs::FileSystem;

/// Capacity of the runtime event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Wires a [`TaskGraph`] to a [`Runtime`] for one run of the program.
#[derive(Debug)]
pub struct Session {
    graph: Arc<TaskGraph>,
    ctx: Arc<PipelineContext>,
    tx: mpsc::Sender<RuntimeEvent>,
    rx: mpsc::Receiver<RuntimeEvent>,
}

impl Session {
    pub fn new(root: impl Into<PathBuf>, cfg: ConfigFile, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let root = root.into();
        let graph = TaskGraph::standard(&cfg, &root)?;
        let (tx, rx) = mpsc::channel::<RuntimeEvent>(EVENT_CHANNEL_CAPACITY);
        let ctx = PipelineContext::new(root, Arc::new(cfg), fs).with_runtime_tx(tx.clone());

        Ok(Self {
            graph: Arc::new(graph),
            ctx: Arc::new(ctx),
            tx,
            rx,
        })
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn context(&self) -> &Arc<PipelineContext> {
        &self.ctx
    }

    /// Sender into the runtime, e.g. for `ShutdownRequested`.
    pub fn sender(&self) -> mpsc::Sender<RuntimeEvent> {
        self.tx.clone()
    }

    /// Run `tasks` (in order) until they finish, or until shutdown when one
    /// of them starts the watcher.
    pub async fn run(self, tasks: &[String]) -> Result<RunSummary> {
        let names: Vec<TaskName> = self.graph.resolve_names(tasks)?;
        let watching = names.iter().any(|n| self.graph.requires_watch(n));

        let options = RuntimeOptions {
            exit_when_idle: !watching,
            queue_length: self.ctx.config().global().queue_length,
        };
        info!(tasks = ?names, watching, jobs = self.ctx.pool().size(), "starting session");

        let executor = TaskExecutor::new(Arc::clone(&self.graph), Arc::clone(&self.ctx));
        let backend = RealExecutorBackend::new(executor, self.tx.clone());

        // Queue what fits before the runtime starts, so a quick first task
        // cannot finish (and end the session) before later names arrive.
        let mut overflow = Vec::new();
        for task in names {
            let event = RuntimeEvent::TaskTriggered {
                task,
                reason: TriggerReason::Manual,
            };
            if let Err(mpsc::error::TrySendError::Full(event)) = self.tx.try_send(event) {
                overflow.push(event);
            }
        }
        if !overflow.is_empty() {
            let seed_tx = self.tx.clone();
            tokio::spawn(async move {
                for event in overflow {
                    if seed_tx.send(event).await.is_err() {
                        break;
                    }
                }
            });
        }

        let core = CoreRuntime::new(options);
        let runtime = Runtime::new(core, self.rx, backend);
        let summary = runtime.run().await;

        self.ctx.stop_watcher();
        Ok(summary?)
    }
}
