// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of running tasks
//! itself, so tests can swap in a fake that records dispatches and reports
//! completions immediately.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::engine::{RuntimeEvent, ScheduledTask, TaskOutcome};
use crate::errors::Result;
use crate::exec::executor::TaskExecutor;
use crate::exec::report::TaskReport;

/// Trait abstracting how scheduled tasks are executed.
pub trait ExecutorBackend: Send {
    /// Start the given tasks. Completion is reported back to the runtime as
    /// `RuntimeEvent::TaskCompleted`.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production backend: runs each task on the [`TaskExecutor`] in its own
/// tokio task.
#[derive(Debug)]
pub struct RealExecutorBackend {
    executor: TaskExecutor,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl RealExecutorBackend {
    pub fn new(executor: TaskExecutor, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            executor,
            runtime_tx,
        }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let executor = self.executor.clone();
        let tx = self.runtime_tx.clone();

        Box::pin(async move {
            for task in tasks {
                let executor = executor.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let report = executor.run(&task.name).await;
                    log_report(&report);

                    let outcome = if report.is_fatal() {
                        TaskOutcome::Failed
                    } else {
                        TaskOutcome::Success
                    };
                    if tx
                        .send(RuntimeEvent::TaskCompleted {
                            task: task.name.clone(),
                            outcome,
                        })
                        .await
                        .is_err()
                    {
                        warn!(task = %task.name, "runtime gone; dropping completion");
                    }
                });
            }
            Ok(())
        })
    }
}

/// One line per task in the tree, at a level matching its outcome.
pub fn log_report(report: &TaskReport) {
    if report.is_fatal() {
        error!("{report}");
    } else if !report.item_failures().is_empty() {
        warn!("{report} with {} item failure(s)", report.item_failures().len());
    } else {
        info!("{report}");
    }
    for child in report.children.iter() {
        log_report(child);
    }
}
