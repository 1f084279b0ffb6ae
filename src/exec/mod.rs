// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`executor`] walks the task graph (sequence / parallel / leaf).
//! - [`pool`] bounds per-unit stage work and joins it into a [`BatchReport`].
//! - [`context`] holds the shared resolver, folder guard, pool and watcher.
//! - [`report`] defines task and batch reports.
//! - [`backend`] provides the `ExecutorBackend` trait the runtime talks to
//!   and the production `RealExecutorBackend`.

pub mod backend;
pub mod context;
pub mod executor;
pub mod pool;
pub mod report;

pub use backend::{log_report, ExecutorBackend, RealExecutorBackend};
pub use context::PipelineContext;
pub use executor::TaskExecutor;
pub use pool::WorkerPool;
pub use report::{BatchReport, ItemFailure, TaskReport, TaskStatus};
