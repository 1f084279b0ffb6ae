// src/engine/mod.rs

//! Orchestration engine for assetdag.
//!
//! This module ties together:
//! - the trigger queue (what happens when a task is triggered while it is
//!   still running)
//! - the main runtime event loop that reacts to:
//!   - manual triggers from the command line
//!   - file-watch triggers
//!   - task completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Outcome of a task run, as seen by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// The task reported a fatal failure (see `TaskReport::is_fatal`).
    Failed,
}

/// Why a task was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Named on the command line (or `default`).
    Manual,
    /// Triggered due to a filesystem event.
    FileWatch,
}

/// A task the core wants the executor to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub name: TaskName,
    pub reason: TriggerReason,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// Exit once nothing is running and nothing is queued. Off when the
    /// requested tasks start the watcher.
    pub exit_when_idle: bool,
    /// Maximum queued re-runs per task.
    pub queue_length: usize,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            exit_when_idle: true,
            queue_length: 1,
        }
    }
}

/// Events flowing into the runtime from the CLI, the watcher and the executor.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A task should be run.
    TaskTriggered {
        task: TaskName,
        reason: TriggerReason,
    },
    /// A task run finished.
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// What happened during one runtime session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Completed command-line task runs, in completion order.
    pub completed: Vec<TaskName>,
    /// Command-line tasks that reported a fatal failure.
    pub failed: Vec<TaskName>,
    /// Watch-triggered runs that failed. Logged, never fatal for the session.
    pub watch_failures: Vec<TaskName>,
    /// `true` when the session ended through `ShutdownRequested`.
    pub interrupted: bool,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::TriggerQueue;
pub use runtime::Runtime;
