// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - sending `ScheduledTask`s to the executor
//! - handling Ctrl+C / shutdown
//!
//! The core is unit tested without any Tokio, channels, filesystem, or
//! transforms.

use std::collections::{HashMap, VecDeque};

use crate::engine::event_handlers::{handle_task_completion, handle_task_trigger, CoreStep};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RunSummary, RuntimeEvent, RuntimeOptions, TaskName, TriggerReason};

/// Mutable state shared by the event handlers.
#[derive(Debug)]
pub(crate) struct CoreState {
    /// Tasks currently executing, with the reason they were started for.
    pub(crate) running: HashMap<TaskName, TriggerReason>,
    /// Re-runs requested while a task was running.
    pub(crate) queue: TriggerQueue,
    /// Command-line tasks waiting for the previous one to finish.
    pub(crate) manual_backlog: VecDeque<TaskName>,
    /// The command-line task currently executing, if any.
    pub(crate) manual_active: Option<TaskName>,
    pub(crate) summary: RunSummary,
}

/// Pure core runtime state.
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    state: CoreState,
    options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new(options: RuntimeOptions) -> Self {
        Self {
            state: CoreState {
                running: HashMap::new(),
                queue: TriggerQueue::new(options.queue_length),
                manual_backlog: VecDeque::new(),
                manual_active: None,
                summary: RunSummary::default(),
            },
            options,
        }
    }

    /// Nothing running, nothing queued (for tests).
    pub fn is_idle(&self) -> bool {
        self.state.running.is_empty()
            && self.state.queue.is_empty()
            && self.state.manual_backlog.is_empty()
    }

    pub fn is_running(&self, task: &str) -> bool {
        self.state.running.contains_key(task)
    }

    /// Pending re-runs of `task` (for tests).
    pub fn queued_for(&self, task: &str) -> usize {
        self.state.queue.pending_for(task)
    }

    pub fn summary(&self) -> &RunSummary {
        &self.state.summary
    }

    pub fn into_summary(self) -> RunSummary {
        self.state.summary
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskTriggered { task, reason } => {
                handle_task_trigger(&mut self.state, task, reason)
            }
            RuntimeEvent::TaskCompleted { task, outcome } => {
                handle_task_completion(&mut self.state, &self.options, task, outcome)
            }
            RuntimeEvent::ShutdownRequested => {
                self.state.summary.interrupted = true;
                CoreStep {
                    commands: Vec::new(),
                    keep_running: false,
                }
            }
        }
    }
}
