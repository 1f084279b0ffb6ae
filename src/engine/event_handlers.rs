// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{debug, info, warn};

use crate::engine::core::CoreState;
use crate::engine::{RuntimeOptions, ScheduledTask, TaskName, TaskOutcome, TriggerReason};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// Request that the process exits (everything finished, not watching).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    /// All tasks dispatched by this step (for tests).
    pub fn dispatched(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                CoreCommand::DispatchTasks(tasks) => Some(tasks),
                CoreCommand::RequestExit => None,
            })
            .flatten()
            .map(|t| t.name.as_str())
            .collect()
    }
}

/// Handle a task trigger event.
///
/// - Command-line triggers run one after another, in the order received.
/// - A trigger for a task that is already running is queued as a re-run
///   (coalesced up to `queue_length`) instead of starting a second copy.
/// - Anything else starts immediately.
pub(crate) fn handle_task_trigger(state: &mut CoreState, task: TaskName, reason: TriggerReason) -> CoreStep {
    let mut commands = Vec::new();

    if reason == TriggerReason::Manual && state.manual_active.is_some() {
        debug!(task = %task, "queued behind running command-line task");
        state.manual_backlog.push_back(task);
    } else if let Some(scheduled) = start_or_queue(state, task, reason) {
        commands.push(CoreCommand::DispatchTasks(vec![scheduled]));
    }

    CoreStep {
        commands,
        keep_running: true,
    }
}

/// Handle a task completion event.
pub(crate) fn handle_task_completion(
    state: &mut CoreState,
    options: &RuntimeOptions,
    task: TaskName,
    outcome: TaskOutcome,
) -> CoreStep {
    let mut dispatch = Vec::new();

    let Some(reason) = state.running.remove(&task) else {
        warn!(task = %task, "completion for a task that is not running; ignoring");
        return CoreStep {
            commands: Vec::new(),
            keep_running: true,
        };
    };

    match (reason, outcome) {
        (TriggerReason::Manual, TaskOutcome::Success) => {
            state.summary.completed.push(task.clone());
        }
        (TriggerReason::Manual, TaskOutcome::Failed) => {
            state.summary.completed.push(task.clone());
            state.summary.failed.push(task.clone());
        }
        (TriggerReason::FileWatch, TaskOutcome::Success) => {
            info!(task = %task, "re-run finished");
        }
        (TriggerReason::FileWatch, TaskOutcome::Failed) => {
            warn!(task = %task, "re-run failed; still watching");
            state.summary.watch_failures.push(task.clone());
        }
    }

    if state.manual_active.as_deref() == Some(task.as_str()) && reason == TriggerReason::Manual {
        state.manual_active = None;
    }

    // A re-run of this very task goes first, then the next command-line task.
    if let Some(next_reason) = state.queue.take(&task) {
        if let Some(scheduled) = start_or_queue(state, task.clone(), next_reason) {
            dispatch.push(scheduled);
        }
    }

    if state.manual_active.is_none() {
        if let Some(next) = state.manual_backlog.pop_front() {
            if let Some(scheduled) = start_or_queue(state, next, TriggerReason::Manual) {
                dispatch.push(scheduled);
            }
        }
    }

    let mut commands = Vec::new();
    if !dispatch.is_empty() {
        commands.push(CoreCommand::DispatchTasks(dispatch));
    }

    let idle = state.running.is_empty()
        && state.queue.is_empty()
        && state.manual_backlog.is_empty();

    let mut keep_running = true;
    if options.exit_when_idle && idle {
        keep_running = false;
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running,
    }
}

/// Start `task` unless it is already running, in which case queue a re-run.
fn start_or_queue(
    state: &mut CoreState,
    task: TaskName,
    reason: TriggerReason,
) -> Option<ScheduledTask> {
    if state.running.contains_key(&task) {
        // A command-line re-run still holds the sequential slot until it ran.
        if reason == TriggerReason::Manual {
            state.manual_active = Some(task.clone());
        }
        state.queue.record_trigger(&task, reason);
        return None;
    }

    if reason == TriggerReason::Manual {
        state.manual_active = Some(task.clone());
    }
    state.running.insert(task.clone(), reason);
    debug!(task = %task, ?reason, "dispatching task");
    Some(ScheduledTask { name: task, reason })
}
