// src/engine/queue.rs

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::{TaskName, TriggerReason};

/// Re-runs requested for tasks that were still running when triggered.
///
/// Semantics:
/// - Each task keeps a counter of pending re-runs, capped at `max_runs`.
///   The default of 1 means "at most one follow-up run": any number of
///   changes during a run collapse into one re-run afterwards.
/// - A queued command-line re-run stays a command-line run. Watch triggers
///   arriving later fold into it without changing its reason, so its
///   failure still counts against the exit code.
#[derive(Debug)]
pub struct TriggerQueue {
    max_runs: usize,
    pending: BTreeMap<TaskName, Pending>,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    runs: usize,
    reason: TriggerReason,
}

impl TriggerQueue {
    /// Create a new queue with the given maximum queued runs per task.
    ///
    /// `max_runs` is clamped to at least 1, as a zero-length queue would drop
    /// every change that arrives during a build.
    pub fn new(max_runs: usize) -> Self {
        Self {
            max_runs: max_runs.max(1),
            pending: BTreeMap::new(),
        }
    }

    /// Returns true if no re-run is pending for any task.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of re-runs pending for `task`.
    pub fn pending_for(&self, task: &str) -> usize {
        self.pending.get(task).map(|p| p.runs).unwrap_or(0)
    }

    /// Record a trigger for a task that is currently running.
    ///
    /// Returns `false` when the queue for this task was already full and the
    /// trigger was coalesced into an existing entry.
    pub fn record_trigger(&mut self, task: &str, reason: TriggerReason) -> bool {
        let entry = self
            .pending
            .entry(task.to_string())
            .or_insert(Pending { runs: 0, reason });
        if reason == TriggerReason::Manual {
            entry.reason = TriggerReason::Manual;
        }

        if entry.runs >= self.max_runs {
            warn!(
                task = %task,
                max_runs = self.max_runs,
                "re-run already queued; coalescing trigger"
            );
            return false;
        }

        entry.runs += 1;
        debug!(task = %task, pending = entry.runs, "queued re-run");
        true
    }

    /// Take one pending re-run of `task`, if any.
    pub fn take(&mut self, task: &str) -> Option<TriggerReason> {
        let entry = self.pending.get_mut(task)?;
        let reason = entry.reason;
        entry.runs = entry.runs.saturating_sub(1);
        if entry.runs == 0 {
            self.pending.remove(task);
        }
        debug!(task = %task, "dequeued re-run");
        Some(reason)
    }
}
