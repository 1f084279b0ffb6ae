// src/exec/report.rs

//! Result values produced by stages and tasks.

use std::fmt;
use std::path::PathBuf;

use crate::engine::TaskName;

/// One unit that failed inside a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    /// Unit label, usually the offending file name.
    pub item: String,
    pub message: String,
}

/// Aggregated outcome of one stage run.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub stage: String,
    /// Number of units that were scheduled.
    pub units: usize,
    /// Every file written (artifacts and source maps), sorted.
    pub written: Vec<PathBuf>,
    /// Failed units, sorted by label.
    pub failures: Vec<ItemFailure>,
}

impl BatchReport {
    pub fn empty(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            ..Self::default()
        }
    }

    pub fn succeeded_units(&self) -> usize {
        self.units.saturating_sub(self.failures.len())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Succeeded,
    /// Nothing to do (e.g. the source folder is missing). Counts as success.
    Skipped(String),
    /// The task could not run (e.g. its output folder could not be created).
    Failed(String),
}

/// Outcome of running one task, including its children for composites.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub task: TaskName,
    pub status: TaskStatus,
    pub batch: Option<BatchReport>,
    pub children: Vec<TaskReport>,
}

impl TaskReport {
    pub fn succeeded(task: impl Into<TaskName>) -> Self {
        Self::with_status(task, TaskStatus::Succeeded)
    }

    pub fn skipped(task: impl Into<TaskName>, reason: impl Into<String>) -> Self {
        Self::with_status(task, TaskStatus::Skipped(reason.into()))
    }

    pub fn failed(task: impl Into<TaskName>, message: impl Into<String>) -> Self {
        Self::with_status(task, TaskStatus::Failed(message.into()))
    }

    fn with_status(task: impl Into<TaskName>, status: TaskStatus) -> Self {
        Self {
            task: task.into(),
            status,
            batch: None,
            children: Vec::new(),
        }
    }

    pub fn with_batch(mut self, batch: BatchReport) -> Self {
        self.batch = Some(batch);
        self
    }

    pub fn with_children(mut self, children: Vec<TaskReport>) -> Self {
        self.children = children;
        self
    }

    /// `true` when this task or any descendant failed.
    ///
    /// Item failures inside a batch are not fatal.
    pub fn is_fatal(&self) -> bool {
        matches!(self.status, TaskStatus::Failed(_)) || self.children.iter().any(|c| c.is_fatal())
    }

    /// Item failures across this task and all descendants.
    pub fn item_failures(&self) -> Vec<&ItemFailure> {
        let mut out: Vec<&ItemFailure> = self
            .batch
            .iter()
            .flat_map(|b| b.failures.iter())
            .collect();
        for child in self.children.iter() {
            out.extend(child.item_failures());
        }
        out
    }

    /// Files written across this task and all descendants.
    pub fn written(&self) -> Vec<&PathBuf> {
        let mut out: Vec<&PathBuf> = self.batch.iter().flat_map(|b| b.written.iter()).collect();
        for child in self.children.iter() {
            out.extend(child.written());
        }
        out
    }

    /// Find a descendant (or self) by task name.
    pub fn find(&self, task: &str) -> Option<&TaskReport> {
        if self.task == task {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(task))
    }
}

impl fmt::Display for TaskReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            TaskStatus::Succeeded => write!(f, "{}: ok", self.task)?,
            TaskStatus::Skipped(reason) => write!(f, "{}: skipped ({reason})", self.task)?,
            TaskStatus::Failed(message) => write!(f, "{}: FAILED ({message})", self.task)?,
        }
        if let Some(batch) = &self.batch {
            write!(
                f,
                " [{} written, {} failed]",
                batch.written.len(),
                batch.failures.len()
            )?;
        }
        Ok(())
    }
}
