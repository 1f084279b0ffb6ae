// src/dag/task.rs

use std::fmt;
use std::sync::Arc;

use crate::engine::TaskName;
use crate::stage::TransformStage;
use crate::types::AssetClass;

/// What a leaf task does when it runs.
#[derive(Clone)]
pub enum LeafAction {
    /// Run one transform stage over the class sources.
    Transform(Arc<dyn TransformStage>),
    /// Empty the class output directory.
    Clean(AssetClass),
    /// Start the file watcher (no-op if it is already running).
    Watch,
}

impl fmt::Debug for LeafAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeafAction::Transform(stage) => write!(f, "Transform({})", stage.name()),
            LeafAction::Clean(class) => write!(f, "Clean({class})"),
            LeafAction::Watch => f.write_str("Watch"),
        }
    }
}

/// How a task is composed.
#[derive(Debug, Clone)]
pub enum TaskKind {
    Leaf(LeafAction),
    /// Children run one after another; a fatal failure stops the rest.
    Sequence(Vec<TaskName>),
    /// Children run concurrently; the task finishes once all of them have.
    Parallel(Vec<TaskName>),
}

impl TaskKind {
    pub fn children(&self) -> &[TaskName] {
        match self {
            TaskKind::Leaf(_) => &[],
            TaskKind::Sequence(children) | TaskKind::Parallel(children) => children,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, TaskKind::Leaf(_))
    }

    /// Short label used by `--list` and `--dry-run`.
    pub fn label(&self) -> String {
        match self {
            TaskKind::Leaf(LeafAction::Transform(stage)) => format!("stage {}", stage.name()),
            TaskKind::Leaf(LeafAction::Clean(class)) => format!("clean {class}"),
            TaskKind::Leaf(LeafAction::Watch) => "watch".to_string(),
            TaskKind::Sequence(_) => "series".to_string(),
            TaskKind::Parallel(_) => "parallel".to_string(),
        }
    }
}

/// One named, independently invocable task.
#[derive(Debug, Clone)]
pub struct Task {
    pub name: TaskName,
    pub class: Option<AssetClass>,
    pub kind: TaskKind,
}

impl Task {
    pub fn leaf(name: impl Into<TaskName>, action: LeafAction) -> Self {
        let class = match &action {
            LeafAction::Transform(stage) => Some(stage.class()),
            LeafAction::Clean(class) => Some(*class),
            LeafAction::Watch => None,
        };
        Self {
            name: name.into(),
            class,
            kind: TaskKind::Leaf(action),
        }
    }
}
