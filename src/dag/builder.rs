// src/dag/builder.rs

//! Explicit construction and validation of the task graph.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::task::{LeafAction, Task, TaskKind};
use crate::engine::TaskName;
use crate::errors::{PipelineError, Result};
use crate::types::AssetClass;

/// Collects task declarations; [`TaskGraphBuilder::build`] validates them.
#[derive(Debug, Default)]
pub struct TaskGraphBuilder {
    tasks: Vec<Task>,
    aliases: Vec<(String, TaskName)>,
}

impl TaskGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn leaf(mut self, name: &str, action: LeafAction) -> Self {
        self.tasks.push(Task::leaf(name, action));
        self
    }

    pub fn sequence(mut self, name: &str, class: Option<AssetClass>, children: &[&str]) -> Self {
        self.tasks.push(Task {
            name: name.to_string(),
            class,
            kind: TaskKind::Sequence(children.iter().map(|c| c.to_string()).collect()),
        });
        self
    }

    pub fn parallel(mut self, name: &str, class: Option<AssetClass>, children: &[&str]) -> Self {
        self.tasks.push(Task {
            name: name.to_string(),
            class,
            kind: TaskKind::Parallel(children.iter().map(|c| c.to_string()).collect()),
        });
        self
    }

    /// Another name under which `target` can be invoked.
    pub fn alias(mut self, alias: &str, target: &str) -> Self {
        self.aliases.push((alias.to_string(), target.to_string()));
        self
    }

    /// Validate and freeze the graph.
    ///
    /// Rejects duplicate names, empty composites, references to unknown
    /// tasks and cycles.
    pub fn build(self) -> Result<TaskGraph> {
        let mut order = Vec::with_capacity(self.tasks.len());
        let mut tasks: BTreeMap<TaskName, Task> = BTreeMap::new();

        for task in self.tasks {
            if tasks.contains_key(&task.name) {
                return Err(PipelineError::InvalidGraph(format!(
                    "task '{}' is declared more than once",
                    task.name
                )));
            }
            order.push(task.name.clone());
            tasks.insert(task.name.clone(), task);
        }

        for task in tasks.values() {
            let children = task.kind.children();
            if !task.kind.is_leaf() && children.is_empty() {
                return Err(PipelineError::InvalidGraph(format!(
                    "composite task '{}' has no children",
                    task.name
                )));
            }
            for child in children {
                if !tasks.contains_key(child) {
                    return Err(PipelineError::InvalidGraph(format!(
                        "task '{}' references unknown task '{}'",
                        task.name, child
                    )));
                }
                if child == &task.name {
                    return Err(PipelineError::TaskCycle(format!(
                        "task '{}' lists itself as a child",
                        task.name
                    )));
                }
            }
        }

        let mut aliases = BTreeMap::new();
        for (alias, target) in self.aliases {
            if tasks.contains_key(&alias) || aliases.contains_key(&alias) {
                return Err(PipelineError::InvalidGraph(format!(
                    "alias '{alias}' collides with an existing name"
                )));
            }
            if !tasks.contains_key(&target) {
                return Err(PipelineError::InvalidGraph(format!(
                    "alias '{alias}' points at unknown task '{target}'"
                )));
            }
            aliases.insert(alias, target);
        }

        check_acyclic(&tasks)?;

        Ok(TaskGraph {
            tasks,
            aliases,
            order,
        })
    }
}

fn check_acyclic(tasks: &BTreeMap<TaskName, Task>) -> Result<()> {
    // Edge direction: parent -> child.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for name in tasks.keys() {
        graph.add_node(name.as_str());
    }
    for task in tasks.values() {
        for child in task.kind.children() {
            graph.add_edge(task.name.as_str(), child.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_) => Ok(()),
        Err(cycle) => Err(PipelineError::TaskCycle(format!(
            "cycle in task graph involving task '{}'",
            cycle.node_id()
        ))),
    }
}

/// Immutable, validated set of named tasks.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    tasks: BTreeMap<TaskName, Task>,
    aliases: BTreeMap<String, TaskName>,
    /// Declaration order, used for listing.
    order: Vec<TaskName>,
}

impl TaskGraph {
    /// Canonical name for `name`, following aliases.
    pub fn canonical_name<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if self.tasks.contains_key(name) {
            return Some(name);
        }
        self.aliases.get(name).map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.canonical_name(name).and_then(|n| self.tasks.get(n))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Task names in declaration order.
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(a, t)| (a.as_str(), t.as_str()))
    }

    /// Map user-supplied names onto canonical task names.
    pub fn resolve_names<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<TaskName>> {
        names
            .iter()
            .map(|n| {
                self.canonical_name(n.as_ref())
                    .map(str::to_string)
                    .ok_or_else(|| PipelineError::UnknownTask(n.as_ref().to_string()))
            })
            .collect()
    }

    /// Leaf tasks reachable from `name`, each listed once, in execution order.
    pub fn leaves_of(&self, name: &str) -> Vec<&Task> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.collect_leaves(name, &mut seen, &mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, name: &str, seen: &mut HashSet<&'a str>, out: &mut Vec<&'a Task>) {
        let Some(task) = self.get(name) else {
            return;
        };
        if !seen.insert(task.name.as_str()) {
            return;
        }
        match &task.kind {
            TaskKind::Leaf(_) => out.push(task),
            TaskKind::Sequence(children) | TaskKind::Parallel(children) => {
                for child in children {
                    self.collect_leaves(child, seen, out);
                }
            }
        }
    }

    /// `true` when running `name` starts the watcher.
    pub fn requires_watch(&self, name: &str) -> bool {
        self.leaves_of(name)
            .iter()
            .any(|t| matches!(t.kind, TaskKind::Leaf(LeafAction::Watch)))
    }

    /// Indented tree of `name` and its descendants.
    pub fn render_tree(&self, name: &str) -> String {
        let mut out = String::new();
        self.render_into(name, 0, &mut out);
        out
    }

    fn render_into(&self, name: &str, depth: usize, out: &mut String) {
        let Some(task) = self.get(name) else {
            return;
        };
        let _ = write!(out, "{}{} ({})", "  ".repeat(depth), task.name, task.kind.label());
        if let Some(class) = task.class {
            let _ = write!(out, " [{class}]");
        }
        out.push('\n');
        for child in task.kind.children() {
            self.render_into(child, depth + 1, out);
        }
    }
}
