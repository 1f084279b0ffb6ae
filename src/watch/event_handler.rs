// src/watch/event_handler.rs

//! Turning batches of filesystem events into task triggers.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use notify::event::{EventKind, ModifyKind};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::{RuntimeEvent, TaskName, TriggerReason};
use crate::watch::hash::ContentFingerprints;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::{tasks_for_path, WatchBinding};

/// Reads and metadata-only changes (permissions, timestamps) never trigger.
pub fn is_relevant(kind: &EventKind) -> bool {
    !matches!(
        kind,
        EventKind::Access(_) | EventKind::Modify(ModifyKind::Metadata(_))
    )
}

/// Tasks to trigger for one debounced batch of changed paths.
///
/// Each task appears at most once, however many of its files changed.
/// Paths whose content is unchanged since the last event are skipped.
pub fn collect_triggers(
    root: &Path,
    paths: &BTreeSet<PathBuf>,
    bindings: &[WatchBinding],
    fingerprints: &mut ContentFingerprints,
) -> Vec<TaskName> {
    let mut triggers: Vec<TaskName> = Vec::new();

    for path in paths {
        let Some(rel) = relative_str(root, path) else {
            warn!("could not relativize path {:?} against root {:?}", path, root);
            continue;
        };

        let tasks = tasks_for_path(bindings, &rel);
        if tasks.is_empty() {
            continue;
        }

        if !fingerprints.changed(path) {
            debug!(rel = %rel, "content unchanged; ignoring event");
            continue;
        }

        debug!(rel = %rel, ?tasks, "watch match");
        for task in tasks {
            if !triggers.iter().any(|t| t == task) {
                triggers.push(task.to_string());
            }
        }
    }

    triggers
}

/// Send one `TaskTriggered` per task.
///
/// Returns `false` once the runtime channel is closed.
pub async fn send_triggers(tasks: Vec<TaskName>, runtime_tx: &mpsc::Sender<RuntimeEvent>) -> bool {
    for task in tasks {
        debug!(task = %task, "watch -> triggering task");
        if let Err(err) = runtime_tx
            .send(RuntimeEvent::TaskTriggered {
                task,
                reason: TriggerReason::FileWatch,
            })
            .await
        {
            warn!("failed to send RuntimeEvent::TaskTriggered: {err}");
            return false;
        }
    }
    true
}
