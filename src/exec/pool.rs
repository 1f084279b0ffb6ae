// src/exec/pool.rs

//! Bounded pool for per-unit stage work.
//!
//! All stages share one pool, so `jobs` caps how many units are being
//! transformed at once across the whole process. Every unit runs on a
//! blocking thread; [`WorkerPool::run_stage`] returns only after all units of
//! the stage have finished.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::exec::report::{BatchReport, ItemFailure};
use crate::stage::{StageEnv, StageUnit, TransformStage};

#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Transform every unit and write its artifacts.
    ///
    /// A failing unit is logged and recorded; it never stops its siblings.
    pub async fn run_stage(
        &self,
        stage: Arc<dyn TransformStage>,
        env: StageEnv,
        units: Vec<StageUnit>,
    ) -> BatchReport {
        let mut report = BatchReport::empty(stage.name());
        report.units = units.len();

        let mut set = JoinSet::new();
        for unit in units {
            let permits = Arc::clone(&self.permits);
            let stage = Arc::clone(&stage);
            let env = env.clone();

            set.spawn(async move {
                let label = unit.label.clone();
                let Ok(_permit) = permits.acquire_owned().await else {
                    return (label, Err("worker pool closed".to_string()));
                };
                let result = tokio::task::spawn_blocking(move || process_unit(&*stage, &env, &unit))
                    .await
                    .unwrap_or_else(|join_err| Err(format!("worker panicked: {join_err}")));
                (label, result)
            });
        }

        while let Some(joined) = set.join_next().await {
            let (label, result) = match joined {
                Ok(pair) => pair,
                Err(join_err) => ("<unknown>".to_string(), Err(join_err.to_string())),
            };
            match result {
                Ok(written) => report.written.extend(written),
                Err(message) => {
                    error!(stage = %report.stage, file = %label, error = %message, "item failed");
                    report.failures.push(ItemFailure {
                        item: label,
                        message,
                    });
                }
            }
        }

        report.written.sort();
        report.failures.sort_by(|a, b| a.item.cmp(&b.item));
        report
    }
}

/// Run one unit and write what it produced.
///
/// Nothing is written unless the whole unit succeeded.
fn process_unit(
    stage: &dyn TransformStage,
    env: &StageEnv,
    unit: &StageUnit,
) -> Result<Vec<PathBuf>, String> {
    let artifacts = stage.apply(unit, env).map_err(|e| format!("{e:#}"))?;

    let mut written = Vec::new();
    for artifact in artifacts {
        let path = env.out_root.join(&artifact.relative_path);
        env.fs
            .write(&path, &artifact.bytes)
            .map_err(|e| format!("{e:#}"))?;
        written.push(path);

        if let Some(map) = &artifact.source_map {
            let map_path = env.out_root.join(artifact.map_path());
            env.fs
                .write(&map_path, map.as_bytes())
                .map_err(|e| format!("{e:#}"))?;
            written.push(map_path);
        }
    }

    debug!(stage = stage.name(), file = %unit.label, outputs = written.len(), "item done");
    Ok(written)
}
