use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use assetdag::config::ConfigFile;
use assetdag::dag::{LeafAction, TaskGraph, TaskGraphBuilder};
use assetdag::exec::{PipelineContext, TaskExecutor, TaskStatus, WorkerPool};
use assetdag::fs::mock::MockFileSystem;
use assetdag::fs::FileSystem;
use assetdag::stage::scripts::ReadableScripts;
use assetdag::stage::styles::{ReadableStyles, StyleOptions};
use assetdag::stage::{OutputArtifact, StageEnv, StageUnit, TransformStage};
use assetdag::types::AssetClass;
use assetdag_test_utils::builders::ConfigBuilder;
use assetdag_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn mock_project() -> Arc<MockFileSystem> {
    let fs = MockFileSystem::new();
    fs.add_file("proj/src/js/app.js", "console.log('app');");
    fs.add_file("proj/src/scss/site.scss", "body { margin: 0; }");
    Arc::new(fs)
}

fn context(fs: Arc<MockFileSystem>, cfg: ConfigFile) -> Arc<PipelineContext> {
    let fs: Arc<dyn FileSystem> = fs;
    Arc::new(PipelineContext::new("proj", Arc::new(cfg), fs))
}

#[tokio::test]
async fn sequence_stops_after_a_fatal_child() -> TestResult {
    init_tracing();
    let fs = mock_project();
    fs.deny_writes_under("proj/build/js");
    let cfg = ConfigBuilder::new().build();
    let graph = TaskGraph::standard(&cfg, Path::new("proj"))?;
    let executor = TaskExecutor::new(Arc::new(graph), context(fs.clone(), cfg));

    let report = with_timeout(executor.run("scripts")).await;
    assert!(report.is_fatal());
    assert!(matches!(report.status, TaskStatus::Failed(_)));

    let children: Vec<&str> = report.children.iter().map(|c| c.task.as_str()).collect();
    assert_eq!(children, ["clean-scripts", "build-scripts"]);
    let build = report.find("build-scripts").ok_or("no build-scripts report")?;
    match &build.status {
        TaskStatus::Failed(message) => assert!(message.contains("could not create folder"), "{message}"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(report.find("build-scripts-minified").is_none());
    Ok(())
}

#[tokio::test]
async fn parallel_failure_does_not_affect_siblings() -> TestResult {
    init_tracing();
    let fs = mock_project();
    fs.deny_writes_under("proj/build/js");
    let cfg = ConfigBuilder::new().source_maps(false).build();

    let graph = TaskGraphBuilder::new()
        .leaf("js", LeafAction::Transform(Arc::new(ReadableScripts::new())))
        .leaf(
            "css",
            LeafAction::Transform(Arc::new(ReadableStyles::new(StyleOptions::from_config(
                &cfg,
                Path::new("proj"),
            )))),
        )
        .parallel("both", None, &["js", "css"])
        .build()?;
    let executor = TaskExecutor::new(Arc::new(graph), context(fs.clone(), cfg));

    let report = with_timeout(executor.run("both")).await;
    assert!(report.is_fatal());
    assert_eq!(report.children.len(), 2);

    let css = report.find("css").ok_or("no css report")?;
    assert_eq!(css.status, TaskStatus::Succeeded);
    assert!(fs.is_file(Path::new("proj/build/css/site.css")));
    assert!(!fs.exists(Path::new("proj/build/js")));
    Ok(())
}

#[tokio::test]
async fn clean_empties_the_output_folder_but_keeps_it() -> TestResult {
    init_tracing();
    let fs = mock_project();
    fs.add_file("proj/build/img/a-sm.jpg", "x");
    fs.add_file("proj/build/img/sub/b.webp", "y");
    let cfg = ConfigBuilder::new().build();
    let graph = TaskGraph::standard(&cfg, Path::new("proj"))?;
    let executor = TaskExecutor::new(Arc::new(graph), context(fs.clone(), cfg));

    let report = with_timeout(executor.run("clean-images")).await;
    assert_eq!(report.status, TaskStatus::Succeeded);
    assert!(fs.is_dir(Path::new("proj/build/img")));
    assert!(fs.read_dir(Path::new("proj/build/img"))?.is_empty());

    // Nothing to clean is fine too.
    let report = with_timeout(executor.run("clean-styles")).await;
    assert_eq!(report.status, TaskStatus::Succeeded);
    Ok(())
}

#[tokio::test]
async fn watch_without_runtime_fails_cleanly() -> TestResult {
    init_tracing();
    let fs = mock_project();
    let cfg = ConfigBuilder::new().build();
    let graph = TaskGraph::standard(&cfg, Path::new("proj"))?;
    let executor = TaskExecutor::new(Arc::new(graph), context(fs, cfg));

    let report = with_timeout(executor.run("watch")).await;
    assert!(matches!(report.status, TaskStatus::Failed(_)), "{report}");
    Ok(())
}

/// Test stage that tracks how many units run at once.
#[derive(Debug, Default)]
struct CountingStage {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl CountingStage {
    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl TransformStage for CountingStage {
    fn name(&self) -> &str {
        "counting"
    }

    fn class(&self) -> AssetClass {
        AssetClass::Script
    }

    fn apply(&self, unit: &StageUnit, env: &StageEnv) -> Result<Vec<OutputArtifact>> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(40));
        self.current.fetch_sub(1, Ordering::SeqCst);

        let source = &unit.inputs[0];
        let text = env.fs.read_to_string(source)?;
        if text.contains("fail") {
            return Err(anyhow!("refusing {}", unit.label));
        }
        Ok(vec![OutputArtifact::new(env.relative_source(source), text)])
    }
}

fn counting_env(fs: Arc<MockFileSystem>) -> StageEnv {
    StageEnv {
        fs,
        src_root: PathBuf::from("proj/src"),
        out_root: PathBuf::from("proj/out"),
    }
}

#[tokio::test]
async fn worker_pool_bounds_concurrency_and_records_failures() -> TestResult {
    init_tracing();
    let fs = Arc::new(MockFileSystem::new());
    let mut units = Vec::new();
    for i in 0..6 {
        let path = PathBuf::from(format!("proj/src/f{i}.js"));
        let body = if i == 2 || i == 4 { "fail" } else { "ok" };
        fs.add_file(&path, body);
        units.push(StageUnit::single(path));
    }

    let stage = Arc::new(CountingStage::default());
    let pool = WorkerPool::new(2);
    let batch = with_timeout(pool.run_stage(stage.clone(), counting_env(fs.clone()), units)).await;

    assert!(stage.peak() <= 2, "peak {}", stage.peak());
    assert_eq!(batch.units, 6);
    assert_eq!(batch.succeeded_units(), 4);
    let failed: Vec<&str> = batch.failures.iter().map(|f| f.item.as_str()).collect();
    assert_eq!(failed, ["f2.js", "f4.js"]);
    assert!(batch.failures[0].message.contains("refusing f2.js"));

    // Failed units write nothing.
    assert!(fs.is_file(Path::new("proj/out/f0.js")));
    assert!(!fs.exists(Path::new("proj/out/f2.js")));
    assert_eq!(batch.written.len(), 4);
    Ok(())
}

#[tokio::test]
async fn overlapping_runs_of_one_leaf_are_serialized() -> TestResult {
    init_tracing();
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file("proj/src/js/only.js", "ok");
    let cfg = ConfigBuilder::new().jobs(4).build();

    let stage = Arc::new(CountingStage::default());
    let graph = TaskGraphBuilder::new()
        .leaf("count", LeafAction::Transform(stage.clone()))
        .build()?;
    let executor = TaskExecutor::new(Arc::new(graph), context(fs, cfg));

    let (a, b) = with_timeout(async { tokio::join!(executor.run("count"), executor.run("count")) }).await;
    assert_eq!(a.status, TaskStatus::Succeeded);
    assert_eq!(b.status, TaskStatus::Succeeded);
    assert_eq!(stage.peak(), 1);
    Ok(())
}

#[tokio::test]
async fn unknown_task_reports_failure() {
    init_tracing();
    let cfg = ConfigBuilder::new().build();
    let graph = TaskGraph::standard(&cfg, Path::new("proj")).unwrap();
    let executor = TaskExecutor::new(Arc::new(graph), context(mock_project(), cfg));

    let report = with_timeout(executor.run("fonts")).await;
    assert!(report.is_fatal());
}
