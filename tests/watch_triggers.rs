use std::collections::BTreeSet;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::event::{AccessKind, CreateKind, EventKind, MetadataKind, ModifyKind};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

use assetdag::engine::{RuntimeEvent, TriggerReason};
use assetdag::fs::mock::MockFileSystem;
use assetdag::fs::{FileSystem, RealFileSystem};
use assetdag::session::Session;
use assetdag::types::AssetClass;
use assetdag::watch::event_handler::{collect_triggers, is_relevant};
use assetdag::watch::{build_bindings, spawn_watcher, tasks_for_path, ContentFingerprints, WatchSetup};
use assetdag_test_utils::builders::ConfigBuilder;
use assetdag_test_utils::fixtures::ProjectFixture;
use assetdag_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

/// Give the OS watcher a moment to register before touching files.
const SETTLE: Duration = Duration::from_millis(300);

#[test]
fn default_bindings_map_globs_to_tasks() -> TestResult {
    let cfg = ConfigBuilder::new().build();
    let bindings = build_bindings(&cfg)?;

    assert_eq!(
        tasks_for_path(&bindings, "src/js/app.js"),
        ["build-scripts", "build-scripts-minified"]
    );
    assert_eq!(
        tasks_for_path(&bindings, "src/scss/deep/_x.scss"),
        ["build-styles", "build-styles-minified"]
    );
    assert_eq!(
        tasks_for_path(&bindings, "src/img/photo.jpg"),
        ["resize-images", "convert-images"]
    );
    assert!(tasks_for_path(&bindings, "src/js/readme.md").is_empty());
    assert!(tasks_for_path(&bindings, "build/js/bundle.min.js").is_empty());
    Ok(())
}

#[test]
fn unbound_class_has_no_binding() -> TestResult {
    let cfg = ConfigBuilder::new().watch(AssetClass::Image, &[]).build();
    let bindings = build_bindings(&cfg)?;
    let classes: Vec<AssetClass> = bindings.iter().map(|b| b.class()).collect();
    assert_eq!(classes, [AssetClass::Style, AssetClass::Script]);
    assert!(tasks_for_path(&bindings, "src/img/photo.jpg").is_empty());
    Ok(())
}

#[test]
fn reads_and_metadata_changes_are_ignored() {
    assert!(!is_relevant(&EventKind::Access(AccessKind::Any)));
    assert!(!is_relevant(&EventKind::Modify(ModifyKind::Metadata(
        MetadataKind::WriteTime
    ))));
    assert!(is_relevant(&EventKind::Modify(ModifyKind::Any)));
    assert!(is_relevant(&EventKind::Create(CreateKind::File)));
}

#[test]
fn unchanged_content_does_not_trigger() -> TestResult {
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file("proj/src/js/a.js", "one();");
    fs.add_file("proj/src/js/b.js", "two();");
    let cfg = ConfigBuilder::new().build();
    let bindings = build_bindings(&cfg)?;

    let mut fingerprints = ContentFingerprints::new(fs.clone());
    fingerprints.prime_tree(Path::new("proj/src"));
    assert_eq!(fingerprints.len(), 2);

    let batch: BTreeSet<PathBuf> = [
        PathBuf::from("proj/src/js/a.js"),
        PathBuf::from("proj/src/js/b.js"),
    ]
    .into_iter()
    .collect();
    let root = Path::new("proj");

    assert!(collect_triggers(root, &batch, &bindings, &mut fingerprints).is_empty());

    fs.add_file("proj/src/js/b.js", "three();");
    // Two bound tasks, each once, although both files are in the batch.
    assert_eq!(
        collect_triggers(root, &batch, &bindings, &mut fingerprints),
        ["build-scripts", "build-scripts-minified"]
    );
    assert!(collect_triggers(root, &batch, &bindings, &mut fingerprints).is_empty());

    // A deleted file counts as a change.
    fs.remove_file(Path::new("proj/src/js/a.js"))?;
    assert_eq!(
        collect_triggers(root, &batch, &bindings, &mut fingerprints).len(),
        2
    );
    Ok(())
}

async fn next_trigger(rx: &mut mpsc::Receiver<RuntimeEvent>, wait: Duration) -> Option<String> {
    match timeout(wait, rx.recv()).await {
        Ok(Some(RuntimeEvent::TaskTriggered { task, reason })) => {
            assert_eq!(reason, TriggerReason::FileWatch);
            Some(task)
        }
        Ok(Some(other)) => panic!("unexpected event {other:?}"),
        Ok(None) | Err(_) => None,
    }
}

#[tokio::test]
async fn script_change_triggers_each_bound_task_once() -> TestResult {
    init_tracing();
    let project = ProjectFixture::new();
    project.write("src/js/app.js", "console.log('v1');\n");
    project.write("src/scss/site.scss", "body { margin: 0; }\n");

    let cfg = ConfigBuilder::new().debounce_ms(100).build();
    let (tx, mut rx) = mpsc::channel::<RuntimeEvent>(64);
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let handle = spawn_watcher(WatchSetup {
        root: project.root().to_path_buf(),
        bindings: build_bindings(&cfg)?,
        watch_dirs: vec![project.path("src/scss"), project.path("src/js"), project.path("src/img")],
        debounce: Duration::from_millis(100),
        fs,
        runtime_tx: tx,
    })?;
    // src/img does not exist and is skipped.
    assert_eq!(handle.dirs().len(), 2);
    sleep(SETTLE).await;

    // Same bytes: ignored.
    project.write("src/js/app.js", "console.log('v1');\n");
    assert_eq!(next_trigger(&mut rx, Duration::from_millis(600)).await, None);

    project.write("src/js/app.js", "console.log('v2');\n");
    let mut triggered = Vec::new();
    while let Some(task) = next_trigger(&mut rx, Duration::from_secs(3)).await {
        triggered.push(task);
        if triggered.len() == 2 {
            break;
        }
    }
    assert_eq!(triggered, ["build-scripts", "build-scripts-minified"]);

    // Nothing else follows for the same save.
    assert_eq!(next_trigger(&mut rx, Duration::from_millis(600)).await, None);
    assert!(handle.is_running());
    Ok(())
}

async fn wait_for(mut check: impl FnMut() -> bool) {
    with_timeout(async {
        while !check() {
            sleep(Duration::from_millis(25)).await;
        }
    })
    .await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn watching_session_refreshes_the_bundle() -> TestResult {
    init_tracing();
    let project = ProjectFixture::new();
    project.write("src/js/app.js", "console.log('first build');\n");

    let cfg = ConfigBuilder::new().debounce_ms(100).build();
    let session = Session::new(project.root(), cfg, Arc::new(RealFileSystem))?;
    let ctx = Arc::clone(session.context());
    let shutdown = session.sender();

    let tasks = vec!["build-scripts-minified".to_string(), "watch".to_string()];
    let run = tokio::spawn(async move { session.run(&tasks).await });

    wait_for(|| ctx.is_watching()).await;
    assert!(project.read_string("build/js/bundle.min.js").contains("first build"));
    // Only the minified task ran so far.
    assert!(!project.exists("build/js/app.js"));
    sleep(SETTLE).await;

    project.write("src/js/app.js", "console.log('second build');\n");
    let bundle = project.path("build/js/bundle.min.js");
    wait_for(|| {
        std::fs::read_to_string(&bundle)
            .map(|s| s.contains("second build"))
            .unwrap_or(false)
    })
    .await;
    wait_for(|| project.exists("build/js/app.js")).await;

    // Still watching after the re-runs.
    assert!(ctx.is_watching());
    shutdown.send(RuntimeEvent::ShutdownRequested).await?;

    let summary = with_timeout(run).await??;
    assert!(summary.interrupted);
    assert!(summary.is_success());
    assert_eq!(summary.completed, ["build-scripts-minified", "watch"]);
    assert!(!ctx.is_watching());
    Ok(())
}
