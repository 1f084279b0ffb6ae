use std::error::Error;
use std::path::Path;

use assetdag::dag::{LeafAction, TaskGraph, TaskGraphBuilder, TaskKind, DEFAULT_TASK};
use assetdag::errors::PipelineError;
use assetdag::types::AssetClass;
use assetdag_test_utils::builders::ConfigBuilder;

type TestResult = Result<(), Box<dyn Error>>;

fn clean(class: AssetClass) -> LeafAction {
    LeafAction::Clean(class)
}

#[test]
fn builder_accepts_a_valid_graph() -> TestResult {
    let graph = TaskGraphBuilder::new()
        .leaf("a", clean(AssetClass::Style))
        .leaf("b", clean(AssetClass::Script))
        .sequence("ab", None, &["a", "b"])
        .parallel("all", None, &["ab", "a"])
        .alias("everything", "all")
        .build()?;

    assert_eq!(graph.task_names().collect::<Vec<_>>(), ["a", "b", "ab", "all"]);
    assert_eq!(graph.canonical_name("everything"), Some("all"));
    // `a` is reachable twice but listed once.
    let leaves: Vec<&str> = graph.leaves_of("all").iter().map(|t| t.name.as_str()).collect();
    assert_eq!(leaves, ["a", "b"]);
    assert!(!graph.requires_watch("all"));
    Ok(())
}

#[test]
fn unknown_child_is_rejected() {
    let err = TaskGraphBuilder::new()
        .leaf("a", clean(AssetClass::Style))
        .sequence("s", None, &["a", "ghost"])
        .build()
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidGraph(_)), "got {err:?}");
    assert!(err.to_string().contains("ghost"));
}

#[test]
fn empty_composite_is_rejected() {
    let err = TaskGraphBuilder::new()
        .parallel("nothing", None, &[])
        .build()
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidGraph(_)), "got {err:?}");
}

#[test]
fn duplicate_name_is_rejected() {
    let err = TaskGraphBuilder::new()
        .leaf("a", clean(AssetClass::Style))
        .leaf("a", clean(AssetClass::Image))
        .build()
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidGraph(_)), "got {err:?}");
}

#[test]
fn cycles_are_rejected() {
    let err = TaskGraphBuilder::new()
        .leaf("leaf", clean(AssetClass::Style))
        .sequence("x", None, &["leaf", "y"])
        .parallel("y", None, &["x"])
        .build()
        .unwrap_err();
    assert!(matches!(err, PipelineError::TaskCycle(_)), "got {err:?}");

    let err = TaskGraphBuilder::new()
        .sequence("self", None, &["self"])
        .build()
        .unwrap_err();
    assert!(matches!(err, PipelineError::TaskCycle(_)), "got {err:?}");
}

#[test]
fn bad_aliases_are_rejected() {
    let err = TaskGraphBuilder::new()
        .leaf("a", clean(AssetClass::Style))
        .alias("a", "a")
        .build()
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidGraph(_)));

    let err = TaskGraphBuilder::new()
        .leaf("a", clean(AssetClass::Style))
        .alias("b", "missing")
        .build()
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidGraph(_)));
}

#[test]
fn standard_graph_has_every_named_task() -> TestResult {
    let cfg = ConfigBuilder::new().build();
    let graph = TaskGraph::standard(&cfg, Path::new("."))?;

    for name in [
        "clean-styles",
        "clean-scripts",
        "clean-images",
        "build-styles",
        "build-styles-minified",
        "build-scripts",
        "build-scripts-minified",
        "resize-images",
        "convert-images",
        "convert-images-to-format",
        "watch",
        "styles",
        "scripts",
        "images",
        DEFAULT_TASK,
    ] {
        assert!(graph.contains(name), "missing task {name}");
    }

    let styles = graph.get("styles").ok_or("styles missing")?;
    match &styles.kind {
        TaskKind::Sequence(children) => assert_eq!(
            children,
            &["clean-styles", "build-styles", "build-styles-minified"]
        ),
        other => panic!("styles should be a series, got {other:?}"),
    }
    assert!(matches!(graph.get("images").map(|t| &t.kind), Some(TaskKind::Parallel(_))));

    let default = graph.get(DEFAULT_TASK).ok_or("default missing")?;
    assert_eq!(default.kind.children(), ["styles", "scripts", "images", "watch"]);
    Ok(())
}

#[test]
fn only_default_and_watch_require_watching() -> TestResult {
    let cfg = ConfigBuilder::new().build();
    let graph = TaskGraph::standard(&cfg, Path::new("."))?;

    assert!(graph.requires_watch(DEFAULT_TASK));
    assert!(graph.requires_watch("watch"));
    assert!(!graph.requires_watch("styles"));
    assert!(!graph.requires_watch("convert-images-to-format"));
    Ok(())
}

#[test]
fn resolve_names_follows_aliases_and_rejects_unknown() -> TestResult {
    let cfg = ConfigBuilder::new().build();
    let graph = TaskGraph::standard(&cfg, Path::new("."))?;

    let names = graph.resolve_names(&["convert-images-to-format", "styles"])?;
    assert_eq!(names, ["convert-images", "styles"]);

    let err = graph.resolve_names(&["styles", "fonts"]).unwrap_err();
    assert!(matches!(err, PipelineError::UnknownTask(ref n) if n == "fonts"));
    Ok(())
}

#[test]
fn watch_binding_to_unknown_task_is_a_config_error() {
    let cfg = ConfigBuilder::new()
        .watch(AssetClass::Style, &["build-fonts"])
        .build();
    let err = TaskGraph::standard(&cfg, Path::new(".")).unwrap_err();
    assert!(matches!(err, PipelineError::ConfigError(_)), "got {err:?}");
}

#[test]
fn render_tree_indents_children() -> TestResult {
    let cfg = ConfigBuilder::new().build();
    let graph = TaskGraph::standard(&cfg, Path::new("."))?;

    let tree = graph.render_tree("images");
    let lines: Vec<&str> = tree.lines().collect();
    assert_eq!(lines[0], "images (parallel)");
    assert_eq!(lines[1], "  resize-images (stage resize-images) [images]");
    assert_eq!(lines[2], "  convert-images (stage convert-images) [images]");

    let tree = graph.render_tree("styles");
    assert_eq!(tree.lines().next(), Some("styles (series)"));
    assert!(tree.contains("  clean-styles (clean styles) [styles]\n"), "{tree}");
    Ok(())
}
