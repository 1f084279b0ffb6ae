// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod guard;
pub mod logging;
pub mod resolve;
pub mod session;
pub mod stage;
pub mod types;
pub mod watch;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::load_for_project;
use crate::dag::{LeafAction, TaskGraph, TaskKind, DEFAULT_TASK};
use crate::engine::{RunSummary, RuntimeEvent};
use crate::fs::{FileSystem, RealFileSystem};
use crate::resolve::PathResolver;
use crate::session::Session;
use crate::stage::InputMode;
use crate::watch::path_utils::relative_str;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (or conventions when there is no config file)
/// - the task graph
/// - executor / runtime
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<RunSummary> {
    let root = args.root.clone();
    let mut cfg = load_for_project(args.config.as_deref(), &root)?;
    if let Some(jobs) = args.jobs {
        cfg = cfg.with_jobs(jobs as usize);
    }

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    let tasks: Vec<String> = if args.tasks.is_empty() {
        vec![DEFAULT_TASK.to_string()]
    } else {
        args.tasks.clone()
    };

    if args.list || args.dry_run {
        let graph = TaskGraph::standard(&cfg, &root)?;
        if args.list {
            print_task_list(&graph);
        } else {
            let names = graph.resolve_names(&tasks)?;
            let resolver = PathResolver::new(fs, root, Arc::new(cfg));
            print_dry_run(&graph, &resolver, &names)?;
        }
        return Ok(RunSummary::default());
    }

    let session = Session::new(root, cfg, fs)?;

    // Ctrl-C → graceful shutdown.
    {
        let tx = session.sender();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let summary = session.run(&tasks).await?;
    if !summary.watch_failures.is_empty() {
        warn!(
            count = summary.watch_failures.len(),
            "some re-runs failed while watching"
        );
    }
    if summary.is_success() {
        info!(tasks = summary.completed.len(), "done");
    }
    Ok(summary)
}

fn print_task_list(graph: &TaskGraph) {
    for name in graph.task_names() {
        if let Some(task) = graph.get(name) {
            match task.class {
                Some(class) => println!("{name:<24} {:<28} {class}", task.kind.label()),
                None => println!("{name:<24} {}", task.kind.label()),
            }
        }
    }
    for (alias, target) in graph.aliases() {
        println!("{alias:<24} alias of {target}");
    }
}

/// Print the task tree for each requested task and the inputs each
/// transform leaf would read.
fn print_dry_run(graph: &TaskGraph, resolver: &PathResolver, names: &[String]) -> Result<()> {
    println!("assetdag dry-run");
    println!("  root: {:?}", resolver.root());
    println!();

    for name in names {
        print!("{}", graph.render_tree(name));
    }
    println!();

    for name in names {
        for task in graph.leaves_of(name) {
            let TaskKind::Leaf(LeafAction::Transform(stage)) = &task.kind else {
                continue;
            };
            let class = stage.class();
            let src = resolver.source_root(class);
            let inputs = match stage.input_mode() {
                InputMode::Glob => resolver.resolve(class)?,
                InputMode::Listing(exts) => resolver.list_direct(&src, &exts)?,
            };
            println!(
                "{} -> {} ({} input(s))",
                task.name,
                display_rel(resolver.root(), &resolver.output_root(class)),
                inputs.len()
            );
            for input in inputs {
                println!("    {}", display_rel(resolver.root(), &input));
            }
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}

fn display_rel(root: &Path, path: &Path) -> String {
    relative_str(root, path).unwrap_or_else(|| path.display().to_string())
}

