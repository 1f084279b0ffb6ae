use std::path::PathBuf;

use clap::Parser;

use assetdag::cli::{CliArgs, LogLevel};
use assetdag::logging::parse_level_str;

#[test]
fn no_arguments_means_default_task() {
    let args = CliArgs::try_parse_from(["assetdag"]).unwrap();
    assert!(args.tasks.is_empty());
    assert_eq!(args.root, PathBuf::from("."));
    assert!(args.jobs.is_none());
    assert!(!args.dry_run);
    assert!(!args.list);
}

#[test]
fn tasks_keep_their_order() {
    let args = CliArgs::try_parse_from([
        "assetdag",
        "clean-styles",
        "styles",
        "--jobs",
        "2",
        "--root",
        "site",
        "--log-level",
        "debug",
    ])
    .unwrap();
    assert_eq!(args.tasks, ["clean-styles", "styles"]);
    assert_eq!(args.jobs, Some(2));
    assert_eq!(args.root, PathBuf::from("site"));
    assert!(matches!(args.log_level, Some(LogLevel::Debug)));
}

#[test]
fn zero_jobs_is_rejected() {
    assert!(CliArgs::try_parse_from(["assetdag", "--jobs", "0"]).is_err());
}

#[test]
fn env_log_levels_parse() {
    assert_eq!(parse_level_str("WARNING"), Some(tracing::Level::WARN));
    assert_eq!(parse_level_str(" trace "), Some(tracing::Level::TRACE));
    assert_eq!(parse_level_str("loud"), None);
}
