use std::error::Error;

use assetdag::config::{load_for_project, parse_browser_version, ConfigFile, RawConfigFile};
use assetdag::errors::PipelineError;
use assetdag::types::{AssetClass, TargetFormat};
use assetdag_test_utils::builders::ConfigBuilder;
use assetdag_test_utils::fixtures::ProjectFixture;

type TestResult = Result<(), Box<dyn Error>>;

fn parse(toml_src: &str) -> Result<ConfigFile, PipelineError> {
    let raw: RawConfigFile = toml::from_str(toml_src)?;
    ConfigFile::try_from(raw)
}

#[test]
fn empty_file_uses_conventions() -> TestResult {
    let cfg = parse("")?;

    assert_eq!(cfg.paths_for(AssetClass::Style).src, "src/scss");
    assert_eq!(cfg.paths_for(AssetClass::Style).glob, "src/scss/**/*.scss");
    assert_eq!(cfg.paths_for(AssetClass::Script).out, "build/js");
    assert_eq!(cfg.paths_for(AssetClass::Image).glob, "src/img/**/*");
    assert_eq!(cfg.global().debounce_ms, 150);
    assert_eq!(cfg.global().queue_length, 1);
    assert!(cfg.images().only_newer);
    assert_eq!(cfg.images().convert.format, TargetFormat::Webp);
    assert_eq!(cfg.images().resize.variants.len(), 3);
    assert_eq!(
        cfg.watch().tasks_for(AssetClass::Script),
        ["build-scripts", "build-scripts-minified"]
    );
    Ok(())
}

#[test]
fn full_file_overrides_defaults() -> TestResult {
    let cfg = parse(
        r#"
[config]
jobs = 3
debounce_ms = 50
queue_length = 2

[styles]
src = "assets/scss"
out = "public/css"
minified_suffix = "-min"
[styles.targets]
safari = "13.1"

[scripts]
bundle = "app"

[images]
extensions = [".JPG", "png"]
only_newer = false

[images.resize]
variants = [{ width = 320 }]

[images.convert]
format = "jpg"
width = 200
suffix = "-thumb"

[watch]
scripts = ["build-scripts-minified"]
"#,
    )?;

    assert_eq!(cfg.jobs(), 3);
    assert_eq!(cfg.global().queue_length, 2);
    // Moving `src` moves the default glob with it.
    assert_eq!(cfg.paths_for(AssetClass::Style).glob, "assets/scss/**/*.scss");
    assert_eq!(cfg.paths_for(AssetClass::Style).out, "public/css");
    assert_eq!(cfg.styles().minified_suffix, "-min");
    assert_eq!(cfg.styles().targets.len(), 1);
    assert_eq!(cfg.scripts().bundle, "app");
    assert_eq!(cfg.images().extensions, ["jpg", "png"]);
    assert_eq!(cfg.images().resize.variants[0].suffix, "");
    assert_eq!(cfg.images().convert.format, TargetFormat::Jpeg);
    assert_eq!(cfg.watch().tasks_for(AssetClass::Script), ["build-scripts-minified"]);
    // Untouched bindings keep their defaults.
    assert_eq!(cfg.watch().tasks_for(AssetClass::Image).len(), 2);
    Ok(())
}

#[test]
fn unknown_keys_are_rejected() {
    let err = parse("[config]\nthreads = 4\n").unwrap_err();
    assert!(matches!(err, PipelineError::TomlError(_)), "got {err:?}");
}

#[test]
fn zero_jobs_and_queue_length_are_rejected() {
    let err = ConfigFile::try_from(ConfigBuilder::new().jobs(0).raw()).unwrap_err();
    assert!(matches!(err, PipelineError::ConfigError(_)));

    let err = ConfigFile::try_from(ConfigBuilder::new().queue_length(0).raw()).unwrap_err();
    assert!(matches!(err, PipelineError::ConfigError(_)));
}

#[test]
fn image_options_are_checked() {
    let zero_width = ConfigBuilder::new().resize_variants(&[(0, "-x")]).raw();
    assert!(ConfigFile::try_from(zero_width).is_err());

    let duplicate = ConfigBuilder::new()
        .resize_variants(&[(100, "-a"), (200, "-a")])
        .raw();
    let err = ConfigFile::try_from(duplicate).unwrap_err();
    assert!(err.to_string().contains("duplicate"), "got {err}");

    let no_exts = ConfigBuilder::new().extensions(&[]).raw();
    assert!(ConfigFile::try_from(no_exts).is_err());

    let zero_convert = ConfigBuilder::new().convert(TargetFormat::Png, 0, "").raw();
    assert!(ConfigFile::try_from(zero_convert).is_err());
}

#[test]
fn browser_targets_are_checked() {
    let unknown = ConfigBuilder::new().browser("netscape", "4").raw();
    let err = ConfigFile::try_from(unknown).unwrap_err();
    assert!(err.to_string().contains("netscape"));

    let bad_version = ConfigBuilder::new().browser("safari", "latest").raw();
    assert!(ConfigFile::try_from(bad_version).is_err());
}

#[test]
fn output_must_differ_from_source() {
    let err = parse("[scripts]\nsrc = \"js\"\nout = \"js/\"\n").unwrap_err();
    assert!(matches!(err, PipelineError::ConfigError(_)), "got {err:?}");
}

#[test]
fn invalid_glob_is_rejected() {
    let err = parse("[styles]\nglob = \"src/[scss\"\n").unwrap_err();
    assert!(err.to_string().contains("glob"), "got {err}");
}

#[test]
fn empty_bundle_name_is_rejected() {
    assert!(ConfigFile::try_from(ConfigBuilder::new().bundle("").raw()).is_err());
    assert!(ConfigFile::try_from(ConfigBuilder::new().bundle("a/b").raw()).is_err());
}

#[test]
fn browser_versions_pack_like_lightningcss() {
    assert_eq!(parse_browser_version("13"), Some(13 << 16));
    assert_eq!(parse_browser_version("13.1"), Some((13 << 16) | (1 << 8)));
    assert_eq!(parse_browser_version("13.1.2"), Some((13 << 16) | (1 << 8) | 2));
    assert_eq!(parse_browser_version("13.x"), None);
    assert_eq!(parse_browser_version("1.2.3.4"), None);
}

#[test]
fn project_without_config_file_uses_conventions() -> TestResult {
    let project = ProjectFixture::new();
    let cfg = load_for_project(None, project.root())?;
    assert_eq!(cfg.paths_for(AssetClass::Image).out, "build/img");
    Ok(())
}

#[test]
fn project_config_file_is_picked_up() -> TestResult {
    let project = ProjectFixture::new();
    project.write("Assetdag.toml", "[scripts]\nbundle = \"site\"\n");

    let cfg = load_for_project(None, project.root())?;
    assert_eq!(cfg.scripts().bundle, "site");
    Ok(())
}

#[test]
fn missing_explicit_config_is_an_error() {
    let project = ProjectFixture::new();
    let missing = project.path("nope.toml");
    let err = load_for_project(Some(&missing), project.root()).unwrap_err();
    assert!(matches!(err, PipelineError::ConfigError(_)));
}
