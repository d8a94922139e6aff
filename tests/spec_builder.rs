// tests/spec_builder.rs

use std::path::{Path, PathBuf};

use encarun::config::NumericParameter;
use encarun::fs::mock::MockFileSystem;
use encarun::outcome::{TaskOutcome, TaskResult};
use encarun::task::TaskSpecBuilder;
use encarun::task::builder::started_from_tag;
use encarun_test_utils::builders::ConfigFileBuilder;

fn fs_with_output_dir() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_dir("/data/out");
    fs
}

fn fields(err: &encarun::task::SpecError) -> Vec<&str> {
    err.problems().iter().map(|p| p.field.as_str()).collect()
}

#[test]
fn assembles_the_tool_invocation() {
    let fs = fs_with_output_dir();
    fs.add_file("/data/in/land_cover.tif");

    let cfg = ConfigFileBuilder::new()
        .executable("python")
        .base_args(&["-m", "enca"])
        .years(&[2000, 2010])
        .tier(2)
        .aoi_name("Luxembourg")
        .input("land_cover", "/data/in/land_cover.tif")
        .parameter("discount", NumericParameter::with_range(0.03, 0.0, 1.0))
        .env("PYTHONUNBUFFERED", "1")
        .build();

    let spec = TaskSpecBuilder::new(&cfg, &fs).build().expect("valid config");

    assert_eq!(spec.program(), "python");
    let expected: Vec<String> = [
        "-m",
        "enca",
        "carbon",
        "--run-name",
        "baseline",
        "--output-dir",
        "/data/out",
        "--years",
        "2000,2010",
        "--tier",
        "2",
        "--aoi-name",
        "Luxembourg",
        "--verbose",
        "--started-from",
    ]
    .iter()
    .map(|s| s.to_string())
    .chain([
        started_from_tag(),
        "--input".to_string(),
        "land_cover=/data/in/land_cover.tif".to_string(),
        "--param".to_string(),
        "discount=0.03".to_string(),
    ])
    .collect();
    assert_eq!(spec.arguments(), expected.as_slice());

    assert_eq!(spec.working_dir(), Path::new("/data/out"));
    assert_eq!(spec.log_path(), Path::new("/data/out/baseline.log"));
    assert_eq!(
        spec.env_overrides().get("PYTHONUNBUFFERED").map(String::as_str),
        Some("1")
    );
}

#[test]
fn optional_flags_are_omitted_when_unset() {
    let fs = fs_with_output_dir();
    let cfg = ConfigFileBuilder::new()
        .verbose(false)
        .log_file_name("enca.log")
        .build();

    let spec = TaskSpecBuilder::new(&cfg, &fs).build().expect("valid config");
    let args = spec.arguments();

    assert!(!args.iter().any(|a| a == "--verbose"));
    assert!(!args.iter().any(|a| a == "--tier"));
    assert!(!args.iter().any(|a| a == "--continue"));
    assert_eq!(spec.log_path(), Path::new("/data/out/enca.log"));
}

#[test]
fn missing_input_file_is_a_configuration_error() {
    let fs = fs_with_output_dir();
    let cfg = ConfigFileBuilder::new()
        .input("land_cover", "/data/in/missing.tif")
        .build();

    let err = TaskSpecBuilder::new(&cfg, &fs)
        .build()
        .expect_err("input does not exist");
    assert_eq!(fields(&err), vec!["run.inputs.land_cover"]);

    let result = TaskResult::from(err);
    assert_eq!(result.outcome(), TaskOutcome::ConfigurationError);
    assert_eq!(result.task(), None);
    assert_eq!(result.log_file(), None);
    assert!(result.errors()[0].contains("missing.tif"));
}

#[test]
fn input_pointing_at_a_directory_is_rejected() {
    let fs = fs_with_output_dir();
    fs.add_dir("/data/in");
    let cfg = ConfigFileBuilder::new().input("lc", "/data/in").build();

    let err = TaskSpecBuilder::new(&cfg, &fs).build().expect_err("not a file");
    assert!(err.problems()[0].message.contains("is not a file"));
}

#[test]
fn all_problems_are_reported_together() {
    let fs = MockFileSystem::new();
    let cfg = ConfigFileBuilder::new()
        .account("biodiversity")
        .run_name("a/b")
        .years(&[])
        .tier(7)
        .parameter("rate", NumericParameter::with_range(2.0, 0.0, 1.0))
        .parameter("empty", NumericParameter::with_range(0.5, 1.0, 0.0))
        .build();

    let err = TaskSpecBuilder::new(&cfg, &fs).build().expect_err("many problems");
    let fields = fields(&err);

    assert!(fields.contains(&"run.account"));
    assert!(fields.contains(&"run.run_name"));
    assert!(fields.contains(&"run.output_dir"));
    assert!(fields.contains(&"run.years"));
    assert!(fields.contains(&"run.tier"));
    assert!(fields.contains(&"run.parameters.rate"));
    assert!(fields.contains(&"run.parameters.empty"));
    assert_eq!(err.problems().len(), 7);
}

#[test]
fn duplicate_years_are_rejected() {
    let fs = fs_with_output_dir();
    let cfg = ConfigFileBuilder::new().years(&[2000, 2000]).build();
    let err = TaskSpecBuilder::new(&cfg, &fs).build().expect_err("duplicate year");
    assert_eq!(fields(&err), vec!["run.years"]);
}

#[test]
fn existing_run_directory_needs_continue() {
    let fs = fs_with_output_dir();
    fs.add_dir(PathBuf::from("/data/out/baseline"));

    let cfg = ConfigFileBuilder::new().build();
    let err = TaskSpecBuilder::new(&cfg, &fs).build().expect_err("run dir exists");
    assert_eq!(fields(&err), vec!["run.run_name"]);

    let cfg = ConfigFileBuilder::new().continue_run(true).build();
    let spec = TaskSpecBuilder::new(&cfg, &fs).build().expect("continue allowed");
    assert!(spec.arguments().iter().any(|a| a == "--continue"));
}

#[test]
fn non_finite_parameter_is_rejected() {
    let fs = fs_with_output_dir();
    let cfg = ConfigFileBuilder::new()
        .parameter("rate", NumericParameter::new(f64::NAN))
        .build();
    let err = TaskSpecBuilder::new(&cfg, &fs).build().expect_err("NaN");
    assert_eq!(fields(&err), vec!["run.parameters.rate"]);
}

#[test]
fn display_quotes_arguments_with_spaces() {
    let fs = fs_with_output_dir();
    let cfg = ConfigFileBuilder::new().aoi_name("Grand Duchy").build();
    let spec = TaskSpecBuilder::new(&cfg, &fs).build().expect("valid config");
    assert!(spec.to_string().contains("--aoi-name \"Grand Duchy\""));
}
