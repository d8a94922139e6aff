// tests/config_loading.rs

use std::error::Error;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use encarun::config::{ConfigFile, load_and_validate, load_from_path, validate_config};
use encarun::errors::EncarunError;
use encarun_test_utils::builders::ConfigFileBuilder;

type TestResult = Result<(), Box<dyn Error>>;

fn write_config(contents: &str) -> Result<NamedTempFile, Box<dyn Error>> {
    let mut file = NamedTempFile::new()?;
    file.write_all(contents.as_bytes())?;
    Ok(file)
}

#[test]
fn loads_minimal_config_with_defaults() -> TestResult {
    let file = write_config(
        r#"
[controller]
executable = "enca"

[run]
account = "water"
run_name = "r1"
output_dir = "/tmp/out"
years = [2015]
"#,
    )?;

    let cfg = load_and_validate(file.path())?;
    assert_eq!(cfg.controller.executable, "enca");
    assert!(cfg.controller.verbose);
    assert!(cfg.controller.accounts.iter().any(|a| a == "water"));
    assert_eq!(cfg.controller.accounts.len(), 13);
    assert_eq!(cfg.controller.log_file_name, None);
    assert_eq!(cfg.run.tier, None);
    assert!(!cfg.run.continue_run);
    assert!(cfg.run.inputs.is_empty());
    Ok(())
}

#[test]
fn parses_nested_tables_and_continue_flag() -> TestResult {
    let file = write_config(
        r#"
[controller]
executable = "python"
base_args = ["-m", "enca"]
accounts = ["carbon", "custom"]
log_file_name = "enca.log"

[controller.env]
GDAL_CACHEMAX = "512"

[run]
account = "custom"
run_name = "r2"
output_dir = "/tmp/out"
years = [2000, 2010]
tier = 3
continue = true

[run.inputs]
lc = "/tmp/lc.tif"

[run.parameters.alpha]
value = 0.5
max = 1.0
"#,
    )?;

    let cfg = load_and_validate(file.path())?;
    assert_eq!(cfg.controller.base_args, vec!["-m", "enca"]);
    assert_eq!(cfg.controller.accounts, vec!["carbon", "custom"]);
    assert_eq!(cfg.controller.env.get("GDAL_CACHEMAX").map(String::as_str), Some("512"));
    assert_eq!(cfg.run.tier, Some(3));
    assert!(cfg.run.continue_run);
    assert_eq!(cfg.run.inputs.get("lc"), Some(&PathBuf::from("/tmp/lc.tif")));
    let alpha = cfg.run.parameters.get("alpha").copied().ok_or("missing alpha")?;
    assert_eq!(alpha.value, 0.5);
    assert_eq!(alpha.min, None);
    assert_eq!(alpha.max, Some(1.0));
    Ok(())
}

#[test]
fn malformed_toml_is_a_toml_error() -> TestResult {
    let file = write_config("[controller\nexecutable = ")?;
    let err = load_from_path(file.path()).expect_err("invalid TOML");
    assert!(matches!(err, EncarunError::TomlError(_)));
    Ok(())
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_and_validate("/nonexistent/Encarun.toml").expect_err("no such file");
    assert!(matches!(err, EncarunError::IoError(_)));
}

#[test]
fn structural_problems_are_config_errors() {
    let raw = ConfigFileBuilder::new().executable("  ").raw();
    assert!(matches!(
        validate_config(&raw),
        Err(EncarunError::ConfigError(_))
    ));

    let raw = ConfigFileBuilder::new().env("BAD=NAME", "x").raw();
    assert!(ConfigFile::try_from(raw).is_err());

    let raw = ConfigFileBuilder::new().log_file_name("logs/run.log").raw();
    assert!(ConfigFile::try_from(raw).is_err());

    let raw = ConfigFileBuilder::new()
        .parameter("a=b", encarun::config::NumericParameter::new(1.0))
        .raw();
    assert!(ConfigFile::try_from(raw).is_err());
}

#[test]
fn sample_config_in_demos_loads() -> TestResult {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/encarun.toml");
    let cfg = load_and_validate(&path)?;
    assert_eq!(cfg.run.account, "carbon");
    assert_eq!(cfg.run.years, vec![2000, 2018]);
    assert_eq!(cfg.run.inputs.len(), 2);
    Ok(())
}
