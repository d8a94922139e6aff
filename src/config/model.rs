// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [controller]
/// executable = "python"
/// base_args = ["-m", "enca"]
///
/// [controller.env]
/// PYTHONUNBUFFERED = "1"
///
/// [run]
/// account = "carbon"
/// run_name = "baseline"
/// output_dir = "/data/enca"
/// years = [2000, 2010]
///
/// [run.inputs]
/// land_cover = "/data/land_cover.tif"
///
/// [run.parameters.discount_rate]
/// value = 0.03
/// min = 0.0
/// max = 1.0
/// ```
///
/// This is the raw, deserialized form; see [`ConfigFile`] for the validated
/// one.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    pub controller: ControllerSection,
    pub run: RunSection,
}

/// A structurally validated configuration.
///
/// Only obtainable through `ConfigFile::try_from(RawConfigFile)` (see
/// `validate.rs`) or [`crate::config::load_and_validate`]. Checks that need the
/// filesystem (input files exist, run directory free) are left to
/// [`crate::task::TaskSpecBuilder`].
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub controller: ControllerSection,
    pub run: RunSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(controller: ControllerSection, run: RunSection) -> Self {
        Self { controller, run }
    }
}

/// `[controller]` section: how the external tool is invoked.
#[derive(Debug, Clone, Deserialize)]
pub struct ControllerSection {
    /// Program to execute (looked up on `PATH` if not a path).
    pub executable: String,

    /// Arguments placed before the account name, e.g. `["-m", "enca"]`.
    #[serde(default)]
    pub base_args: Vec<String>,

    /// Account/module names the external tool accepts.
    #[serde(default = "default_accounts")]
    pub accounts: Vec<String>,

    /// Pass `--verbose` to the external tool.
    #[serde(default = "default_verbose")]
    pub verbose: bool,

    /// Environment overrides; everything else is inherited.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// File name of the persisted log inside the output directory.
    ///
    /// Defaults to `<run_name>.log`.
    #[serde(default)]
    pub log_file_name: Option<String>,
}

pub fn default_accounts() -> Vec<String> {
    [
        "carbon",
        "carbon-agriculture",
        "carbon-fire",
        "carbon-fire-vulnerability",
        "carbon-forest",
        "carbon-livestock",
        "carbon-npp",
        "carbon-soil",
        "carbon-erosion",
        "infra",
        "leac",
        "water",
        "total",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_verbose() -> bool {
    true
}

/// `[run]` section: one computation request.
#[derive(Debug, Clone, Deserialize)]
pub struct RunSection {
    /// Account/module to run; first positional argument of the invocation.
    pub account: String,

    /// Output goes to `<output_dir>/<run_name>`.
    pub run_name: String,

    /// User-chosen directory; also the working directory of the process.
    pub output_dir: PathBuf,

    #[serde(default)]
    pub years: Vec<i32>,

    #[serde(default)]
    pub tier: Option<u8>,

    #[serde(default)]
    pub aoi_name: Option<String>,

    /// Resume work in an existing run directory.
    #[serde(default, rename = "continue")]
    pub continue_run: bool,

    /// Named input files (`name = "path"`).
    #[serde(default)]
    pub inputs: BTreeMap<String, PathBuf>,

    /// Named numeric parameters with optional declared range.
    #[serde(default)]
    pub parameters: BTreeMap<String, NumericParameter>,
}

/// `[run.parameters.<name>]`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct NumericParameter {
    pub value: f64,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl NumericParameter {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            min: None,
            max: None,
        }
    }

    pub fn with_range(value: f64, min: f64, max: f64) -> Self {
        Self {
            value,
            min: Some(min),
            max: Some(max),
        }
    }
}
