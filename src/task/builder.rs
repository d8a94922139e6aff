// src/task/builder.rs

//! Task Specification Builder.
//!
//! Turns a structurally valid [`ConfigFile`] into a [`TaskSpec`]. Every check
//! that needs the filesystem or the declared ranges happens here, and all
//! problems are collected so a user can fix them in one go. The builder never
//! spawns anything; a failure here means no process is ever created.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

use crate::config::ConfigFile;
use crate::fs::FileSystem;
use crate::task::TaskSpec;

pub const MIN_TIER: u8 = 1;
pub const MAX_TIER: u8 = 3;

/// Value passed as `--started-from` so the external tool can log its caller.
pub fn started_from_tag() -> String {
    format!("encarun/{}", env!("CARGO_PKG_VERSION"))
}

/// One reason why a configuration cannot be run.
///
/// `field` is the dotted config path (e.g. `run.inputs.land_cover`) so that a
/// front end can point at the offending input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigProblem {
    pub field: String,
    pub message: String,
}

impl ConfigProblem {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// The configuration was rejected before any process was created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid run configuration ({} problem(s)): {}", .problems.len(), join_problems(.problems))]
pub struct SpecError {
    problems: Vec<ConfigProblem>,
}

impl SpecError {
    pub fn new(problems: Vec<ConfigProblem>) -> Self {
        Self { problems }
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(vec![ConfigProblem::new(field, message)])
    }

    pub fn problems(&self) -> &[ConfigProblem] {
        &self.problems
    }

    pub fn into_problems(self) -> Vec<ConfigProblem> {
        self.problems
    }
}

fn join_problems(problems: &[ConfigProblem]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Builds the invocation for the external tool:
///
/// `<executable> <base_args..> <account> --run-name <name> --output-dir <dir>
/// --years <y1,y2,..> [--tier <n>] [--aoi-name <name>] [--continue]
/// [--verbose] --started-from <tag> [--input <name>=<path>].. [--param <name>=<value>]..`
#[derive(Debug)]
pub struct TaskSpecBuilder<'a> {
    config: &'a ConfigFile,
    fs: &'a dyn FileSystem,
}

impl<'a> TaskSpecBuilder<'a> {
    pub fn new(config: &'a ConfigFile, fs: &'a dyn FileSystem) -> Self {
        Self { config, fs }
    }

    /// Validate the configuration and produce the invocation descriptor.
    pub fn build(&self) -> Result<TaskSpec, SpecError> {
        let mut problems = Vec::new();

        self.check_account(&mut problems);
        self.check_run_name(&mut problems);
        self.check_output_dir(&mut problems);
        self.check_years_and_tier(&mut problems);
        self.check_inputs(&mut problems);
        self.check_parameters(&mut problems);

        if !problems.is_empty() {
            debug!(count = problems.len(), "run configuration rejected");
            return Err(SpecError::new(problems));
        }

        Ok(self.assemble())
    }

    fn run_name(&self) -> &str {
        self.config.run.run_name.trim()
    }

    fn run_dir(&self) -> PathBuf {
        self.config.run.output_dir.join(self.run_name())
    }

    fn check_account(&self, problems: &mut Vec<ConfigProblem>) {
        let account = self.config.run.account.trim();
        if !self.config.controller.accounts.iter().any(|a| a == account) {
            problems.push(ConfigProblem::new(
                "run.account",
                format!(
                    "unknown account '{account}' (known: {})",
                    self.config.controller.accounts.join(", ")
                ),
            ));
        }
    }

    fn check_run_name(&self, problems: &mut Vec<ConfigProblem>) {
        let name = self.run_name();
        if name.is_empty() {
            problems.push(ConfigProblem::new("run.run_name", "run name must not be empty"));
        } else if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
            problems.push(ConfigProblem::new(
                "run.run_name",
                format!("run name '{name}' must not contain path separators"),
            ));
        }
    }

    fn check_output_dir(&self, problems: &mut Vec<ConfigProblem>) {
        let output_dir = &self.config.run.output_dir;
        if !self.fs.is_dir(output_dir) {
            problems.push(ConfigProblem::new(
                "run.output_dir",
                format!("output directory {} does not exist", output_dir.display()),
            ));
            return;
        }

        if self.run_name().is_empty() {
            return;
        }

        let run_dir = self.run_dir();
        if self.fs.exists(&run_dir) && !self.config.run.continue_run {
            problems.push(ConfigProblem::new(
                "run.run_name",
                format!(
                    "run directory {} already exists; set `continue = true` to resume it",
                    run_dir.display()
                ),
            ));
        }
    }

    fn check_years_and_tier(&self, problems: &mut Vec<ConfigProblem>) {
        let years = &self.config.run.years;
        if years.is_empty() {
            problems.push(ConfigProblem::new("run.years", "at least one year is required"));
        }

        let mut seen = HashSet::new();
        for year in years {
            if !seen.insert(*year) {
                problems.push(ConfigProblem::new(
                    "run.years",
                    format!("year {year} is listed more than once"),
                ));
            }
        }

        if let Some(tier) = self.config.run.tier {
            if !(MIN_TIER..=MAX_TIER).contains(&tier) {
                problems.push(ConfigProblem::new(
                    "run.tier",
                    format!("tier {tier} is outside {MIN_TIER}..={MAX_TIER}"),
                ));
            }
        }
    }

    fn check_inputs(&self, problems: &mut Vec<ConfigProblem>) {
        for (name, path) in &self.config.run.inputs {
            let field = format!("run.inputs.{name}");
            if !self.fs.exists(path) {
                problems.push(ConfigProblem::new(
                    field,
                    format!("input file {} does not exist", path.display()),
                ));
            } else if !self.fs.is_file(path) {
                problems.push(ConfigProblem::new(
                    field,
                    format!("input {} is not a file", path.display()),
                ));
            }
        }
    }

    fn check_parameters(&self, problems: &mut Vec<ConfigProblem>) {
        for (name, param) in &self.config.run.parameters {
            let field = format!("run.parameters.{name}");

            if !param.value.is_finite() {
                problems.push(ConfigProblem::new(field, "value must be a finite number"));
                continue;
            }

            if let (Some(min), Some(max)) = (param.min, param.max) {
                if min > max {
                    problems.push(ConfigProblem::new(
                        field,
                        format!("declared range is empty (min {min} > max {max})"),
                    ));
                    continue;
                }
            }

            let below = param.min.is_some_and(|min| param.value < min);
            let above = param.max.is_some_and(|max| param.value > max);
            if below || above {
                problems.push(ConfigProblem::new(
                    field,
                    format!(
                        "value {} is outside the declared range {}..={}",
                        param.value,
                        param.min.map_or("-inf".to_string(), |v| v.to_string()),
                        param.max.map_or("+inf".to_string(), |v| v.to_string()),
                    ),
                ));
            }
        }
    }

    fn assemble(&self) -> TaskSpec {
        let controller = &self.config.controller;
        let run = &self.config.run;
        let run_name = self.run_name();

        let years = run
            .years
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let mut spec = TaskSpec::new(controller.executable.trim(), run.output_dir.clone())
            .args(controller.base_args.iter().cloned())
            .arg(run.account.trim())
            .args(["--run-name", run_name])
            .arg("--output-dir")
            .arg(run.output_dir.to_string_lossy())
            .args(["--years".to_string(), years]);

        if let Some(tier) = run.tier {
            spec = spec.args(["--tier".to_string(), tier.to_string()]);
        }
        if let Some(aoi) = run.aoi_name.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            spec = spec.args(["--aoi-name", aoi]);
        }
        if run.continue_run {
            spec = spec.arg("--continue");
        }
        if controller.verbose {
            spec = spec.arg("--verbose");
        }
        spec = spec.args(["--started-from".to_string(), started_from_tag()]);

        for (name, path) in &run.inputs {
            spec = spec.args(["--input".to_string(), format!("{name}={}", path.display())]);
        }
        for (name, param) in &run.parameters {
            spec = spec.args(["--param".to_string(), format!("{name}={}", param.value)]);
        }

        for (key, value) in &controller.env {
            spec = spec.env(key, value);
        }

        let log_name = controller
            .log_file_name
            .clone()
            .unwrap_or_else(|| format!("{run_name}.log"));
        spec.log_file(run.output_dir.join(log_name))
    }
}
