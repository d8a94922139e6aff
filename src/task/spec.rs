// src/task/spec.rs

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Default name of the persisted log when none is chosen explicitly.
pub const DEFAULT_LOG_FILE_NAME: &str = "encarun.log";

/// Immutable description of one external-process invocation.
///
/// Constructed either by [`super::TaskSpecBuilder`] from a validated config
/// (the normal path) or directly with the chained setters below. Once handed
/// to the controller it is only read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
    env: BTreeMap<String, String>,
    log_file: PathBuf,
}

impl TaskSpec {
    /// Start a spec for `program`, run from `working_dir`.
    ///
    /// The log file defaults to `<working_dir>/encarun.log`.
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        let working_dir = working_dir.into();
        let log_file = working_dir.join(DEFAULT_LOG_FILE_NAME);
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir,
            env: BTreeMap::new(),
            log_file,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Override (or add) one environment variable; the rest of the
    /// environment is inherited.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = path.into();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn env_overrides(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn log_path(&self) -> &Path {
        &self.log_file
    }
}

/// Shell-like rendering of the command line, used for the log header and
/// `--dry-run`. Arguments containing whitespace are double-quoted.
impl fmt::Display for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

fn quote(s: &str) -> String {
    if s.is_empty() || s.chars().any(char::is_whitespace) {
        format!("\"{}\"", s.replace('"', "\\\""))
    } else {
        s.to_string()
    }
}
