// src/outcome/mod.rs

//! Final classification of a task.
//!
//! - [`classifier`] holds the exit-code contract and the decision table.
//! - [`report`] renders a result into the text shown to the user.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::task::{SpecError, TaskId, TaskState};

pub mod classifier;
pub mod report;

pub use classifier::{classify, decide_outcome, exit_codes, ExitReport};
pub use report::ResultReport;

/// User-meaningful category of a finished task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskOutcome {
    Success,
    SuccessWithWarnings,
    Cancelled,
    ConfigurationError,
    ProcessingError,
    UnexpectedError,
    UnsupportedExitCode,
}

impl TaskOutcome {
    pub const ALL: [TaskOutcome; 7] = [
        TaskOutcome::Success,
        TaskOutcome::SuccessWithWarnings,
        TaskOutcome::Cancelled,
        TaskOutcome::ConfigurationError,
        TaskOutcome::ProcessingError,
        TaskOutcome::UnexpectedError,
        TaskOutcome::UnsupportedExitCode,
    ];

    pub fn is_success(self) -> bool {
        matches!(self, TaskOutcome::Success | TaskOutcome::SuccessWithWarnings)
    }

    /// Terminal lifecycle state a task ends in with this outcome.
    pub fn final_state(self) -> TaskState {
        match self {
            TaskOutcome::Success | TaskOutcome::SuccessWithWarnings => TaskState::Completed,
            TaskOutcome::Cancelled => TaskState::Cancelled,
            _ => TaskState::Failed,
        }
    }

    /// Exit status for the `encarun` binary, expressed in the same contract as
    /// the external tool.
    pub fn process_exit_code(self) -> i32 {
        match self {
            TaskOutcome::Success => exit_codes::RUN_OK,
            TaskOutcome::SuccessWithWarnings => exit_codes::RUN_WARN,
            TaskOutcome::Cancelled => exit_codes::CANCEL,
            TaskOutcome::ConfigurationError => exit_codes::ERROR_CONFIG,
            TaskOutcome::ProcessingError => exit_codes::ERROR_PROCESSING,
            TaskOutcome::UnexpectedError | TaskOutcome::UnsupportedExitCode => {
                exit_codes::ERROR_OTHER
            }
        }
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskOutcome::Success => "success",
            TaskOutcome::SuccessWithWarnings => "success with warnings",
            TaskOutcome::Cancelled => "cancelled",
            TaskOutcome::ConfigurationError => "configuration error",
            TaskOutcome::ProcessingError => "processing error",
            TaskOutcome::UnexpectedError => "unexpected error",
            TaskOutcome::UnsupportedExitCode => "unsupported exit code",
        };
        f.write_str(s)
    }
}

/// Immutable final result of one task; produced exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    task: Option<TaskId>,
    outcome: TaskOutcome,
    exit_code: Option<i32>,
    warnings: Vec<String>,
    errors: Vec<String>,
    log_file: Option<PathBuf>,
}

impl TaskResult {
    pub(crate) fn new(
        task: Option<TaskId>,
        outcome: TaskOutcome,
        exit_code: Option<i32>,
        warnings: Vec<String>,
        errors: Vec<String>,
        log_file: Option<PathBuf>,
    ) -> Self {
        Self {
            task,
            outcome,
            exit_code,
            warnings,
            errors,
            log_file,
        }
    }

    /// The configuration was rejected; nothing was spawned and there is no log.
    pub fn configuration_error(errors: Vec<String>) -> Self {
        Self::new(None, TaskOutcome::ConfigurationError, None, Vec::new(), errors, None)
    }

    /// The process could not be launched. The OS message is kept verbatim.
    pub fn launch_failure(task: TaskId, error: String, log_file: Option<PathBuf>) -> Self {
        Self::new(
            Some(task),
            TaskOutcome::UnexpectedError,
            None,
            Vec::new(),
            vec![error],
            log_file,
        )
    }

    /// The task was cancelled before (or while) it was being launched.
    pub fn cancelled_before_start(task: TaskId, log_file: Option<PathBuf>) -> Self {
        Self::new(
            Some(task),
            TaskOutcome::Cancelled,
            None,
            Vec::new(),
            Vec::new(),
            log_file,
        )
    }

    pub fn task(&self) -> Option<TaskId> {
        self.task
    }

    pub fn outcome(&self) -> TaskOutcome {
        self.outcome
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    pub fn report(&self) -> ResultReport<'_> {
        ResultReport::new(self)
    }
}

impl From<SpecError> for TaskResult {
    fn from(err: SpecError) -> Self {
        let errors = err
            .into_problems()
            .into_iter()
            .map(|p| p.to_string())
            .collect();
        TaskResult::configuration_error(errors)
    }
}
