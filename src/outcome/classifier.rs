// src/outcome/classifier.rs

//! Outcome Classifier.
//!
//! Pure mapping from (exit code, accumulated warnings/errors, cancellation)
//! to a [`TaskOutcome`]. The exit codes below are a versioned contract with
//! the external tool; the table never guesses beyond them.

use std::path::PathBuf;

use crate::outcome::{TaskOutcome, TaskResult};
use crate::task::TaskId;

/// Exit codes of the external tool, contract version [`CONTRACT_VERSION`].
pub mod exit_codes {
    pub const CONTRACT_VERSION: u32 = 1;

    pub const RUN_OK: i32 = 0;
    pub const ERROR_PROCESSING: i32 = 1;
    pub const ERROR_CONFIG: i32 = 2;
    pub const ERROR_OTHER: i32 = 3;
    pub const RUN_WARN: i32 = 4;
    pub const CANCEL: i32 = 5;
}

pub use exit_codes::CONTRACT_VERSION;

use exit_codes::{CANCEL, ERROR_CONFIG, ERROR_OTHER, ERROR_PROCESSING, RUN_OK, RUN_WARN};

/// Everything the supervisor knows once the process is gone and its output
/// has been drained.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExitReport {
    /// `None` when the process was terminated by a signal (or never ran).
    pub exit_code: Option<i32>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub log_file: Option<PathBuf>,
}

/// The decision table, first match wins:
///
/// 1. user cancellation -> `Cancelled`
/// 2. `0`, no errors, no warnings -> `Success`
/// 3. `0`, no errors, warnings -> `SuccessWithWarnings`
/// 4. `RUN_WARN` -> `SuccessWithWarnings`
/// 5. `CANCEL` -> `Cancelled`
/// 6. `ERROR_CONFIG` -> `ConfigurationError`
/// 7. `ERROR_PROCESSING` -> `ProcessingError`
/// 8. `ERROR_OTHER` -> `UnexpectedError`
/// 9. anything else -> `UnsupportedExitCode`
///
/// Exit code `0` with error lines falls through to 9: the tool reported
/// success while logging errors, which the contract does not cover.
pub fn decide_outcome(
    exit_code: Option<i32>,
    has_warnings: bool,
    has_errors: bool,
    cancelled: bool,
) -> TaskOutcome {
    if cancelled {
        return TaskOutcome::Cancelled;
    }

    match exit_code {
        Some(RUN_OK) if !has_errors && !has_warnings => TaskOutcome::Success,
        Some(RUN_OK) if !has_errors => TaskOutcome::SuccessWithWarnings,
        Some(RUN_WARN) => TaskOutcome::SuccessWithWarnings,
        Some(CANCEL) => TaskOutcome::Cancelled,
        Some(ERROR_CONFIG) => TaskOutcome::ConfigurationError,
        Some(ERROR_PROCESSING) => TaskOutcome::ProcessingError,
        Some(ERROR_OTHER) => TaskOutcome::UnexpectedError,
        _ => TaskOutcome::UnsupportedExitCode,
    }
}

/// Classify a finished process into its immutable [`TaskResult`].
pub fn classify(task: Option<TaskId>, report: ExitReport, cancelled: bool) -> TaskResult {
    let outcome = decide_outcome(
        report.exit_code,
        !report.warnings.is_empty(),
        !report.errors.is_empty(),
        cancelled,
    );

    TaskResult::new(
        task,
        outcome,
        report.exit_code,
        report.warnings,
        report.errors,
        report.log_file,
    )
}
