// src/outcome/report.rs

use std::fmt;

use crate::outcome::{TaskOutcome, TaskResult};

/// User-facing rendering of a [`TaskResult`].
///
/// Front ends show `title()` as the heading and the `Display` output as the
/// body; `is_blocking()` says whether that deserves a modal message or can be
/// listed inline.
#[derive(Debug, Clone, Copy)]
pub struct ResultReport<'a> {
    result: &'a TaskResult,
}

impl<'a> ResultReport<'a> {
    pub fn new(result: &'a TaskResult) -> Self {
        Self { result }
    }

    pub fn title(&self) -> String {
        match self.result.outcome() {
            TaskOutcome::Success => "Task completed".to_string(),
            TaskOutcome::SuccessWithWarnings => "Task completed with warnings".to_string(),
            TaskOutcome::Cancelled => "Task was cancelled".to_string(),
            TaskOutcome::ConfigurationError => "Task configuration error".to_string(),
            TaskOutcome::ProcessingError => "Task processing error".to_string(),
            TaskOutcome::UnexpectedError => "Task encountered an unexpected error".to_string(),
            TaskOutcome::UnsupportedExitCode => match self.result.exit_code() {
                Some(code) => format!("Task returned an unsupported exit code: {code}"),
                None => "Task ended without an exit code".to_string(),
            },
        }
    }

    pub fn is_blocking(&self) -> bool {
        !self.result.outcome().is_success()
    }
}

impl fmt::Display for ResultReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title())?;

        if self.result.outcome() == TaskOutcome::Success {
            return Ok(());
        }

        if let Some(path) = self.result.log_file() {
            write!(
                f,
                "\nPlease refer to the log file at {} for more details.",
                path.display()
            )?;
        }

        let errors = self.result.errors();
        let warnings = self.result.warnings();
        if !errors.is_empty() {
            write!(f, "\nError message(s):")?;
            for e in errors {
                write!(f, "\n{e}")?;
            }
        } else if !warnings.is_empty() {
            write!(f, "\nWarning(s):")?;
            for w in warnings {
                write!(f, "\n{w}")?;
            }
        }

        Ok(())
    }
}
