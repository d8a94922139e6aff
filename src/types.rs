use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Which pipe of the external process a line was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamOrigin {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamOrigin::Stdout => f.write_str("stdout"),
            StreamOrigin::Stderr => f.write_str("stderr"),
        }
    }
}

/// Severity derived from the level tag the external tool writes in front of
/// each log record.
///
/// - `Info`: `[INFO]`, `[DEBUG]` or no tag at the start of a stream.
/// - `Warning`: `[WARNING]`.
/// - `Error`: `[ERROR]` or `[CRITICAL]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => f.write_str("info"),
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    /// Accepts both the external tool's level names (`CRITICAL`, `ERROR`,
    /// `WARNING`, `INFO`, `DEBUG`) and our own lowercase names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "critical" | "error" => Ok(Severity::Error),
            "warning" | "warn" => Ok(Severity::Warning),
            "info" | "debug" => Ok(Severity::Info),
            other => Err(format!(
                "invalid severity: {other} (expected CRITICAL, ERROR, WARNING, INFO or DEBUG)"
            )),
        }
    }
}
