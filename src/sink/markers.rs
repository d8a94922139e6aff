// src/sink/markers.rs

//! Recognition of the external tool's level tags.
//!
//! The tool logs records as `<time> <logger> [<LEVEL>] - <message>`. A line
//! carrying a tag starts a new record; a line without one continues the
//! previous record of the same stream (tracebacks, wrapped messages).

use std::sync::LazyLock;

use regex::Regex;

use crate::types::Severity;

static LEVEL_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(CRITICAL|ERROR|WARNING|INFO|DEBUG)\]").expect("level tag pattern is valid")
});

/// Severity of the first level tag in `text` and the byte offset right after it.
pub fn find_marker(text: &str) -> Option<(Severity, usize)> {
    let caps = LEVEL_TAG.captures(text)?;
    let tag = caps.get(1)?;
    let whole = caps.get(0)?;
    let severity = tag.as_str().parse::<Severity>().ok()?;
    Some((severity, whole.end()))
}

/// Message part of a tagged line, i.e. the text after `[LEVEL] - `.
///
/// Untagged lines are returned unchanged.
pub fn message_of(text: &str) -> &str {
    match find_marker(text) {
        Some((_, end)) => {
            let rest = text[end..].trim_start();
            rest.strip_prefix("- ").unwrap_or(rest)
        }
        None => text,
    }
}

/// How one line relates to the records of its stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineKind {
    pub severity: Severity,
    /// The line has no tag and extends the previous record.
    pub continuation: bool,
}

/// Per-stream classifier. One instance must only ever see lines of one
/// stream, in order.
#[derive(Debug, Clone, Default)]
pub struct MarkerParser {
    current: Option<Severity>,
}

impl MarkerParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classify(&mut self, text: &str) -> LineKind {
        match find_marker(text) {
            Some((severity, _)) => {
                self.current = Some(severity);
                LineKind {
                    severity,
                    continuation: false,
                }
            }
            None => match self.current {
                Some(severity) => LineKind {
                    severity,
                    continuation: true,
                },
                // Nothing to continue yet: a plain informational line.
                None => LineKind {
                    severity: Severity::Info,
                    continuation: false,
                },
            },
        }
    }
}
