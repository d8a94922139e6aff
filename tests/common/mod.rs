#![allow(dead_code)]

use std::path::Path;

pub use encarun_test_utils::{init_tracing, with_timeout, with_timeout_of};

use encarun::task::TaskSpec;

/// A spec running `script` through `sh -c` in `dir`, logging to
/// `<dir>/task.log`.
pub fn sh_spec(dir: &Path, script: &str) -> TaskSpec {
    TaskSpec::new("sh", dir)
        .arg("-c")
        .arg(script)
        .log_file(dir.join("task.log"))
}

/// Format a line the way the accounting tool's logger does.
pub fn tool_line(level: &str, message: &str) -> String {
    format!("2024-01-01 12:00:00,000 enca [{level}] - {message}")
}
