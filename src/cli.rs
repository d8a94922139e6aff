// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `encarun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "encarun",
    version,
    about = "Run one ecosystem-accounting job, stream its log and report the outcome.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Encarun.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Encarun.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ENCARUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate the config and print the command line, but don't run it.
    #[arg(long)]
    pub dry_run: bool,

    /// Run this account instead of `run.account`.
    #[arg(long, value_name = "NAME")]
    pub account: Option<String>,

    /// Use this run name instead of `run.run_name`.
    #[arg(long, value_name = "NAME")]
    pub run_name: Option<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
