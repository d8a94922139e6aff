// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod outcome;
pub mod sink;
pub mod task;
pub mod types;

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::ConfigFile;
use crate::config::loader::load_and_validate;
use crate::engine::{ControllerHandle, Notification, spawn_controller};
use crate::exec::SupervisorOptions;
use crate::fs::RealFileSystem;
use crate::outcome::{TaskOutcome, TaskResult};
use crate::sink::LogLine;
use crate::task::{TaskSpec, TaskSpecBuilder};
use crate::types::Severity;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - building the task spec
/// - the controller and its real process backend
/// - Ctrl-C handling (cancels the running task)
/// - printing streamed lines and the final report
///
/// Every task-level failure is reported and returned as a [`TaskOutcome`];
/// only controller plumbing failures surface as `Err`.
pub async fn run(args: CliArgs) -> Result<TaskOutcome> {
    let config_path = PathBuf::from(&args.config);
    let mut cfg = match load_and_validate(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            let result =
                TaskResult::configuration_error(vec![format!("{}: {e}", config_path.display())]);
            present(&result);
            return Ok(result.outcome());
        }
    };
    apply_overrides(&mut cfg, &args);

    let spec = match TaskSpecBuilder::new(&cfg, &RealFileSystem).build() {
        Ok(spec) => spec,
        Err(e) => {
            warn!(problems = e.problems().len(), "run configuration rejected");
            let result = TaskResult::from(e);
            present(&result);
            return Ok(result.outcome());
        }
    };

    if args.dry_run {
        print_dry_run(&spec);
        return Ok(TaskOutcome::Success);
    }

    let (controller, mut notifications, controller_task) =
        spawn_controller(SupervisorOptions::default());

    // Ctrl-C → cancel the running task; the controller keeps going until the
    // result is delivered.
    spawn_ctrl_c_forwarder(controller.clone());

    let handle = controller
        .start(spec)
        .await
        .context("submitting task to controller")?;
    info!(task = %handle.id(), "task accepted");

    let result = presentation_loop(&mut notifications).await;

    if let Err(e) = controller.shutdown().await {
        debug!(error = %e, "controller already stopped");
    }
    match controller_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "controller loop ended with an error"),
        Err(e) => warn!(error = %e, "controller task panicked"),
    }

    let result = result.ok_or_else(|| anyhow!("controller stopped without delivering a result"))?;
    present(&result);
    Ok(result.outcome())
}

/// CLI overrides win over the file.
fn apply_overrides(cfg: &mut ConfigFile, args: &CliArgs) {
    if let Some(account) = &args.account {
        debug!(%account, "account overridden on the command line");
        cfg.run.account = account.clone();
    }
    if let Some(run_name) = &args.run_name {
        debug!(%run_name, "run name overridden on the command line");
        cfg.run.run_name = run_name.clone();
    }
}

fn spawn_ctrl_c_forwarder(controller: ControllerHandle) {
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("Ctrl+C received; cancelling task");
            if controller.request_cancel().await.is_err() {
                return;
            }
        }
    });
}

/// Print streamed lines until the result arrives.
async fn presentation_loop(
    notifications: &mut mpsc::UnboundedReceiver<Notification>,
) -> Option<TaskResult> {
    while let Some(notification) = notifications.recv().await {
        match notification {
            Notification::Log(line) => print_line(&line),
            Notification::StateChanged { task, state } => {
                info!(task = %task, %state, "task state changed");
            }
            Notification::Finished(result) => return Some(result),
        }
    }
    None
}

fn print_line(line: &LogLine) {
    let marker = match (line.severity, line.continuation) {
        (_, true) => "  ",
        (Severity::Error, false) => "✖ ",
        (Severity::Warning, false) => "⚠ ",
        (Severity::Info, false) => "",
    };
    println!("{marker}{}", line.text);
}

fn present(result: &TaskResult) {
    let report = result.report();
    if report.is_blocking() {
        eprintln!("\n{report}");
    } else {
        println!("\n{report}");
    }
}

/// Dry-run output: the exact invocation, nothing is spawned.
fn print_dry_run(spec: &TaskSpec) {
    println!("encarun dry-run");
    println!("  command:     {spec}");
    println!("  working dir: {}", spec.working_dir().display());
    println!("  log file:    {}", spec.log_path().display());
    if !spec.env_overrides().is_empty() {
        println!("  env:");
        for (key, value) in spec.env_overrides() {
            println!("    {key}={value}");
        }
    }

    debug!("dry-run complete (no execution)");
}
