// src/exec/supervisor.rs

//! Process Supervisor: runs exactly one external process for one task.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, error, info, warn};

use crate::engine::{ControllerEvent, Notification, SupervisorEvent};
use crate::exec::cancel::{CancelToken, DEFAULT_GRACE_PERIOD, terminate_with_grace};
use crate::exec::streams::spawn_stream_reader;
use crate::outcome::ExitReport;
use crate::sink::{LogSink, SinkInput, SinkSummary};
use crate::task::{TaskId, TaskSpec};
use crate::types::StreamOrigin;

/// How long the pipes may stay open after the process has exited.
///
/// Grandchildren that inherited the pipes can keep them open indefinitely;
/// after this long the readers are abandoned.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorOptions {
    pub grace_period: Duration,
    pub drain_timeout: Duration,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }
}

/// Launch and supervise the process described by `spec`.
///
/// Always ends by sending exactly one terminal event for `task` to the
/// controller: `LaunchFailed` if no process could be started, `Finished`
/// otherwise (including the case where cancellation arrived before the
/// spawn).
pub async fn supervise(
    task: TaskId,
    spec: TaskSpec,
    cancel: CancelToken,
    events: mpsc::Sender<ControllerEvent>,
    notify: mpsc::UnboundedSender<Notification>,
    options: SupervisorOptions,
) {
    let terminal = run_supervised(task, &spec, cancel, &events, notify, options).await;
    if events
        .send(ControllerEvent::Supervisor(terminal))
        .await
        .is_err()
    {
        debug!(task = %task, "controller gone; dropping terminal event");
    }
}

async fn run_supervised(
    task: TaskId,
    spec: &TaskSpec,
    mut cancel: CancelToken,
    events: &mpsc::Sender<ControllerEvent>,
    notify: mpsc::UnboundedSender<Notification>,
    options: SupervisorOptions,
) -> SupervisorEvent {
    if cancel.is_cancelled() {
        info!(task = %task, "cancelled before launch; not starting process");
        return SupervisorEvent::Finished {
            task,
            report: ExitReport::default(),
        };
    }

    let log_path = spec.log_path().to_path_buf();
    let sink = match LogSink::create(task, &log_path, &log_header(task, spec), notify).await {
        Ok(sink) => sink,
        Err(e) => {
            error!(
                task = %task,
                log_file = %log_path.display(),
                error = %e,
                "cannot create task log file"
            );
            return SupervisorEvent::LaunchFailed {
                task,
                error: format!("cannot create log file {}: {e}", log_path.display()),
                log_file: None,
            };
        }
    };

    if cancel.is_cancelled() {
        info!(task = %task, "cancelled before launch; not starting process");
        let summary = sink.finish().await;
        return SupervisorEvent::Finished {
            task,
            report: ExitReport {
                log_file: Some(summary.log_file),
                ..ExitReport::default()
            },
        };
    }

    info!(task = %task, command = %spec, "starting process");

    let mut child = match build_command(spec).spawn() {
        Ok(child) => child,
        Err(e) => {
            error!(task = %task, program = %spec.program(), error = %e, "failed to spawn process");
            let summary = sink.finish().await;
            return SupervisorEvent::LaunchFailed {
                task,
                error: e.to_string(),
                log_file: Some(summary.log_file),
            };
        }
    };

    // `id()` is only `None` after the child has been reaped.
    let pid = child.id().unwrap_or_default();
    if events
        .send(ControllerEvent::Supervisor(SupervisorEvent::Spawned { task, pid }))
        .await
        .is_err()
    {
        debug!(task = %task, "controller gone; process keeps running until it exits");
    }

    let (sink_input, sink_handle) = sink.spawn();
    let readers = attach_readers(task, &mut child, &sink_input);
    drop(sink_input);

    let waited = tokio::select! {
        status = child.wait() => Some(status),
        _ = cancel.cancelled() => None,
    };

    let status: io::Result<ExitStatus> = match waited {
        Some(status) => status,
        None => {
            info!(task = %task, pid, "cancellation requested; terminating process");
            terminate_with_grace(&mut child, task, options.grace_period)
                .await
                .map(|(status, how)| {
                    info!(task = %task, pid, termination = ?how, "process terminated");
                    status
                })
        }
    };

    drain_readers(task, readers, options.drain_timeout).await;

    let mut summary = match sink_handle.await {
        Ok(summary) => summary,
        Err(e) => {
            error!(task = %task, error = %e, "log sink task failed");
            SinkSummary {
                warnings: Vec::new(),
                errors: vec![format!("log sink failed: {e}")],
                log_file: log_path,
                lines: 0,
            }
        }
    };

    let exit_code = match status {
        Ok(status) => {
            info!(
                task = %task,
                pid,
                exit_code = ?status.code(),
                lines = summary.lines,
                warnings = summary.warnings.len(),
                errors = summary.errors.len(),
                "process exited"
            );
            status.code()
        }
        Err(e) => {
            error!(task = %task, pid, error = %e, "failed to wait for process");
            summary
                .errors
                .push(format!("failed to wait for process: {e}"));
            None
        }
    };

    SupervisorEvent::Finished {
        task,
        report: ExitReport {
            exit_code,
            warnings: summary.warnings,
            errors: summary.errors,
            log_file: Some(summary.log_file),
        },
    }
}

fn build_command(spec: &TaskSpec) -> Command {
    let mut cmd = Command::new(spec.program());
    cmd.args(spec.arguments())
        .current_dir(spec.working_dir())
        .envs(spec.env_overrides())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // Own process group, so termination also reaches anything the tool forks.
    #[cfg(unix)]
    cmd.process_group(0);

    cmd
}

fn attach_readers(task: TaskId, child: &mut Child, sink: &SinkInput) -> Vec<JoinHandle<u64>> {
    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_stream_reader(
            task,
            StreamOrigin::Stdout,
            stdout,
            sink.clone(),
        ));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_stream_reader(
            task,
            StreamOrigin::Stderr,
            stderr,
            sink.clone(),
        ));
    }
    readers
}

async fn drain_readers(task: TaskId, readers: Vec<JoinHandle<u64>>, drain_timeout: Duration) {
    let deadline = Instant::now() + drain_timeout;
    for mut reader in readers {
        match timeout_at(deadline, &mut reader).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(task = %task, error = %e, "stream reader failed"),
            Err(_) => {
                warn!(
                    task = %task,
                    "output pipe still open after process exit; abandoning reader"
                );
                reader.abort();
                let _ = reader.await;
            }
        }
    }
}

fn log_header(task: TaskId, spec: &TaskSpec) -> String {
    let started = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("# {task} started at {started} (unix): {spec}")
}
