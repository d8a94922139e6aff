// src/engine/event_handlers.rs

//! Event handling logic for the controller core.
//!
//! Every handler mutates the single task slot and returns the commands the IO
//! shell has to carry out. State changes only ever move forward
//! (see [`TaskState::can_advance_to`]); a change that would move backwards is
//! dropped.

use std::path::PathBuf;
use std::time::SystemTime;

use tracing::{debug, info, warn};

use crate::engine::core::ActiveTask;
use crate::outcome::{ExitReport, TaskResult, classify};
use crate::task::{TaskId, TaskSpec, TaskState, TaskStatus};

/// Why a start request was turned down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Another task occupies the slot.
    Busy(TaskId),
    /// The controller is shutting down.
    ShuttingDown,
}

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreCommand {
    /// Answer the pending start request with a handle for `task`.
    Accept {
        task: TaskId,
        submitted_at: SystemTime,
    },
    /// Answer the pending start request with an error.
    Reject(Rejection),
    /// Hand the spec to the process backend.
    Launch { task: TaskId, spec: TaskSpec },
    /// Ask the backend to terminate the task's process.
    Terminate { task: TaskId },
    /// The task's observable status changed.
    Publish { task: TaskId, status: TaskStatus },
    /// Hand the final result to the presentation layer.
    Deliver(TaskResult),
    /// The slot is free again.
    ReleaseSlot { task: TaskId },
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer controller loop should keep running.
    pub keep_running: bool,
}

/// Handle a start request.
///
/// Rejected while a task occupies the slot (whatever its state) or once
/// shutdown has begun; otherwise a fresh id is allocated and the task is
/// launched.
pub fn handle_submit(
    active: &mut Option<ActiveTask>,
    next_id: &mut u64,
    shutting_down: bool,
    spec: TaskSpec,
    submitted_at: SystemTime,
) -> Vec<CoreCommand> {
    if shutting_down {
        info!("start requested during shutdown; rejecting");
        return vec![CoreCommand::Reject(Rejection::ShuttingDown)];
    }

    if let Some(current) = active.as_ref() {
        info!(
            active = %current.id,
            state = %current.status.state,
            "start requested while a task is active; rejecting"
        );
        return vec![CoreCommand::Reject(Rejection::Busy(current.id))];
    }

    *next_id += 1;
    let task = TaskId::new(*next_id);
    *active = Some(ActiveTask::new(task));
    info!(task = %task, program = %spec.program(), "task submitted");

    vec![
        CoreCommand::Accept { task, submitted_at },
        CoreCommand::Launch { task, spec },
    ]
}

/// Handle a cancel request for the active task.
///
/// - `Submitted` goes straight to `Cancelled`; the backend is told so it
///   never spawns.
/// - `Running` goes to `CancelRequested` and the backend starts terminating.
/// - Anything else (no task, cancel already requested) is a no-op.
pub fn handle_cancel(active: &mut Option<ActiveTask>) -> Vec<CoreCommand> {
    let Some(current) = active.as_mut() else {
        debug!("cancel requested with no active task; ignoring");
        return Vec::new();
    };

    if current.cancel_requested {
        debug!(task = %current.id, "cancel already requested; ignoring");
        return Vec::new();
    }

    let next = match current.status.state {
        TaskState::Submitted => TaskState::Cancelled,
        TaskState::Running => TaskState::CancelRequested,
        other => {
            debug!(task = %current.id, state = %other, "task past cancellation; ignoring");
            return Vec::new();
        }
    };

    info!(task = %current.id, state = %current.status.state, "cancel requested");
    current.cancel_requested = true;

    let mut commands = Vec::new();
    commands.extend(advance(current, next));
    commands.push(CoreCommand::Terminate { task: current.id });
    commands
}

/// The process for `task` exists now.
pub fn handle_spawned(active: &mut Option<ActiveTask>, task: TaskId, pid: u32) -> Vec<CoreCommand> {
    let Some(current) = matching(active, task) else {
        return Vec::new();
    };

    current.status.pid = Some(pid);
    if current.status.state.can_advance_to(TaskState::Running) {
        current.status.state = TaskState::Running;
    }
    info!(task = %task, pid, state = %current.status.state, "process spawned");

    vec![CoreCommand::Publish {
        task,
        status: current.status,
    }]
}

/// No process could be started for `task`.
pub fn handle_launch_failed(
    active: &mut Option<ActiveTask>,
    task: TaskId,
    error: String,
    log_file: Option<PathBuf>,
) -> Vec<CoreCommand> {
    let Some(current) = matching(active, task) else {
        return Vec::new();
    };

    let result = if current.cancel_requested {
        TaskResult::cancelled_before_start(task, log_file)
    } else {
        warn!(task = %task, %error, "launch failed");
        TaskResult::launch_failure(task, error, log_file)
    };

    finish(active, result)
}

/// The process for `task` is gone and its output is drained.
pub fn handle_finished(
    active: &mut Option<ActiveTask>,
    task: TaskId,
    report: ExitReport,
) -> Vec<CoreCommand> {
    let Some(current) = matching(active, task) else {
        return Vec::new();
    };

    let result = classify(Some(task), report, current.cancel_requested);
    finish(active, result)
}

/// Begin shutdown: cancel the active task if any. The loop stops once the
/// slot is empty.
pub fn handle_shutdown(active: &mut Option<ActiveTask>, shutting_down: &mut bool) -> Vec<CoreCommand> {
    *shutting_down = true;
    match active.as_ref().map(|current| current.id) {
        Some(task) => {
            info!(task = %task, "shutdown requested; cancelling active task");
            handle_cancel(active)
        }
        None => {
            info!("shutdown requested; no active task");
            Vec::new()
        }
    }
}

/// Move the task to its terminal state, deliver the result, free the slot.
fn finish(active: &mut Option<ActiveTask>, result: TaskResult) -> Vec<CoreCommand> {
    let Some(mut current) = active.take() else {
        return Vec::new();
    };

    let mut commands = Vec::new();
    commands.extend(advance(&mut current, result.outcome().final_state()));

    info!(
        task = %current.id,
        outcome = %result.outcome(),
        exit_code = ?result.exit_code(),
        warnings = result.warnings().len(),
        errors = result.errors().len(),
        "task finished"
    );

    commands.push(CoreCommand::Deliver(result));
    commands.push(CoreCommand::ReleaseSlot { task: current.id });
    commands
}

fn advance(current: &mut ActiveTask, next: TaskState) -> Option<CoreCommand> {
    if !current.status.state.can_advance_to(next) {
        debug!(
            task = %current.id,
            from = %current.status.state,
            to = %next,
            "ignoring non-forward state change"
        );
        return None;
    }
    current.status.state = next;
    Some(CoreCommand::Publish {
        task: current.id,
        status: current.status,
    })
}

fn matching(active: &mut Option<ActiveTask>, task: TaskId) -> Option<&mut ActiveTask> {
    match active.as_mut() {
        Some(current) if current.id == task => Some(current),
        _ => {
            warn!(task = %task, "event for a task that is not active; ignoring");
            None
        }
    }
}
