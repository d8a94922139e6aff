// src/engine/mod.rs

//! Task Execution Controller.
//!
//! This module ties together:
//! - the single task slot and its lifecycle
//! - start / cancel / shutdown requests from the front end
//! - supervisor reports (spawned, launch failed, finished)
//! - the notifications the presentation layer consumes
//!
//! The pure core state machine lives in [`core`] (decisions in
//! [`event_handlers`]); the async/IO shell is implemented in [`runtime`] and
//! driven through the cloneable [`ControllerHandle`] from [`handle`].

use std::path::PathBuf;

use tokio::sync::oneshot;

use crate::errors::Result;
use crate::outcome::{ExitReport, TaskResult};
use crate::sink::LogLine;
use crate::task::{TaskHandle, TaskId, TaskSpec, TaskState};

/// What the presentation layer receives, in order.
///
/// For one task: `StateChanged(Submitted)`, then interleaved `Log` lines and
/// further `StateChanged`s, and finally exactly one `Finished`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Log(LogLine),
    StateChanged { task: TaskId, state: TaskState },
    Finished(TaskResult),
}

/// Reports from the process supervisor (or a test double) about one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// The OS process exists.
    Spawned { task: TaskId, pid: u32 },
    /// No process could be started; `error` is the OS message.
    LaunchFailed {
        task: TaskId,
        error: String,
        log_file: Option<PathBuf>,
    },
    /// The process is gone and its output fully drained, or it was never
    /// started because cancellation came first.
    Finished { task: TaskId, report: ExitReport },
}

impl SupervisorEvent {
    pub fn task(&self) -> TaskId {
        match self {
            SupervisorEvent::Spawned { task, .. }
            | SupervisorEvent::LaunchFailed { task, .. }
            | SupervisorEvent::Finished { task, .. } => *task,
        }
    }
}

/// Events flowing into the controller loop.
#[derive(Debug)]
pub enum ControllerEvent {
    /// Front end wants a task started; the answer goes to `reply`.
    StartRequested {
        spec: TaskSpec,
        reply: oneshot::Sender<Result<TaskHandle>>,
    },
    /// Front end wants the active task cancelled.
    CancelRequested,
    /// Cancel whatever runs, deliver its result, then stop the loop.
    ShutdownRequested,
    Supervisor(SupervisorEvent),
}

pub mod core;
pub mod event_handlers;
pub mod handle;
pub mod runtime;

pub use self::core::{ControllerCore, CoreEvent};
pub use event_handlers::{CoreCommand, CoreStep, Rejection};
pub use handle::ControllerHandle;
pub use runtime::{Controller, spawn_controller, start_controller};
