// src/task/mod.rs

//! Task data model.
//!
//! - [`spec`] holds the immutable invocation descriptor handed to the
//!   controller.
//! - [`builder`] turns a validated [`crate::config::ConfigFile`] into a
//!   [`TaskSpec`], or into the list of problems that prevents it.
//! - This module defines task identity and lifecycle state.

use std::fmt;
use std::time::SystemTime;

use tokio::sync::watch;

pub mod builder;
pub mod spec;

pub use builder::{ConfigProblem, SpecError, TaskSpecBuilder};
pub use spec::TaskSpec;

/// Identity of one submitted task, unique per controller instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Lifecycle state of the controller slot and of a single task.
///
/// `Idle` only describes the controller slot (no task occupies it). A task
/// moves forward through `Submitted -> Running -> CancelRequested` and ends in
/// one of the terminal states; it never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Idle,
    Submitted,
    Running,
    CancelRequested,
    Completed,
    Cancelled,
    Failed,
}

impl TaskState {
    /// Task accepted and not finished yet.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            TaskState::Submitted | TaskState::Running | TaskState::CancelRequested
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Cancelled | TaskState::Failed
        )
    }

    fn rank(self) -> u8 {
        match self {
            TaskState::Idle => 0,
            TaskState::Submitted => 1,
            TaskState::Running => 2,
            TaskState::CancelRequested => 3,
            TaskState::Completed | TaskState::Cancelled | TaskState::Failed => 4,
        }
    }

    /// Whether moving from `self` to `next` keeps the lifecycle monotonic.
    pub fn can_advance_to(self, next: TaskState) -> bool {
        next.rank() > self.rank()
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Idle => "idle",
            TaskState::Submitted => "submitted",
            TaskState::Running => "running",
            TaskState::CancelRequested => "cancel-requested",
            TaskState::Completed => "completed",
            TaskState::Cancelled => "cancelled",
            TaskState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Live view of a task: its state plus the OS process id once spawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskStatus {
    pub state: TaskState,
    pub pid: Option<u32>,
}

impl TaskStatus {
    pub fn submitted() -> Self {
        Self {
            state: TaskState::Submitted,
            pid: None,
        }
    }
}

/// Caller-side handle returned by [`crate::engine::ControllerHandle::start`].
///
/// The handle is a read-only view; the controller alone owns the process and
/// drives the state.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: TaskId,
    submitted_at: SystemTime,
    status: watch::Receiver<TaskStatus>,
}

impl TaskHandle {
    pub fn new(id: TaskId, submitted_at: SystemTime, status: watch::Receiver<TaskStatus>) -> Self {
        Self {
            id,
            submitted_at,
            status,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn submitted_at(&self) -> SystemTime {
        self.submitted_at
    }

    pub fn status(&self) -> TaskStatus {
        *self.status.borrow()
    }

    pub fn state(&self) -> TaskState {
        self.status.borrow().state
    }

    /// OS process id, `None` until the process has been spawned (and forever
    /// if it never was).
    pub fn pid(&self) -> Option<u32> {
        self.status.borrow().pid
    }

    /// Wait until the task reaches a terminal state.
    ///
    /// If the controller goes away first, the last observed state is returned.
    pub async fn wait_for_terminal(&mut self) -> TaskState {
        loop {
            let state = self.status.borrow_and_update().state;
            if state.is_terminal() {
                return state;
            }
            if self.status.changed().await.is_err() {
                return self.status.borrow().state;
            }
        }
    }
}
