// src/engine/core.rs

//! Pure controller state machine.
//!
//! This module contains a synchronous, deterministic core that consumes
//! [`CoreEvent`]s and produces:
//! - an updated slot state
//! - a list of commands describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::Controller`) is responsible for reading
//! events from channels, answering start requests, talking to the process
//! backend and sending notifications. The core has no channels, no Tokio
//! types, and does not perform any IO, so it can be tested exhaustively.

use std::time::SystemTime;

use crate::engine::SupervisorEvent;
use crate::engine::event_handlers::{
    CoreStep, handle_cancel, handle_finished, handle_launch_failed, handle_shutdown,
    handle_spawned, handle_submit,
};
use crate::task::{TaskId, TaskSpec, TaskState, TaskStatus};

/// Input of [`ControllerCore::step`].
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    Submit {
        spec: TaskSpec,
        submitted_at: SystemTime,
    },
    Cancel,
    Shutdown,
    Supervisor(SupervisorEvent),
}

/// The task occupying the slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTask {
    pub id: TaskId,
    pub status: TaskStatus,
    /// Set once by the first effective cancel; decides the classification.
    pub cancel_requested: bool,
}

impl ActiveTask {
    pub fn new(id: TaskId) -> Self {
        Self {
            id,
            status: TaskStatus::submitted(),
            cancel_requested: false,
        }
    }
}

/// Pure controller state: at most one active task.
#[derive(Debug, Default)]
pub struct ControllerCore {
    active: Option<ActiveTask>,
    next_id: u64,
    shutting_down: bool,
}

impl ControllerCore {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of the slot: `Idle` when empty, else the active task's state.
    pub fn state(&self) -> TaskState {
        self.active
            .as_ref()
            .map_or(TaskState::Idle, |t| t.status.state)
    }

    pub fn active(&self) -> Option<&ActiveTask> {
        self.active.as_ref()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down
    }

    /// Handle a single event, updating the slot and returning the resulting
    /// commands for the IO shell.
    pub fn step(&mut self, event: CoreEvent) -> CoreStep {
        let commands = match event {
            CoreEvent::Submit { spec, submitted_at } => handle_submit(
                &mut self.active,
                &mut self.next_id,
                self.shutting_down,
                spec,
                submitted_at,
            ),
            CoreEvent::Cancel => handle_cancel(&mut self.active),
            CoreEvent::Shutdown => handle_shutdown(&mut self.active, &mut self.shutting_down),
            CoreEvent::Supervisor(SupervisorEvent::Spawned { task, pid }) => {
                handle_spawned(&mut self.active, task, pid)
            }
            CoreEvent::Supervisor(SupervisorEvent::LaunchFailed {
                task,
                error,
                log_file,
            }) => handle_launch_failed(&mut self.active, task, error, log_file),
            CoreEvent::Supervisor(SupervisorEvent::Finished { task, report }) => {
                handle_finished(&mut self.active, task, report)
            }
        };

        CoreStep {
            commands,
            keep_running: !(self.shutting_down && self.active.is_none()),
        }
    }
}
