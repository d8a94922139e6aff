// src/engine/handle.rs

use tokio::sync::{mpsc, oneshot, watch};

use crate::errors::{EncarunError, Result};
use crate::task::{TaskHandle, TaskSpec, TaskState};

use super::ControllerEvent;

/// Cloneable front-end handle to a running controller.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    events: mpsc::Sender<ControllerEvent>,
    state: watch::Receiver<TaskState>,
}

impl ControllerHandle {
    pub fn new(events: mpsc::Sender<ControllerEvent>, state: watch::Receiver<TaskState>) -> Self {
        Self { events, state }
    }

    /// Submit `spec` for execution.
    ///
    /// Fails with [`EncarunError::TaskAlreadyRunning`] while the slot is
    /// occupied, and with [`EncarunError::ControllerClosed`] once the
    /// controller is shutting down or gone.
    pub async fn start(&self, spec: TaskSpec) -> Result<TaskHandle> {
        let (reply, answer) = oneshot::channel();
        self.send(ControllerEvent::StartRequested { spec, reply })
            .await?;
        answer.await.map_err(|_| EncarunError::ControllerClosed)?
    }

    /// Ask for the active task to be cancelled. A no-op when nothing runs.
    pub async fn request_cancel(&self) -> Result<()> {
        self.send(ControllerEvent::CancelRequested).await
    }

    /// Cancel the active task (if any) and stop the controller once its
    /// result has been delivered.
    pub async fn shutdown(&self) -> Result<()> {
        self.send(ControllerEvent::ShutdownRequested).await
    }

    /// Current state of the slot.
    pub fn state(&self) -> TaskState {
        *self.state.borrow()
    }

    pub fn is_busy(&self) -> bool {
        self.state() != TaskState::Idle
    }

    pub fn subscribe_state(&self) -> watch::Receiver<TaskState> {
        self.state.clone()
    }

    async fn send(&self, event: ControllerEvent) -> Result<()> {
        self.events
            .send(event)
            .await
            .map_err(|_| EncarunError::ControllerClosed)
    }
}
