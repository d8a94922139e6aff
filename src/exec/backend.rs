// src/exec/backend.rs

//! Pluggable process backend.
//!
//! The controller talks to a `ProcessBackend` instead of spawning processes
//! itself. Production uses [`RealProcessBackend`], which runs one
//! [`supervise`] future per task; tests swap in a fake that records launch
//! and terminate requests and answers with synthetic supervisor events.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::{ControllerEvent, Notification};
use crate::errors::Result;
use crate::exec::cancel::{CancelTrigger, cancel_pair};
use crate::exec::supervisor::{SupervisorOptions, supervise};
use crate::task::{TaskId, TaskSpec};

/// How the controller gets processes started and stopped.
///
/// Implementations report back exclusively through
/// [`ControllerEvent::Supervisor`] events: one `Spawned` at most, then exactly
/// one terminal event (`LaunchFailed` or `Finished`) per launched task.
pub trait ProcessBackend: Send {
    /// Start working on `task`. Returning an error means the task could not
    /// even be handed over; the controller then treats it as a launch
    /// failure.
    fn launch(
        &mut self,
        task: TaskId,
        spec: TaskSpec,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Ask for `task` to be terminated. Must be idempotent and must not
    /// block.
    fn terminate(&mut self, task: TaskId);
}

/// Internal handle for the currently supervised process.
struct ActiveProcess {
    task: TaskId,
    cancel: CancelTrigger,
    handle: JoinHandle<()>,
}

/// Backend that runs real OS processes.
pub struct RealProcessBackend {
    events: mpsc::Sender<ControllerEvent>,
    notify: mpsc::UnboundedSender<Notification>,
    options: SupervisorOptions,
    active: Option<ActiveProcess>,
}

impl RealProcessBackend {
    pub fn new(
        events: mpsc::Sender<ControllerEvent>,
        notify: mpsc::UnboundedSender<Notification>,
        options: SupervisorOptions,
    ) -> Self {
        Self {
            events,
            notify,
            options,
            active: None,
        }
    }

    pub fn options(&self) -> SupervisorOptions {
        self.options
    }
}

impl ProcessBackend for RealProcessBackend {
    fn launch(
        &mut self,
        task: TaskId,
        spec: TaskSpec,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            if let Some(previous) = self.active.as_ref() {
                if !previous.handle.is_finished() {
                    warn!(
                        task = %task,
                        previous = %previous.task,
                        "previous supervisor still winding down"
                    );
                }
            }

            let (trigger, token) = cancel_pair();
            let events = self.events.clone();
            let notify = self.notify.clone();
            let options = self.options;

            let handle = tokio::spawn(async move {
                supervise(task, spec, token, events, notify, options).await;
                debug!(task = %task, "supervisor future finished");
            });

            self.active = Some(ActiveProcess {
                task,
                cancel: trigger,
                handle,
            });
            Ok(())
        })
    }

    fn terminate(&mut self, task: TaskId) {
        match self.active.as_ref() {
            Some(active) if active.task == task => {
                if active.cancel.cancel() {
                    info!(task = %task, "cancellation signalled to supervisor");
                } else {
                    debug!(task = %task, "cancellation already signalled");
                }
            }
            _ => debug!(task = %task, "terminate for unknown task; ignoring"),
        }
    }
}
