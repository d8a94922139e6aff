// src/engine/runtime.rs

use std::collections::VecDeque;
use std::fmt;
use std::time::SystemTime;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::errors::{EncarunError, Result};
use crate::exec::{ProcessBackend, RealProcessBackend, SupervisorOptions};
use crate::task::{TaskHandle, TaskId, TaskState, TaskStatus};

use super::core::{ControllerCore, CoreEvent};
use super::handle::ControllerHandle;
use super::{ControllerEvent, CoreCommand, Notification, Rejection, SupervisorEvent};

/// Capacity of the controller's inbound event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

type StartReply = oneshot::Sender<Result<TaskHandle>>;

/// Drives the controller core in response to [`ControllerEvent`]s and
/// delegates process handling to a [`ProcessBackend`].
///
/// This is a pure IO shell around [`ControllerCore`], which contains all the
/// lifecycle semantics. The shell owns the per-task status channel behind each
/// [`TaskHandle`], the slot state channel behind [`ControllerHandle::state`],
/// and the notification channel to the presentation layer.
pub struct Controller<B: ProcessBackend> {
    core: ControllerCore,
    events_rx: mpsc::Receiver<ControllerEvent>,
    backend: B,
    notify: mpsc::UnboundedSender<Notification>,
    slot: watch::Sender<TaskState>,
    current: Option<(TaskId, watch::Sender<TaskStatus>)>,
}

impl<B: ProcessBackend> fmt::Debug for Controller<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<B: ProcessBackend> Controller<B> {
    pub fn new(
        events_rx: mpsc::Receiver<ControllerEvent>,
        backend: B,
        notify: mpsc::UnboundedSender<Notification>,
    ) -> (Self, watch::Receiver<TaskState>) {
        let (slot, slot_rx) = watch::channel(TaskState::Idle);
        let controller = Self {
            core: ControllerCore::new(),
            events_rx,
            backend,
            notify,
            slot,
            current: None,
        };
        (controller, slot_rx)
    }

    /// Main event loop.
    ///
    /// - Consumes `ControllerEvent`s from `events_rx`.
    /// - Feeds them into the core and executes the returned commands.
    /// - Stops once shutdown was requested and the slot is empty.
    pub async fn run(mut self) -> Result<()> {
        info!("controller started");

        loop {
            let event = match self.events_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("controller event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "controller received event");

            let (core_event, mut reply) = match event {
                ControllerEvent::StartRequested { spec, reply } => (
                    CoreEvent::Submit {
                        spec,
                        submitted_at: SystemTime::now(),
                    },
                    Some(reply),
                ),
                ControllerEvent::CancelRequested => (CoreEvent::Cancel, None),
                ControllerEvent::ShutdownRequested => (CoreEvent::Shutdown, None),
                ControllerEvent::Supervisor(event) => (CoreEvent::Supervisor(event), None),
            };

            let mut pending = VecDeque::from([core_event]);
            let mut keep_running = true;
            while let Some(event) = pending.pop_front() {
                let step = self.core.step(event);
                for command in step.commands {
                    if let Some(follow_up) = self.execute_command(command, &mut reply).await {
                        pending.push_back(follow_up);
                    }
                }
                keep_running = step.keep_running;
            }

            if !keep_running {
                info!("shutdown complete; stopping controller");
                break;
            }
        }

        info!("controller exiting");
        Ok(())
    }

    /// Execute a single command from the core.
    ///
    /// Returns an event to feed back into the core when the command itself
    /// failed in a way the core must know about.
    async fn execute_command(
        &mut self,
        command: CoreCommand,
        reply: &mut Option<StartReply>,
    ) -> Option<CoreEvent> {
        match command {
            CoreCommand::Accept { task, submitted_at } => {
                let (status_tx, status_rx) = watch::channel(TaskStatus::submitted());
                self.current = Some((task, status_tx));
                self.publish_state(task, TaskState::Submitted);
                answer(reply, Ok(TaskHandle::new(task, submitted_at, status_rx)));
            }
            CoreCommand::Reject(rejection) => {
                let err = match rejection {
                    Rejection::Busy(active) => EncarunError::TaskAlreadyRunning(active),
                    Rejection::ShuttingDown => EncarunError::ControllerClosed,
                };
                answer(reply, Err(err));
            }
            CoreCommand::Launch { task, spec } => {
                if let Err(e) = self.backend.launch(task, spec).await {
                    error!(task = %task, error = %e, "process backend refused the task");
                    return Some(CoreEvent::Supervisor(SupervisorEvent::LaunchFailed {
                        task,
                        error: e.to_string(),
                        log_file: None,
                    }));
                }
            }
            CoreCommand::Terminate { task } => self.backend.terminate(task),
            CoreCommand::Publish { task, status } => match self.current.as_ref() {
                Some((id, status_tx)) if *id == task => {
                    let previous = status_tx.send_replace(status);
                    if previous.state != status.state {
                        self.publish_state(task, status.state);
                    }
                }
                _ => debug!(task = %task, "status update for a released task; ignoring"),
            },
            CoreCommand::Deliver(result) => {
                if self.notify.send(Notification::Finished(result)).is_err() {
                    debug!("notification channel closed; result not delivered");
                }
            }
            CoreCommand::ReleaseSlot { task } => {
                self.current = None;
                self.slot.send_replace(TaskState::Idle);
                debug!(task = %task, "slot released");
            }
        }
        None
    }

    fn publish_state(&self, task: TaskId, state: TaskState) {
        self.slot.send_replace(state);
        if self
            .notify
            .send(Notification::StateChanged { task, state })
            .is_err()
        {
            debug!(task = %task, %state, "notification channel closed");
        }
    }
}

fn answer(reply: &mut Option<StartReply>, response: Result<TaskHandle>) {
    match reply.take() {
        Some(reply) => {
            if reply.send(response).is_err() {
                debug!("start requester went away before the answer");
            }
        }
        None => debug!("no pending start request to answer"),
    }
}

/// Spawn a controller over `backend` on the current Tokio runtime.
///
/// `events_tx`/`events_rx` must be the two halves of one channel; the backend
/// is expected to hold another clone of `events_tx` for its reports.
pub fn start_controller<B>(
    events_tx: mpsc::Sender<ControllerEvent>,
    events_rx: mpsc::Receiver<ControllerEvent>,
    backend: B,
    notify: mpsc::UnboundedSender<Notification>,
) -> (ControllerHandle, JoinHandle<Result<()>>)
where
    B: ProcessBackend + 'static,
{
    let (controller, state) = Controller::new(events_rx, backend, notify);
    let join = tokio::spawn(controller.run());
    (ControllerHandle::new(events_tx, state), join)
}

/// Spawn a controller that runs real processes.
///
/// Returns the handle for requests, the receiver of all notifications, and
/// the join handle of the controller loop.
pub fn spawn_controller(
    options: SupervisorOptions,
) -> (
    ControllerHandle,
    mpsc::UnboundedReceiver<Notification>,
    JoinHandle<Result<()>>,
) {
    let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (notify_tx, notify_rx) = mpsc::unbounded_channel();
    let backend = RealProcessBackend::new(events_tx.clone(), notify_tx.clone(), options);
    let (handle, join) = start_controller(events_tx, events_rx, backend, notify_tx);
    (handle, notify_rx, join)
}
