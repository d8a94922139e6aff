use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use encarun::engine::{
    ControllerEvent, ControllerHandle, Notification, SupervisorEvent, start_controller,
};
use encarun::errors::Result;
use encarun::exec::ProcessBackend;
use encarun::outcome::ExitReport;
use encarun::task::{TaskId, TaskSpec};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Pid reported for every fake process.
pub const FAKE_PID: u32 = 4242;

/// What the fake does when asked to launch.
#[derive(Debug, Clone)]
pub enum FakeBehaviour {
    /// Report `Spawned` and keep "running" until terminated (or until the
    /// test injects a `Finished` event). Terminating reports a signal death.
    Hold,
    /// Report `Spawned`, then `Finished` with this report right away.
    ExitWith(ExitReport),
    /// Report `LaunchFailed` with this message.
    FailLaunch(String),
    /// Report nothing at all; the test drives every supervisor event.
    Silent,
}

/// What the controller asked the fake to do.
#[derive(Debug, Default, Clone)]
pub struct FakeLog {
    pub launched: Vec<(TaskId, TaskSpec)>,
    pub terminated: Vec<TaskId>,
}

/// A fake process backend that:
/// - records which tasks were launched and terminated
/// - answers with synthetic supervisor events according to [`FakeBehaviour`]
pub struct FakeBackend {
    events: mpsc::Sender<ControllerEvent>,
    behaviour: Arc<Mutex<FakeBehaviour>>,
    log: Arc<Mutex<FakeLog>>,
    terminated: HashSet<TaskId>,
}

impl FakeBackend {
    pub fn new(
        events: mpsc::Sender<ControllerEvent>,
        behaviour: Arc<Mutex<FakeBehaviour>>,
        log: Arc<Mutex<FakeLog>>,
    ) -> Self {
        Self {
            events,
            behaviour,
            log,
            terminated: HashSet::new(),
        }
    }
}

impl ProcessBackend for FakeBackend {
    fn launch(
        &mut self,
        task: TaskId,
        spec: TaskSpec,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.events.clone();
        let behaviour = self.behaviour.lock().unwrap().clone();
        self.log.lock().unwrap().launched.push((task, spec));

        Box::pin(async move {
            let events = match behaviour {
                FakeBehaviour::Hold => vec![SupervisorEvent::Spawned {
                    task,
                    pid: FAKE_PID,
                }],
                FakeBehaviour::ExitWith(report) => vec![
                    SupervisorEvent::Spawned {
                        task,
                        pid: FAKE_PID,
                    },
                    SupervisorEvent::Finished { task, report },
                ],
                FakeBehaviour::FailLaunch(error) => vec![SupervisorEvent::LaunchFailed {
                    task,
                    error,
                    log_file: None,
                }],
                FakeBehaviour::Silent => Vec::new(),
            };

            for event in events {
                tx.send(ControllerEvent::Supervisor(event))
                    .await
                    .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }

    fn terminate(&mut self, task: TaskId) {
        self.log.lock().unwrap().terminated.push(task);

        let hold = matches!(*self.behaviour.lock().unwrap(), FakeBehaviour::Hold);
        if !hold || !self.terminated.insert(task) {
            return;
        }

        let tx = self.events.clone();
        tokio::spawn(async move {
            let _ = tx
                .send(ControllerEvent::Supervisor(SupervisorEvent::Finished {
                    task,
                    report: ExitReport::default(),
                }))
                .await;
        });
    }
}

/// A controller wired to a [`FakeBackend`], plus everything a test needs to
/// observe and steer it.
pub struct FakeHarness {
    pub handle: ControllerHandle,
    pub notifications: mpsc::UnboundedReceiver<Notification>,
    pub join: JoinHandle<Result<()>>,
    pub log: Arc<Mutex<FakeLog>>,
    pub behaviour: Arc<Mutex<FakeBehaviour>>,
    /// Inject supervisor events as if a real process reported them.
    pub events: mpsc::Sender<ControllerEvent>,
}

impl FakeHarness {
    pub fn start(behaviour: FakeBehaviour) -> Self {
        let (events_tx, events_rx) = mpsc::channel(64);
        let (notify_tx, notifications) = mpsc::unbounded_channel();
        let behaviour = Arc::new(Mutex::new(behaviour));
        let log = Arc::new(Mutex::new(FakeLog::default()));

        let backend = FakeBackend::new(events_tx.clone(), Arc::clone(&behaviour), Arc::clone(&log));
        let (handle, join) = start_controller(events_tx.clone(), events_rx, backend, notify_tx);

        Self {
            handle,
            notifications,
            join,
            log,
            behaviour,
            events: events_tx,
        }
    }

    pub fn set_behaviour(&self, behaviour: FakeBehaviour) {
        *self.behaviour.lock().unwrap() = behaviour;
    }

    pub fn launched(&self) -> Vec<TaskId> {
        self.log
            .lock()
            .unwrap()
            .launched
            .iter()
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn terminated(&self) -> Vec<TaskId> {
        self.log.lock().unwrap().terminated.clone()
    }

    pub async fn inject(&self, event: SupervisorEvent) {
        self.events
            .send(ControllerEvent::Supervisor(event))
            .await
            .expect("controller event channel closed");
    }

    /// Receive notifications until the task result arrives.
    pub async fn next_result(&mut self) -> (Vec<Notification>, encarun::outcome::TaskResult) {
        let mut seen = Vec::new();
        while let Some(n) = self.notifications.recv().await {
            if let Notification::Finished(result) = n {
                return (seen, result);
            }
            seen.push(n);
        }
        panic!("notification channel closed before a result arrived");
    }
}
