// tests/controller_fake_backend.rs

mod common;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::path::Path;

use encarun::engine::{Notification, SupervisorEvent};
use encarun::errors::EncarunError;
use encarun::outcome::{ExitReport, TaskOutcome};
use encarun::task::{TaskSpec, TaskState};
use encarun_test_utils::fake_backend::{FAKE_PID, FakeBehaviour, FakeHarness};

type TestResult = Result<(), Box<dyn Error>>;

fn spec() -> TaskSpec {
    TaskSpec::new("enca", Path::new("/tmp")).arg("carbon")
}

fn states(notes: &[Notification]) -> Vec<TaskState> {
    notes
        .iter()
        .filter_map(|n| match n {
            Notification::StateChanged { state, .. } => Some(*state),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn clean_exit_is_delivered_once_and_slot_returns_to_idle() -> TestResult {
    init_tracing();
    let mut h = FakeHarness::start(FakeBehaviour::ExitWith(ExitReport {
        exit_code: Some(0),
        ..ExitReport::default()
    }));

    let mut task = h.handle.start(spec()).await?;
    let (notes, result) = with_timeout(h.next_result()).await;

    assert_eq!(result.outcome(), TaskOutcome::Success);
    assert_eq!(result.task(), Some(task.id()));
    assert_eq!(
        states(&notes),
        vec![TaskState::Submitted, TaskState::Running, TaskState::Completed]
    );
    assert_eq!(with_timeout(task.wait_for_terminal()).await, TaskState::Completed);
    assert_eq!(h.launched(), vec![task.id()]);

    // Released only after delivery; the next start is accepted.
    h.set_behaviour(FakeBehaviour::Hold);
    let second = h.handle.start(spec()).await?;
    assert_ne!(second.id(), task.id());

    h.handle.shutdown().await?;
    with_timeout(h.join).await??;
    Ok(())
}

#[tokio::test]
async fn start_while_running_is_rejected_and_running_task_untouched() -> TestResult {
    init_tracing();
    let mut h = FakeHarness::start(FakeBehaviour::Hold);

    let mut first = h.handle.start(spec()).await?;
    // Wait until the fake reported the spawn.
    let mut state = h.handle.subscribe_state();
    with_timeout(state.wait_for(|s| *s == TaskState::Running)).await?;
    assert_eq!(first.pid(), Some(FAKE_PID));

    let err = h.handle.start(spec()).await.expect_err("slot is occupied");
    assert!(matches!(err, EncarunError::TaskAlreadyRunning(id) if id == first.id()));
    assert_eq!(first.state(), TaskState::Running);
    assert_eq!(h.launched().len(), 1);
    assert!(h.terminated().is_empty());

    h.inject(SupervisorEvent::Finished {
        task: first.id(),
        report: ExitReport {
            exit_code: Some(4),
            warnings: vec!["[WARNING] - partial coverage".to_string()],
            ..ExitReport::default()
        },
    })
    .await;
    let (_, result) = with_timeout(h.next_result()).await;
    assert_eq!(result.outcome(), TaskOutcome::SuccessWithWarnings);
    assert_eq!(with_timeout(first.wait_for_terminal()).await, TaskState::Completed);
    Ok(())
}

#[tokio::test]
async fn cancel_running_task_yields_cancelled() -> TestResult {
    init_tracing();
    let mut h = FakeHarness::start(FakeBehaviour::Hold);

    let task = h.handle.start(spec()).await?;
    let mut state = h.handle.subscribe_state();
    with_timeout(state.wait_for(|s| *s == TaskState::Running)).await?;

    h.handle.request_cancel().await?;
    h.handle.request_cancel().await?;

    let (notes, result) = with_timeout(h.next_result()).await;
    assert_eq!(result.outcome(), TaskOutcome::Cancelled);
    assert_eq!(
        states(&notes),
        vec![
            TaskState::Submitted,
            TaskState::Running,
            TaskState::CancelRequested,
            TaskState::Cancelled
        ]
    );
    // Idempotent: the second request never reached the backend.
    assert_eq!(h.terminated(), vec![task.id()]);
    Ok(())
}

#[tokio::test]
async fn cancel_before_spawn_never_reports_running() -> TestResult {
    init_tracing();
    let mut h = FakeHarness::start(FakeBehaviour::Silent);

    let mut task = h.handle.start(spec()).await?;
    h.handle.request_cancel().await?;
    assert_eq!(with_timeout(task.wait_for_terminal()).await, TaskState::Cancelled);
    // The slot is still held until the supervisor reports back.
    assert_eq!(h.handle.state(), TaskState::Cancelled);

    h.inject(SupervisorEvent::Finished {
        task: task.id(),
        report: ExitReport::default(),
    })
    .await;

    let (notes, result) = with_timeout(h.next_result()).await;
    assert_eq!(result.outcome(), TaskOutcome::Cancelled);
    assert!(!states(&notes).contains(&TaskState::Running));
    assert_eq!(task.pid(), None);
    Ok(())
}

#[tokio::test]
async fn launch_failure_is_unexpected_error() -> TestResult {
    init_tracing();
    let mut h = FakeHarness::start(FakeBehaviour::FailLaunch(
        "No such file or directory (os error 2)".to_string(),
    ));

    let task = h.handle.start(spec()).await?;
    let (_, result) = with_timeout(h.next_result()).await;

    assert_eq!(result.outcome(), TaskOutcome::UnexpectedError);
    assert_eq!(result.task(), Some(task.id()));
    assert_eq!(
        result.errors(),
        &["No such file or directory (os error 2)".to_string()]
    );
    assert_eq!(task.pid(), None);
    Ok(())
}

#[tokio::test]
async fn shutdown_cancels_active_task_then_stops() -> TestResult {
    init_tracing();
    let mut h = FakeHarness::start(FakeBehaviour::Hold);

    let task = h.handle.start(spec()).await?;
    let mut state = h.handle.subscribe_state();
    with_timeout(state.wait_for(|s| *s == TaskState::Running)).await?;

    h.handle.shutdown().await?;
    let (_, result) = with_timeout(h.next_result()).await;
    assert_eq!(result.outcome(), TaskOutcome::Cancelled);
    assert_eq!(result.task(), Some(task.id()));

    with_timeout(h.join).await??;
    let err = h.handle.start(spec()).await.expect_err("controller stopped");
    assert!(matches!(err, EncarunError::ControllerClosed));
    Ok(())
}
