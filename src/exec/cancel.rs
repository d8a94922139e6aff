// src/exec/cancel.rs

//! Cancellation Coordinator.
//!
//! A cancel request is a level-triggered flag (`watch` channel): the
//! controller flips it once, the supervisor of the task observes it whenever
//! it looks. Termination is advisory first (SIGTERM to the process group) and
//! forceful after a fixed grace period (SIGKILL).

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::task::TaskId;

/// Time a process gets to exit after the graceful signal.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Controller side of a cancellation flag.
#[derive(Debug)]
pub struct CancelTrigger {
    tx: watch::Sender<bool>,
}

impl CancelTrigger {
    /// Raise the flag. Returns `false` if it was already raised.
    pub fn cancel(&self) -> bool {
        self.tx.send_if_modified(|cancelled| {
            if *cancelled {
                false
            } else {
                *cancelled = true;
                true
            }
        })
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Supervisor side of a cancellation flag.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is requested.
    ///
    /// If the trigger is dropped without cancelling, this never resolves.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

pub fn cancel_pair() -> (CancelTrigger, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelTrigger { tx }, CancelToken { rx })
}

/// How a cancelled process actually went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Graceful,
    Forced,
}

/// Ask the process to stop, wait up to `grace`, then kill it.
pub async fn terminate_with_grace(
    child: &mut Child,
    task: TaskId,
    grace: Duration,
) -> io::Result<(ExitStatus, Termination)> {
    match send_graceful_signal(child) {
        Ok(true) => {
            info!(task = %task, grace_ms = grace.as_millis() as u64, "sent graceful termination signal");
            match timeout(grace, child.wait()).await {
                Ok(status) => return Ok((status?, Termination::Graceful)),
                Err(_) => warn!(
                    task = %task,
                    "process still running after grace period; forcing termination"
                ),
            }
        }
        Ok(false) => debug!(task = %task, "graceful termination unavailable; killing process"),
        Err(e) => warn!(
            task = %task,
            error = %e,
            "failed to send graceful termination signal; killing process"
        ),
    }

    force_kill(child, task);
    let status = child.wait().await?;
    Ok((status, Termination::Forced))
}

#[cfg(unix)]
fn send_graceful_signal(child: &Child) -> io::Result<bool> {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return Ok(false);
    };
    // The child leads its own process group (see `supervisor::build_command`).
    killpg(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(io::Error::from)?;
    Ok(true)
}

#[cfg(not(unix))]
fn send_graceful_signal(_child: &Child) -> io::Result<bool> {
    Ok(false)
}

#[cfg(unix)]
fn force_kill(child: &mut Child, task: TaskId) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    if let Some(pid) = child.id() {
        if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            debug!(task = %task, error = %e, "SIGKILL to process group failed");
        }
    }
    if let Err(e) = child.start_kill() {
        debug!(task = %task, error = %e, "kill of child process failed (already exited?)");
    }
}

#[cfg(not(unix))]
fn force_kill(child: &mut Child, task: TaskId) {
    if let Err(e) = child.start_kill() {
        debug!(task = %task, error = %e, "kill of child process failed (already exited?)");
    }
}
