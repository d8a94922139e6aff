// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] provides the `ProcessBackend` trait the controller drives and
//!   the production `RealProcessBackend`.
//! - [`supervisor`] runs one external process: spawn, stream, wait or
//!   terminate, then report an [`crate::outcome::ExitReport`].
//! - [`streams`] drains stdout/stderr into the log sink.
//! - [`cancel`] holds the cancellation flag and the graceful-then-forced
//!   termination sequence.

pub mod backend;
pub mod cancel;
pub mod streams;
pub mod supervisor;

pub use backend::{ProcessBackend, RealProcessBackend};
pub use cancel::{CancelToken, CancelTrigger, DEFAULT_GRACE_PERIOD, cancel_pair};
pub use supervisor::{DEFAULT_DRAIN_TIMEOUT, SupervisorOptions, supervise};
