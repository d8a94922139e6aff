// src/sink/mod.rs

//! Log/Progress Sink.
//!
//! Receives the lines read from the external process, classifies them with
//! [`markers`], accumulates warning/error records for the classifier,
//! persists every line to the task's log file and forwards each line to the
//! presentation channel.
//!
//! The sink runs as its own Tokio task fed by an unbounded channel, so the
//! stream readers never wait on file IO or on a slow front end: pipes are
//! always drained.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::engine::Notification;
use crate::task::TaskId;
use crate::types::{Severity, StreamOrigin};

pub mod markers;

pub use markers::{LineKind, MarkerParser};

/// A line as read from a pipe, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    pub stream: StreamOrigin,
    /// Per-stream sequence number, starting at 0.
    pub seq: u64,
    pub text: String,
}

/// A classified output line, as delivered to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub task: TaskId,
    pub stream: StreamOrigin,
    pub seq: u64,
    /// Raw text, without the trailing newline.
    pub text: String,
    pub severity: Severity,
    /// Untagged line extending the previous record of its stream.
    pub continuation: bool,
}

impl LogLine {
    /// Text after the level tag, for display next to a severity icon.
    pub fn message(&self) -> &str {
        markers::message_of(&self.text)
    }
}

/// What the sink hands back once every line has been processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkSummary {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub log_file: PathBuf,
    pub lines: u64,
}

#[derive(Debug, Default)]
struct StreamState {
    parser: MarkerParser,
    /// Index (in the warnings or errors list) of the record that untagged
    /// lines currently extend.
    open_record: Option<usize>,
}

/// Sender half used by the stream readers.
pub type SinkInput = mpsc::UnboundedSender<RawLine>;

#[derive(Debug)]
pub struct LogSink {
    task: TaskId,
    stdout: StreamState,
    stderr: StreamState,
    warnings: Vec<String>,
    errors: Vec<String>,
    forward: Option<mpsc::UnboundedSender<Notification>>,
    writer: Option<BufWriter<File>>,
    log_file: PathBuf,
    lines: u64,
}

impl LogSink {
    /// Create (truncating) the log file and write the header line.
    pub async fn create(
        task: TaskId,
        log_file: impl AsRef<Path>,
        header: &str,
        forward: mpsc::UnboundedSender<Notification>,
    ) -> std::io::Result<Self> {
        let log_file = log_file.as_ref().to_path_buf();
        let file = File::create(&log_file).await?;
        let mut writer = BufWriter::new(file);
        writer.write_all(header.as_bytes()).await?;
        writer.write_all(b"\n").await?;

        Ok(Self {
            task,
            stdout: StreamState::default(),
            stderr: StreamState::default(),
            warnings: Vec::new(),
            errors: Vec::new(),
            forward: Some(forward),
            writer: Some(writer),
            log_file,
            lines: 0,
        })
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// Classify, accumulate, persist and forward one line.
    pub async fn accept(&mut self, raw: RawLine) -> LogLine {
        let state = match raw.stream {
            StreamOrigin::Stdout => &mut self.stdout,
            StreamOrigin::Stderr => &mut self.stderr,
        };
        let kind = state.parser.classify(&raw.text);

        match (kind.severity, kind.continuation) {
            (Severity::Info, _) => state.open_record = None,
            (severity, false) => {
                let list = match severity {
                    Severity::Warning => &mut self.warnings,
                    _ => &mut self.errors,
                };
                list.push(raw.text.clone());
                state.open_record = Some(list.len() - 1);
            }
            (severity, true) => {
                let list = match severity {
                    Severity::Warning => &mut self.warnings,
                    _ => &mut self.errors,
                };
                match state.open_record.and_then(|idx| list.get_mut(idx)) {
                    Some(record) => {
                        record.push('\n');
                        record.push_str(&raw.text);
                    }
                    None => {
                        list.push(raw.text.clone());
                        state.open_record = Some(list.len() - 1);
                    }
                }
            }
        }

        let line = LogLine {
            task: self.task,
            stream: raw.stream,
            seq: raw.seq,
            text: raw.text,
            severity: kind.severity,
            continuation: kind.continuation,
        };
        self.lines += 1;

        self.persist(&line).await;
        self.forward(&line);
        line
    }

    async fn persist(&mut self, line: &LogLine) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        let res = async {
            writer.write_all(line.text.as_bytes()).await?;
            writer.write_all(b"\n").await
        }
        .await;
        if let Err(e) = res {
            warn!(
                task = %self.task,
                log_file = %self.log_file.display(),
                error = %e,
                "failed to write task log; further lines are only forwarded"
            );
            self.writer = None;
        }
    }

    fn forward(&mut self, line: &LogLine) {
        let Some(tx) = self.forward.as_ref() else {
            return;
        };
        if tx.send(Notification::Log(line.clone())).is_err() {
            debug!(task = %self.task, "presentation channel closed; no longer forwarding lines");
            self.forward = None;
        }
    }

    /// Flush the log file and return the accumulated records.
    pub async fn finish(mut self) -> SinkSummary {
        if let Some(writer) = self.writer.as_mut() {
            if let Err(e) = writer.flush().await {
                warn!(task = %self.task, error = %e, "failed to flush task log");
            }
        }

        debug!(
            task = %self.task,
            lines = self.lines,
            warnings = self.warnings.len(),
            errors = self.errors.len(),
            "log sink finished"
        );

        SinkSummary {
            warnings: self.warnings,
            errors: self.errors,
            log_file: self.log_file,
            lines: self.lines,
        }
    }

    /// Run the sink on its own Tokio task.
    ///
    /// The task ends once every [`SinkInput`] clone has been dropped.
    pub fn spawn(mut self) -> (SinkInput, JoinHandle<SinkSummary>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<RawLine>();
        let handle = tokio::spawn(async move {
            while let Some(raw) = rx.recv().await {
                self.accept(raw).await;
            }
            self.finish().await
        });
        (tx, handle)
    }
}
