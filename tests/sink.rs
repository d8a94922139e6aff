// tests/sink.rs

mod common;
use crate::common::{init_tracing, tool_line, with_timeout};

use std::error::Error;

use tokio::sync::mpsc;

use encarun::engine::Notification;
use encarun::sink::{LogSink, RawLine};
use encarun::task::TaskId;
use encarun::types::{Severity, StreamOrigin};

type TestResult = Result<(), Box<dyn Error>>;

fn raw(stream: StreamOrigin, seq: u64, text: &str) -> RawLine {
    RawLine {
        stream,
        seq,
        text: text.to_string(),
    }
}

#[tokio::test]
async fn accumulates_records_and_persists_every_line() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let log_path = dir.path().join("run.log");
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut sink = LogSink::create(TaskId::new(1), &log_path, "# header", tx).await?;

    let warning = tool_line("WARNING", "no data for 2019");
    let error = tool_line("ERROR", "processing failed");
    sink.accept(raw(StreamOrigin::Stdout, 0, &tool_line("INFO", "starting"))).await;
    sink.accept(raw(StreamOrigin::Stdout, 1, &warning)).await;
    sink.accept(raw(StreamOrigin::Stderr, 0, &error)).await;
    sink.accept(raw(StreamOrigin::Stderr, 1, "Traceback line 1")).await;
    sink.accept(raw(StreamOrigin::Stderr, 2, "Traceback line 2")).await;
    let summary = sink.finish().await;

    assert_eq!(summary.lines, 5);
    assert_eq!(summary.warnings, vec![warning.clone()]);
    assert_eq!(
        summary.errors,
        vec![format!("{error}\nTraceback line 1\nTraceback line 2")]
    );
    assert_eq!(summary.log_file, log_path);

    let contents = std::fs::read_to_string(&log_path)?;
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines[0], "# header");
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[2], warning);

    let mut forwarded = Vec::new();
    while let Ok(Notification::Log(line)) = rx.try_recv() {
        forwarded.push(line);
    }
    assert_eq!(forwarded.len(), 5);
    assert_eq!(forwarded[1].severity, Severity::Warning);
    assert_eq!(forwarded[1].message(), "no data for 2019");
    assert!(forwarded[3].continuation);
    assert_eq!(forwarded[3].severity, Severity::Error);

    Ok(())
}

#[tokio::test]
async fn streams_keep_separate_record_state() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut sink = LogSink::create(TaskId::new(1), dir.path().join("x.log"), "#", tx).await?;

    let warning = tool_line("WARNING", "stdout warning");
    sink.accept(raw(StreamOrigin::Stdout, 0, &warning)).await;
    // No record open on stderr yet: a plain line there is informational.
    let line = sink.accept(raw(StreamOrigin::Stderr, 0, "progress 10%")).await;
    assert_eq!(line.severity, Severity::Info);
    assert!(!line.continuation);

    let summary = sink.finish().await;
    assert_eq!(summary.warnings, vec![warning]);
    assert!(summary.errors.is_empty());
    Ok(())
}

#[tokio::test]
async fn keeps_working_when_presentation_is_gone() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let (tx, rx) = mpsc::unbounded_channel();
    drop(rx);

    let sink = LogSink::create(TaskId::new(2), dir.path().join("y.log"), "#", tx).await?;
    let (input, handle) = sink.spawn();
    for seq in 0..10 {
        input.send(raw(StreamOrigin::Stdout, seq, &format!("line {seq}")))?;
    }
    drop(input);

    let summary = with_timeout(handle).await?;
    assert_eq!(summary.lines, 10);
    let contents = std::fs::read_to_string(dir.path().join("y.log"))?;
    assert!(contents.ends_with("line 9\n"));
    Ok(())
}

#[tokio::test]
async fn creating_log_in_missing_directory_fails() {
    init_tracing();
    let (tx, _rx) = mpsc::unbounded_channel();
    let result = LogSink::create(
        TaskId::new(3),
        "/nonexistent-encarun-dir/sub/run.log",
        "#",
        tx,
    )
    .await;
    assert!(result.is_err());
}
