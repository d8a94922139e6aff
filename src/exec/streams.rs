// src/exec/streams.rs

//! Pipe readers feeding the log sink.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::sink::{RawLine, SinkInput};
use crate::task::TaskId;
use crate::types::StreamOrigin;

/// Read `reader` line by line until EOF and hand each line to the sink.
///
/// Lines are numbered per stream from 0. Invalid UTF-8 is replaced rather than
/// aborting the read, and the pipe is always drained to EOF, even once the
/// sink is gone, so the child never blocks on a full pipe. The join handle
/// yields the number of lines read.
pub fn spawn_stream_reader<R>(
    task: TaskId,
    stream: StreamOrigin,
    reader: R,
    sink: SinkInput,
) -> JoinHandle<u64>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut segments = BufReader::new(reader).split(b'\n');
        let mut seq: u64 = 0;
        let mut sink = Some(sink);

        loop {
            match segments.next_segment().await {
                Ok(Some(mut bytes)) => {
                    if bytes.last() == Some(&b'\r') {
                        bytes.pop();
                    }
                    let text = String::from_utf8_lossy(&bytes).into_owned();

                    if let Some(tx) = sink.as_ref() {
                        if tx.send(RawLine { stream, seq, text }).is_err() {
                            debug!(task = %task, %stream, "log sink gone; discarding remaining output");
                            sink = None;
                        }
                    }
                    seq += 1;
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(task = %task, %stream, error = %e, "error reading process output");
                    break;
                }
            }
        }

        debug!(task = %task, %stream, lines = seq, "stream reader finished");
        seq
    })
}
