//! Async stream log readers (non-UTF8-safe).
//!
//! llama-server (and other C/C++ tooling) can emit non-UTF8 bytes on stdout/stderr.
//! Using `BufReader::lines()` would terminate the reader on invalid UTF-8, so
//! lines are read as bytes and decoded lossily.

use std::fmt;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Which stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        })
    }
}

/// Destination for captured output lines.
///
/// Called from reader tasks; implementations must not block.
pub trait OutputSink: Send + Sync {
    fn append(&self, stream: StreamKind, line: String);
}

/// Spawn a task that forwards every line of `stream` to `sink` until EOF,
/// a read error, or `cancel`.
pub fn spawn_stream_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    kind: StreamKind,
    pid: Option<u32>,
    sink: Arc<dyn OutputSink>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            let read = tokio::select! {
                () = cancel.cancelled() => break,
                read = reader.read_until(b'\n', &mut buf) => read,
            };
            match read {
                Ok(0) => break, // EOF
                Ok(_) => {
                    // Trim trailing newline(s)
                    if buf.last() == Some(&b'\n') {
                        buf.pop();
                        if buf.last() == Some(&b'\r') {
                            buf.pop();
                        }
                    }
                    sink.append(kind, String::from_utf8_lossy(&buf).into_owned());
                }
                Err(e) => {
                    debug!(?pid, stream = %kind, error = %e, "Output reader exiting due to read error");
                    break;
                }
            }
        }

        debug!(?pid, stream = %kind, "Output reader task exiting");
    })
}
