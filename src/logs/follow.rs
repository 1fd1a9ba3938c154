//! Continuous reading of lines appended to a log file.
//!
//! The preferred source is a `tail -n 0 -F` child process. Its handle lives
//! inside the stream and is killed when the stream is dropped, so cancelling a
//! follow never leaks the helper. Without `tail` the file is polled instead.

use crate::error::{Error, Result};
use async_process::{Child, ChildStdout, Command, Stdio};
use futures::Stream;
use futures_lite::io::{AsyncBufReadExt, BufReader};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Unbounded stream of log lines; ends only on a read error or when dropped.
pub type LogStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Follows `path` from its current end.
pub(crate) fn follow(path: PathBuf, poll_interval: Duration) -> LogStream {
    match spawn_tail(&path) {
        Ok((child, stdout)) => {
            tracing::debug!(path = %path.display(), "Following log with tail");
            Box::pin(tail_lines(child, stdout))
        }
        Err(e) => {
            tracing::debug!(error = %e, "tail unavailable, polling log file");
            let offset = current_len(&path);
            Box::pin(poll_lines(path, offset, poll_interval))
        }
    }
}

fn spawn_tail(path: &Path) -> std::io::Result<(Child, ChildStdout)> {
    let mut child = Command::new("tail")
        .arg("-n")
        .arg("0")
        .arg("-F")
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other("tail stdout not captured"))?;
    Ok((child, stdout))
}

fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim_end().to_string()
}

fn tail_lines(child: Child, stdout: ChildStdout) -> impl Stream<Item = Result<String>> + Send {
    async_stream::stream! {
        // Held for the lifetime of the stream; dropping it kills tail.
        let _child = child;
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => yield Ok(decode_line(&buf)),
                Err(e) => {
                    yield Err(Error::Log(format!("Failed to follow log: {}", e)));
                    break;
                }
            }
        }
    }
}

async fn read_from(path: &Path, offset: u64) -> std::io::Result<Vec<u8>> {
    let mut file = tokio::fs::File::open(path).await?;
    file.seek(SeekFrom::Start(offset)).await?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).await?;
    Ok(bytes)
}

/// Size of `path` now, so lines written before the first poll are not skipped.
fn current_len(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Polls `path` every `interval`, yielding complete lines written past
/// `start`. A shrinking file (clear or rotation) restarts from offset 0.
pub(crate) fn poll_lines(
    path: PathBuf,
    start: u64,
    interval: Duration,
) -> impl Stream<Item = Result<String>> + Send {
    async_stream::stream! {
        let mut offset = start;
        let mut pending: Vec<u8> = Vec::new();

        loop {
            // A missing file is waited for, as tail -F does.
            if let Ok(meta) = tokio::fs::metadata(&path).await {
                let len = meta.len();
                if len < offset {
                    offset = 0;
                    pending.clear();
                }
                if len > offset {
                    match read_from(&path, offset).await {
                        Ok(bytes) => {
                            offset += bytes.len() as u64;
                            pending.extend_from_slice(&bytes);
                        }
                        Err(e) => {
                            yield Err(Error::Log(format!("Failed to follow log: {}", e)));
                            break;
                        }
                    }
                    while let Some(end) = pending.iter().position(|b| *b == b'\n') {
                        let line: Vec<u8> = pending.drain(..=end).collect();
                        yield Ok(decode_line(&line));
                    }
                }
            }
            tokio::time::sleep(interval).await;
        }
    }
}
