//! Client stdout watcher and stderr pass-through

use crate::output::OutputWriter;
use crate::types::{ClientLogRecord, ReadyMarkers};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn, Instrument};

/// Receives ready notifications from the log watcher.
#[async_trait]
pub trait ReadyListener: Send + Sync {
    /// Called for every log message that matches a ready marker.
    async fn on_ready(&self, message: &str);
}

/// Reads the client's stdout line by line.
///
/// Every line is parsed into a [`ClientLogRecord`] and written to the
/// configured output. Messages matching a ready marker are reported to the
/// [`ReadyListener`].
pub struct LogWatcher {
    markers: ReadyMarkers,
    output: Box<dyn OutputWriter>,
    listener: Arc<dyn ReadyListener>,
}

impl LogWatcher {
    pub fn new(
        markers: ReadyMarkers,
        output: Box<dyn OutputWriter>,
        listener: Arc<dyn ReadyListener>,
    ) -> Self {
        Self {
            markers,
            output,
            listener,
        }
    }

    /// Spawns the reader task in the current span.
    ///
    /// The task ends at EOF, on a read error, or when `cancel_token` fires,
    /// and yields the number of lines processed.
    pub fn spawn(
        self,
        stream: impl AsyncRead + Unpin + Send + 'static,
        cancel_token: CancellationToken,
    ) -> JoinHandle<u64> {
        tokio::spawn(self.run(stream, cancel_token).instrument(tracing::Span::current()))
    }

    async fn run(
        mut self,
        stream: impl AsyncRead + Unpin,
        cancel_token: CancellationToken,
    ) -> u64 {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        let mut line_num = 0u64;

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    debug!("Client stdout watcher cancelled");
                    break;
                }
                result = reader.read_until(b'\n', &mut buf) => {
                    match result {
                        Ok(0) => {
                            debug!("Client stdout closed");
                            break;
                        }
                        Ok(_) => {
                            line_num += 1;
                            // Invalid UTF-8 is replaced, not treated as a read error
                            let line = String::from_utf8_lossy(&buf).into_owned();
                            buf.clear();
                            self.process_line(line.trim_end_matches(['\n', '\r'])).await;
                        }
                        Err(e) => {
                            error!(error = %e, "Error reading client stdout");
                            break;
                        }
                    }
                }
            }
        }

        if let Err(e) = self.output.flush() {
            warn!(error = %e, "Failed to flush client log output");
        }

        debug!(lines = line_num, "Client stdout watcher finished");
        line_num
    }

    async fn process_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }

        let record = ClientLogRecord::parse_line(line);
        if let Err(e) = self.output.write(&record) {
            warn!(error = %e, "Failed to write client log record");
        }

        if self.markers.is_ready(&record.msg) {
            debug!(message = %record.msg, "Ready marker found in client log");
            self.listener.on_ready(&record.msg).await;
        }
    }
}

/// Copies the client's stderr to this process's stderr until EOF or cancel.
pub fn spawn_stderr_passthrough(
    stream: impl AsyncRead + Unpin + Send + 'static,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    let task = async move {
        let mut stream = stream;
        let mut sink = tokio::io::stderr();
        tokio::select! {
            _ = cancel_token.cancelled() => {
                debug!("Client stderr pass-through cancelled");
            }
            result = tokio::io::copy(&mut stream, &mut sink) => {
                match result {
                    Ok(bytes) => debug!(bytes, "Client stderr closed"),
                    Err(e) => warn!(error = %e, "Error copying client stderr"),
                }
            }
        }
    };
    tokio::spawn(task.instrument(tracing::Span::current()))
}
