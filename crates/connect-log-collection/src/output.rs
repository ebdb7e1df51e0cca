//! Output writers for client log records

use crate::types::{ClientLogRecord, LogLevel};
use chrono::Utc;
use connect_common::{ConnectError, ConnectResult};
use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};

/// Tracing target for records re-emitted from the client.
pub const CLIENT_LOG_TARGET: &str = "connect_client";

/// Trait for writing client log records to various outputs
pub trait OutputWriter: Send {
    /// Write a log record
    fn write(&mut self, record: &ClientLogRecord) -> ConnectResult<()>;

    /// Flush any buffered output
    fn flush(&mut self) -> ConnectResult<()>;
}

/// Re-emits client records as tracing events under [`CLIENT_LOG_TARGET`].
#[derive(Debug, Default)]
pub struct TracingOutputWriter;

impl OutputWriter for TracingOutputWriter {
    fn write(&mut self, record: &ClientLogRecord) -> ConnectResult<()> {
        match record.log_level() {
            LogLevel::Debug => tracing::debug!(target: CLIENT_LOG_TARGET, "{}", record.msg),
            LogLevel::Info => tracing::info!(target: CLIENT_LOG_TARGET, "{}", record.msg),
            LogLevel::Warn => tracing::warn!(target: CLIENT_LOG_TARGET, "{}", record.msg),
            LogLevel::Error => tracing::error!(target: CLIENT_LOG_TARGET, "{}", record.msg),
        }
        Ok(())
    }

    fn flush(&mut self) -> ConnectResult<()> {
        Ok(())
    }
}

/// File output writer
///
/// Each record becomes one `<ts>\t<level>\t<msg>` line.
pub struct FileOutputWriter {
    writer: LineWriter<File>,
    path: PathBuf,
}

impl FileOutputWriter {
    /// Create a new file output writer, creating parent directories.
    pub fn new(path: PathBuf) -> ConnectResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConnectError::logging(format!("failed to create log directory: {}", e))
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                ConnectError::logging(format!("failed to open {}: {}", path.display(), e))
            })?;

        Ok(Self {
            writer: LineWriter::new(file),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutputWriter for FileOutputWriter {
    fn write(&mut self, record: &ClientLogRecord) -> ConnectResult<()> {
        let ts = record
            .ts
            .clone()
            .unwrap_or_else(|| Utc::now().to_rfc3339());
        writeln!(self.writer, "{}\t{}\t{}", ts, record.log_level(), record.msg)
            .map_err(|e| ConnectError::logging(format!("failed to write log file: {}", e)))
    }

    fn flush(&mut self) -> ConnectResult<()> {
        self.writer
            .flush()
            .map_err(|e| ConnectError::logging(format!("failed to flush log file: {}", e)))
    }
}

/// Path of a fresh client log file under `cache_dir`.
pub fn client_log_file_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(format!(
        "autifyconnect-{}-{}.log",
        Utc::now().timestamp_millis(),
        std::process::id()
    ))
}
