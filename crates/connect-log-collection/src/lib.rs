//! # Connect Log Collection
//!
//! Capture of the Autify Connect client's output.
//!
//! This crate provides:
//! - Parsing of the client's newline-delimited JSON log records
//! - Ready-marker detection on the client's stdout
//! - Output targets for client log records (tracing or a log file)
//! - Pass-through of the client's stderr

pub mod output;
pub mod types;
pub mod watcher;

// Re-export main types
pub use output::{client_log_file_path, FileOutputWriter, OutputWriter, TracingOutputWriter};
pub use types::{ClientLogRecord, LogLevel, ReadyMarkers};
pub use watcher::{spawn_stderr_passthrough, LogWatcher, ReadyListener};
