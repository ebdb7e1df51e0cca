//! Core types for client log collection

use serde::{Deserialize, Serialize};

/// Log level of a client record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl LogLevel {
    /// Maps a client level string. Unknown levels read as info.
    pub fn parse(level: &str) -> Self {
        match level.to_ascii_lowercase().as_str() {
            "debug" | "trace" => LogLevel::Debug,
            "warn" | "warning" => LogLevel::Warn,
            "error" | "fatal" | "panic" | "dpanic" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

/// One line of client stdout.
///
/// The client writes `{"level": ..., "msg": ..., "ts": ...}` per line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientLogRecord {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub msg: String,
    #[serde(default, deserialize_with = "deserialize_ts")]
    pub ts: Option<String>,
}

fn default_level() -> String {
    "info".to_string()
}

// `ts` may be an RFC 3339 string or epoch seconds.
fn deserialize_ts<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

impl ClientLogRecord {
    /// Parses one stdout line.
    ///
    /// Lines that are not JSON objects become an info record carrying the
    /// raw line, so the watcher never fails on unexpected output.
    pub fn parse_line(line: &str) -> Self {
        match serde_json::from_str::<ClientLogRecord>(line) {
            Ok(record) => record,
            Err(_) => Self {
                level: default_level(),
                msg: line.to_string(),
                ts: None,
            },
        }
    }

    pub fn log_level(&self) -> LogLevel {
        LogLevel::parse(&self.level)
    }
}

/// Messages that mean the client is connected.
///
/// A message matches when it contains any of the markers, so one entry per
/// supported client language is enough.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyMarkers(Vec<String>);

impl Default for ReadyMarkers {
    fn default() -> Self {
        Self(vec!["Successfully connected".to_string()])
    }
}

impl ReadyMarkers {
    pub fn new(markers: Vec<String>) -> Self {
        Self(markers)
    }

    pub fn is_ready(&self, message: &str) -> bool {
        self.0.iter().any(|m| !m.is_empty() && message.contains(m.as_str()))
    }

    pub fn markers(&self) -> &[String] {
        &self.0
    }
}
