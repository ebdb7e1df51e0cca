//! # Connect Monitoring
//!
//! Health checking of a running Autify Connect client.
//!
//! This crate provides:
//! - A client for the loopback debug server (`GET /status`, `POST /terminate`)
//! - A fixed-interval status poller that reports to a [`HealthListener`]

pub mod http;
pub mod poller;

#[cfg(test)]
mod testing;

use connect_common::ConnectError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Health check error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HealthCheckError {
    #[error("Debug server request timed out: {endpoint}")]
    Timeout { endpoint: String },

    #[error("Debug server connection failed: {endpoint} - {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    #[error("Request to debug server failed: {endpoint} => {status}")]
    UnexpectedStatus { endpoint: String, status: u16 },

    #[error("Invalid response from {endpoint}: {response}")]
    InvalidResponse { endpoint: String, response: String },
}

/// Result type for health check operations.
pub type HealthCheckResult<T> = Result<T, HealthCheckError>;

impl From<HealthCheckError> for ConnectError {
    fn from(err: HealthCheckError) -> Self {
        ConnectError::health_poll(err.to_string())
    }
}

/// Connection state reported by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Starting,
    Ready,
    Reconnecting,
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthState::Starting => write!(f, "starting"),
            HealthState::Ready => write!(f, "ready"),
            HealthState::Reconnecting => write!(f, "reconnecting"),
        }
    }
}

/// One `/status` answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub state: HealthState,
    pub message: String,
}

// Re-export main types
pub use http::DebugServerClient;
pub use poller::{HealthListener, PollerStats, StatusPoller};
